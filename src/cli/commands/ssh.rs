use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use crate::aws::{AwsInstanceSource, CallPolicy, InstanceSource};
use crate::config::{Account, AccountStore, Settings};
use crate::ssh::{apply, synthesize, AccountBlock, MergedSection, SynthesisOptions};
use crate::Result;

/// Flags of the `ssh` command
#[derive(Debug, Clone, Default)]
pub struct SshOptions {
    pub aws_config: Option<PathBuf>,
    pub ssh_config: Option<PathBuf>,
    pub update: bool,
    pub backup: bool,
    pub quiet: bool,
    pub key_checking: bool,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

pub async fn execute(options: SshOptions) -> Result<()> {
    let settings = Settings::load()?;

    let aws_config = settings.resolve_aws_config(options.aws_config.clone())?;
    let store = AccountStore::load(&aws_config)?;
    if store.is_legacy() {
        tracing::info!(path = %aws_config.display(), "using legacy single-account config");
    }

    let policy = CallPolicy::new(
        settings.timeout(options.timeout_secs),
        settings.retries(options.retries),
    );
    let source = AwsInstanceSource::new(policy);

    let section =
        build_section(store.accounts(), &source, options.key_checking, options.quiet).await?;

    if options.update {
        let target = settings.resolve_ssh_config(options.ssh_config.clone())?;
        let report = apply(&section, &target, options.backup || settings.backup)?;

        if let Some(backup) = &report.backup {
            println!("Backed up {} to {}", target.display(), backup.display());
        }
        println!(
            "Successfully updated {} with {} instances!",
            report.target.display(),
            report.entries
        );
    } else {
        println!("{}", section.render().trim());
    }

    Ok(())
}

/// Discover every account in order and turn the results into one section
pub async fn build_section(
    accounts: &[Account],
    source: &dyn InstanceSource,
    key_checking: bool,
    quiet: bool,
) -> Result<MergedSection> {
    let mut blocks = Vec::with_capacity(accounts.len());

    for account in accounts {
        let spinner = create_spinner(&format!("Discovering instances for '{}'...", account.name));
        let instances = match source.discover(account).await {
            Ok(instances) => instances,
            Err(e) => {
                spinner.abandon_with_message(format!("Discovery failed for '{}'", account.name));
                return Err(e);
            }
        };

        let options = SynthesisOptions::resolve(account, key_checking, quiet);
        tracing::debug!(account = %account.name, ?options, "synthesis options");

        let entries = synthesize(&instances, &options);
        tracing::info!(
            account = %account.name,
            discovered = instances.len(),
            entries = entries.len(),
            "account done"
        );
        spinner.finish_and_clear();

        blocks.push(AccountBlock {
            account: account.name.clone(),
            entries,
        });
    }

    Ok(MergedSection::merge(blocks))
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
