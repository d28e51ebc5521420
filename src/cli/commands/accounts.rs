use std::path::PathBuf;

use crate::config::{Account, AccountStore, Settings};
use crate::ssh::SynthesisOptions;
use crate::{OpsworksSshError, Result};

/// List the accounts read from the AWS config, or just the one named
pub fn list(aws_config: Option<PathBuf>, name: Option<&str>) -> Result<()> {
    let settings = Settings::load()?;
    let path = settings.resolve_aws_config(aws_config)?;
    let store = AccountStore::load(&path)?;

    if let Some(name) = name {
        let account = store.get(name).ok_or_else(|| {
            OpsworksSshError::Config(format!("Account '{}' not found in {}", name, path.display()))
        })?;
        print!("{}", describe(account));
        return Ok(());
    }

    println!("Accounts in {}:", path.display());
    if store.is_legacy() {
        println!("  (legacy single-account layout)");
    }

    if store.accounts().is_empty() {
        println!("  (none configured)");
        return Ok(());
    }

    for account in store.accounts() {
        println!();
        print!("{}", describe(account));
    }

    Ok(())
}

fn describe(account: &Account) -> String {
    let credentials = account.credentials();
    let options = SynthesisOptions::resolve(account, false, false);
    let or_none = |items: &[String]| {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.join(", ")
        }
    };

    let mut out = format!("  {}\n", account.name);
    out.push_str(&format!(
        "    Credentials: {}\n",
        if credentials.keys.is_some() {
            "static keys"
        } else {
            "default provider chain"
        }
    ));
    out.push_str(&format!("    Regions: {}\n", or_none(&account.regions)));
    out.push_str(&format!("    Stacks: {}\n", or_none(&account.stack_ids)));
    out.push_str(&format!(
        "    SSH user: {}\n",
        options.user.as_deref().unwrap_or("(unset)")
    ));
    if let Some(identity) = &options.identity_file {
        out.push_str(&format!("    Identity file: {}\n", identity));
    }
    out
}
