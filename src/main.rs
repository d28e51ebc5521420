use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod aws;
mod cli;
mod config;
mod error;
mod ssh;

pub use error::{OpsworksSshError, Result};

use cli::commands::ssh::SshOptions;

#[derive(Parser)]
#[command(name = "opsworks-ssh")]
#[command(about = "Generate SSH config entries for OpsWorks and EC2 instances")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// AWS config file listing the accounts
    #[arg(long, env = "AWS_CONFIG_FILE", global = true)]
    aws_config: Option<PathBuf>,

    /// SSH config file to update (default ~/.ssh/config)
    #[arg(long, global = true)]
    ssh_config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and update SSH configuration files
    Ssh(SshArgs),

    /// List configured accounts
    Accounts {
        /// Show only this account
        name: Option<String>,
    },
}

#[derive(Args)]
struct SshArgs {
    /// Update the SSH config file directly
    #[arg(short, long)]
    update: bool,

    /// Backup old SSH config before updating
    #[arg(short, long)]
    backup: bool,

    /// Use SSH LogLevel quiet
    #[arg(short, long, default_value_t = true, overrides_with = "no_quiet")]
    quiet: bool,

    /// Do not add LogLevel quiet
    #[arg(long, overrides_with = "quiet")]
    no_quiet: bool,

    /// Check SSH host keys (this can be annoying since dynamic instances often change IP number)
    #[arg(short = 'c', long)]
    key_checking: bool,

    /// Timeout in seconds for each AWS request
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra attempts for a failed AWS request
    #[arg(long)]
    retries: Option<u32>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,opsworks_ssh={}", level))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Ssh(args) => {
            cli::commands::ssh::execute(SshOptions {
                aws_config: cli.aws_config,
                ssh_config: cli.ssh_config,
                update: args.update,
                backup: args.backup,
                quiet: args.quiet && !args.no_quiet,
                key_checking: args.key_checking,
                timeout_secs: args.timeout,
                retries: args.retries,
            })
            .await?
        }
        Commands::Accounts { name } => {
            cli::commands::accounts::list(cli.aws_config, name.as_deref())?
        }
    }

    Ok(())
}
