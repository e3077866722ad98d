use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "keel", version, about = "Keel policy engine CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a policy file against the filter and action registry.
    Check {
        /// Path to the policy file (YAML).
        file: PathBuf,

        /// Engine configuration to validate alongside the policies.
        #[arg(long, env = "KEEL_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the remote permissions a policy file needs, for a dry-run
    /// permission check.
    Permissions {
        /// Path to the policy file (YAML).
        file: PathBuf,

        /// Only report this policy.
        #[arg(long)]
        policy: Option<String>,

        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Check { file, config } => commands::check::run(&file, config.as_deref())?,
        Command::Permissions { file, policy, json } => {
            commands::permissions::run(&file, policy.as_deref(), json)?
        }
    }

    Ok(())
}
