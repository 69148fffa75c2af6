mod commands;
mod providers;

use std::path::PathBuf;

use anyhow::Context;
use burster_cloud::{CancellationToken, Operation};
use burster_core::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloud-burster")]
#[command(about = "Burst HPC compute nodes into the cloud", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(
        short = 'c',
        long = "config-path",
        env = "CONFIG_PATH",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    config_path: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create hosts
    Create {
        /// Hostname pattern, e.g. "cn[1-10,12],gpu1"
        hostnames: String,
    },
    /// Delete hosts
    Delete {
        /// Hostname pattern, e.g. "cn[1-10,12],gpu1"
        hostnames: String,
    },
    /// Show which cloud and settings a hostname resolves to
    Search {
        /// Hostname pattern, e.g. "cn[1-10,12],gpu1"
        hostnames: String,
    },
    /// Validate the configuration file
    Validate,
    /// Generate files from the configuration
    #[command(subcommand)]
    Generate(GenerateCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Print /etc/hosts entries for every configured host
    Hosts,
    /// Print the hostnames a pattern expands to
    Hostnames {
        /// Hostname pattern, e.g. "cn[1-10,12],gpu1"
        pattern: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending operations");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config_path;
    let load = || {
        burster_core::load_file(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))
    };

    // Version and hostname generation never read the configuration
    match cli.command {
        Commands::Version => {
            println!("cloud-burster {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Generate(GenerateCommands::Hostnames { pattern }) => {
            commands::generate::hostnames(&pattern);
            Ok(())
        }
        Commands::Generate(GenerateCommands::Hosts) => commands::generate::hosts(&load()?),
        Commands::Create { hostnames } => {
            let config = load()?;
            let cancel = cancel_on_interrupt();
            commands::provision::handle(config, Operation::Create, &hostnames, cancel).await
        }
        Commands::Delete { hostnames } => {
            let config = load()?;
            let cancel = cancel_on_interrupt();
            commands::provision::handle(config, Operation::Delete, &hostnames, cancel).await
        }
        Commands::Search { hostnames } => commands::search::handle(&load()?, &hostnames),
        Commands::Validate => commands::validate::handle(&load()?, &config_path),
    }
}
