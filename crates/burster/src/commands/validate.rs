use std::path::Path;

use burster_core::{BurstError, Config};
use colored::Colorize;

pub fn handle(config: &Config, path: &Path) -> anyhow::Result<()> {
    println!("{} {}", "Validating".blue(), path.display().to_string().cyan());

    match config.validate() {
        Ok(()) => {
            println!("{}", "✓ Configuration is valid".green().bold());
            println!();
            println!("Clouds: {}", config.clouds.len());
            for cloud in &config.clouds {
                println!(
                    "  - {} (network {}, {} hosts, {} groups)",
                    cloud.label().cyan(),
                    cloud.network.name,
                    cloud.hosts.len(),
                    cloud.groups_host.len()
                );
            }
            println!("Hosts: {}", config.all_hosts()?.len());
            Ok(())
        }
        Err(BurstError::Invalid(violations)) => {
            eprintln!("{}", "✗ Configuration is invalid".red().bold());
            for violation in &violations {
                eprintln!("  - {violation}");
            }
            anyhow::bail!("{} violation(s)", violations.len())
        }
        Err(e) => Err(e.into()),
    }
}
