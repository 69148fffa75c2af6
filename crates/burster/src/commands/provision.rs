use std::sync::Arc;

use burster_cloud::{CancellationToken, Operation, Orchestrator};
use burster_core::Config;
use colored::Colorize;

use crate::providers;

/// Creates or deletes every host matching `pattern`, then prints one line
/// per host.
pub async fn handle(
    config: Config,
    operation: Operation,
    pattern: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    config.validate()?;

    let hostnames = burster_core::pattern::expand(pattern);
    let orchestrator = Orchestrator::new(
        Arc::new(config),
        Arc::new(providers::registry()),
        cancel,
    );
    let report = orchestrator.run(operation, hostnames).await;

    println!();
    for outcome in &report.outcomes {
        let cloud = outcome.cloud.as_deref().unwrap_or("-");
        match &outcome.result {
            Ok(()) => println!("{} {} ({})", "✓".green(), outcome.hostname.cyan(), cloud),
            Err(e) => println!(
                "{} {} ({}): {}",
                "✗".red(),
                outcome.hostname.cyan(),
                cloud,
                e.to_string().red()
            ),
        }
    }
    println!(
        "{}: {} succeeded, {} failed in {}ms",
        report.operation,
        report.succeeded(),
        report.failed(),
        report.duration_ms
    );

    if !report.is_success() {
        anyhow::bail!("{} of {} hosts failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}
