use burster_core::Config;
use colored::Colorize;

pub fn handle(config: &Config, pattern: &str) -> anyhow::Result<()> {
    let mut missing = 0;

    for hostname in burster_core::pattern::expand(pattern) {
        match config.resolve_with_suffixes(&hostname) {
            Ok(resolved) => {
                let host = &resolved.host;
                println!(
                    "{} {} ({})",
                    "✓".green(),
                    host.name.cyan().bold(),
                    resolved.cloud.label()
                );
                println!("    ip:     {}", host.ip.as_deref().unwrap_or("(unset)"));
                println!("    flavor: {}", host.flavor_name);
                println!("    image:  {}", host.image_name);
                println!("    disk:   {} GB", host.disk_size);
                if let Some(ram) = host.ram {
                    println!("    ram:    {ram} GB");
                }
                if let Some(gpu) = host.gpu {
                    println!("    gpu:    {gpu}");
                }
            }
            Err(e) => {
                missing += 1;
                eprintln!("{} {}: {}", "✗".red(), hostname.bold(), e);
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{missing} hostname(s) not found");
    }
    Ok(())
}
