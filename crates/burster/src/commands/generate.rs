use burster_core::Config;

pub fn hosts(config: &Config) -> anyhow::Result<()> {
    print!("{}", config.hosts_file()?);
    Ok(())
}

pub fn hostnames(pattern: &str) {
    for name in burster_core::pattern::expand(pattern) {
        println!("{name}");
    }
}
