//! `intentus tools`: List the enabled tools.

use anyhow::Context;
use intentus_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let registry = intentus_tools::default_registry(&config.agent.enabled_tools);

    if registry.is_empty() {
        println!("No tools enabled (enabled_tools = {:?})", config.agent.enabled_tools);
        return Ok(());
    }

    println!("Enabled tools ({}):", registry.len());
    for spec in registry.list() {
        println!("   {:<18} {}", spec.name, spec.description);
    }
    Ok(())
}
