//! `intentus serve`: Start the HTTP orchestrator service.

use anyhow::Context;
use intentus_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;

    if let Some(port) = port_override {
        config.gateway.port = port;
        config.validate()?;
    }

    println!("Intentus Orchestrator");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Engine:    {}", config.agent.llm_engine);
    println!(
        "   Auth:      {}",
        if config.gateway.api_key.is_some() { "bearer" } else { "disabled" }
    );

    intentus_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))
}
