//! `intentus run`: Run a single query through the agent.

use anyhow::{Context, bail};
use intentus_agent::Agent;
use intentus_config::AppConfig;
use intentus_core::agent::Verbosity;
use intentus_core::run::RunResultPayload;
use std::sync::Arc;

/// Command-line overrides on top of the loaded configuration.
#[derive(Debug, Default)]
pub struct Overrides {
    pub context: Option<String>,
    pub max_steps: Option<u32>,
    pub engine: Option<String>,
    pub verbose: bool,
}

pub async fn run(query: &str, overrides: Overrides) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;
    let context = apply(&mut config, &overrides)?;

    let reasoner = intentus_providers::build_reasoner(&config).with_context(|| {
        format!(
            "Cannot reach engine '{}'. Set INTENTUS_API_KEY or OPENAI_API_KEY, or add api_key to {}",
            config.agent.llm_engine,
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;
    let tools = Arc::new(intentus_tools::default_registry(&config.agent.enabled_tools));
    let agent = Agent::new(Arc::new(reasoner), tools, config.agent.clone());

    let result = agent.run(query, context).await?;
    let payload = RunResultPayload::from(&result);
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if !result.success {
        tracing::warn!(reason = result.reason.as_str(), "Run did not complete");
    }
    Ok(())
}

/// Apply overrides to `config`, returning the parsed context.
fn apply(
    config: &mut AppConfig,
    overrides: &Overrides,
) -> anyhow::Result<Option<serde_json::Value>> {
    if let Some(engine) = &overrides.engine {
        config.agent.llm_engine = engine.clone();
    }
    if let Some(max_steps) = overrides.max_steps {
        config.agent.max_steps = max_steps;
    }
    if overrides.verbose {
        config.agent.verbosity = Verbosity::Verbose;
    }
    config.validate()?;

    let Some(raw) = &overrides.context else {
        return Ok(None);
    };
    let context: serde_json::Value =
        serde_json::from_str(raw).context("--context must be valid JSON")?;
    if !context.is_object() {
        bail!("--context must be a JSON object");
    }
    Ok(Some(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AppConfig::default();
        let overrides = Overrides {
            context: Some(r#"{"room": "kitchen"}"#.into()),
            max_steps: Some(4),
            engine: Some("vllm-qwen2.5".into()),
            verbose: true,
        };

        let context = apply(&mut config, &overrides).unwrap();

        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.agent.llm_engine, "vllm-qwen2.5");
        assert_eq!(config.agent.verbosity, Verbosity::Verbose);
        assert_eq!(context.unwrap()["room"], "kitchen");
    }

    #[test]
    fn zero_step_budget_is_rejected() {
        let mut config = AppConfig::default();
        let overrides = Overrides {
            max_steps: Some(0),
            ..Default::default()
        };
        assert!(apply(&mut config, &overrides).is_err());
    }

    #[test]
    fn context_must_be_an_object() {
        let mut config = AppConfig::default();
        let overrides = Overrides {
            context: Some("[1, 2]".into()),
            ..Default::default()
        };
        assert!(apply(&mut config, &overrides).is_err());

        let overrides = Overrides {
            context: Some("not json".into()),
            ..Default::default()
        };
        assert!(apply(&mut config, &overrides).is_err());
    }
}
