//! Engine routing: turns an `llm_engine` identifier into a transport.
//!
//! `vllm-<model>` → local vLLM server, `together-<model>` → Together AI,
//! `ollama-<model>` → Ollama, anything else → OpenAI with the identifier as
//! the model name. `[providers.<name>]` entries override URL and key.

use crate::openai_compat::OpenAiCompatProvider;
use crate::reasoner::LlmReasoner;
use crate::retry::RetryPolicy;
use intentus_config::AppConfig;
use intentus_core::error::ProviderError;
use intentus_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

/// Where an engine identifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRoute {
    /// Provider name, also the `[providers.<name>]` key
    pub provider: &'static str,
    /// Model name sent to the backend
    pub model: String,
    pub default_base_url: &'static str,
    /// Whether the backend refuses requests without a key
    pub requires_key: bool,
}

/// Resolve an engine identifier.
pub fn resolve_engine(llm_engine: &str) -> EngineRoute {
    let engine = llm_engine.trim();
    let lower = engine.to_ascii_lowercase();

    let prefixed = |prefix: &str| -> Option<String> {
        lower
            .starts_with(prefix)
            .then(|| engine[prefix.len()..].to_string())
    };

    if let Some(model) = prefixed("vllm-") {
        EngineRoute {
            provider: "vllm",
            model,
            default_base_url: "http://localhost:8888/v1",
            requires_key: false,
        }
    } else if let Some(model) = prefixed("together-") {
        EngineRoute {
            provider: "together",
            model,
            default_base_url: "https://api.together.xyz/v1",
            requires_key: true,
        }
    } else if let Some(model) = prefixed("ollama-") {
        EngineRoute {
            provider: "ollama",
            model,
            default_base_url: "http://localhost:11434/v1",
            requires_key: false,
        }
    } else {
        EngineRoute {
            provider: "openai",
            model: engine.to_string(),
            default_base_url: "https://api.openai.com/v1",
            requires_key: true,
        }
    }
}

/// Build the transport for the configured engine.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let route = resolve_engine(&config.agent.llm_engine);
    let provider_config = config.providers.get(route.provider);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let api_key = match api_key {
        Some(key) => key,
        None if route.requires_key => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (set INTENTUS_API_KEY or OPENAI_API_KEY)",
                route.provider
            )));
        }
        None => "EMPTY".to_string(),
    };

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| route.default_base_url.to_string());

    info!(provider = route.provider, model = %route.model, url = %base_url, "LLM engine resolved");

    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        route.provider,
        base_url,
        api_key,
        config.reasoner.request_timeout(),
    )))
}

/// Build the Reasoner Client for the configured engine.
pub fn build_reasoner(config: &AppConfig) -> Result<LlmReasoner, ProviderError> {
    let route = resolve_engine(&config.agent.llm_engine);
    let provider = build_provider(config)?;
    Ok(LlmReasoner::new(provider, route.model)
        .with_temperature(config.agent.temperature)
        .with_max_tokens(config.agent.max_tokens)
        .with_retry_policy(RetryPolicy::from(&config.reasoner)))
}
