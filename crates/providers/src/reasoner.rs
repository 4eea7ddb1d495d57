//! `LlmReasoner`: the Reasoner Client backed by a chat-completion provider.
//!
//! Every call goes through [`LlmReasoner::complete`], which applies the retry
//! policy: transient provider failures (timeouts, rate limits, network
//! errors, 5xx) are retried with exponential backoff, anything else surfaces
//! at once as [`ReasonerError::Rejected`]. The reasoner keeps no state
//! between calls.

use crate::prompts;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use intentus_core::error::{ProviderError, ReasonerError};
use intentus_core::message::Message;
use intentus_core::provider::{Provider, ProviderRequest, ToolDefinition};
use intentus_core::reasoner::{Decision, PromptMaterials, Reasoner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct LlmReasoner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    policy: RetryPolicy,
}

impl LlmReasoner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` under the retry policy and return the reply.
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        json_mode: bool,
    ) -> Result<Message, ReasonerError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
            json_mode,
        };

        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            let call = self.provider.complete(request.clone());
            let outcome = tokio::time::timeout(self.policy.request_timeout, call).await;

            let (error, hint) = match outcome {
                Ok(Ok(response)) => {
                    debug!(
                        provider = self.provider.name(),
                        model = %response.model,
                        attempt = attempt + 1,
                        "Reasoner call succeeded"
                    );
                    return Ok(response.message);
                }
                Ok(Err(e)) if !e.is_transient() => {
                    warn!(provider = self.provider.name(), error = %e, "Reasoner call rejected");
                    return Err(ReasonerError::Rejected(e.to_string()));
                }
                Ok(Err(e)) => {
                    let hint = match &e {
                        ProviderError::RateLimited { retry_after_secs } => {
                            Some(Duration::from_secs(*retry_after_secs))
                        }
                        _ => None,
                    };
                    (e.to_string(), hint)
                }
                Err(_) => (
                    format!(
                        "request timed out after {}ms",
                        self.policy.request_timeout.as_millis()
                    ),
                    None,
                ),
            };

            warn!(
                provider = self.provider.name(),
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts,
                error = %error,
                "Transient Reasoner failure"
            );
            last_error = error;

            if attempt + 1 < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay_with_hint(attempt, hint)).await;
            }
        }

        Err(ReasonerError::Unavailable {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn analyze(&self, materials: &PromptMaterials) -> Result<String, ReasonerError> {
        let reply = self.complete(prompts::analysis(materials), Vec::new(), false).await?;
        Ok(reply.content.trim().to_string())
    }

    async fn respond(&self, materials: &PromptMaterials) -> Result<String, ReasonerError> {
        let reply = self.complete(prompts::base_response(materials), Vec::new(), false).await?;
        Ok(reply.content.trim().to_string())
    }

    async fn decide(&self, materials: &PromptMaterials) -> Result<Decision, ReasonerError> {
        // Tools are offered both in the prompt and natively; either reply shape parses.
        let reply = self
            .complete(prompts::decision(materials), materials.tools.clone(), true)
            .await?;
        parse_decision(&reply)
    }
}

/// Extract a [`Decision`] from a model reply.
///
/// Native tool calls win over text. Otherwise the reply must contain one
/// JSON object (optionally fenced) with an `action` field.
pub fn parse_decision(reply: &Message) -> Result<Decision, ReasonerError> {
    match reply.tool_calls.as_slice() {
        [] => {}
        [call] => {
            let arguments = if call.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&call.arguments).map_err(|e| {
                    ReasonerError::Malformed(format!("tool call arguments are not JSON: {e}"))
                })?
            };
            return Ok(Decision::InvokeTool {
                name: call.name.clone(),
                arguments,
                rationale: reply.content.trim().to_string(),
            });
        }
        calls => {
            return Err(ReasonerError::Malformed(format!(
                "expected one tool call, got {}",
                calls.len()
            )));
        }
    }

    let object = extract_json_object(&reply.content)
        .ok_or_else(|| ReasonerError::Malformed("reply contains no JSON object".into()))?;
    let value: serde_json::Value = serde_json::from_str(object)
        .map_err(|e| ReasonerError::Malformed(format!("reply is not valid JSON: {e}")))?;

    let field = |names: &[&str]| -> Option<String> {
        names
            .iter()
            .find_map(|n| value.get(*n).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let rationale = field(&["rationale", "justification"]).unwrap_or_default();

    let action = field(&["action"])
        .ok_or_else(|| ReasonerError::Malformed("missing 'action' field".into()))?;

    match action.to_ascii_lowercase().as_str() {
        "invoke_tool" | "tool" | "use_tool" => {
            let name = field(&["tool", "name", "tool_name"])
                .ok_or_else(|| ReasonerError::Malformed("invoke_tool without a tool name".into()))?;
            let arguments = match value.get("arguments") {
                None | Some(serde_json::Value::Null) => serde_json::json!({}),
                Some(args @ serde_json::Value::Object(_)) => args.clone(),
                Some(other) => {
                    return Err(ReasonerError::Malformed(format!(
                        "arguments must be an object, got {other}"
                    )));
                }
            };
            Ok(Decision::InvokeTool {
                name,
                arguments,
                rationale,
            })
        }
        "final_answer" | "answer" | "finish" => {
            let text = field(&["answer", "text", "final_answer"])
                .ok_or_else(|| ReasonerError::Malformed("final_answer without an answer".into()))?;
            Ok(Decision::FinalAnswer { text, rationale })
        }
        "clarify" | "clarification" => {
            let question = field(&["question"])
                .ok_or_else(|| ReasonerError::Malformed("clarify without a question".into()))?;
            Ok(Decision::Clarify { question })
        }
        other => Err(ReasonerError::Malformed(format!("unknown action '{other}'"))),
    }
}

/// The span from the first `{` to the last `}`, ignoring code fences.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
