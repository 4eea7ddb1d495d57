//! Shared test helpers for loop tests.

use intentus_core::error::{ReasonerError, ToolError};
use intentus_core::reasoner::{Decision, PromptMaterials, Reasoner};
use intentus_core::tool::{Tool, ToolRegistry, ToolResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock reasoner that returns scripted decisions in order.
///
/// Analysis and base response are fixed. Panics if `decide` is called more
/// often than decisions were scripted.
pub struct ScriptedReasoner {
    analysis: Result<String, ReasonerError>,
    base_response: String,
    decisions: Mutex<VecDeque<Result<Decision, ReasonerError>>>,
    decide_delay: Option<Duration>,
    seen: Mutex<Vec<PromptMaterials>>,
}

impl ScriptedReasoner {
    pub fn new(decisions: Vec<Result<Decision, ReasonerError>>) -> Self {
        Self {
            analysis: Ok("The user wants a short factual answer.".into()),
            base_response: "Base answer".into(),
            decisions: Mutex::new(decisions.into()),
            decide_delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Script plain decisions (no errors).
    pub fn decisions(decisions: Vec<Decision>) -> Self {
        Self::new(decisions.into_iter().map(Ok).collect())
    }

    /// A reasoner whose every call fails as if retries were exhausted.
    pub fn unavailable() -> Self {
        let err = ReasonerError::Unavailable {
            attempts: 3,
            last_error: "connection refused".into(),
        };
        let mut reasoner = Self::new(vec![]);
        reasoner.analysis = Err(err);
        reasoner
    }

    pub fn with_base_response(mut self, text: &str) -> Self {
        self.base_response = text.into();
        self
    }

    /// Sleep this long inside every `decide` call.
    pub fn with_decide_delay(mut self, delay: Duration) -> Self {
        self.decide_delay = Some(delay);
        self
    }

    /// Prompt materials passed to `decide`, in call order.
    pub fn seen(&self) -> Vec<PromptMaterials> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Reasoner for ScriptedReasoner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, _materials: &PromptMaterials) -> Result<String, ReasonerError> {
        self.analysis.clone()
    }

    async fn respond(&self, _materials: &PromptMaterials) -> Result<String, ReasonerError> {
        Ok(self.base_response.clone())
    }

    async fn decide(&self, materials: &PromptMaterials) -> Result<Decision, ReasonerError> {
        self.seen.lock().unwrap().push(materials.clone());
        if let Some(delay) = self.decide_delay {
            tokio::time::sleep(delay).await;
        }
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedReasoner: no more scripted decisions")
    }
}

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }
    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let text = arguments["text"].as_str().unwrap_or("").to_string();
        Ok(ToolResult::ok(text, None))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait::async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn invoke(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "service unavailable".into(),
        })
    }
}

/// Sleeps before answering; `finished` flips only if the sleep completes.
pub struct SlowTool {
    pub delay: Duration,
    pub finished: Arc<AtomicBool>,
}

impl SlowTool {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Takes its time"
    }
    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn invoke(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(ToolResult::ok("late result", None))
    }
}

/// Registers `echo` into the shared registry when invoked.
pub struct InstallerTool {
    pub registry: Arc<ToolRegistry>,
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Tool for InstallerTool {
    fn name(&self) -> &str {
        "install_echo"
    }
    fn description(&self) -> &str {
        "Installs the echo tool"
    }
    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    async fn invoke(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.registry
            .register_tool(EchoTool)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "install_echo".into(),
                reason: e.to_string(),
            })?;
        Ok(ToolResult::ok("echo installed", None))
    }
}
