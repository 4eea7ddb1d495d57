//! Tool trait and the process-wide tool registry.
//!
//! Tools are the opaque capabilities the planning loop can invoke. The
//! registry maps a unique name to a [`ToolSpec`] and is the one piece of
//! state shared by every concurrent run: reads (`resolve`, `list`) take a
//! shared lock, `register`/`unregister` take the exclusive one. No run keeps
//! a private snapshot, so a tool registered mid-process is visible to the
//! next Decide step of every run.

use crate::error::{RegistryError, ToolError};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// The result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool considers the invocation successful
    pub success: bool,

    /// Text rendering of the output (what the Reasoner observes)
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result with structured data.
    pub fn ok(output: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data,
        }
    }

    /// A result the tool itself reports as failed.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }
}

/// The core Tool trait.
///
/// Each capability (wikipedia_search, web_search, robot skills, ...)
/// implements this trait. Selection logic lives in the agent, never here.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "wikipedia_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the Reasoner).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// JSON Schema describing this tool's structured output.
    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    /// Invoke the tool with the given arguments.
    async fn invoke(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;
}

/// A registered capability: its contract plus the capability itself.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    capability: Arc<dyn Tool>,
}

impl ToolSpec {
    /// Build a spec from a tool, capturing its declared contract.
    pub fn from_tool(tool: impl Tool + 'static) -> Self {
        Self::from_arc(Arc::new(tool))
    }

    /// Build a spec from a shared tool.
    pub fn from_arc(tool: Arc<dyn Tool>) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
            output_schema: tool.output_schema(),
            capability: tool,
        }
    }

    /// The invocable capability behind this spec.
    pub fn capability(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.capability)
    }

    /// Convert into the definition the Reasoner sees.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A registry of available tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<Vec<ToolSpec>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool spec. Fails if the name is already taken.
    pub fn register(&self, spec: ToolSpec) -> std::result::Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.name == spec.name) {
            return Err(RegistryError::DuplicateToolName(spec.name));
        }
        info!(tool = %spec.name, "Tool registered");
        entries.push(spec);
        Ok(())
    }

    /// Convenience wrapper around [`register`](Self::register).
    pub fn register_tool(
        &self,
        tool: impl Tool + 'static,
    ) -> std::result::Result<(), RegistryError> {
        self.register(ToolSpec::from_tool(tool))
    }

    /// Remove a tool. Returns whether anything was removed; absent names are a no-op.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.name != name);
        let removed = entries.len() != before;
        if removed {
            info!(tool = %name, "Tool unregistered");
        } else {
            debug!(tool = %name, "Unregister of absent tool ignored");
        }
        removed
    }

    /// Look up the capability for a tool name.
    pub fn resolve(&self, name: &str) -> std::result::Result<Arc<dyn Tool>, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|e| e.name == name)
            .map(ToolSpec::capability)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// All specs, in registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Definitions for prompt construction, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(ToolSpec::to_definition).collect()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
