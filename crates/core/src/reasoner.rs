//! Reasoner trait: the abstraction over the external language model.
//!
//! The Agent never talks to a model directly. It hands the Reasoner a bundle
//! of prompt materials and gets back text (analysis, base response) or a
//! structured [`Decision`]. Implementations own their retry policy and hold
//! no state across calls.

use crate::error::ReasonerError;
use crate::memory::MemoryRecord;
use crate::provider::ToolDefinition;
use serde::{Deserialize, Serialize};

/// The Reasoner's choice at a Decide step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Invoke a named tool with the given argument object.
    InvokeTool {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
        #[serde(default)]
        rationale: String,
    },

    /// Stop and answer.
    FinalAnswer {
        text: String,
        #[serde(default)]
        rationale: String,
    },

    /// Stop and ask the caller for more information.
    Clarify { question: String },
}

impl Decision {
    pub fn invoke(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::InvokeTool {
            name: name.into(),
            arguments,
            rationale: String::new(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer {
            text: text.into(),
            rationale: String::new(),
        }
    }

    pub fn clarify(question: impl Into<String>) -> Self {
        Self::Clarify {
            question: question.into(),
        }
    }
}

/// Everything a Reasoner call may draw on.
///
/// Assembled fresh by the Agent for every call; `memory` is the bounded
/// recent window, not the full log.
#[derive(Debug, Clone, Default)]
pub struct PromptMaterials {
    pub query: String,
    pub context: Option<serde_json::Value>,
    pub analysis: Option<String>,
    pub tools: Vec<ToolDefinition>,
    pub memory: Vec<MemoryRecord>,
    /// The step about to be taken (1-based)
    pub step: u32,
    pub max_steps: u32,
    /// Set when re-prompting after a planning error
    pub last_error: Option<String>,
}

impl PromptMaterials {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Whether `name` was offered to the Reasoner in this prompt.
    pub fn offers_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

/// The Reasoner Client contract.
#[async_trait::async_trait]
pub trait Reasoner: Send + Sync {
    /// Human-readable name (used in logs).
    fn name(&self) -> &str;

    /// Decompose / restate the query.
    async fn analyze(&self, materials: &PromptMaterials) -> Result<String, ReasonerError>;

    /// A direct first-pass answer, without tools.
    async fn respond(&self, materials: &PromptMaterials) -> Result<String, ReasonerError>;

    /// Choose the next action.
    async fn decide(&self, materials: &PromptMaterials) -> Result<Decision, ReasonerError>;
}
