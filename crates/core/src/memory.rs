//! Memory records: one entry per step of a run.
//!
//! A run's memory is an ordered, append-only log. Insertion order is causal
//! order, and step indices run 1, 2, 3, ... with no gaps. The store itself
//! lives in `intentus-memory`; this module only defines what gets stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest observation preview rendered into a summary line.
const SUMMARY_OBSERVATION_CHARS: usize = 240;

/// What the loop did at a given step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedAction {
    /// A tool invocation (or an attempted one, if the tool was unknown).
    ToolCall {
        tool: String,
        arguments: serde_json::Value,
    },
    /// The Reasoner produced the final answer.
    FinalAnswer,
    /// The Reasoner asked the caller for clarification.
    Clarification,
    /// The Decide call produced nothing usable (malformed or abandoned).
    NoDecision,
}

impl std::fmt::Display for RecordedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolCall { tool, arguments } => write!(f, "{tool}({arguments})"),
            Self::FinalAnswer => f.write_str("final-answer"),
            Self::Clarification => f.write_str("clarification"),
            Self::NoDecision => f.write_str("no-decision"),
        }
    }
}

/// How a step turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
    UnknownTool,
    Malformed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::UnknownTool => "unknown_tool",
            Self::Malformed => "malformed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One immutable entry in a run's memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Step index, starting at 1
    pub step: u32,

    /// The action taken
    pub action: RecordedAction,

    /// The observation / result text
    pub observation: String,

    /// How the step turned out
    pub outcome: Outcome,

    /// The Reasoner's stated rationale for this step
    #[serde(default)]
    pub rationale: String,

    /// When the record was produced
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        step: u32,
        action: RecordedAction,
        observation: impl Into<String>,
        outcome: Outcome,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            step,
            action,
            observation: observation.into(),
            outcome,
            rationale: rationale.into(),
            timestamp: Utc::now(),
        }
    }

    /// One-line text summary, used for the outbound payload and prompts.
    pub fn summary(&self) -> String {
        let observation: String = if self.observation.chars().count() > SUMMARY_OBSERVATION_CHARS
        {
            let head: String = self
                .observation
                .chars()
                .take(SUMMARY_OBSERVATION_CHARS)
                .collect();
            format!("{head}…")
        } else {
            self.observation.clone()
        };
        format!(
            "Step {}: {} -> {}: {}",
            self.step,
            self.action,
            self.outcome.as_str(),
            observation.replace('\n', " ")
        )
    }
}
