//! Run results: what a finished run hands back to its caller.

use crate::memory::MemoryRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    Completed,
    ClarificationNeeded,
    BudgetExceeded,
    ReasonerUnavailable,
    ReasonerRejected,
    PlanningFailed,
    ToolFailuresExceeded,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ClarificationNeeded => "clarification-needed",
            Self::BudgetExceeded => "budget-exceeded",
            Self::ReasonerUnavailable => "reasoner-unavailable",
            Self::ReasonerRejected => "reasoner-rejected",
            Self::PlanningFailed => "planning-failed",
            Self::ToolFailuresExceeded => "tool-failures-exceeded",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terminal output of one run. Owned by the caller once returned.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub success: bool,
    pub reason: TerminationReason,
    pub query_analysis: String,
    pub base_response: String,
    pub final_output: String,
    pub execution_time: Duration,
    pub steps_taken: u32,
    pub memory: Vec<MemoryRecord>,
    /// The question, when the Reasoner asked for clarification
    pub clarification: Option<String>,
    /// Last error seen, for failed runs
    pub error: Option<String>,
}

/// The outbound JSON shape of a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResultPayload {
    pub success: bool,
    pub query_analysis: String,
    pub base_response: String,
    pub final_output: String,
    /// Seconds
    pub execution_time: f64,
    pub steps_taken: u32,
    pub memory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RunResult> for RunResultPayload {
    fn from(result: &RunResult) -> Self {
        Self {
            success: result.success,
            query_analysis: result.query_analysis.clone(),
            base_response: result.base_response.clone(),
            final_output: result.final_output.clone(),
            execution_time: result.execution_time.as_secs_f64(),
            steps_taken: result.steps_taken,
            memory: result.memory.iter().map(MemoryRecord::summary).collect(),
            reason: Some(result.reason.as_str().to_string()),
            error: result.error.clone(),
        }
    }
}

impl RunResultPayload {
    /// A failure payload for requests that never reached the Agent.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            query_analysis: String::new(),
            base_response: String::new(),
            final_output: String::new(),
            execution_time: 0.0,
            steps_taken: 0,
            memory: Vec::new(),
            reason: None,
            error: Some(error.into()),
        }
    }
}
