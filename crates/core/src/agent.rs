//! Agent configuration.
//!
//! Passed explicitly into each `Agent` at construction. There is no ambient
//! global configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the planning-execution loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Engine identifier, e.g. `gpt-4.1-mini`, `vllm-qwen2.5`, `together-llama-3`
    #[serde(default = "default_llm_engine")]
    pub llm_engine: String,

    /// Tool names to load; `["all"]` loads every built-in tool
    #[serde(default = "default_enabled_tools")]
    pub enabled_tools: Vec<String>,

    /// Maximum recorded steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Wall-clock budget per run
    #[serde(default = "default_max_time_secs")]
    pub max_time_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub verbosity: Verbosity,

    /// Records of memory shown to the Reasoner per call
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Consecutive planning errors tolerated before giving up
    #[serde(default = "default_max_decide_retries")]
    pub max_decide_retries: u32,

    /// Consecutive tool failures tolerated before giving up
    #[serde(default = "default_max_tool_failures")]
    pub max_tool_failures: u32,

    /// Per-invocation tool deadline (further capped by remaining run time)
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Ask the Reasoner for a tool-free first-pass answer during Analyze
    #[serde(default = "default_true")]
    pub generate_base_response: bool,
}

fn default_llm_engine() -> String {
    "gpt-4.1-mini".into()
}
fn default_enabled_tools() -> Vec<String> {
    vec!["all".into()]
}
fn default_max_steps() -> u32 {
    10
}
fn default_max_time_secs() -> u64 {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_memory_window() -> usize {
    8
}
fn default_max_decide_retries() -> u32 {
    2
}
fn default_max_tool_failures() -> u32 {
    3
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm_engine: default_llm_engine(),
            enabled_tools: default_enabled_tools(),
            max_steps: default_max_steps(),
            max_time_secs: default_max_time_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            verbosity: Verbosity::default(),
            memory_window: default_memory_window(),
            max_decide_retries: default_max_decide_retries(),
            max_tool_failures: default_max_tool_failures(),
            tool_timeout_secs: default_tool_timeout_secs(),
            generate_base_response: true,
        }
    }
}

impl AgentConfig {
    pub fn max_time(&self) -> Duration {
        Duration::from_secs(self.max_time_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Whether every built-in tool should be loaded.
    pub fn all_tools_enabled(&self) -> bool {
        self.enabled_tools.iter().any(|t| t == "all")
    }
}

/// How chatty a run is in the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}
