//! Per-run mutable state.
//!
//! A `RunContext` is created when a run starts and consumed when it
//! finalizes. It is owned by exactly one run; nothing in it is shared.

use intentus_core::memory::{MemoryRecord, Outcome, RecordedAction};
use intentus_core::run::TerminationReason;
use intentus_memory::RunMemory;
use std::time::Duration;
use tokio::time::Instant;

/// Stand-in deadline for budgets too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct RunContext {
    pub session_id: String,
    pub query: String,
    pub context: Option<serde_json::Value>,
    pub memory: RunMemory,

    pub analysis: String,
    pub base_response: String,
    pub final_answer: Option<String>,
    pub clarification: Option<String>,

    /// Error shown to the Reasoner on the next Decide
    pub last_error: Option<String>,
    /// Error reported in the result when the run fails
    pub error: Option<String>,

    pub consecutive_planning_errors: u32,
    pub consecutive_tool_failures: u32,

    started: Instant,
    deadline: Instant,
    termination: Option<TerminationReason>,
}

impl RunContext {
    pub fn new(
        session_id: impl Into<String>,
        query: impl Into<String>,
        context: Option<serde_json::Value>,
        max_time: Duration,
    ) -> Self {
        let started = Instant::now();
        Self {
            session_id: session_id.into(),
            query: query.into(),
            context,
            memory: RunMemory::new(),
            analysis: String::new(),
            base_response: String::new(),
            final_answer: None,
            clarification: None,
            last_error: None,
            error: None,
            consecutive_planning_errors: 0,
            consecutive_tool_failures: 0,
            started,
            deadline: started
                .checked_add(max_time)
                .unwrap_or_else(|| started + FAR_FUTURE),
            termination: None,
        }
    }

    /// Monotonic time since the run started, Reasoner and tool latency included.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the run's deadline (zero once past it).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn steps_taken(&self) -> u32 {
        self.memory.len() as u32
    }

    /// Append a record for the next step and return it.
    pub fn record(
        &mut self,
        action: RecordedAction,
        observation: impl Into<String>,
        outcome: Outcome,
        rationale: impl Into<String>,
    ) -> &MemoryRecord {
        let record = MemoryRecord::new(
            self.memory.next_step(),
            action,
            observation,
            outcome,
            rationale,
        );
        self.memory.append(record);
        // Just appended, so never empty.
        &self.memory.all()[self.memory.len() - 1]
    }

    /// Mark the run as finished. The first reason wins.
    pub fn terminate(&mut self, reason: TerminationReason) {
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }
}
