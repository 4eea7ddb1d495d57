//! The planning-execution loop at the heart of Intentus.
//!
//! The agent follows an **Analyze → Decide → Execute → Finalize** cycle:
//!
//! 1. **Analyze** the query (and produce a tool-free base response)
//! 2. **Decide** the next action via the Reasoner: invoke a tool, answer,
//!    or ask for clarification
//! 3. **Execute** the chosen tool under a deadline, record the observation,
//!    and loop back to Decide
//! 4. **Finalize** into a `RunResult` once an answer is reached or a budget
//!    runs out
//!
//! Every predictable failure ends in a `RunResult` with `success = false`
//! and a reason code; only an empty query is rejected outright.

pub mod loop_runner;
pub mod run_context;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::Agent;
pub use run_context::RunContext;
