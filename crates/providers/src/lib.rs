//! LLM transport and Reasoner Client implementations for Intentus.
//!
//! All transports implement the `intentus_core::Provider` trait. The
//! [`LlmReasoner`] wraps one of them with prompts, decision parsing and the
//! retry policy; the router picks the transport from the engine identifier.

pub mod openai_compat;
pub mod prompts;
pub mod reasoner;
pub mod retry;
pub mod router;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use openai_compat::OpenAiCompatProvider;
pub use reasoner::LlmReasoner;
pub use retry::RetryPolicy;
pub use router::{EngineRoute, build_provider, build_reasoner, resolve_engine};
