//! # Intentus Core
//!
//! Domain types, traits, and error definitions for the Intentus orchestration
//! loop. This crate has **no framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The seams of the loop are traits defined here ([`Tool`], [`Reasoner`],
//! [`Provider`]). Implementations live in their respective crates, so tests
//! can drive the loop with scripted stand-ins and the binary can pick real
//! backends from configuration.

pub mod agent;
pub mod error;
pub mod event;
pub mod intention;
pub mod memory;
pub mod message;
pub mod provider;
pub mod reasoner;
pub mod run;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, Verbosity};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use intention::{Intention, IntentionError, IntentionType};
pub use memory::{MemoryRecord, Outcome, RecordedAction};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use reasoner::{Decision, PromptMaterials, Reasoner};
pub use run::{RunResult, RunResultPayload, TerminationReason};
pub use tool::{Tool, ToolRegistry, ToolResult, ToolSpec};
