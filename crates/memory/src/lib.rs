//! Memory store implementation for Intentus.

pub mod run_memory;

pub use run_memory::{RunMemory, WindowLimit};
