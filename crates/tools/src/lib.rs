//! Built-in tool implementations for Intentus.
//!
//! Tools give the agent access to outside knowledge: an encyclopedia lookup
//! and a web search. Which ones a process loads is controlled by the
//! `enabled_tools` setting.

pub mod web_search;
pub mod wikipedia_search;

use intentus_core::tool::{Tool, ToolRegistry, ToolSpec};
use std::sync::Arc;
use tracing::warn;

pub use web_search::WebSearchTool;
pub use wikipedia_search::WikipediaSearchTool;

/// Every built-in tool, in presentation order.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WikipediaSearchTool::new()),
        Arc::new(WebSearchTool::from_env()),
    ]
}

/// Create a tool registry holding the enabled built-in tools.
///
/// `["all"]` loads everything. Otherwise tools are registered in the order
/// they are listed; unknown names are logged and skipped.
pub fn default_registry(enabled_tools: &[String]) -> ToolRegistry {
    let registry = ToolRegistry::new();
    let available = builtin_tools();

    let selected: Vec<Arc<dyn Tool>> = if enabled_tools.iter().any(|t| t == "all") {
        available
    } else {
        enabled_tools
            .iter()
            .filter_map(|name| {
                let tool = available.iter().find(|t| t.name() == name.as_str()).cloned();
                if tool.is_none() {
                    warn!(tool = %name, "Unknown tool in enabled_tools, skipping");
                }
                tool
            })
            .collect()
    };

    for tool in selected {
        if let Err(e) = registry.register(ToolSpec::from_arc(tool)) {
            warn!(error = %e, "Skipping tool");
        }
    }
    registry
}
