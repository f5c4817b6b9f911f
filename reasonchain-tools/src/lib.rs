//! # Reasonchain Tools
//!
//! Tool implementations for the Reasonchain finishing stage.
//! Provides the tool registry (the pipeline's `ToolDispatcher`) and the
//! web search client.

pub mod registry;
pub mod web;

use reasonchain_core::config::SearchConfig;
use reasonchain_core::error::ToolError;
use registry::{Tool, ToolRegistry};
use std::sync::Arc;

/// Register all built-in tools.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    search: &SearchConfig,
    search_api_key: &str,
) -> Result<(), ToolError> {
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(web::WebSearchTool::new(
        search,
        search_api_key,
    )?)];

    for tool in tools {
        registry.register(tool)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasonchain_core::dispatch::{ToolDispatcher, ToolName};

    #[test]
    fn test_register_builtin_tools() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, &SearchConfig::default(), "tvly-key").unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(ToolName::WebSearch).is_some());

        let defs = registry.definitions();
        assert_eq!(defs[0].name, "webSearch");
        assert_eq!(defs[0].description, "Search the web for current information");
    }

    #[test]
    fn test_register_builtin_tools_twice_conflicts() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, &SearchConfig::default(), "k").unwrap();
        assert!(register_builtin_tools(&mut registry, &SearchConfig::default(), "k").is_err());
    }
}
