//! Tool registry: tool registration and execution.
//!
//! Tools are registered at startup. The registry provides tool definitions
//! for the finishing model and executes tool calls with timeout handling.
//! It is the concrete [`ToolDispatcher`] handed to the pipeline.

use async_trait::async_trait;
use reasonchain_core::dispatch::{ToolDispatcher, ToolInvocation, ToolName, ToolResult};
use reasonchain_core::error::{DispatchError, ToolError};
use reasonchain_core::types::ToolDefinition;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's wire name.
    fn name(&self) -> ToolName;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult, ToolError>;

    /// Maximum execution time before timeout.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// The tool registry holds all registered tools and handles execution.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Returns error if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    /// List all registered tool definitions (for sending to the LLM), ordered by name.
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name with the given arguments, applying timeout.
    pub async fn execute(
        &self,
        name: ToolName,
        args: Map<String, Value>,
    ) -> Result<ToolResult, ToolError> {
        let tool = self.tools.get(&name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;

        let timeout = tool.timeout();
        info!(tool = %name, timeout_secs = timeout.as_secs(), "Executing tool");

        match tokio::time::timeout(timeout, tool.execute(args)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_definitions()
    }

    async fn dispatch(&self, invocation: ToolInvocation) -> Result<ToolResult, DispatchError> {
        self.execute(invocation.name, invocation.arguments)
            .await
            .map_err(|e| {
                warn!(error = %e, "Tool execution failed");
                DispatchError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasonchain_core::dispatch::Finding;
    use serde_json::json;

    /// Echoes the query back as a single finding.
    struct EchoSearchTool;

    #[async_trait]
    impl Tool for EchoSearchTool {
        fn name(&self) -> ToolName {
            ToolName::WebSearch
        }

        fn description(&self) -> &str {
            "Echoes the query back"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to echo" }
                },
                "required": ["query"]
            })
        }

        async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult, ToolError> {
            let query = args.get("query").and_then(|q| q.as_str()).ok_or_else(|| {
                ToolError::InvalidArguments {
                    name: "webSearch".to_string(),
                    reason: "missing 'query' parameter".to_string(),
                }
            })?;
            Ok(ToolResult {
                answer: Some(format!("Echo: {}", query)),
                findings: vec![Finding {
                    title: query.to_string(),
                    url: "https://example.com".to_string(),
                    excerpt: String::new(),
                }],
            })
        }
    }

    /// A slow tool for timeout testing.
    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> ToolName {
            ToolName::WebSearch
        }

        fn description(&self) -> &str {
            "A tool that takes forever"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: Map<String, Value>) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolResult::default())
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(100) // Very short timeout for testing
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get(ToolName::WebSearch).is_none());
    }

    #[test]
    fn test_register_tool() {
        let mut registry = ToolRegistry::new();
        let tool: Arc<dyn Tool> = Arc::new(EchoSearchTool);
        registry.register(tool).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get(ToolName::WebSearch).is_some());
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoSearchTool)).unwrap();

        let result = registry.register(Arc::new(SlowTool));
        match result.unwrap_err() {
            ToolError::AlreadyRegistered { name } => assert_eq!(name, "webSearch"),
            _ => panic!("Expected AlreadyRegistered error"),
        }
    }

    #[test]
    fn test_list_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoSearchTool)).unwrap();

        let defs = registry.list_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "webSearch");
        assert_eq!(defs[0].description, "Echoes the query back");
        assert_eq!(registry.definitions(), defs);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoSearchTool)).unwrap();

        let result = registry
            .execute(ToolName::WebSearch, args(json!({"query": "hello"})))
            .await
            .unwrap();
        assert_eq!(result.answer.as_deref(), Some("Echo: hello"));
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_is_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .dispatch(ToolInvocation::new(ToolName::WebSearch, Map::new()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnknownTool {
                name: "webSearch".into()
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_invalid_args() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoSearchTool)).unwrap();

        let err = registry
            .dispatch(ToolInvocation::new(ToolName::WebSearch, Map::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_timeout_is_unavailable() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SlowTool)).unwrap();

        let err = registry
            .dispatch(ToolInvocation::new(ToolName::WebSearch, Map::new()))
            .await
            .unwrap_err();
        assert!(err.is_soft());
        match err {
            DispatchError::ToolUnavailable { name, message } => {
                assert_eq!(name, "webSearch");
                assert!(message.contains("timed out"));
            }
            e => panic!("Expected ToolUnavailable, got: {:?}", e),
        }
    }
}
