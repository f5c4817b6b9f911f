//! Tool dispatch interface.
//!
//! The finishing stage only sees [`ToolDispatcher`]; the concrete registry
//! and the web search client live in `reasonchain-tools`.

use crate::error::DispatchError;
use crate::types::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of tools a model may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    #[serde(rename = "webSearch")]
    WebSearch,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::WebSearch => "webSearch",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webSearch" => Ok(ToolName::WebSearch),
            other => Err(DispatchError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }
}

/// A decoded tool call taken from the finishing model's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: ToolName,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolInvocation {
    pub fn new(name: ToolName, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { name, arguments }
    }

    /// The `query` argument, when present and a string.
    pub fn query(&self) -> Option<&str> {
        self.arguments.get("query").and_then(|q| q.as_str())
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

/// What a successful tool run hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub answer: Option<String>,
    pub findings: Vec<Finding>,
}

/// Executes model-requested tools.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Tool definitions advertised to the finishing model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one invocation.
    async fn dispatch(&self, invocation: ToolInvocation) -> Result<ToolResult, DispatchError>;
}
