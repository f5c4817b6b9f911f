//! Web search tool.
//!
//! - `webSearch`: query a Tavily-style search API and return the provider's
//!   short answer plus up to five findings.

use crate::registry::Tool;
use async_trait::async_trait;
use reasonchain_core::config::{MAX_SEARCH_RESULTS, SearchConfig};
use reasonchain_core::dispatch::{Finding, ToolName, ToolResult};
use reasonchain_core::error::ToolError;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const TOOL: &str = "webSearch";

// ---------------------------------------------------------------------------
// WebSearchTool
// ---------------------------------------------------------------------------

/// Search the web through a Tavily-compatible `POST /search` endpoint.
///
/// Every backend failure (transport, non-success status, unreadable body)
/// is reported as [`ToolError::Unavailable`] so the pipeline can degrade
/// instead of failing the request.
pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_results: usize,
    timeout: Duration,
}

impl WebSearchTool {
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, ToolError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Reasonchain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Unavailable {
                name: TOOL.into(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results: config.effective_max_results(),
            timeout,
        })
    }

    fn unavailable(message: String) -> ToolError {
        ToolError::Unavailable {
            name: TOOL.into(),
            message,
        }
    }
}

/// Response body of the search API. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

impl SearchResponse {
    /// Keep the first `max_results` hits (never more than [`MAX_SEARCH_RESULTS`]).
    pub(crate) fn into_tool_result(self, max_results: usize) -> ToolResult {
        let limit = max_results.min(MAX_SEARCH_RESULTS);
        ToolResult {
            answer: self.answer.filter(|a| !a.is_empty()),
            findings: self
                .results
                .into_iter()
                .take(limit)
                .map(|hit| Finding {
                    title: hit.title,
                    url: hit.url,
                    excerpt: hit.content,
                })
                .collect(),
        }
    }
}

fn parse_query(args: &Map<String, Value>) -> Result<&str, ToolError> {
    match args.get("query") {
        Some(Value::String(q)) if !q.trim().is_empty() => Ok(q),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments {
            name: TOOL.into(),
            reason: "'query' must be a non-empty string".into(),
        }),
        Some(_) => Err(ToolError::InvalidArguments {
            name: TOOL.into(),
            reason: "'query' must be a string".into(),
        }),
        None => Err(ToolError::InvalidArguments {
            name: TOOL.into(),
            reason: "Missing required parameter: query".into(),
        }),
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> ToolName {
        ToolName::WebSearch
    }

    fn description(&self) -> &str {
        "Search the web for current information"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let query = parse_query(&args)?;
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, query = %query, "Sending search request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": query,
                "search_depth": "advanced",
                "include_images": false,
                "include_answer": true,
            }))
            .send()
            .await
            .map_err(|e| Self::unavailable(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Search provider returned an error");
            return Err(Self::unavailable(format!(
                "search provider returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Self::unavailable(format!("Failed to parse search response: {}", e)))?;

        let result = body.into_tool_result(self.max_results);
        debug!(findings = result.findings.len(), "Search complete");
        Ok(result)
    }
}
