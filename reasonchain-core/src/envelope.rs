//! Request and response shapes for one pipeline run.
//!
//! Covers the validated [`Question`], the per-stage results, and the
//! [`ResponseEnvelope`] returned to the caller.

use crate::dispatch::ToolResult;
use crate::error::ClientError;
use crate::usage::Usage;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A validated, non-empty question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// Accept `text` unless it is empty or whitespace-only.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::MissingQuestion);
        }
        Ok(Self(text.to_string()))
    }

    /// Extract the question from a raw `{"question": "..."}` request body.
    pub fn from_body(raw: &[u8]) -> Result<Self, ClientError> {
        let body: Value = serde_json::from_slice(raw).map_err(|e| ClientError::InvalidBody {
            message: e.to_string(),
        })?;
        match body.get("question") {
            Some(Value::String(text)) => Self::parse(text),
            _ => Err(ClientError::MissingQuestion),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of the reasoning stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningResult {
    pub transcript: String,
    pub token_count: u64,
}

/// How the finishing stage shapes its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishingMode {
    Plain,
    Structured,
    #[serde(alias = "tool")]
    ToolCapable,
}

impl std::fmt::Display for FinishingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishingMode::Plain => write!(f, "plain"),
            FinishingMode::Structured => write!(f, "structured"),
            FinishingMode::ToolCapable => write!(f, "tool_capable"),
        }
    }
}

/// Schema-validated summary produced in structured mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredSummary {
    pub summary: String,
    pub bullet_points: Vec<String>,
    pub reasoning_steps: u32,
    pub follow_up_prompts: Vec<String>,
}

/// What happened to the optional web search in tool-capable mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The model answered without asking for a tool.
    NotInvoked { text: String },
    /// The search ran.
    Completed { query: String, result: ToolResult },
    /// The search backend failed; the request still succeeds.
    Unavailable { query: String, reason: String },
}

impl ToolOutcome {
    pub fn status(&self) -> ToolStatus {
        match self {
            ToolOutcome::NotInvoked { .. } => ToolStatus::NotInvoked,
            ToolOutcome::Completed { .. } => ToolStatus::Completed,
            ToolOutcome::Unavailable { .. } => ToolStatus::Unavailable,
        }
    }
}

/// Wire label for [`ToolOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    NotInvoked,
    Completed,
    Unavailable,
}

/// Output of the finishing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishingResult {
    Plain {
        summary_text: String,
        token_count: u64,
    },
    Structured {
        summary: StructuredSummary,
        token_count: u64,
    },
    ToolAugmented {
        outcome: ToolOutcome,
        token_count: u64,
    },
}

impl FinishingResult {
    pub fn token_count(&self) -> u64 {
        match self {
            FinishingResult::Plain { token_count, .. }
            | FinishingResult::Structured { token_count, .. }
            | FinishingResult::ToolAugmented { token_count, .. } => *token_count,
        }
    }

    /// Only set for tool-capable results.
    pub fn tool_status(&self) -> Option<ToolStatus> {
        match self {
            FinishingResult::ToolAugmented { outcome, .. } => Some(outcome.status()),
            _ => None,
        }
    }

    /// The `summary` field of the response envelope.
    pub fn render_summary(&self) -> Value {
        match self {
            FinishingResult::Plain { summary_text, .. } => Value::String(summary_text.clone()),
            FinishingResult::Structured { summary, .. } => json!(summary),
            FinishingResult::ToolAugmented { outcome, .. } => match outcome {
                ToolOutcome::NotInvoked { text } => Value::String(text.clone()),
                ToolOutcome::Completed { result, .. } => {
                    let results: Vec<Value> = result
                        .findings
                        .iter()
                        .map(|f| {
                            json!({
                                "title": f.title,
                                "url": f.url,
                                "content": f.excerpt,
                            })
                        })
                        .collect();
                    json!({
                        "answer": result.answer,
                        "results": results,
                    })
                }
                ToolOutcome::Unavailable { .. } => Value::Null,
            },
        }
    }
}

/// The successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub question: String,
    pub reasoning: String,
    pub summary: Value,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_status: Option<ToolStatus>,
}

impl ResponseEnvelope {
    pub fn assemble(
        question: &Question,
        reasoning: ReasoningResult,
        finishing: &FinishingResult,
        usage: Usage,
    ) -> Self {
        Self {
            question: question.as_str().to_string(),
            reasoning: reasoning.transcript,
            summary: finishing.render_summary(),
            usage,
            tool_status: finishing.tool_status(),
        }
    }
}

/// The error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub const MISSING_QUESTION: &'static str = "Question is required";
    pub const PROCESSING_FAILED: &'static str = "An error occurred while processing the request";

    pub fn missing_question() -> Self {
        Self {
            error: Self::MISSING_QUESTION.to_string(),
            details: None,
        }
    }

    pub fn processing_failed(details: impl Into<String>) -> Self {
        Self {
            error: Self::PROCESSING_FAILED.to_string(),
            details: Some(details.into()),
        }
    }
}
