//! Core type definitions for talking to LLM providers.
//!
//! Defines the provider-neutral request/response shapes: messages, content,
//! tool definitions, structured-output formats, and token usage.

use serde::{Deserialize, Serialize};

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Content within a message: text, a tool call, or several parts.
///
/// Tool-call arguments are kept as the raw JSON string the provider sent;
/// decoding happens where the call is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    MultiPart {
        parts: Vec<Content>,
    },
}

impl Content {
    /// Create a simple text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Create a tool call content.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Content::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Returns the text of this content, joining text parts of a multipart.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Content::Text { text } => Some(text.clone()),
            Content::ToolCall { .. } => None,
            Content::MultiPart { parts } => {
                let texts: Vec<String> = parts.iter().filter_map(Content::as_text).collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.join("\n"))
                }
            }
        }
    }

    /// All tool calls in this content, in the order the provider sent them.
    pub fn tool_calls(&self) -> Vec<ToolCallRef<'_>> {
        match self {
            Content::Text { .. } => Vec::new(),
            Content::ToolCall {
                id,
                name,
                arguments,
            } => vec![ToolCallRef {
                id,
                name,
                arguments,
            }],
            Content::MultiPart { parts } => parts.iter().flat_map(Content::tool_calls).collect(),
        }
    }
}

/// Borrowed view of a single tool call inside a `Content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolCallRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub arguments: &'a str,
}

/// A single message in a completion request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::text(text))
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }
}

/// A definition describing a tool for the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// How the model may pick among declared tools. The model always decides
/// for itself whether to call one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
        }
    }
}

/// Constrains the shape of the model's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

/// Token usage reported by a provider. Missing fields are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// A provider-neutral completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Overrides the provider's configured model.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// A provider-neutral completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    /// The reply's text, or an empty string when the provider sent none.
    pub fn text(&self) -> String {
        self.message.content.as_text().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_content_as_text() {
        assert_eq!(Content::text("hi").as_text().as_deref(), Some("hi"));
        assert_eq!(Content::tool_call("c1", "webSearch", "{}").as_text(), None);

        let multi = Content::MultiPart {
            parts: vec![
                Content::text("looking"),
                Content::tool_call("c1", "webSearch", "{}"),
                Content::text("it up"),
            ],
        };
        assert_eq!(multi.as_text().as_deref(), Some("looking\nit up"));
    }

    #[test]
    fn test_tool_calls_preserve_order() {
        let multi = Content::MultiPart {
            parts: vec![
                Content::text("two searches"),
                Content::tool_call("c1", "webSearch", r#"{"query":"first"}"#),
                Content::tool_call("c2", "webSearch", r#"{"query":"second"}"#),
            ],
        };
        let calls = multi.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[1].arguments, r#"{"query":"second"}"#);
        assert!(Content::text("none").tool_calls().is_empty());
    }

    #[test]
    fn test_request_builders() {
        let req = CompletionRequest::new(vec![Message::user("q")])
            .with_stop("</think>")
            .with_tools(Vec::new(), ToolChoice::Auto);
        assert_eq!(req.stop_sequences, vec!["</think>".to_string()]);
        assert_eq!(req.tool_choice, Some(ToolChoice::Auto));
        assert!(req.response_format.is_none());
    }

    #[test]
    fn test_response_text_defaults_to_empty() {
        let resp = CompletionResponse {
            message: Message::new(Role::Assistant, Content::tool_call("c1", "x", "{}")),
            usage: TokenUsage::default(),
            model: "m".into(),
            finish_reason: None,
        };
        assert_eq!(resp.text(), "");
    }
}
