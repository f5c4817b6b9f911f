//! LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait both pipeline stages talk to, and a
//! scriptable `MockLlmProvider` that records every request it receives.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Trait for chat-completion style LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a single non-streamed completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the configured model name.
    fn model_name(&self) -> &str;

    /// Short provider label used in logs ("deepseek", "openai", ...).
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}

/// A mock LLM provider for testing and development.
///
/// Queued errors are served first; once the queue is drained the
/// `fallback` response (if any) is repeated.
pub struct MockLlmProvider {
    model: String,
    errors: Mutex<VecDeque<LlmError>>,
    fallback: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            errors: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a provider that answers every call with the same response.
    pub fn always(response: CompletionResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new()
        }
    }

    /// Create a provider that answers every call with `text` and `total_tokens`.
    pub fn with_response(text: &str, total_tokens: u64) -> Self {
        Self::always(Self::text_response(text, total_tokens))
    }

    /// Sleep before answering; used to exercise stage timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an error to be returned by the next `complete` call.
    pub fn queue_error(&self, error: LlmError) {
        self.lock_errors().push_back(error);
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Snapshot of all requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str, total_tokens: u64) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 0,
                output_tokens: total_tokens,
                total_tokens,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Create a tool call response for testing. `arguments` is the raw JSON
    /// string as a provider would send it.
    pub fn tool_call_response(
        tool_name: &str,
        arguments: &str,
        total_tokens: u64,
    ) -> CompletionResponse {
        CompletionResponse {
            message: Message::new(
                Role::Assistant,
                Content::tool_call("call_mock_0", tool_name, arguments),
            ),
            usage: TokenUsage {
                input_tokens: 0,
                output_tokens: total_tokens,
                total_tokens,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("tool_calls".to_string()),
        }
    }

    fn lock_errors(&self) -> std::sync::MutexGuard<'_, VecDeque<LlmError>> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.lock_requests().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.lock_errors().pop_front();
        match queued {
            Some(error) => Err(error),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::Connection {
                    message: "mock provider has no fallback response".to_string(),
                }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
