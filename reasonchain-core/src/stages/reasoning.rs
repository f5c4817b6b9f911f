//! Reasoning stage: obtain a chain-of-thought transcript for the question.

use super::run_stage;
use crate::brain::LlmProvider;
use crate::config::{PipelineConfig, RetryConfig};
use crate::envelope::{Question, ReasoningResult};
use crate::error::{Stage, StageFailure};
use crate::types::{CompletionRequest, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ReasoningStage {
    provider: Arc<dyn LlmProvider>,
    stop_sequence: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl ReasoningStage {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            stop_sequence: config.reasoning.stop_sequence.clone(),
            timeout: config.stage_timeout(),
            retry: config.retry.clone(),
        }
    }

    /// The single request sent for `question`.
    pub fn build_request(&self, question: &Question) -> CompletionRequest {
        let mut request = CompletionRequest::new(vec![Message::user(question.as_str())]);
        request.model = Some(self.provider.model_name().to_string());
        if !self.stop_sequence.is_empty() {
            request = request.with_stop(self.stop_sequence.clone());
        }
        request
    }

    pub async fn reason(
        &self,
        question: &Question,
        cancel: &CancellationToken,
    ) -> Result<ReasoningResult, StageFailure> {
        let request = self.build_request(question);
        let response = run_stage(Stage::Reasoning, self.timeout, &self.retry, cancel, || {
            self.provider.complete(request.clone())
        })
        .await?;

        let result = ReasoningResult {
            transcript: response.text(),
            token_count: response.usage.total_tokens,
        };
        info!(
            stage = "reasoning",
            model = %response.model,
            tokens = result.token_count,
            transcript_len = result.transcript.len(),
            "Reasoning complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::error::{LlmError, StageFailureKind};
    use crate::types::{CompletionResponse, Role, TokenUsage};
    use pretty_assertions::assert_eq;

    fn stage(provider: Arc<MockLlmProvider>) -> ReasoningStage {
        ReasoningStage::new(provider, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_reason_returns_transcript_and_tokens() {
        let provider = Arc::new(MockLlmProvider::with_response(
            "France's capital is Paris.",
            12,
        ));
        let question = Question::parse("What is the capital of France?").unwrap();

        let result = stage(provider.clone())
            .reason(&question, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            result,
            ReasoningResult {
                transcript: "France's capital is Paris.".into(),
                token_count: 12,
            }
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert_eq!(
            requests[0].messages[0],
            Message::user("What is the capital of France?")
        );
        assert_eq!(requests[0].stop_sequences, vec!["</think>".to_string()]);
        assert_eq!(requests[0].model.as_deref(), Some("mock-model"));
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_reason_missing_content_and_usage() {
        let provider = Arc::new(MockLlmProvider::always(CompletionResponse {
            message: Message::assistant(""),
            usage: TokenUsage::default(),
            model: "deepseek-reasoner".into(),
            finish_reason: None,
        }));
        let question = Question::parse("q").unwrap();
        let result = stage(provider)
            .reason(&question, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.transcript, "");
        assert_eq!(result.token_count, 0);
    }

    #[tokio::test]
    async fn test_reason_provider_failure() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.queue_error(LlmError::ApiRequest {
            message: "Server error (500)".into(),
        });
        let question = Question::parse("q").unwrap();
        let err = stage(provider.clone())
            .reason(&question, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Reasoning);
        assert_eq!(err.kind, StageFailureKind::Provider);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reason_timeout() {
        let provider = Arc::new(
            MockLlmProvider::with_response("late", 1).with_delay(Duration::from_secs(5)),
        );
        let mut config = PipelineConfig::default();
        config.stage_timeout_secs = 0;
        let stage = ReasoningStage::new(provider, &config);
        let err = stage
            .reason(&Question::parse("q").unwrap(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, StageFailureKind::Timeout);
    }
}
