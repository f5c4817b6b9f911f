//! Finishing stage: turn the question and reasoning transcript into the
//! final answer.
//!
//! All three modes share the same prompt. Structured mode constrains the
//! reply to [`schema::structured_response_schema`]; tool-capable mode lets
//! the model request one web search, which is executed through the
//! [`ToolDispatcher`] without a second model round-trip.

use super::{cancelled, run_stage, schema};
use crate::brain::LlmProvider;
use crate::config::{PipelineConfig, RetryConfig};
use crate::dispatch::{ToolDispatcher, ToolInvocation, ToolName};
use crate::envelope::{FinishingMode, FinishingResult, Question, ToolOutcome};
use crate::error::{DispatchError, PipelineError, Stage, StageFailure, StageFailureKind};
use crate::types::{CompletionRequest, CompletionResponse, Message, ToolCallRef, ToolChoice};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct FinishingStage {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Arc<dyn ToolDispatcher>,
    system_prompt: String,
    temperature: Option<f32>,
    timeout: Duration,
    retry: RetryConfig,
}

impl FinishingStage {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            system_prompt: config.finishing.system_prompt.clone(),
            temperature: config.finishing.temperature,
            timeout: config.stage_timeout(),
            retry: config.retry.clone(),
        }
    }

    /// The system and user messages shared by every mode.
    pub fn messages(&self, question: &Question, transcript: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!(
                "<QUESTION>\n{}\n</QUESTION>\n<REASONING>\n{}\n</REASONING>",
                question, transcript
            )),
        ]
    }

    pub fn build_request(
        &self,
        question: &Question,
        transcript: &str,
        mode: FinishingMode,
    ) -> CompletionRequest {
        let mut request = CompletionRequest::new(self.messages(question, transcript));
        request.model = Some(self.provider.model_name().to_string());
        request.temperature = self.temperature;
        match mode {
            FinishingMode::Plain => request,
            FinishingMode::Structured => {
                request.with_response_format(schema::structured_response_format())
            }
            FinishingMode::ToolCapable => {
                request.with_tools(self.dispatcher.definitions(), ToolChoice::Auto)
            }
        }
    }

    pub async fn finish(
        &self,
        question: &Question,
        transcript: &str,
        mode: FinishingMode,
        cancel: &CancellationToken,
    ) -> Result<FinishingResult, PipelineError> {
        let request = self.build_request(question, transcript, mode);
        let response = run_stage(Stage::Finishing, self.timeout, &self.retry, cancel, || {
            self.provider.complete(request.clone())
        })
        .await?;

        let token_count = response.usage.total_tokens;
        let result = match mode {
            FinishingMode::Plain => FinishingResult::Plain {
                summary_text: response.text(),
                token_count,
            },
            FinishingMode::Structured => FinishingResult::Structured {
                summary: schema::parse_structured(&response.text())?,
                token_count,
            },
            FinishingMode::ToolCapable => FinishingResult::ToolAugmented {
                outcome: self.resolve_tool_call(&response, cancel).await?,
                token_count,
            },
        };

        info!(
            stage = "finishing",
            %mode,
            model = %response.model,
            tokens = token_count,
            "Finishing complete"
        );
        Ok(result)
    }

    async fn resolve_tool_call(
        &self,
        response: &CompletionResponse,
        cancel: &CancellationToken,
    ) -> Result<ToolOutcome, PipelineError> {
        let calls = response.message.content.tool_calls();
        let Some(call) = calls.first() else {
            return Ok(ToolOutcome::NotInvoked {
                text: response.text(),
            });
        };
        if calls.len() > 1 {
            debug!(
                ignored = calls.len() - 1,
                "Only the first tool call is executed"
            );
        }

        let invocation = decode_invocation(call)?;
        let query = invocation.query().unwrap_or_default().to_string();
        debug!(tool = %invocation.name, query = %query, "Dispatching tool call");

        let dispatched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(Stage::Finishing).into()),
            result = self.dispatcher.dispatch(invocation) => result,
        };

        match dispatched {
            Ok(result) => {
                info!(
                    tool = call.name,
                    findings = result.findings.len(),
                    "Tool call completed"
                );
                Ok(ToolOutcome::Completed { query, result })
            }
            Err(err) if err.is_soft() => {
                warn!(tool = call.name, error = %err, "Tool unavailable, returning degraded result");
                Ok(ToolOutcome::Unavailable {
                    query,
                    reason: err.to_string(),
                })
            }
            Err(DispatchError::InvalidArguments { name, reason }) => Err(StageFailure::new(
                Stage::Finishing,
                StageFailureKind::MalformedToolArgs,
                format!("{}: {}", name, reason),
            )
            .into()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Decode a raw tool call into a typed invocation.
fn decode_invocation(call: &ToolCallRef<'_>) -> Result<ToolInvocation, PipelineError> {
    let arguments = match serde_json::from_str::<serde_json::Value>(call.arguments) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            return Err(malformed_args(
                call.name,
                format!("expected a JSON object, got {}", other),
            ));
        }
        Err(e) => return Err(malformed_args(call.name, e.to_string())),
    };
    let name: ToolName = call.name.parse()?;
    Ok(ToolInvocation::new(name, arguments))
}

fn malformed_args(tool: &str, reason: String) -> PipelineError {
    StageFailure::new(
        Stage::Finishing,
        StageFailureKind::MalformedToolArgs,
        format!("arguments for '{}' are not valid: {}", tool, reason),
    )
    .into()
}
