//! Request orchestrator.
//!
//! Drives one request through `Received -> Reasoning -> Finishing ->
//! Assembled`. The orchestrator holds no per-request state and is shared
//! across handlers behind an `Arc`.

use crate::brain::LlmProvider;
use crate::config::PipelineConfig;
use crate::dispatch::ToolDispatcher;
use crate::envelope::{FinishingMode, Question, ResponseEnvelope};
use crate::error::PipelineError;
use crate::stages::{FinishingStage, ReasoningStage};
use crate::usage::UsageAccumulator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

pub struct Orchestrator {
    reasoning: ReasoningStage,
    finishing: FinishingStage,
}

impl Orchestrator {
    pub fn new(
        reasoning_provider: Arc<dyn LlmProvider>,
        finishing_provider: Arc<dyn LlmProvider>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            reasoning: ReasoningStage::new(reasoning_provider, config),
            finishing: FinishingStage::new(finishing_provider, dispatcher, config),
        }
    }

    /// Run the full pipeline for a raw `{"question": ...}` body.
    pub async fn handle(
        &self,
        raw_body: &[u8],
        mode: FinishingMode,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, PipelineError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, %mode);

        async move {
            let question = Question::from_body(raw_body).inspect_err(|e| {
                debug!(error = %e, "Rejected request body");
            })?;
            self.run(&question, mode, cancel).await
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline for an already validated question.
    pub async fn run(
        &self,
        question: &Question,
        mode: FinishingMode,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, PipelineError> {
        let mut usage = UsageAccumulator::default();

        let reasoning = self.reasoning.reason(question, cancel).await?;
        usage.record_reasoning(reasoning.token_count);

        let finishing = self
            .finishing
            .finish(question, &reasoning.transcript, mode, cancel)
            .await?;
        usage.record_summary(finishing.token_count());

        let usage = usage.finish();
        info!(
            reasoning_tokens = usage.reasoning_tokens,
            summary_tokens = usage.summary_tokens,
            total_tokens = usage.total_tokens,
            "Request complete"
        );
        Ok(ResponseEnvelope::assemble(
            question, reasoning, &finishing, usage,
        ))
    }
}
