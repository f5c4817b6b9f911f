//! Pipeline stages.
//!
//! Each stage makes one remote model call through [`run_stage`], which
//! bounds it by the stage timeout, the request's cancellation token and the
//! attempt policy.

pub mod finishing;
pub mod reasoning;
pub mod schema;

pub use finishing::FinishingStage;
pub use reasoning::ReasoningStage;

use crate::config::RetryConfig;
use crate::error::{LlmError, Stage, StageFailure, StageFailureKind};
use crate::providers::with_retry;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run one stage's provider call.
///
/// Errors map to `Provider`, an elapsed `timeout` to `Timeout` and a fired
/// `cancel` token to `Cancelled`.
pub async fn run_stage<F, Fut, T>(
    stage: Stage,
    timeout: Duration,
    retry: &RetryConfig,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, StageFailure>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    if cancel.is_cancelled() {
        return Err(cancelled(stage));
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%stage, "Stage cancelled");
            Err(cancelled(stage))
        }
        result = tokio::time::timeout(timeout, with_retry(retry, operation)) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StageFailure::provider(stage, &e)),
            Err(_) => Err(StageFailure::new(
                stage,
                StageFailureKind::Timeout,
                format!("no response within {}s", timeout.as_secs()),
            )),
        },
    }
}

pub(crate) fn cancelled(stage: Stage) -> StageFailure {
    StageFailure::new(stage, StageFailureKind::Cancelled, "request cancelled")
}
