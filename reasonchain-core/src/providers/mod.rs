//! LLM provider implementations.
//!
//! Both pipeline stages use [`OpenAiCompatibleProvider`]; the helpers here
//! build one per stage from configuration and run calls under the
//! configured attempt policy.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::{FinishingConfig, ReasoningConfig, RetryConfig};
use crate::error::LlmError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use openai_compat::OpenAiCompatibleProvider;

/// Execute an async operation up to `config.max_attempts` times.
///
/// Only transient errors (`RateLimited`, `Connection`, `Timeout`) are
/// retried; everything else returns immediately. With the default config
/// the operation runs exactly once.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt >= max_attempts {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt - 1, &e);
                tracing::warn!(
                    attempt,
                    max = max_attempts,
                    backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Check if an error is retryable (transient).
fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::RateLimited { .. } | LlmError::Connection { .. } | LlmError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &LlmError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    if let LlmError::RateLimited { retry_after_secs } = err {
        return retry_after_secs.saturating_mul(1000).max(computed);
    }
    computed
}

/// Pure exponential backoff, capped at `max_backoff_ms`.
fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    base.min(config.max_backoff_ms as f64) as u64
}

/// Create the reasoning-stage provider.
pub fn create_reasoning_provider(
    config: &ReasoningConfig,
    api_key: &str,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleProvider::new(
        &config.provider,
        &config.base_url,
        &config.model,
        api_key,
    )?))
}

/// Create the finishing-stage provider.
pub fn create_finishing_provider(
    config: &FinishingConfig,
    api_key: &str,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleProvider::new(
        &config.provider,
        &config.base_url,
        &config.model,
        api_key,
    )?))
}
