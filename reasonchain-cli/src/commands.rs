//! CLI subcommand handlers.

use reasonchain_core::config::{Credentials, PipelineConfig};
use reasonchain_core::gateway::run_gateway;
use reasonchain_core::providers::{create_finishing_provider, create_reasoning_provider};
use reasonchain_core::{FinishingMode, Orchestrator};
use reasonchain_tools::register_builtin_tools;
use reasonchain_tools::registry::ToolRegistry;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wire providers, tools and stages from configuration.
///
/// Fails before anything is served when a credential is missing.
fn build_orchestrator(config: &PipelineConfig) -> anyhow::Result<Arc<Orchestrator>> {
    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    let credentials = Credentials::resolve(config)?;
    let reasoning = create_reasoning_provider(&config.reasoning, &credentials.reasoning_api_key)?;
    let finishing = create_finishing_provider(&config.finishing, &credentials.finishing_api_key)?;

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, &config.search, &credentials.search_api_key)?;

    info!(
        reasoning_model = %config.reasoning.model,
        finishing_model = %config.finishing.model,
        tools = registry.len(),
        "Pipeline ready"
    );
    Ok(Arc::new(Orchestrator::new(
        reasoning,
        finishing,
        Arc::new(registry),
        config,
    )))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), token));
}

/// Cancel `token` once `signal` fires. A signal handler that could not be
/// installed leaves the token alone.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Received Ctrl-C, shutting down");
            token.cancel();
        }
        Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
    }
}

/// `reasonchain serve`
pub async fn serve(config: PipelineConfig) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    run_gateway(orchestrator, &config.gateway, shutdown).await?;
    Ok(())
}

/// `reasonchain ask`
pub async fn ask(config: PipelineConfig, question: &str, mode: FinishingMode) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let body = serde_json::json!({ "question": question }).to_string();
    let envelope = orchestrator.handle(body.as_bytes(), mode, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        cancel_on_signal(std::future::ready(Ok(())), token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_registration_does_not_cancel() {
        let token = CancellationToken::new();
        let failed = std::future::ready(Err(std::io::Error::other("no signal handler")));
        cancel_on_signal(failed, token.clone()).await;
        assert!(!token.is_cancelled());
    }
}
