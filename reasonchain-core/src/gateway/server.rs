//! HTTP gateway server built on axum.

use super::GatewayConfig;
use crate::envelope::{ErrorEnvelope, FinishingMode};
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Thread-safe shared orchestrator reference for axum handlers.
pub type SharedOrchestrator = Arc<Orchestrator>;

/// Build an axum Router with the three answer routes and `/health`.
pub fn router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/api", post(plain_handler))
        .route("/api/structured", post(structured_handler))
        .route("/api/tool-calling", post(tool_handler))
        .route("/health", get(health_handler))
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn plain_handler(State(orch): State<SharedOrchestrator>, body: Bytes) -> Response {
    answer(&orch, &body, FinishingMode::Plain).await
}

async fn structured_handler(State(orch): State<SharedOrchestrator>, body: Bytes) -> Response {
    answer(&orch, &body, FinishingMode::Structured).await
}

async fn tool_handler(State(orch): State<SharedOrchestrator>, body: Bytes) -> Response {
    answer(&orch, &body, FinishingMode::ToolCapable).await
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn answer(orch: &Orchestrator, body: &[u8], mode: FinishingMode) -> Response {
    // Dropping the handler future (client disconnect) cancels in-flight stages.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match orch.handle(body, mode, &cancel).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Map a pipeline error to its HTTP status and body.
pub(crate) fn error_response(err: &PipelineError) -> Response {
    if err.is_client_error() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorEnvelope::missing_question()),
        )
            .into_response();
    }
    error!(error = %err, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope::processing_failed(err.to_string())),
    )
        .into_response()
}

/// Start the gateway server on the configured address.
///
/// Runs until `shutdown` is cancelled.
pub async fn run(
    orchestrator: SharedOrchestrator,
    config: &GatewayConfig,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let app = router(orchestrator);
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        ClientError, DispatchError, LlmError, Stage, StageFailure, StageFailureKind,
    };

    #[test]
    fn test_client_errors_map_to_400() {
        let resp = error_response(&PipelineError::Client(ClientError::MissingQuestion));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_response(&PipelineError::Client(ClientError::InvalidBody {
            message: "expected value".into(),
        }));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let errors = [
            PipelineError::Stage(StageFailure::provider(
                Stage::Reasoning,
                &LlmError::Connection {
                    message: "refused".into(),
                },
            )),
            PipelineError::Stage(StageFailure::new(
                Stage::Finishing,
                StageFailureKind::SchemaViolation,
                "missing field",
            )),
            PipelineError::Dispatch(DispatchError::UnknownTool {
                name: "runShell".into(),
            }),
        ];
        for err in &errors {
            assert_eq!(
                error_response(err).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
