//! End-to-end: gateway -> orchestrator -> OpenAI-compatible providers and
//! the web search tool, all against in-process stub servers.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use pretty_assertions::assert_eq;
use reasonchain_core::config::PipelineConfig;
use reasonchain_core::gateway::gateway_router;
use reasonchain_core::providers::{create_finishing_provider, create_reasoning_provider};
use reasonchain_core::Orchestrator;
use reasonchain_tools::register_builtin_tools;
use reasonchain_tools::registry::ToolRegistry;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

async fn reasoning_handler(Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(body["stop"], "</think>");
    Json(json!({
        "model": "deepseek-reasoner",
        "choices": [{"message": {"role": "assistant", "content": "The user wants current news."}}],
        "usage": {"total_tokens": 21}
    }))
}

async fn finishing_handler(Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"][0]["function"]["name"], "webSearch");
    Json(json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "webSearch", "arguments": "{\"query\":\"rust news\"}"}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"total_tokens": 9}
    }))
}

async fn search_down() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "down")
}

async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_search_outage_returns_200_with_null_summary() {
    let mut config = PipelineConfig::default();
    config.reasoning.base_url =
        spawn_stub(Router::new().route("/chat/completions", post(reasoning_handler))).await;
    config.finishing.base_url =
        spawn_stub(Router::new().route("/chat/completions", post(finishing_handler))).await;
    config.search.base_url = spawn_stub(Router::new().route("/search", post(search_down))).await;

    let reasoning = create_reasoning_provider(&config.reasoning, "ds-key").unwrap();
    let finishing = create_finishing_provider(&config.finishing, "oa-key").unwrap();
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, &config.search, "tvly-key").unwrap();

    let orchestrator = Orchestrator::new(reasoning, finishing, Arc::new(registry), &config);
    let app = gateway_router(Arc::new(orchestrator));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/tool-calling")
        .header("content-type", "application/json")
        .body(Body::from(json!({"question": "What's new in Rust?"}).to_string()))
        .unwrap();
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, request)
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), 100_000)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        json!({
            "question": "What's new in Rust?",
            "reasoning": "The user wants current news.",
            "summary": null,
            "usage": {"reasoning_tokens": 21, "summary_tokens": 9, "total_tokens": 30},
            "tool_status": "unavailable"
        })
    );
}
