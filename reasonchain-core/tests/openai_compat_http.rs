//! OpenAI-compatible provider against an in-process chat completions server.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use pretty_assertions::assert_eq;
use reasonchain_core::providers::OpenAiCompatibleProvider;
use reasonchain_core::{CompletionRequest, LlmError, LlmProvider, Message};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct StubState {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

async fn completions_handler(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    state.auth.lock().await.push(auth);
    state.bodies.lock().await.push(body);

    Json(json!({
        "id": "chatcmpl-1",
        "model": "deepseek-reasoner",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "France's capital is Paris."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    }))
}

async fn failing_handler() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "upstream exploded")
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
async fn test_complete_posts_chat_completions() {
    let state = StubState::default();
    let app = Router::new()
        .route("/chat/completions", post(completions_handler))
        .with_state(state.clone());
    let base_url = spawn_stub(app).await;

    let provider =
        OpenAiCompatibleProvider::new("deepseek", &base_url, "deepseek-reasoner", "sk-test")
            .unwrap();
    let request = CompletionRequest::new(vec![Message::user("What is the capital of France?")])
        .with_stop("</think>");
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.text(), "France's capital is Paris.");
    assert_eq!(response.usage.total_tokens, 12);

    let bodies = state.bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "deepseek-reasoner");
    assert_eq!(bodies[0]["stream"], false);
    assert_eq!(bodies[0]["stop"], "</think>");
    assert_eq!(
        bodies[0]["messages"],
        json!([{"role": "user", "content": "What is the capital of France?"}])
    );
    assert_eq!(state.auth.lock().await[0], "Bearer sk-test");
}

#[tokio::test]
async fn test_server_error_maps_to_api_request() {
    let app = Router::new().route("/chat/completions", post(failing_handler));
    let base_url = spawn_stub(app).await;

    let provider = OpenAiCompatibleProvider::new("openai", &base_url, "gpt-4o-mini", "sk").unwrap();
    let err = provider
        .complete(CompletionRequest::new(vec![Message::user("q")]))
        .await
        .unwrap_err();
    match err {
        LlmError::ApiRequest { message } => {
            assert!(message.contains("502"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("Expected ApiRequest, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider =
        OpenAiCompatibleProvider::new("openai", format!("http://{}", addr), "gpt-4o-mini", "sk")
            .unwrap();
    let err = provider
        .complete(CompletionRequest::new(vec![Message::user("q")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Connection { .. }));
}
