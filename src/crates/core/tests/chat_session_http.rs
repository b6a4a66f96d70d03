use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use finchat_core::infrastructure::api::{parse_date, AnalysisRequest};
use finchat_core::{
    ChatMessage, ChatSession, ClientConfig, FinChatApiClient, FinChatError, TurnOutcome,
    FALLBACK_REPLY,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct TestState {
    chat_requests: Arc<Mutex<Vec<Value>>>,
    analyze_requests: Arc<Mutex<Vec<Value>>>,
}

fn sse_event(payload: Value) -> String {
    format!("event: message\r\ndata: {}\r\n\r\n", payload)
}

/// Re-chunk a body so that event lines straddle read boundaries.
fn streamed(body: String, chunk_size: usize) -> Response {
    let chunks: Vec<Result<Vec<u8>, Infallible>> = body
        .into_bytes()
        .chunks(chunk_size)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .expect("valid response")
}

async fn chat_handler(State(state): State<TestState>, Json(body): Json<Value>) -> Response {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.chat_requests.lock().await.push(body);

    match message.as_str() {
        "misconfigured" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "API配置缺失" })),
        )
            .into_response(),
        "explode" => {
            let mut body = sse_event(json!({ "type": "content", "content": "Partial" }));
            body.push_str(&sse_event(json!({ "type": "error", "error": "LLM unavailable" })));
            streamed(body, 7)
        }
        "truncate" => streamed(
            sse_event(json!({ "type": "content", "content": "Partial" })),
            64,
        ),
        _ => {
            let mut body = String::from(": ping - 2024-01-01 00:00:00\r\n\r\n");
            body.push_str(&sse_event(json!({ "type": "content", "content": "贵州茅台" })));
            body.push_str(&sse_event(json!({ "type": "status", "stage": "querying" })));
            body.push_str(&sse_event(json!({ "type": "content", "content": " looks stable." })));
            body.push_str(&sse_event(json!({ "type": "done" })));
            streamed(body, 5)
        }
    }
}

async fn models_handler() -> Json<Value> {
    Json(json!({
        "models": [
            { "id": "deepseek-chat", "name": "Deepseek Chat" },
            { "id": "glm-4-plus", "name": "GLM-4 Plus" }
        ]
    }))
}

async fn analyze_handler(State(state): State<TestState>, Json(body): Json<Value>) -> Response {
    let stock = body
        .get("stock_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.analyze_requests.lock().await.push(body);

    if stock == "unknown" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "no data for unknown" })),
        )
            .into_response();
    }
    Json(json!({
        "status": "success",
        "report": format!("# {} report\n\nRevenue grew.", stock)
    }))
    .into_response()
}

async fn spawn_backend() -> (String, TestState) {
    let state = TestState::default();
    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/models", get(models_handler))
        .route("/api/analyze", post(analyze_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn client_for(base_url: &str) -> FinChatApiClient {
    FinChatApiClient::new(ClientConfig::new(base_url).with_chat_model("glm-4-plus"))
        .expect("valid client config")
}

#[tokio::test]
async fn chat_turn_streams_reply_over_http() {
    let (base_url, state) = spawn_backend().await;
    let client = client_for(&base_url);
    let session = ChatSession::new(client.clone(), client.config());

    let outcome = session.submit_turn("How is Moutai?", "600519").await;

    match outcome {
        TurnOutcome::Completed(reply) => assert_eq!(reply.content, "贵州茅台 looks stable."),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        session.history(),
        vec![
            ChatMessage::user("How is Moutai?"),
            ChatMessage::assistant("贵州茅台 looks stable."),
        ]
    );
    assert!(session.in_flight().is_empty());
    assert!(!session.is_busy());

    let requests = state.chat_requests.lock().await;
    assert_eq!(
        requests[0],
        json!({
            "message": "How is Moutai?",
            "stock_name": "600519",
            "chat_model": "glm-4-plus"
        })
    );
}

#[tokio::test]
async fn error_status_becomes_fallback_reply() {
    let (base_url, _state) = spawn_backend().await;
    let client = client_for(&base_url);
    let session = ChatSession::new(client.clone(), client.config());

    let outcome = session.submit_turn("misconfigured", "600519").await;

    match outcome {
        TurnOutcome::Failed(FinChatError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "API配置缺失");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        session.history().last(),
        Some(&ChatMessage::assistant(FALLBACK_REPLY))
    );
}

#[tokio::test]
async fn error_event_discards_partial_reply() {
    let (base_url, _state) = spawn_backend().await;
    let client = client_for(&base_url);
    let session = ChatSession::new(client.clone(), client.config());

    let outcome = session.submit_turn("explode", "600519").await;

    assert!(matches!(outcome, TurnOutcome::Failed(FinChatError::Backend(ref m)) if m == "LLM unavailable"));
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn stream_closed_without_done_becomes_fallback() {
    let (base_url, _state) = spawn_backend().await;
    let client = client_for(&base_url);
    let session = ChatSession::new(client.clone(), client.config());

    let outcome = session.submit_turn("truncate", "600519").await;

    assert!(matches!(outcome, TurnOutcome::Failed(FinChatError::StreamClosed)));
    assert_eq!(session.history()[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn unreachable_backend_becomes_fallback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}"));
    let session = ChatSession::new(client.clone(), client.config());

    let outcome = session.submit_turn("hello", "600519").await;

    match outcome {
        TurnOutcome::Failed(e) => assert!(e.is_transport(), "unexpected error: {e}"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.history()[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn lists_backend_models() {
    let (base_url, _state) = spawn_backend().await;
    let client = client_for(&base_url);

    let models = client.list_models().await.expect("models should load");

    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["deepseek-chat", "glm-4-plus"]);
}

#[tokio::test]
async fn analyze_returns_markdown_report() {
    let (base_url, state) = spawn_backend().await;
    let client = client_for(&base_url);
    let request = AnalysisRequest::new(
        "600519",
        parse_date("2024-01-01").unwrap(),
        parse_date("2024-06-30").unwrap(),
        "deepseek-chat",
    )
    .unwrap();

    let report = client.analyze_stock(&request).await.expect("report");

    assert!(report.report.starts_with("# 600519 report"));
    let requests = state.analyze_requests.lock().await;
    assert_eq!(requests[0]["start_date"], "2024-01-01");
    assert_eq!(requests[0]["end_date"], "2024-06-30");
}

#[tokio::test]
async fn analyze_failure_carries_backend_detail() {
    let (base_url, _state) = spawn_backend().await;
    let client = client_for(&base_url);
    let request = AnalysisRequest::new(
        "unknown",
        parse_date("2024-01-01").unwrap(),
        parse_date("2024-01-31").unwrap(),
        "deepseek-chat",
    )
    .unwrap();

    let err = client.analyze_stock(&request).await.unwrap_err();

    match err {
        FinChatError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "no data for unknown");
        }
        other => panic!("unexpected error: {other}"),
    }
}
