use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chailv_core::state::FAILURE_MESSAGE;
use chailv_core::tables::{PRESET_REGION_DATA, PRESET_STANDARD_DATA};
use chailv_core::{ChatMessage, ChatSession, RelayClient};
use chailv_relay::{router, GeminiGenerator, RelayState};
use serde_json::{json, Value};

const MODEL: &str = "gemini-2.0-flash";

/// What the fake generation API saw: (api key header, request body)
type Seen = Arc<Mutex<Vec<(String, Value)>>>;

#[derive(Clone)]
struct FakeGemini {
    seen: Seen,
    status: StatusCode,
    reply: Value,
}

async fn fake_generate(
    State(fake): State<FakeGemini>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fake.seen.lock().unwrap().push((key, body));
    (fake.status, Json(fake.reply.clone()))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn start_fake_gemini(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let fake = FakeGemini {
        seen: seen.clone(),
        status,
        reply,
    };
    let app = Router::new()
        .route(&format!("/v1beta/models/{MODEL}:generateContent"), post(fake_generate))
        .with_state(fake);
    let addr = serve(app).await;
    (format!("http://{addr}"), seen)
}

async fn start_relay(api_key: Option<&str>, gemini_base_url: &str) -> RelayClient {
    let state = RelayState {
        api_key: api_key.map(str::to_string),
        model: MODEL.to_string(),
        generator: Arc::new(GeminiGenerator::new(gemini_base_url)),
    };
    let addr = serve(router(state)).await;
    RelayClient::new(&format!("http://{addr}"))
}

#[tokio::test]
async fn question_flows_from_session_to_model_and_back() {
    let answer = "【核查报告】\n- 目的地判定：上海 -> 一类地区\n- 职级定位：达仁堂 | 中层";
    let (gemini_url, seen) = start_fake_gemini(
        StatusCode::OK,
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": answer}]}}]}),
    )
    .await;
    let client = start_relay(Some("test-key"), &gemini_url).await;

    let mut session = ChatSession::new();
    session.input = "我是达仁堂的中层，去上海出差标准是多少？".to_string();
    let message = session.submit().expect("submit while idle");
    assert!(session.is_awaiting());
    assert!(!session.can_send());

    let outcome = client
        .chat(&message, PRESET_REGION_DATA, PRESET_STANDARD_DATA)
        .await;
    session.resolve(outcome);

    assert!(!session.is_awaiting());
    assert_eq!(session.messages().last(), Some(&ChatMessage::assistant(answer)));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (key, body) = &seen[0];
    assert_eq!(key, "test-key");
    assert_eq!(body["generationConfig"]["temperature"], 0.0);
    assert_eq!(body["generationConfig"]["topK"], 1);
    let parts = body["contents"][0]["parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 3);
    let context = parts[0]["text"].as_str().unwrap();
    assert!(context.contains(PRESET_REGION_DATA));
    assert!(context.contains(PRESET_STANDARD_DATA));
    assert_eq!(
        parts[2]["text"],
        "用户咨询：我是达仁堂的中层，去上海出差标准是多少？"
    );
}

#[tokio::test]
async fn missing_credential_reaches_the_ui_as_failure_message() {
    let (gemini_url, seen) = start_fake_gemini(StatusCode::OK, json!({})).await;
    let client = start_relay(None, &gemini_url).await;

    let err = client.chat("q", "r", "s").await.expect_err("should fail");
    assert_eq!(err.to_string(), "Request failed (500): Missing GEMINI_API_KEY");
    assert!(seen.lock().unwrap().is_empty());

    let mut session = ChatSession::new();
    session.input = "q".to_string();
    session.submit();
    session.resolve(Err(err));
    assert_eq!(
        session.messages().last(),
        Some(&ChatMessage::assistant(FAILURE_MESSAGE))
    );
    assert!(!session.is_awaiting());
}

#[tokio::test]
async fn provider_error_message_is_relayed() {
    let (gemini_url, _) = start_fake_gemini(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}),
    )
    .await;
    let client = start_relay(Some("test-key"), &gemini_url).await;

    let err = client.chat("q", "r", "s").await.expect_err("should fail");
    assert_eq!(err.to_string(), "Request failed (500): Resource has been exhausted");
}

#[tokio::test]
async fn empty_model_output_becomes_fallback_text() {
    let (gemini_url, _) = start_fake_gemini(
        StatusCode::OK,
        json!({"candidates": [{"finishReason": "STOP", "content": {"parts": []}}]}),
    )
    .await;
    let client = start_relay(Some("test-key"), &gemini_url).await;

    let text = client.chat("q", "r", "s").await.expect("ok");
    assert_eq!(text, chailv_core::prompt::FALLBACK_TEXT);
}

#[tokio::test]
async fn non_json_error_body_keeps_status_only() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream timed out") }),
    );
    let addr = serve(app).await;
    let client = RelayClient::new(&format!("http://{addr}"));

    let err = client.chat("q", "r", "s").await.expect_err("should fail");
    assert_eq!(err.to_string(), "Request failed (502)");
}

#[tokio::test]
async fn non_json_success_body_yields_fallback() {
    let app = Router::new().route("/api/chat", post(|| async { "plain text" }));
    let addr = serve(app).await;
    let client = RelayClient::new(&format!("http://{addr}"));

    let text = client.chat("q", "r", "s").await.expect("ok");
    assert_eq!(text, chailv_core::prompt::FALLBACK_TEXT);
}
