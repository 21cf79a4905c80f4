use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use bytes::Bytes;
use chailv_core::ai::GenerationConfig;
use chailv_core::api::{ChatRequest, ChatResponse, CHAT_PATH};
use chailv_core::prompt::{self, FALLBACK_TEXT};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::error::RelayError;
use crate::generator::{GenerateRequest, Generator};

#[derive(Clone)]
pub struct RelayState {
    /// Generation API credential; `None` means the deployment is misconfigured
    pub api_key: Option<String>,
    pub model: String,
    pub generator: Arc<dyn Generator>,
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(CHAT_PATH, post(chat).fallback(method_not_allowed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed() -> RelayError {
    RelayError::MethodNotAllowed
}

/// Lenient body parsing: a JSON string holding JSON is unwrapped once, and
/// anything unparseable is treated as an empty request. Fields are read one
/// at a time so a mistyped table never hides the message.
fn parse_body(body: &[u8]) -> ChatRequest {
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(inner)) => serde_json::from_str::<Value>(&inner).unwrap_or(Value::Null),
        Ok(value) => value,
        Err(_) => Value::Null,
    };
    ChatRequest {
        user_message: value.get("userMessage").and_then(message_text),
        region_table: table_text(value.get("regionTable")),
        standard_table: table_text(value.get("standardTable")),
    }
}

/// Non-empty strings pass through; other truthy scalars are stringified
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Tables must be strings; anything else falls back to the placeholder
fn table_text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

async fn chat(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, RelayError> {
    let Some(api_key) = state.api_key.as_deref() else {
        tracing::error!("Missing GEMINI_API_KEY");
        return Err(RelayError::MissingCredential);
    };

    let request = parse_body(&body);
    let user_message = request
        .user_message
        .filter(|m| !m.is_empty())
        .ok_or(RelayError::MissingUserMessage)?;

    let generate = GenerateRequest {
        model: state.model.clone(),
        parts: prompt::build_parts(
            &user_message,
            request.region_table.as_deref(),
            request.standard_table.as_deref(),
        ),
        config: GenerationConfig::deterministic(),
    };

    match state.generator.generate(api_key, &generate).await {
        Ok(text) if text.is_empty() => Ok(Json(ChatResponse {
            text: FALLBACK_TEXT.to_string(),
        })),
        Ok(text) => Ok(Json(ChatResponse { text })),
        Err(e) => {
            tracing::error!(error = %e, model = %state.model, "generation request failed");
            Err(RelayError::provider(e.to_string()))
        }
    }
}
