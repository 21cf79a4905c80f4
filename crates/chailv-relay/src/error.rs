use axum::{http::StatusCode, response::IntoResponse, Json};
use chailv_core::api::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Missing GEMINI_API_KEY")]
    MissingCredential,
    #[error("Missing userMessage")]
    MissingUserMessage,
    #[error("{0}")]
    Provider(String),
}

impl RelayError {
    /// Provider failure carrying its message, or a generic one when it has none
    pub fn provider(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            RelayError::Provider("Request failed".to_string())
        } else {
            RelayError::Provider(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingUserMessage => StatusCode::BAD_REQUEST,
            RelayError::MissingCredential | RelayError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
