use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum NvrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Camera not found: {0}")]
    CameraNotFound(String),

    #[error("API key not found")]
    KeyNotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("Entropy source failure: {0}")]
    Entropy(String),

    #[error("Listen failure on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NvrError>;

/// Map each error variant to (HTTP status, error code, client-visible message).
///
/// Internal failures (IO, serialization, entropy) hide their detail from the
/// client; the full error is logged before the response is built.
impl IntoResponse for NvrError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            NvrError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            NvrError::CameraNotFound(_) => {
                (StatusCode::NOT_FOUND, "camera_not_found", self.to_string())
            }
            NvrError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            NvrError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            NvrError::Recorder(_) => {
                tracing::error!("recorder failure: {}", self);
                (StatusCode::BAD_GATEWAY, "recorder_error", self.to_string())
            }
            NvrError::Io(_) | NvrError::Json(_) | NvrError::Entropy(_) | NvrError::Listen { .. } => {
                tracing::error!("internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
