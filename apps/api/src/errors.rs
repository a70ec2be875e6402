use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

/// Application-level error type, and the trust boundary for everything below it.
/// Messages here are safe to show to callers; causes are logged where they occur.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input.")]
    InvalidInput,

    /// Carries the feature's generic failure text, never the provider's.
    #[error("{0}")]
    Generation(&'static str),
}

/// A body that failed to parse as JSON is invalid input like any other.
/// The parser's detail names fields, so it is logged and not returned.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        AppError::InvalidInput
    }
}

/// JSON body extractor whose rejections surface as [`AppError`].
#[derive(Debug, Deserialize, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonInput(pub Value);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AI_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}
