use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use wattlink_store::StoreError;

/// HTTP-facing failures. JSON variants carry the exact response body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(Value),

    /// Plain-text 404.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(Value),

    #[error("internal: {0}")]
    Internal(Value),
}

impl ApiError {
    /// `{"error": code}` with 400.
    pub fn bad_request(code: &str) -> Self {
        Self::BadRequest(json!({ "error": code }))
    }

    pub fn internal<E: std::fmt::Display>(code: &str, err: E) -> Self {
        Self::Internal(json!({ "error": code, "message": err.to_string() }))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::internal("storage_error", e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::ServiceUnavailable(body) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            Self::Internal(body) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
