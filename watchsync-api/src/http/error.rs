//! HTTP error responses
//!
//! Handlers return [`AppResult`]; failures render as `{"error", "status"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message, "status": self.status.as_u16() });
        (self.status, Json(body)).into_response()
    }
}

/// Room lookups are the only core calls made over HTTP
impl From<watchsync_core::Error> for AppError {
    fn from(err: watchsync_core::Error) -> Self {
        match err {
            watchsync_core::Error::NotFound(msg) => Self::not_found(msg),
            watchsync_core::Error::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                tracing::error!(code = other.code(), error = %other, "Unexpected room error over HTTP");
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!(error = %err, "Storage I/O failed");
        Self::internal_server_error("Storage error")
    }
}
