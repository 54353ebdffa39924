//! Health check endpoint

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::http::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(health_check))
}

/// Always OK while the process is serving
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}
