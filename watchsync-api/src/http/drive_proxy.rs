//! Passthrough proxy for publicly shared third-party drive files
//!
//! Players can't read drive downloads cross-origin, so the file is fetched
//! here and streamed through with its range headers intact.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::error::{AppError, AppResult};
use crate::http::AppState;

/// Response headers copied from upstream
const FORWARDED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::CONTENT_LENGTH,
];

#[derive(Debug, Deserialize)]
pub struct DriveProxyQuery {
    /// Drive file id
    pub id: Option<String>,
    /// Full download URL; wins over `id`
    pub url: Option<String>,
}

pub fn create_drive_proxy_router() -> Router<AppState> {
    Router::new().route("/drive/proxy", get(proxy_drive_file))
}

/// Resolve the upstream URL from the query
pub fn target_url(query: &DriveProxyQuery, drive_base_url: &str) -> AppResult<url::Url> {
    let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(raw) = non_empty(&query.url) {
        let parsed = url::Url::parse(&raw).map_err(|e| AppError::bad_request(format!("Invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::bad_request("Only http and https urls can be proxied"));
        }
        return Ok(parsed);
    }
    if let Some(id) = non_empty(&query.id) {
        return url::Url::parse_with_params(drive_base_url, &[("export", "download"), ("id", id.as_str())])
            .map_err(|e| AppError::internal_server_error(format!("Invalid drive base url: {e}")));
    }
    Err(AppError::bad_request("Provide id or url"))
}

/// GET /drive/proxy?id=..|url=..
pub async fn proxy_drive_file(
    State(state): State<AppState>,
    Query(query): Query<DriveProxyQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let target = target_url(&query, &state.config.proxy.drive_base_url)?;
    debug!(target = %target, "Proxying drive file");

    let mut request = state.http_client.get(target.clone());
    if let Some(range) = headers.get(header::RANGE) {
        request = request.header(header::RANGE, range.clone());
    }

    let upstream = request.send().await.map_err(|e| {
        warn!(target = %target, error = %e, "Drive proxy request failed");
        AppError::bad_gateway("Upstream request failed")
    })?;

    let status = upstream.status();
    if !status.is_success() {
        debug!(target = %target, status = %status, "Upstream refused drive file");
        return Ok(status.into_response());
    }

    let upstream_headers = upstream.headers().clone();
    let status = if upstream_headers.contains_key(header::CONTENT_RANGE) {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream_headers.get(&name) {
            response.headers_mut().insert(name, value.clone());
        }
    }
    Ok(response)
}
