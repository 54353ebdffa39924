//! Byte-range serving of uploaded media

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::http::error::{AppError, AppResult};
use crate::http::AppState;

pub fn create_media_router() -> Router<AppState> {
    Router::new().route("/media/{filename}", get(serve_media))
}

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Resolve a `Range` header against a file of `size` bytes.
///
/// Supports a single `bytes=start-end`, `bytes=start-` (capped at
/// `chunk` bytes) and `bytes=-suffix`. Returns `None` when the header is
/// malformed or the range cannot be satisfied.
#[must_use]
pub fn parse_range(header: &str, size: u64, chunk: u64) -> Option<ByteRange> {
    let ranges = header.trim().strip_prefix("bytes=")?;
    if ranges.contains(',') || size == 0 {
        return None;
    }
    let (first, last) = ranges.split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let suffix: u64 = last.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some(ByteRange {
            start: size.saturating_sub(suffix),
            end: size - 1,
        });
    }

    let start: u64 = first.parse().ok()?;
    if start >= size {
        return None;
    }
    let end = if last.is_empty() {
        start.saturating_add(chunk.max(1) - 1)
    } else {
        last.parse::<u64>().ok()?
    }
    .min(size - 1);

    (start <= end).then_some(ByteRange { start, end })
}

/// A stored filename is a single plain path component
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\', '\0'])
}

/// GET /media/{filename} - full content, or one byte range
pub async fn serve_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    if !is_safe_filename(&filename) {
        return Err(AppError::bad_request("Invalid file name"));
    }
    let path = PathBuf::from(&state.config.media.upload_dir).join(&filename);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(AppError::not_found("File not found")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found("File not found"))
        }
        Err(e) => return Err(e.into()),
    };
    let size = metadata.len();
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
    let mut file = File::open(&path).await?;

    let Some(range_header) = headers.get(header::RANGE) else {
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_LENGTH, size.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response());
    };

    let range = range_header
        .to_str()
        .ok()
        .and_then(|value| parse_range(value, size, state.config.media.default_chunk_bytes));
    let Some(range) = range else {
        debug!(filename = %filename, range = ?range_header, size, "Unsatisfiable range");
        let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
        return Ok(response);
    };

    file.seek(SeekFrom::Start(range.start)).await?;
    let body = Body::from_stream(ReaderStream::new(file.take(range.len())));

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, range.len().to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{size}", range.start, range.end),
            ),
        ],
        body,
    )
        .into_response())
}
