//! Local media upload
//!
//! Files are streamed to the upload directory under a generated name and
//! served back by the byte-range media endpoint.

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{info, warn};

use crate::http::error::{AppError, AppResult};
use crate::http::AppState;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
    pub original: String,
    pub size: u64,
}

pub fn create_upload_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Extension for the stored file: the original's, else one guessed from the
/// declared content type. Anything odd is dropped.
fn extension_for(original: &str, content_type: Option<&str>) -> String {
    let from_name = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string);
    let from_mime = || {
        content_type
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .map(|ext| (*ext).to_string())
    };

    from_name
        .or_else(from_mime)
        .filter(|ext| ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// `<unix-millis>_<random 10 chars><ext>`
#[must_use]
pub fn stored_filename(original: &str, content_type: Option<&str>, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}{}",
        now.timestamp_millis(),
        nanoid::nanoid!(10),
        extension_for(original, content_type)
    )
}

async fn write_field(field: &mut Field<'_>, path: &PathBuf) -> AppResult<u64> {
    let mut file = File::create(path).await?;
    let mut size = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::bad_request(format!("Upload interrupted: {e}")))?
    {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(size)
}

/// POST /upload - store a single file from the `file` field
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let upload_dir = PathBuf::from(&state.config.media.upload_dir);

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let filename = stored_filename(&original, field.content_type(), Utc::now());
        fs::create_dir_all(&upload_dir).await?;
        let path = upload_dir.join(&filename);

        let size = match write_field(&mut field, &path).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %rm, "Failed to remove partial upload");
                }
                return Err(e);
            }
        };

        info!(filename = %filename, original = %original, size, "File uploaded");
        return Ok(Json(UploadResponse {
            url: format!("/media/{filename}"),
            filename,
            original,
            size,
        }));
    }

    Err(AppError::bad_request("No file uploaded"))
}
