//! Upload API endpoints
//!
//! Handles image uploads for posts (admin role required):
//! - POST /api/v1/admin/uploads/image - Upload a single image
//!
//! Stored files get a generated name combining a timestamp, a random tail,
//! and a sanitized version of the client file name, so uploads never
//! overwrite each other and client names cannot escape the upload directory.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};
use crate::config::UploadConfig;

/// Maximum length of the sanitized client file stem
const MAX_STEM_LEN: usize = 40;

/// Multipart framing headroom on top of the configured file size cap
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Response for successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Build the upload router
///
/// The request body limit follows the configured file size cap instead of
/// the framework default, so the handler's own size check stays the one
/// that rejects oversized files.
pub fn router(upload: &UploadConfig) -> Router<AppState> {
    let body_limit = upload.max_file_size as usize + MULTIPART_OVERHEAD;
    Router::new()
        .route("/image", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /api/v1/admin/uploads/image - Upload a single image
///
/// Accepts multipart/form-data with a file field named "image" (or "file").
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let config = &state.upload_config;

    ensure_upload_dir(&config.path).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "image" && name != "file" {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "image".to_string());

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                content_type, config.allowed_types
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::validation_error("Uploaded file is empty"));
        }

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} bytes",
                config.max_file_size
            )));
        }

        let filename = build_filename(&original_name, config.get_extension(&content_type));
        let file_path = config.path.join(&filename);

        fs::write(&file_path, &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        tracing::info!(filename = %filename, size = data.len(), "Image uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("{}/{}", config.public_prefix, filename),
                filename,
                size: data.len() as u64,
                content_type,
            }),
        ));
    }

    Err(ApiError::validation_error("No image field provided"))
}

/// Ensure the upload directory exists
async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create upload directory: {}", e)))
}

/// Build a collision-free stored file name.
///
/// Format: `<unix-millis>-<random8>-<sanitized-stem>.<ext>`
fn build_filename(original_name: &str, ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let tail = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}.{}",
        millis,
        &tail[..8],
        sanitize_stem(original_name),
        ext
    )
}

/// Reduce a client file name to a safe ASCII stem.
///
/// Everything after the last dot is dropped (the extension is re-derived
/// from the content type), remaining characters outside [a-z0-9_-] become
/// hyphens, and the result is length-capped.
fn sanitize_stem(original_name: &str) -> String {
    let stem = match original_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => original_name,
    };

    let mut result = String::new();
    let mut prev_hyphen = true;
    for c in stem.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
        if result.len() >= MAX_STEM_LEN {
            break;
        }
    }

    let result = result.trim_matches('-');
    if result.is_empty() {
        "image".to_string()
    } else {
        result.to_string()
    }
}
