//! Generic admin upload endpoint. Files are routed by content type: images
//! land in the image directory, everything else in the resources directory.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::{checked_file_bytes, checked_filename};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub size: usize,
}

/// POST /api/v1/admin/upload
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload: Option<(String, bool, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| ApiError::BadRequest("file field has no file name".to_string()))?
            .to_string();
        checked_filename(&file_name)?;

        let is_image = field
            .content_type()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file data: {e}")))?;
        upload = Some((file_name, is_image, bytes));
        break;
    }

    let Some((file_name, is_image, bytes)) = upload else {
        return Err(ApiError::BadRequest("missing file field".to_string()));
    };
    checked_file_bytes(&bytes)?;

    let dir = if is_image {
        &state.config.image_dir
    } else {
        &state.config.resources_dir
    };
    tokio::fs::write(dir.join(&file_name), &bytes).await?;

    tracing::info!(file = %file_name, size = bytes.len(), image = is_image, "file uploaded");

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            file_name,
            size: bytes.len(),
        }),
    ))
}
