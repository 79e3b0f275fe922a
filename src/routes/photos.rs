//! Photography page handlers. A photo is an uploaded file plus one row
//! keyed by its filename.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::Photo;
use crate::error::ApiError;
use crate::routes::{checked_file_bytes, checked_filename};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotosResponse {
    pub photos: Vec<Photo>,
}

/// GET /api/v1/photos
pub async fn list_photos(State(state): State<AppState>) -> Result<Json<PhotosResponse>, ApiError> {
    let photos = state.db.get_photos().await?;
    Ok(Json(PhotosResponse { photos }))
}

/// POST /api/v1/admin/photos
///
/// Multipart upload of one `image` field. The client filename (sanitized)
/// becomes both the on-disk name and the database key.
pub async fn add_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart data: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| ApiError::BadRequest("image field has no file name".to_string()))?
            .to_string();
        checked_filename(&file_name)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file data: {e}")))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::BadRequest("missing image field".to_string()));
    };
    checked_file_bytes(&bytes)?;

    let out_path = state.config.image_dir.join(&file_name);
    tokio::fs::write(&out_path, &bytes).await?;

    state.db.add_photo(&file_name).await?;

    tracing::info!(file = %file_name, size = bytes.len(), "photo uploaded");
    Ok(StatusCode::OK)
}

/// DELETE /api/v1/admin/photos/{file_name}
///
/// Removes the row first, then the file. A file deletion failure after the
/// commit is reported to the client even though the row is already gone.
pub async fn remove_photo(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    checked_filename(&file_name)?;

    state.db.remove_photo(&file_name).await?;

    let path = state.config.image_dir.join(&file_name);
    tokio::fs::remove_file(&path).await?;

    tracing::info!(file = %file_name, "photo removed");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_app;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_add_photo_requires_session() {
        let app = test_app();
        let req = Request::post("/api/v1/admin/photos")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_remove_photo_requires_session() {
        let app = test_app();
        let req = Request::delete("/api/v1/admin/photos/some.jpg")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
