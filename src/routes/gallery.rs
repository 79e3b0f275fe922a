//! Gallery/project handlers: the portfolio entries themselves, their
//! thumbnails, and their associated images.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::GalleryItem;
use crate::error::ApiError;
use crate::routes::{checked_file_bytes, checked_filename};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateGalleryRequest {
    pub title: String,
    pub caption: String,
    pub project_info: String,
    pub embed_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChangeThumbnailRequest {
    pub thumbnail: String,
}

/// GET /api/v1/gallery
pub async fn list_gallery_items(
    State(state): State<AppState>,
) -> Result<Json<GalleryResponse>, ApiError> {
    let items = state.db.get_gallery_items().await?;
    Ok(Json(GalleryResponse { items }))
}

/// GET /api/v1/gallery/{name}
pub async fn get_gallery_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<GalleryItem>, ApiError> {
    let item = state
        .db
        .get_gallery_item(&name)
        .await?
        .ok_or(ApiError::NotFound("gallery item"))?;
    Ok(Json(item))
}

/// POST /api/v1/admin/gallery
///
/// Multipart form: text fields `name`, `title`, `caption`, `project_info`,
/// optional `embed_url`, and a `thumbnail` file. The thumbnail is stored as
/// `<name>-thumb.<ext>` in the image directory.
pub async fn create_gallery_item(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let mut name = String::new();
    let mut title = String::new();
    let mut caption = String::new();
    let mut project_info = String::new();
    let mut embed_url = String::new();
    let mut thumbnail: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart data: {e}")))?
    {
        match field.name() {
            Some("name") => name = read_text(field).await?,
            Some("title") => title = read_text(field).await?,
            Some("caption") => caption = read_text(field).await?,
            Some("project_info") => project_info = read_text(field).await?,
            Some("embed_url") => embed_url = read_text(field).await?,
            Some("thumbnail") => {
                let original = field
                    .file_name()
                    .ok_or_else(|| {
                        ApiError::BadRequest("thumbnail field has no file name".to_string())
                    })?
                    .to_string();
                checked_filename(&original)?;
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read thumbnail: {e}"))
                })?;
                thumbnail = Some((original, bytes));
            }
            _ => {}
        }
    }

    if name.is_empty() {
        return Err(ApiError::BadRequest("missing name field".to_string()));
    }
    checked_filename(&name)?;

    let (original, bytes) =
        thumbnail.ok_or_else(|| ApiError::BadRequest("missing thumbnail field".to_string()))?;
    checked_file_bytes(&bytes)?;

    let ext = std::path::Path::new(&original)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let thumb_name = format!("{name}-thumb.{ext}");

    let out_path = state.config.image_dir.join(&thumb_name);
    tokio::fs::write(&out_path, &bytes).await?;

    let item = GalleryItem {
        id: name.clone(),
        title,
        caption,
        project_info,
        thumbnail: thumb_name,
        embed_url: (!embed_url.is_empty()).then_some(embed_url),
        images: Vec::new(),
    };

    state.db.add_gallery_item(&item).await?;

    tracing::info!(id = %name, "gallery item created");
    Ok(StatusCode::OK)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid form field: {e}")))
}

/// PUT /api/v1/admin/gallery/{id}
pub async fn update_gallery_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGalleryRequest>,
) -> Result<StatusCode, ApiError> {
    if payload.title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    state
        .db
        .update_gallery_item(
            &id,
            &payload.title,
            &payload.caption,
            &payload.project_info,
            payload.embed_url.as_deref().filter(|s| !s.is_empty()),
        )
        .await?;

    Ok(StatusCode::OK)
}

/// DELETE /api/v1/admin/gallery/{id}
///
/// The ON DELETE CASCADE on `project_images` removes the association rows
/// in the same transaction.
pub async fn remove_gallery_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.remove_gallery_item(&id).await?;
    tracing::info!(id = %id, "gallery item removed");
    Ok(StatusCode::OK)
}

/// PATCH /api/v1/admin/gallery/{id}/thumbnail
pub async fn change_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChangeThumbnailRequest>,
) -> Result<StatusCode, ApiError> {
    checked_filename(&payload.thumbnail)?;
    state.db.change_thumbnail(&id, &payload.thumbnail).await?;
    Ok(StatusCode::OK)
}

/// POST /api/v1/admin/gallery/{id}/images
///
/// Body: JSON array of already-uploaded image filenames to associate.
pub async fn add_project_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(files): Json<Vec<String>>,
) -> Result<StatusCode, ApiError> {
    if files.is_empty() {
        return Err(ApiError::BadRequest("no image files given".to_string()));
    }
    for file in &files {
        checked_filename(file)?;
    }

    state.db.add_project_images(&id, &files).await?;
    Ok(StatusCode::OK)
}

/// DELETE /api/v1/admin/gallery/{id}/images
///
/// Removes the association rows (one transaction), then the files. A file
/// deletion failure after the commit is reported as an error.
pub async fn remove_project_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(files): Json<Vec<String>>,
) -> Result<StatusCode, ApiError> {
    if files.is_empty() {
        return Err(ApiError::BadRequest("no image files given".to_string()));
    }
    for file in &files {
        checked_filename(file)?;
    }

    state.db.remove_project_images(&id, &files).await?;

    for file in &files {
        let path = state.config.image_dir.join(file);
        tokio::fs::remove_file(&path).await?;
    }

    Ok(StatusCode::OK)
}
