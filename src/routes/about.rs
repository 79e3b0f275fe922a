//! About-page handlers. The about info is a single JSON file in the
//! resources directory; a missing file means "empty about page".

use axum::{extract::State, http::StatusCode, Json};

use crate::db::models::{About, AboutUpdate};
use crate::error::ApiError;
use crate::state::AppState;

async fn load_about(state: &AppState) -> Result<About, ApiError> {
    let path = state.config.about_file();

    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(About::default()),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&raw)
        .map_err(|e| ApiError::Internal(format!("corrupt about-info file: {e}")))
}

/// GET /api/v1/about
pub async fn get_about(State(state): State<AppState>) -> Result<Json<About>, ApiError> {
    Ok(Json(load_about(&state).await?))
}

/// PATCH /api/v1/admin/about
///
/// Merge-update: fields that are omitted or empty leave the stored values
/// unchanged.
pub async fn update_about(
    State(state): State<AppState>,
    Json(update): Json<AboutUpdate>,
) -> Result<StatusCode, ApiError> {
    let merged = load_about(&state).await?.merged(update);

    let raw = serde_json::to_vec(&merged)
        .map_err(|e| ApiError::Internal(format!("failed to encode about info: {e}")))?;
    tokio::fs::write(state.config.about_file(), raw).await?;

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
    async fn test_get_about_missing_file_returns_empty_defaults() {
        let app = test_app();
        let req = Request::get("/api/v1/about").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: About = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, About::default());
    }

    #[tokio::test]
    async fn test_update_about_requires_session() {
        let app = test_app();
        let req = Request::patch("/api/v1/admin/about")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
