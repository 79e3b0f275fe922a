//! Admin user management. This cluster checks sessions inside the handlers
//! rather than behind the middleware gate: user creation has the bootstrap
//! exception, and deletion needs the caller's resolved identity for the
//! self-delete guard.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::authenticate;
use crate::db::models::User;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct AddUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsersResponse>, ApiError> {
    authenticate(&state, &headers).await?;

    let users = state.db.get_users().await?;
    Ok(Json(UsersResponse { users }))
}

/// POST /api/v1/admin/users
///
/// Bootstrap case: while the user table is empty there is no way to hold a
/// session, so the first user may be created without one. Once any user
/// exists, a valid session is required and usernames must be unique.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddUserRequest>,
) -> Result<StatusCode, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    if state.db.count_users().await? > 0 {
        authenticate(&state, &headers).await?;

        if state.db.get_user_by_name(&payload.username).await?.is_some() {
            return Err(ApiError::BadRequest("username already exists".to_string()));
        }
    }

    let password = payload.password;
    let password_hash =
        tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))?;

    state
        .db
        .add_user(&payload.username, &password_hash, false)
        .await?;

    tracing::info!(username = %payload.username, "user created");
    Ok(StatusCode::CREATED)
}

/// Pure guard for user deletion: the caller may not remove their own
/// account, and protected accounts may not be removed by anyone.
/// `target_protected` is `None` before the target row has been looked up.
fn check_removal(
    caller_user_id: i64,
    target_id: i64,
    target_protected: Option<bool>,
) -> Result<(), ApiError> {
    if caller_user_id == target_id {
        return Err(ApiError::BadRequest("can't delete yourself".to_string()));
    }
    if target_protected == Some(true) {
        return Err(ApiError::BadRequest(
            "protected users cannot be removed".to_string(),
        ));
    }
    Ok(())
}

/// DELETE /api/v1/admin/users/{id}
///
/// Rejects deleting the caller's own account and protected users. The
/// target's sessions are removed by the cascade on the users table.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = authenticate(&state, &headers).await?;

    // Self-delete is rejected before the target lookup.
    check_removal(session.user_id, id, None)?;

    // fetch_one: a nonexistent target surfaces as a database error.
    let target = state.db.get_user(id).await?;
    check_removal(session.user_id, id, Some(target.protected))?;

    state.db.remove_user(id).await?;

    tracing::info!(username = %target.username, deleted_by = %session.username, "user removed");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{request_builder, test_app};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_users_requires_session() {
        let app = test_app();
        let req = Request::get("/api/v1/admin/users")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_user_empty_fields_rejected_before_auth() {
        let app = test_app();
        let req = request_builder("POST", "/api/v1/admin/users")
            .body(Body::from(
                serde_json::to_vec(&AddUserRequest {
                    username: String::new(),
                    password: String::new(),
                })
                .unwrap(),
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_user_requires_session() {
        let app = test_app();
        let req = Request::delete("/api/v1/admin/users/3")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_check_removal_rejects_self_delete() {
        assert!(matches!(
            check_removal(7, 7, None),
            Err(ApiError::BadRequest(_))
        ));
        // Self-delete loses even against a fetched unprotected row.
        assert!(matches!(
            check_removal(7, 7, Some(false)),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_check_removal_rejects_protected_target() {
        assert!(matches!(
            check_removal(1, 2, Some(true)),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_check_removal_allows_other_unprotected_target() {
        assert!(check_removal(1, 2, None).is_ok());
        assert!(check_removal(1, 2, Some(false)).is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_non_numeric_id_is_bad_request() {
        let app = test_app();
        let req = Request::delete("/api/v1/admin/users/not-a-number")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
