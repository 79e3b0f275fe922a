//! Login, logout, session check and session refresh.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{authenticate, clear_session_cookie, session_cookie, session_token};
use crate::error::ApiError;
use crate::session::{SessionManager, SessionStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub extended: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckSessionResponse {
    pub valid: bool,
}

/// GET /api/v1/check
///
/// Reports whether the caller's cookie maps to a live session. Always 200;
/// a missing, unknown, malformed, or expired token is just `valid: false`.
/// Expired rows are cleaned up as a side effect of validation.
pub async fn check_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CheckSessionResponse>, ApiError> {
    let Ok(Some(token)) = session_token(&headers) else {
        return Ok(Json(CheckSessionResponse { valid: false }));
    };

    let status = state.sessions.validate(&token).await?;
    Ok(Json(CheckSessionResponse {
        valid: status.is_valid(),
    }))
}

/// POST /api/v1/login
///
/// Exchange credentials for a session cookie. A successful login replaces
/// any session the user already had.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let Some(user) = state.db.get_user_by_name(&payload.username).await? else {
        tracing::warn!(username = %payload.username, "login attempt for unknown user");
        return Err(ApiError::Unauthorized);
    };

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password;
    let hash = user.password_hash.clone();
    let password_ok =
        tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
            .await
            .map_err(|e| ApiError::Internal(format!("hash verification task failed: {e}")))?;

    if !password_ok {
        tracing::warn!(username = %user.username, "failed login attempt");
        return Err(ApiError::Unauthorized);
    }

    state.db.update_login_time(user.id).await?;

    let session = state
        .sessions
        .create(user.id, &user.username, payload.extended)
        .await?;

    tracing::info!(username = %user.username, extended = payload.extended, "successful login");

    let cookie = session_cookie(
        &session.token,
        SessionManager::lifetime_secs(payload.extended),
    );
    Ok((jar.add(cookie), StatusCode::OK))
}

/// POST /api/v1/logout
///
/// Invalidate the caller's session and clear the cookie. Requires a live
/// session; anything else is 401.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let session = authenticate(&state, &headers).await?;
    state.sessions.invalidate(&session.token).await?;

    tracing::info!(username = %session.username, "logged out");
    Ok((jar.add(clear_session_cookie()), StatusCode::OK))
}

/// POST /api/v1/refresh
///
/// Extend a still-valid session and re-issue the cookie with the remaining
/// lifetime.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let token = session_token(&headers)?.ok_or(ApiError::Unauthorized)?;

    let session = match state.sessions.refresh(&token).await? {
        SessionStatus::Valid(session) => session,
        SessionStatus::Missing | SessionStatus::Expired => return Err(ApiError::Unauthorized),
    };

    let remaining = (session.expires_at() - Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(&session.token, remaining);
    Ok((jar.add(cookie), StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{request_builder, test_app};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_check_without_cookie_is_200_not_valid() {
        let app = test_app();
        let req = Request::get("/api/v1/check").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: CheckSessionResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.valid);
    }

    #[tokio::test]
    async fn test_login_empty_username_is_bad_request() {
        let app = test_app();
        let req = request_builder("POST", "/api/v1/login")
            .body(Body::from(
                serde_json::to_vec(&LoginRequest {
                    username: String::new(),
                    password: "hunter2".to_string(),
                    extended: false,
                })
                .unwrap(),
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_malformed_json_is_client_error() {
        let app = test_app();
        let req = request_builder("POST", "/api/v1/login")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert!(res.status().is_client_error());
    }

    #[tokio::test]
    async fn test_logout_without_cookie_is_unauthorized() {
        let app = test_app();
        let req = Request::post("/api/v1/logout")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_without_cookie_is_unauthorized() {
        let app = test_app();
        let req = Request::post("/api/v1/refresh")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_malformed_cookie_header_is_bad_request() {
        let app = test_app();
        let req = Request::post("/api/v1/refresh")
            .header(axum::http::header::COOKIE, &b"\xff\xfe"[..])
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
