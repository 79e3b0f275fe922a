//! Authorization gate for admin-only routes, plus the cookie helpers shared
//! by the auth handlers. The gate does exactly one session lookup per
//! request and never caches validity across requests.

use axum::{
    extract::{Request, State},
    http::header::COOKIE,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::db::models::Session;
use crate::error::ApiError;
use crate::session::SessionStatus;
use crate::state::AppState;

/// Name of the session cookie handed to the browser.
pub const SESSION_COOKIE: &str = "session_token";

/// Pull the session token out of the Cookie header.
///
/// - No Cookie header, or no `session_token` pair: `Ok(None)`.
/// - Header present but not valid UTF-8: `Err(BadRequest)`.
pub fn session_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(raw) = headers.get(COOKIE) else {
        return Ok(None);
    };

    let raw = raw
        .to_str()
        .map_err(|_| ApiError::BadRequest("malformed cookie header".to_string()))?;

    for cookie in Cookie::split_parse(raw).flatten() {
        if cookie.name() == SESSION_COOKIE {
            return Ok(Some(cookie.value().to_string()));
        }
    }

    Ok(None)
}

/// Resolve the caller's session or reject the request. Expired sessions have
/// already been removed from storage by the time this returns.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = session_token(headers)?.ok_or(ApiError::Unauthorized)?;

    match state.sessions.validate(&token).await? {
        SessionStatus::Valid(session) => Ok(session),
        SessionStatus::Missing | SessionStatus::Expired => Err(ApiError::Unauthorized),
    }
}

/// Middleware guarding the admin router. On success the resolved session is
/// placed in request extensions for handlers that need the caller identity.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Build the session cookie for a login or refresh response.
pub fn session_cookie(token: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Build an expired session cookie that clears the browser's copy.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}
