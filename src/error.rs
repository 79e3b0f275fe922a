//! Error type shared by all request handlers. Every variant maps to one
//! HTTP status and a JSON body of the shape `{"code": <int>, "message": ...}`.
//! Database and filesystem errors are logged with their full detail but only
//! a generic message is returned to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal database error")]
    Database(#[from] sqlx::Error),

    #[error("file storage error")]
    Io(#[from] std::io::Error),

    #[error("internal error")]
    Internal(String),
}

/// Wire shape for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {}", e),
            ApiError::Io(e) => tracing::error!("filesystem error: {}", e),
            ApiError::Internal(msg) => tracing::error!("internal error: {}", msg),
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
