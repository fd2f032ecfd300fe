//! Application-level error type returned by handlers.
//!
//! All variants serialise to the shared [`ErrorResponse`] JSON format and
//! map to the appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parlor_api::error::{codes, ErrorResponse};

use crate::blobs::BlobError;
use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    /// The caller targeted themselves with an action that requires another
    /// user (400, distinct code from plain bad input).
    SelfAction(String),
    BadRequest(String),
    NotFound(String),
    /// Rank rule violation: the target outranks or equals the caller (409).
    Conflict(String),
    /// Thank cooldown not yet elapsed (429).
    RateLimited(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, codes::FORBIDDEN, msg),
            AppError::SelfAction(msg) => {
                (StatusCode::BAD_REQUEST, codes::SELF_ACTION_NOT_ALLOWED, msg)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_PARAMETER, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, codes::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, codes::RANK_CONFLICT, msg),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, codes::RATE_LIMITED, msg),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, msg)
            }
        };
        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<BlobError> for AppError {
    fn from(e: BlobError) -> Self {
        AppError::Internal(e.to_string())
    }
}
