//! Session-token authentication extractors.
//!
//! Clients carry an opaque session token in the `token` request header.
//! Two extractors resolve it against the [`TokenStore`] cache:
//!
//! - [`RequireAuth`]: requires a live session; returns 401 if the header is
//!   absent or the token is unknown.
//! - [`OptionalAuth`]: accepts requests with or without a live session.
//!
//! Both hand the handler the cached [`PublicUser`] snapshot, so an
//! authenticated request costs no storage round-trip.
//!
//! [`TokenStore`]: crate::tokens::TokenStore

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use parlor_api::error::{codes, ErrorResponse};
use parlor_api::PublicUser;

use crate::handlers::AppState;

/// Request header carrying the session token.
pub const TOKEN_HEADER: &str = "token";

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

/// An authentication failure that maps to HTTP 401.
#[derive(Debug)]
pub struct AuthError(pub String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(codes::UNAUTHORIZED, self.0);
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Session resolution
// ---------------------------------------------------------------------------

/// Resolve the `token` header to a live session.
///
/// Returns `(token, snapshot)` on success, or a human-readable reason on
/// failure.
fn resolve_session(parts: &Parts, state: &AppState) -> Result<(String, PublicUser), String> {
    let token = parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "missing token header".to_string())?;

    let user = state
        .tokens
        .resolve(token)
        .ok_or_else(|| "unknown or expired token".to_string())?;

    Ok((token.to_string(), user))
}

// ---------------------------------------------------------------------------
// RequireAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that requires a live session token.
///
/// Returns 401 if the `token` header is absent or not a live session.
pub struct RequireAuth {
    /// Cached snapshot of the calling user.
    pub user: PublicUser,
    /// The presented token, kept so handlers can refresh this session's
    /// cache entry after a write.
    pub token: String,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move {
            let (token, user) = resolve_session(parts, &app_state).map_err(AuthError)?;
            Ok(RequireAuth { user, token })
        }
    }
}

// ---------------------------------------------------------------------------
// OptionalAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that accepts requests with or without a live session.
///
/// Yields `Some(user)` if a live token is present, `None` otherwise.
pub struct OptionalAuth(pub Option<PublicUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        async move {
            let result = resolve_session(parts, &app_state);
            Ok(OptionalAuth(result.ok().map(|(_, user)| user)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
