//! User lookup handlers.
//!
//! - `GET /api/v1/user/{id}`     — a user's profile with follow context.
//! - `GET /api/v1/latest_users`  — the newest accounts, newest first.

use axum::{
    extract::{Path, State},
    Json,
};
use parlor_api::{PublicUser, UserProfile};

use crate::error::AppError;
use crate::middleware::auth::{OptionalAuth, RequireAuth};

use super::AppState;

/// `GET /api/v1/user/{id}` — look up a user by numeric id.
///
/// The response merges the target's public fields with follow counts and the
/// two relationship flags relative to the caller: `isFollowing` (caller
/// follows the target) and `isFollower` (the target follows the caller).
/// Returns `404` for an unknown id.
pub async fn profile(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, AppError> {
    let target = state
        .storage
        .user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

    let follower_count = state.storage.follower_count(&target.uuid).await?;
    let following_count = state.storage.following_count(&target.uuid).await?;
    let (is_following, is_follower) = state
        .storage
        .follows_between(&auth.user.uuid, &target.uuid)
        .await?;

    Ok(Json(UserProfile {
        user: target.public(),
        follower_count,
        following_count,
        is_following,
        is_follower,
    }))
}

/// `GET /api/v1/latest_users` — the ten newest accounts, newest first.
///
/// Authentication is optional; the listing is the same either way.
pub async fn latest(
    State(state): State<AppState>,
    _auth: OptionalAuth,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let records = state.storage.latest_users(10).await?;
    Ok(Json(records.iter().map(|r| r.public()).collect()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
