//! Moderation handlers: `POST /api/v1/block_user`, `POST /api/v1/unblock_user`.
//!
//! Both take `{"userId": "<uuid>"}`, require a moderator-or-above caller, and
//! enforce the rank rule: a target of equal or higher rank cannot be acted on.

use axum::{extract::State, Json};
use chrono::{Days, Utc};
use parlor_api::{ModerationRequest, PublicUser};

use crate::error::AppError;
use crate::middleware::auth::RequireAuth;
use crate::storage::UserRecord;

use super::AppState;

/// Days a block lasts, counted from today.
const BLOCK_DAYS: u64 = 3;

/// Shared gate for both moderation actions: caller must be moderator-or-above
/// and must outrank the target.
async fn authorize_target(
    state: &AppState,
    caller: &PublicUser,
    target_uuid: &str,
) -> Result<UserRecord, AppError> {
    if !caller.role.is_mod() {
        return Err(AppError::Forbidden("No permission".into()));
    }
    let target = state
        .storage
        .user_by_uuid(target_uuid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {target_uuid} not found")))?;
    if target.role >= caller.role {
        return Err(AppError::Conflict(
            "Target user has higher permission".into(),
        ));
    }
    Ok(target)
}

/// `POST /api/v1/block_user` — block a user for three days.
///
/// Sets the target's block expiry to today plus three days and revokes every
/// live session of the target, forcing a re-login that will surface the
/// block. Returns the JSON string `"Block until YYYY-MM-DD"`.
pub async fn block_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<ModerationRequest>,
) -> Result<Json<String>, AppError> {
    let target = authorize_target(&state, &auth.user, &req.user_id).await?;

    let until = Utc::now().date_naive() + Days::new(BLOCK_DAYS);
    state
        .storage
        .set_block_until(&target.uuid, Some(until))
        .await?;

    let revoked = state.tokens.revoke_all_for_user(&target.uuid);
    tracing::info!(
        "blocked user {} until {until}, revoked {revoked} session(s)",
        target.uuid
    );

    Ok(Json(format!("Block until {until}")))
}

/// `POST /api/v1/unblock_user` — clear a user's block.
///
/// Clears the block expiry and returns `"unblocked"`. Sessions revoked by an
/// earlier block are not re-issued.
pub async fn unblock_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<ModerationRequest>,
) -> Result<Json<String>, AppError> {
    let target = authorize_target(&state, &auth.user, &req.user_id).await?;
    state.storage.set_block_until(&target.uuid, None).await?;
    Ok(Json("unblocked".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
