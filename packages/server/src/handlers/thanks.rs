//! Thank handler: `POST /api/v1/thank_user`.
//!
//! One user grants reputation credit to another: +3 to the target, +1 to the
//! caller, rate-limited per caller by a role-dependent cooldown. The transfer
//! itself is a single atomic storage transaction with an in-transaction
//! cooldown re-check, so concurrent thanks from the same caller cannot
//! double-spend the window.

use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use parlor_api::{ThankRequest, ThankResponse};

use crate::error::AppError;
use crate::middleware::auth::RequireAuth;

use super::AppState;

/// Cooldown between thanks for regular members.
const THANK_WAIT_SECS: i64 = 60 * 60;
/// Cooldown between thanks for moderators and above.
const THANK_WAIT_SECS_MOD: i64 = 60 * 5;

/// True while `now` is still inside the cooldown window opened at
/// `last_checkin`. The boundary instant counts as inside.
fn within_cooldown(last_checkin: DateTime<Utc>, now: DateTime<Utc>, wait_secs: i64) -> bool {
    now - last_checkin <= Duration::seconds(wait_secs)
}

/// `POST /api/v1/thank_user` — thank another user.
///
/// Body: `{"userId": "<uuid>"}`. Responds with the caller's new balance as
/// `{"credit": n}`.
///
/// Fails with `400` when the target is the caller, `404` when the target
/// does not exist, and `429` while the caller's cooldown has not elapsed.
/// The boundary counts as inside the window: elapsed time must strictly
/// exceed the cooldown.
pub async fn thank_user(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<ThankRequest>,
) -> Result<Json<ThankResponse>, AppError> {
    if req.user_id == auth.user.uuid {
        return Err(AppError::SelfAction("not for yourself".into()));
    }

    // The cached snapshot may be stale; cooldown decisions use the stored row.
    let caller = state
        .storage
        .user_by_uuid(&auth.user.uuid)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".into()))?;

    let wait_secs = if caller.role.is_mod() {
        THANK_WAIT_SECS_MOD
    } else {
        THANK_WAIT_SECS
    };
    let now = Utc::now();
    if within_cooldown(caller.last_checkin, now, wait_secs) {
        return Err(AppError::RateLimited("Too soon".into()));
    }

    let target = state
        .storage
        .user_by_uuid(&req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", req.user_id)))?;

    let cutoff = now - Duration::seconds(wait_secs);
    let credit = state
        .storage
        .credit_transfer(&caller.uuid, &target.uuid, 1, 3, now, cutoff)
        .await?
        .ok_or_else(|| AppError::RateLimited("Too soon".into()))?;

    // Both parties' balances changed; push fresh snapshots into every live
    // session of each.
    if let Some(fresh) = state.storage.user_by_uuid(&caller.uuid).await? {
        state.tokens.refresh_for_user(&fresh.public());
    }
    if let Some(fresh) = state.storage.user_by_uuid(&target.uuid).await? {
        state.tokens.refresh_for_user(&fresh.public());
    }

    Ok(Json(ThankResponse { credit }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
