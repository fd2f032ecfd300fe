//! Self-account handlers.
//!
//! - `GET  /api/v1/user`        — the caller's cached session snapshot.
//! - `POST /api/v1/user`        — profile self-update (multipart), returns `{token, user}`.
//! - `POST /api/v1/change_room` — presence update, returns `"ok"`.
//!
//! The GET answers from the token cache alone; the two writes persist first
//! and then push the refreshed snapshot back into the presented session.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use parlor_api::{AccountResponse, ChangeRoomRequest, PublicUser};

use crate::error::AppError;
use crate::middleware::auth::RequireAuth;
use crate::storage::ProfileUpdate;

use super::AppState;

/// `GET /api/v1/user` — return the caller's session snapshot.
///
/// Served straight from the token cache; no database read. The snapshot can
/// lag behind writes made through another session of the same account.
pub async fn current(auth: RequireAuth) -> Json<PublicUser> {
    Json(auth.user)
}

/// `POST /api/v1/user` — update the caller's profile.
///
/// Multipart form fields:
///
/// | Field | Meaning |
/// |-------|---------|
/// | `name` | New display name; absent counts as empty |
/// | `about` | New bio text; absent counts as empty |
/// | `avatar` | Optional image file; bumps the avatar revision |
///
/// `name` and `about` always overwrite the stored values — there are no
/// partial-update semantics here. A present but empty `avatar` file is
/// ignored. The avatar bytes are uploaded under `"{id}.jpg"` before the row
/// update commits, so a stored revision never points at a missing blob.
///
/// Returns the refreshed account view `{token, user}` bound to the presented
/// credential.
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<AccountResponse>, AppError> {
    let mut name: Option<String> = None;
    let mut about: Option<String> = None;
    let mut avatar: Option<(Bytes, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        match field_name.as_str() {
            "name" => {
                name = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("could not read name field: {e}"))
                })?);
            }
            "about" => {
                about = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("could not read about field: {e}"))
                })?);
            }
            "avatar" => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("could not read avatar upload: {e}"))
                })?;
                if !data.is_empty() {
                    avatar = Some((data, content_type));
                }
            }
            _ => {}
        }
    }

    if let Some((data, content_type)) = &avatar {
        let key = format!("{}.jpg", auth.user.id);
        if let Err(e) = state.blobs.put(&key, data.clone(), content_type).await {
            tracing::warn!("avatar upload failed for {key}: {e}");
            return Err(e.into());
        }
    }

    let update = ProfileUpdate {
        name: Some(name.unwrap_or_default()),
        about: Some(about.unwrap_or_default()),
        bump_avatar: avatar.is_some(),
    };
    let updated = state.storage.update_profile(&auth.user.uuid, &update).await?;

    let user = updated.public();
    state.tokens.refresh(&auth.token, user.clone());

    Ok(Json(AccountResponse {
        token: auth.token,
        user,
    }))
}

/// `POST /api/v1/change_room` — update the caller's presence fields.
///
/// Each of `mode` and `room` updates only when present in the body; a
/// present empty string clears the field. Returns plain-text `"ok"`.
pub async fn change_room(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<ChangeRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state
        .storage
        .update_presence(&auth.user.uuid, req.mode.as_deref(), req.room.as_deref())
        .await?;
    state.tokens.refresh(&auth.token, updated.public());
    Ok("ok")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
