//! User-domain wire types — profiles, presence, thanks, and moderation.
//!
//! Field names are camelCase on the wire (`followerCount`, `isFollowing`,
//! `userId`…); struct fields stay snake_case behind `rename_all`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Moderation role, ordered by privilege: `Member < Mod < Admin`.
///
/// The derived [`Ord`] is the rank compare used by block/unblock — a caller
/// may only act on targets of strictly lower rank. Serializes as a lowercase
/// string (`"member"`, `"mod"`, `"admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Mod,
    Admin,
}

impl Role {
    /// `true` for moderator-or-above. Gates block/unblock and selects the
    /// short thank cooldown.
    pub fn is_mod(self) -> bool {
        self >= Role::Mod
    }

    /// Integer rank as stored in the `users.role` column.
    pub fn rank(self) -> i64 {
        match self {
            Role::Member => 0,
            Role::Mod => 1,
            Role::Admin => 2,
        }
    }

    /// Inverse of [`Role::rank`]. Ranks beyond the known range clamp to the
    /// nearest variant so an out-of-range row still orders sensibly.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            i64::MIN..=0 => Role::Member,
            1 => Role::Mod,
            _ => Role::Admin,
        }
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// A user's public profile as serialized to clients.
///
/// This is also the per-session snapshot the token cache holds: `GET
/// /api/v1/user` serves it straight from the cache, and profile/presence
/// writes push a fresh copy back in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Internal numeric id. Doubles as the avatar blob key (`"{id}.jpg"`)
    /// and as the path parameter of `GET /api/v1/user/{id}`.
    pub id: i64,

    /// External stable identifier — the value request bodies carry in
    /// `userId`.
    pub uuid: String,

    pub name: String,

    pub about: String,

    /// Avatar revision counter, bumped on every upload so clients can
    /// cache-bust the blob URL. `0` means no avatar was ever uploaded.
    pub avatar: i64,

    /// Reputation credit balance.
    pub credit: i64,

    pub role: Role,

    /// Free-form presence fields set by `POST /api/v1/change_room`.
    pub mode: String,
    pub room: String,

    /// Present while the user is blocked; cleared by unblock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_until: Option<NaiveDate>,
}

/// `GET /api/v1/user/{id}` response — the target's public profile merged
/// with follow counts and the viewer's relationship flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: PublicUser,

    pub follower_count: i64,
    pub following_count: i64,

    /// The viewer follows the profiled user.
    pub is_following: bool,

    /// The profiled user follows the viewer.
    pub is_follower: bool,
}

/// `POST /api/v1/user` response — the refreshed account view bound to the
/// presented credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountResponse {
    pub token: String,
    pub user: PublicUser,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `POST /api/v1/change_room` request body.
///
/// Partial-update semantics: an absent field leaves the stored value
/// untouched; a present field overwrites it, empty string included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeRoomRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// `POST /api/v1/thank_user` request body. `userId` is the target's uuid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThankRequest {
    pub user_id: String,
}

/// `POST /api/v1/thank_user` response — the caller's updated balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThankResponse {
    pub credit: i64,
}

/// Request body shared by `POST /api/v1/block_user` and
/// `POST /api/v1/unblock_user`. `userId` is the target's uuid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
