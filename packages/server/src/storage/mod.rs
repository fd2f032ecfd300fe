//! Storage abstraction layer for the parlor server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. All authorization and cooldown policy lives in the
//! handlers; storage is purely a data access layer. The one exception is
//! [`Storage::credit_transfer`], which re-checks the cooldown inside its own
//! transaction so two racing thanks cannot both pass the handler's check.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral deployments |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parlor_api::{PublicUser, Role};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// An item with the same key already exists (e.g. duplicate uuid).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A full user row as stored, including fields that never reach the wire
/// (`last_checkin`).
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Numeric primary key, assigned by storage on insert.
    pub id: i64,
    /// External stable identifier; unique.
    pub uuid: String,
    pub name: String,
    pub about: String,
    /// Avatar revision counter; `0` until the first upload.
    pub avatar: i64,
    pub credit: i64,
    pub role: Role,
    pub mode: String,
    pub room: String,
    /// Instant of the user's last successful thank (either side).
    pub last_checkin: DateTime<Utc>,
    pub block_until: Option<NaiveDate>,
}

impl UserRecord {
    /// The client-facing projection of this record.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            about: self.about.clone(),
            avatar: self.avatar,
            credit: self.credit,
            role: self.role,
            mode: self.mode.clone(),
            room: self.room.clone(),
            block_until: self.block_until,
        }
    }
}

/// Insert payload for [`Storage::create_user`]. Storage assigns the numeric
/// `id`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: String,
    pub name: String,
    pub about: String,
    pub role: Role,
    pub credit: i64,
    pub mode: String,
    pub room: String,
    pub last_checkin: DateTime<Utc>,
}

impl NewUser {
    /// A fresh member with empty profile fields and `last_checkin` at the
    /// epoch, so the first thank is never "too soon".
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            about: String::new(),
            role: Role::Member,
            credit: 0,
            mode: String::new(),
            room: String::new(),
            last_checkin: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Partial update for [`Storage::update_profile`]. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
    /// When `true`, increment the avatar revision by one.
    pub bump_avatar: bool,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for the parlor server.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Users ---------------------------------------------------------------

    /// Insert a user and return the stored record with its assigned `id`.
    /// Returns [`StorageError::Conflict`] if the uuid is already taken.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError>;

    /// Retrieve a user by numeric id. Returns `None` if not found.
    async fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>, StorageError>;

    /// Retrieve a user by uuid. Returns `None` if not found.
    async fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRecord>, StorageError>;

    /// Return the most recently created users, newest first (descending
    /// numeric id), at most `limit` of them.
    async fn latest_users(&self, limit: u32) -> Result<Vec<UserRecord>, StorageError>;

    /// Apply a partial profile update and return the updated record.
    /// Returns [`StorageError::NotFound`] if the uuid is unknown.
    async fn update_profile(
        &self,
        uuid: &str,
        update: &ProfileUpdate,
    ) -> Result<UserRecord, StorageError>;

    /// Overwrite presence fields. A `Some` value is written verbatim, empty
    /// string included; `None` leaves the stored value untouched. Returns the
    /// updated record.
    async fn update_presence(
        &self,
        uuid: &str,
        mode: Option<&str>,
        room: Option<&str>,
    ) -> Result<UserRecord, StorageError>;

    /// Set or clear the block expiry date and return the updated record.
    async fn set_block_until(
        &self,
        uuid: &str,
        until: Option<NaiveDate>,
    ) -> Result<UserRecord, StorageError>;

    // --- Thanks --------------------------------------------------------------

    /// Atomically move credit for a thank: add `target_delta` to the target,
    /// add `caller_delta` to the caller, and stamp the caller's
    /// `last_checkin` to `now`.
    ///
    /// The transfer only commits if the caller's stored `last_checkin` is
    /// still strictly before `cutoff`; otherwise nothing is written and
    /// `Ok(None)` is returned. This is the cooldown re-check that makes two
    /// concurrent thanks from the same caller resolve to exactly one
    /// transfer.
    ///
    /// On success returns `Ok(Some(credit))` with the caller's new balance.
    /// Returns [`StorageError::NotFound`] if either uuid is unknown.
    async fn credit_transfer(
        &self,
        caller_uuid: &str,
        target_uuid: &str,
        caller_delta: i64,
        target_delta: i64,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<i64>, StorageError>;

    // --- Follows -------------------------------------------------------------

    /// Record that `follower` follows `followee`, reactivating a previously
    /// deactivated edge if one exists. Idempotent.
    async fn put_follow(&self, follower: &str, followee: &str) -> Result<(), StorageError>;

    /// Deactivate a follow edge. The edge is kept with `active = false`
    /// rather than deleted; a later re-follow reactivates it. Idempotent.
    async fn deactivate_follow(&self, follower: &str, followee: &str)
        -> Result<(), StorageError>;

    /// Number of active edges pointing at `uuid`.
    async fn follower_count(&self, uuid: &str) -> Result<i64, StorageError>;

    /// Number of active edges leaving `uuid`.
    async fn following_count(&self, uuid: &str) -> Result<i64, StorageError>;

    /// Active-edge relationship between two users: returns
    /// `(viewer_follows_target, target_follows_viewer)`.
    async fn follows_between(
        &self,
        viewer: &str,
        target: &str,
    ) -> Result<(bool, bool), StorageError>;
}
