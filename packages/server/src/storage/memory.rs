//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral
//! deployments.
//!
//! Users are stored in a [`BTreeMap`] keyed by numeric id, so "newest users
//! first" is a reverse scan of the map — no secondary index needed. A
//! uuid → id map covers the external-identifier lookups.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{NewUser, ProfileUpdate, Storage, StorageError, UserRecord};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Inner {
    users: BTreeMap<i64, UserRecord>,
    uuid_index: HashMap<String, i64>,
    /// Follow edges keyed `(follower, followee)`; the value is the active
    /// flag. Deactivated edges stay in the map.
    follows: HashMap<(String, String), bool>,
    next_id: i64,
}

impl Inner {
    fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            uuid_index: HashMap::new(),
            follows: HashMap::new(),
            next_id: 1,
        }
    }

    fn id_of(&self, uuid: &str) -> Result<i64, StorageError> {
        self.uuid_index
            .get(uuid)
            .copied()
            .ok_or(StorageError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Users ---------------------------------------------------------------

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if inner.uuid_index.contains_key(&user.uuid) {
            return Err(StorageError::Conflict(format!(
                "uuid {} already exists",
                user.uuid
            )));
        }
        let id = inner.next_id;
        inner.next_id += 1;

        let record = UserRecord {
            id,
            uuid: user.uuid.clone(),
            name: user.name.clone(),
            about: user.about.clone(),
            avatar: 0,
            credit: user.credit,
            role: user.role,
            mode: user.mode.clone(),
            room: user.room.clone(),
            last_checkin: user.last_checkin,
            block_until: None,
        };
        inner.uuid_index.insert(record.uuid.clone(), id);
        inner.users.insert(id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(&id).cloned())
    }

    async fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRecord>, StorageError> {
        let inner = self.inner.read().unwrap();
        let Some(id) = inner.uuid_index.get(uuid) else {
            return Ok(None);
        };
        Ok(inner.users.get(id).cloned())
    }

    async fn latest_users(&self, limit: u32) -> Result<Vec<UserRecord>, StorageError> {
        let inner = self.inner.read().unwrap();
        // BTreeMap iterates by ascending id; reverse for newest-first.
        Ok(inner
            .users
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update_profile(
        &self,
        uuid: &str,
        update: &ProfileUpdate,
    ) -> Result<UserRecord, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.id_of(uuid)?;
        let user = inner.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(about) = &update.about {
            user.about = about.clone();
        }
        if update.bump_avatar {
            user.avatar += 1;
        }
        Ok(user.clone())
    }

    async fn update_presence(
        &self,
        uuid: &str,
        mode: Option<&str>,
        room: Option<&str>,
    ) -> Result<UserRecord, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.id_of(uuid)?;
        let user = inner.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        if let Some(mode) = mode {
            user.mode = mode.to_string();
        }
        if let Some(room) = room {
            user.room = room.to_string();
        }
        Ok(user.clone())
    }

    async fn set_block_until(
        &self,
        uuid: &str,
        until: Option<NaiveDate>,
    ) -> Result<UserRecord, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.id_of(uuid)?;
        let user = inner.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        user.block_until = until;
        Ok(user.clone())
    }

    // --- Thanks --------------------------------------------------------------

    async fn credit_transfer(
        &self,
        caller_uuid: &str,
        target_uuid: &str,
        caller_delta: i64,
        target_delta: i64,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<i64>, StorageError> {
        // One write lock covers check and update, so concurrent thanks from
        // the same caller serialize here.
        let mut inner = self.inner.write().unwrap();
        let caller_id = inner.id_of(caller_uuid)?;
        let target_id = inner.id_of(target_uuid)?;

        let caller = inner.users.get(&caller_id).ok_or(StorageError::NotFound)?;
        if caller.last_checkin >= cutoff {
            return Ok(None);
        }

        let target = inner
            .users
            .get_mut(&target_id)
            .ok_or(StorageError::NotFound)?;
        target.credit += target_delta;

        let caller = inner
            .users
            .get_mut(&caller_id)
            .ok_or(StorageError::NotFound)?;
        caller.credit += caller_delta;
        caller.last_checkin = now;
        Ok(Some(caller.credit))
    }

    // --- Follows -------------------------------------------------------------

    async fn put_follow(&self, follower: &str, followee: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .follows
            .insert((follower.to_string(), followee.to_string()), true);
        Ok(())
    }

    async fn deactivate_follow(
        &self,
        follower: &str,
        followee: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(active) = inner
            .follows
            .get_mut(&(follower.to_string(), followee.to_string()))
        {
            *active = false;
        }
        Ok(())
    }

    async fn follower_count(&self, uuid: &str) -> Result<i64, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .follows
            .iter()
            .filter(|((_, followee), active)| followee == uuid && **active)
            .count() as i64)
    }

    async fn following_count(&self, uuid: &str) -> Result<i64, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .follows
            .iter()
            .filter(|((follower, _), active)| follower == uuid && **active)
            .count() as i64)
    }

    async fn follows_between(
        &self,
        viewer: &str,
        target: &str,
    ) -> Result<(bool, bool), StorageError> {
        let inner = self.inner.read().unwrap();
        let forward = inner
            .follows
            .get(&(viewer.to_string(), target.to_string()))
            .copied()
            .unwrap_or(false);
        let backward = inner
            .follows
            .get(&(target.to_string(), viewer.to_string()))
            .copied()
            .unwrap_or(false);
        Ok((forward, backward))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
