//! Session token cache.
//!
//! Tokens are opaque strings handed out by [`TokenStore::issue`] and carried
//! by clients in the `token` request header. Each live session maps to a
//! cached [`PublicUser`] snapshot: `GET /api/v1/user` answers straight from
//! the cache without touching storage, so every write that changes a user
//! must push a fresh snapshot back in. Profile and presence updates refresh
//! the presented session only ([`TokenStore::refresh`]); a thank refreshes
//! every session of both parties ([`TokenStore::refresh_for_user`]); a block
//! drops the target's sessions entirely ([`TokenStore::revoke_all_for_user`]).
//!
//! A uuid → tokens index keeps the per-user operations from scanning the
//! whole session table. The cache is process-local and lost on restart, like
//! the in-memory storage backend.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use parlor_api::PublicUser;
use uuid::Uuid;

struct Inner {
    /// token → cached snapshot.
    sessions: HashMap<String, PublicUser>,
    /// user uuid → tokens of that user's live sessions.
    by_user: HashMap<String, HashSet<String>>,
}

/// Thread-safe map of session token to cached user snapshot.
pub struct TokenStore {
    inner: RwLock<Inner>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                sessions: HashMap::new(),
                by_user: HashMap::new(),
            }),
        }
    }

    /// Mint a new session token bound to `user`.
    pub fn issue(&self, user: &PublicUser) -> String {
        let token = Uuid::now_v7().to_string();
        let mut inner = self.inner.write().unwrap();
        inner
            .by_user
            .entry(user.uuid.clone())
            .or_default()
            .insert(token.clone());
        inner.sessions.insert(token.clone(), user.clone());
        token
    }

    /// Look up the snapshot for a presented token. `None` means the token is
    /// unknown, revoked, or from a previous process lifetime.
    pub fn resolve(&self, token: &str) -> Option<PublicUser> {
        self.inner.read().unwrap().sessions.get(token).cloned()
    }

    /// Replace the snapshot of one session. No-op for unknown tokens; a
    /// refresh never creates a session.
    pub fn refresh(&self, token: &str, user: PublicUser) {
        let mut inner = self.inner.write().unwrap();
        if let Some(snapshot) = inner.sessions.get_mut(token) {
            *snapshot = user;
        }
    }

    /// Replace the snapshot of every session belonging to `user`, matched
    /// by uuid.
    pub fn refresh_for_user(&self, user: &PublicUser) {
        let mut inner = self.inner.write().unwrap();
        let Some(tokens) = inner.by_user.get(&user.uuid).cloned() else {
            return;
        };
        for token in tokens {
            if let Some(snapshot) = inner.sessions.get_mut(&token) {
                *snapshot = user.clone();
            }
        }
    }

    /// Drop every session belonging to `uuid`. Returns how many sessions
    /// were revoked.
    pub fn revoke_all_for_user(&self, uuid: &str) -> usize {
        let mut inner = self.inner.write().unwrap();
        let Some(tokens) = inner.by_user.remove(uuid) else {
            return 0;
        };
        let mut revoked = 0;
        for token in tokens {
            if inner.sessions.remove(&token).is_some() {
                revoked += 1;
            }
        }
        revoked
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
