//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `users` — one row per account; `role` is stored as an integer rank.
//! - `follows` — (follower, followee) edges with an `active` flag.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings, so lexicographic
//! comparison in SQL matches chronological order. The cooldown re-check in
//! [`credit_transfer`](Storage::credit_transfer) relies on this.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parlor_api::Role;
use rusqlite::{params, Connection};

use super::{NewUser, ProfileUpdate, Storage, StorageError, UserRecord};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid         TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    about        TEXT NOT NULL DEFAULT '',
    avatar       INTEGER NOT NULL DEFAULT 0,
    credit       INTEGER NOT NULL DEFAULT 0,
    role         INTEGER NOT NULL DEFAULT 0,
    mode         TEXT NOT NULL DEFAULT '',
    room         TEXT NOT NULL DEFAULT '',
    last_checkin TEXT NOT NULL,
    block_until  TEXT
);

CREATE TABLE IF NOT EXISTS follows (
    follower   TEXT NOT NULL,
    followee   TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    PRIMARY KEY (follower, followee)
);
CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// ---------------------------------------------------------------------------
// Error conversions and row mapping
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Fixed-width RFC 3339 UTC encoding (always six fractional digits, always
/// `Z`), so string order equals time order.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    s.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })
}

const USER_COLUMNS: &str =
    "id, uuid, name, about, avatar, credit, role, mode, room, last_checkin, block_until";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    let last_checkin: String = row.get(9)?;
    let block_until: Option<String> = row.get(10)?;
    Ok(UserRecord {
        id: row.get(0)?,
        uuid: row.get(1)?,
        name: row.get(2)?,
        about: row.get(3)?,
        avatar: row.get(4)?,
        credit: row.get(5)?,
        role: Role::from_rank(row.get(6)?),
        mode: row.get(7)?,
        room: row.get(8)?,
        last_checkin: parse_ts(&last_checkin)?,
        block_until: block_until.as_deref().map(parse_date).transpose()?,
    })
}

fn fetch_user_by_uuid(conn: &Connection, uuid: &str) -> Result<Option<UserRecord>, StorageError> {
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = ?1"),
        params![uuid],
        user_from_row,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(map_err(e)),
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Users ---------------------------------------------------------------

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError> {
        let conn = Arc::clone(&self.conn);
        let user = user.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM users WHERE uuid = ?1",
                    params![user.uuid],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            if exists > 0 {
                return Err(StorageError::Conflict(format!(
                    "uuid {} already exists",
                    user.uuid
                )));
            }

            conn.execute(
                "INSERT INTO users (uuid, name, about, avatar, credit, role, mode, room, last_checkin)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.uuid,
                    user.name,
                    user.about,
                    user.credit,
                    user.role.rank(),
                    user.mode,
                    user.room,
                    encode_ts(user.last_checkin),
                ],
            )
            .map_err(map_err)?;

            Ok(UserRecord {
                id: conn.last_insert_rowid(),
                uuid: user.uuid,
                name: user.name,
                about: user.about,
                avatar: 0,
                credit: user.credit,
                role: user.role,
                mode: user.mode,
                room: user.room,
                last_checkin: user.last_checkin,
                block_until: None,
            })
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<UserRecord>, StorageError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(map_err(e)),
            }
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRecord>, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            fetch_user_by_uuid(&conn, &uuid)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn latest_users(&self, limit: u32) -> Result<Vec<UserRecord>, StorageError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC LIMIT ?1"
                ))
                .map_err(map_err)?;
            let users = stmt
                .query_map(params![limit as i64], user_from_row)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(users)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn update_profile(
        &self,
        uuid: &str,
        update: &ProfileUpdate,
    ) -> Result<UserRecord, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();
        let update = update.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut sets: Vec<&str> = Vec::new();
            let mut binds: Vec<String> = Vec::new();
            if let Some(name) = &update.name {
                sets.push("name = ?");
                binds.push(name.clone());
            }
            if let Some(about) = &update.about {
                sets.push("about = ?");
                binds.push(about.clone());
            }
            if update.bump_avatar {
                sets.push("avatar = avatar + 1");
            }

            if !sets.is_empty() {
                let sql = format!("UPDATE users SET {} WHERE uuid = ?", sets.join(", "));
                binds.push(uuid.clone());
                conn.execute(&sql, rusqlite::params_from_iter(binds.iter()))
                    .map_err(map_err)?;
            }

            fetch_user_by_uuid(&conn, &uuid)?.ok_or(StorageError::NotFound)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn update_presence(
        &self,
        uuid: &str,
        mode: Option<&str>,
        room: Option<&str>,
    ) -> Result<UserRecord, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();
        let mode = mode.map(str::to_string);
        let room = room.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut sets: Vec<&str> = Vec::new();
            let mut binds: Vec<String> = Vec::new();
            if let Some(mode) = mode {
                sets.push("mode = ?");
                binds.push(mode);
            }
            if let Some(room) = room {
                sets.push("room = ?");
                binds.push(room);
            }

            if !sets.is_empty() {
                let sql = format!("UPDATE users SET {} WHERE uuid = ?", sets.join(", "));
                binds.push(uuid.clone());
                conn.execute(&sql, rusqlite::params_from_iter(binds.iter()))
                    .map_err(map_err)?;
            }

            fetch_user_by_uuid(&conn, &uuid)?.ok_or(StorageError::NotFound)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn set_block_until(
        &self,
        uuid: &str,
        until: Option<NaiveDate>,
    ) -> Result<UserRecord, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "UPDATE users SET block_until = ?1 WHERE uuid = ?2",
                params![until.map(|d| d.to_string()), uuid],
            )
            .map_err(map_err)?;
            fetch_user_by_uuid(&conn, &uuid)?.ok_or(StorageError::NotFound)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
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
        let conn = Arc::clone(&self.conn);
        let caller_uuid = caller_uuid.to_string();
        let target_uuid = target_uuid.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            let tx = conn.transaction().map_err(map_err)?;

            for uuid in [&caller_uuid, &target_uuid] {
                let exists: i64 = tx
                    .query_row(
                        "SELECT COUNT(*) FROM users WHERE uuid = ?1",
                        params![uuid],
                        |row| row.get(0),
                    )
                    .map_err(map_err)?;
                if exists == 0 {
                    return Err(StorageError::NotFound);
                }
            }

            // The conditional update is the cooldown re-check: zero affected
            // rows means the stored last_checkin moved past the cutoff since
            // the handler last read it. Dropping the tx rolls back.
            let updated = tx
                .execute(
                    "UPDATE users SET credit = credit + ?1, last_checkin = ?2
                     WHERE uuid = ?3 AND last_checkin < ?4",
                    params![caller_delta, encode_ts(now), caller_uuid, encode_ts(cutoff)],
                )
                .map_err(map_err)?;
            if updated == 0 {
                return Ok(None);
            }

            tx.execute(
                "UPDATE users SET credit = credit + ?1 WHERE uuid = ?2",
                params![target_delta, target_uuid],
            )
            .map_err(map_err)?;

            let credit: i64 = tx
                .query_row(
                    "SELECT credit FROM users WHERE uuid = ?1",
                    params![caller_uuid],
                    |row| row.get(0),
                )
                .map_err(map_err)?;

            tx.commit().map_err(map_err)?;
            Ok(Some(credit))
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    // --- Follows -------------------------------------------------------------

    async fn put_follow(&self, follower: &str, followee: &str) -> Result<(), StorageError> {
        let conn = Arc::clone(&self.conn);
        let follower = follower.to_string();
        let followee = followee.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO follows (follower, followee, active, created_at)
                 VALUES (?1, ?2, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(follower, followee) DO UPDATE SET active = 1",
                params![follower, followee],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn deactivate_follow(
        &self,
        follower: &str,
        followee: &str,
    ) -> Result<(), StorageError> {
        let conn = Arc::clone(&self.conn);
        let follower = follower.to_string();
        let followee = followee.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "UPDATE follows SET active = 0 WHERE follower = ?1 AND followee = ?2",
                params![follower, followee],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn follower_count(&self, uuid: &str) -> Result<i64, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE followee = ?1 AND active = 1",
                params![uuid],
                |row| row.get(0),
            )
            .map_err(map_err)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn following_count(&self, uuid: &str) -> Result<i64, StorageError> {
        let conn = Arc::clone(&self.conn);
        let uuid = uuid.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower = ?1 AND active = 1",
                params![uuid],
                |row| row.get(0),
            )
            .map_err(map_err)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }

    async fn follows_between(
        &self,
        viewer: &str,
        target: &str,
    ) -> Result<(bool, bool), StorageError> {
        let conn = Arc::clone(&self.conn);
        let viewer = viewer.to_string();
        let target = target.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            // Both directions in one pass; at most two rows come back.
            let mut stmt = conn
                .prepare(
                    "SELECT follower FROM follows
                     WHERE active = 1
                       AND ((follower = ?1 AND followee = ?2)
                         OR (follower = ?2 AND followee = ?1))",
                )
                .map_err(map_err)?;
            let followers = stmt
                .query_map(params![viewer, target], |row| row.get::<_, String>(0))
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;

            let viewer_follows = followers.iter().any(|f| *f == viewer);
            let target_follows = followers.iter().any(|f| *f == target);
            Ok((viewer_follows, target_follows))
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
