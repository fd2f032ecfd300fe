//! Avatar blob storage.
//!
//! Uploaded avatars are stored under the key `"{user id}.jpg"`; clients
//! derive the fetch URL from the user's numeric id plus the avatar revision
//! counter. The server only ever writes blobs, so the trait is a single
//! `put`.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryBlobStore`] | Tests, conformance suite, ephemeral deployments |
//! | [`HttpBlobStore`] | Production; PUTs to an object-store gateway |

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

// ---------------------------------------------------------------------------
// BlobError
// ---------------------------------------------------------------------------

/// Errors that blob writes can return.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The backend answered with a non-success status.
    #[error("blob backend rejected {key}: status {status}")]
    Rejected { key: String, status: u16 },

    /// The backend could not be reached.
    #[error("blob transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// BlobStore trait
// ---------------------------------------------------------------------------

/// Write-only blob sink for avatar images.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store `data` under `key`, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError>;
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

/// In-memory blob sink. Keeps `(content_type, bytes)` per key so tests can
/// assert on what was uploaded.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, (String, Bytes)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a stored blob. Test-side accessor, not part of the trait.
    pub fn get(&self, key: &str) -> Option<(String, Bytes)> {
        self.blobs.read().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), (content_type.to_string(), data));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HttpBlobStore
// ---------------------------------------------------------------------------

/// Blob sink backed by an HTTP object-store gateway. Each write is a
/// `PUT {base}/{key}` with the blob as the request body.
pub struct HttpBlobStore {
    base: String,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let url = format!("{}/{}", self.base, key);
        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| BlobError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobError::Rejected {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
