//! HTTP request handlers for all parlor user endpoints.
//!
//! Each submodule covers a logical group of endpoints. Handlers are pure
//! async functions that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`.
//!
//! All authorization and cooldown policy lives here, not in storage (the
//! transactional cooldown re-check excepted).

pub mod account;
pub mod moderation;
pub mod thanks;
pub mod users;

use std::sync::Arc;

use crate::{blobs::BlobStore, storage::Storage, tokens::TokenStore};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Session token to user-snapshot cache.
    pub tokens: Arc<TokenStore>,
    /// Sink for uploaded avatar images.
    pub blobs: Arc<dyn BlobStore>,
}
