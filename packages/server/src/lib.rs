//! Public surface for the `parlor-server` crate.
//!
//! Exposes the router builder, config, and backing stores so that external
//! crates (e.g. the conformance test suite) can spin up an in-process server
//! without spawning a subprocess.

pub mod blobs;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod tokens;

pub use blobs::{BlobStore, HttpBlobStore, MemoryBlobStore};
pub use config::ServerConfig;
pub use handlers::AppState;
pub use router::build_router;
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
pub use tokens::TokenStore;
