//! `parlor-server` — user-domain HTTP service.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! parlor-server
//!
//! # Persistent SQLite server with an avatar gateway:
//! PARLOR_DB=./data.db PARLOR_BLOB_URL=http://blobs:9000/avatars parlor-server
//!
//! # Custom bind address:
//! PARLOR_BIND=0.0.0.0:8080 parlor-server
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig::from_env`] for the full list.

use std::sync::Arc;

use parlor_server::{
    blobs::BlobStore, build_router, AppState, HttpBlobStore, MemoryBlobStore, MemoryStorage,
    ServerConfig, SqliteStorage, Storage, TokenStore,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor_server=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .unwrap_or_else(|e| panic!("failed to open SQLite database at {path}: {e}")),
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    let blobs: Arc<dyn BlobStore> = match &config.blob_url {
        Some(url) => {
            tracing::info!("blobs: HTTP gateway at {url}");
            Arc::new(HttpBlobStore::new(url))
        }
        None => {
            tracing::info!("blobs: in-memory (uploads will not survive restart)");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let state = AppState {
        storage,
        tokens: Arc::new(TokenStore::new()),
        blobs,
    };

    let app = build_router(state, config.rate_limit_per_minute);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    axum::serve(listener, app).await.expect("server error");
}
