//! Shared helpers for the parlor conformance test suite.
//!
//! Provides [`spawn_server`] — a function that binds a `TcpListener` on an
//! ephemeral port, wires up an in-process server backed by `MemoryStorage`,
//! and returns handles to the underlying stores so tests can pre-populate
//! users and mint session tokens without going through the HTTP layer.

use std::sync::Arc;

use parlor_server::{
    blobs::BlobStore, build_router, AppState, MemoryBlobStore, MemoryStorage, Storage, TokenStore,
};

/// An ephemeral in-process server plus direct handles to its stores.
///
/// `base_url` is the full API base, e.g. `http://127.0.0.1:51234`. The store
/// handles alias the same instances the server uses, so anything seeded
/// through them is immediately visible over HTTP. This matters for sessions
/// in particular: the service has no login endpoint (tokens are issued by
/// the wider application), so tests mint tokens straight into the token
/// cache.
pub struct TestServer {
    pub base_url: String,
    pub storage: Arc<MemoryStorage>,
    pub tokens: Arc<TokenStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Start an ephemeral in-process server and return it with its store handles.
///
/// The server runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`, with rate limiting disabled.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the server fails to start.
pub async fn spawn_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let mem_storage = Arc::new(MemoryStorage::new());
    let tokens = Arc::new(TokenStore::new());
    let mem_blobs = Arc::new(MemoryBlobStore::new());

    let state = AppState {
        storage: Arc::clone(&mem_storage) as Arc<dyn Storage>,
        tokens: Arc::clone(&tokens),
        blobs: Arc::clone(&mem_blobs) as Arc<dyn BlobStore>,
    };
    let router = build_router(state, 0);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    TestServer {
        base_url,
        storage: mem_storage,
        tokens,
        blobs: mem_blobs,
    }
}
