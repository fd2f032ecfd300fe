//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// Runtime configuration for a parlor server.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a server can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PARLOR_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `PARLOR_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `PARLOR_BLOB_URL` | (absent = in-memory) | Base URL of the avatar blob gateway |
/// | `PARLOR_RATE_LIMIT_PER_MINUTE` | `0` (disabled) | Per-client request cap across the API |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    /// Base URL avatar uploads are PUT to.
    /// `None` means keep blobs in process memory (lost on restart).
    pub blob_url: Option<String>,

    /// Requests allowed per client per minute. `0` disables rate limiting.
    pub rate_limit_per_minute: u32,
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = std::env::var("PARLOR_BIND")
            .unwrap_or_else(|_| "0.0.0.0:3000".into())
            .parse()
            .expect("PARLOR_BIND must be a valid socket address (e.g. 0.0.0.0:3000)");

        let rate_limit_per_minute = std::env::var("PARLOR_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            bind_addr,
            db_path: std::env::var("PARLOR_DB").ok(),
            blob_url: std::env::var("PARLOR_BLOB_URL").ok(),
            rate_limit_per_minute,
        }
    }
}
