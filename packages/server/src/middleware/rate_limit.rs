//! Per-client fixed-window rate limiting middleware.
//!
//! Applies a configurable per-minute request cap keyed on the session token
//! when one is presented, otherwise on the client IP extracted from
//! `X-Forwarded-For` → `X-Real-IP` → `"unknown"` in that order. Clients
//! behind a shared NAT are therefore limited per session, not per address.
//!
//! When the limit is exceeded the middleware returns HTTP 429 with a
//! `Retry-After` header whose value is the number of seconds until the
//! current window resets.
//!
//! A limit of `0` disables rate limiting entirely (useful in tests or for
//! trusted internal deployments).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parlor_api::error::{codes, ErrorResponse};

use super::auth::TOKEN_HEADER;

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// Fixed-window per-client rate limiter.
///
/// Each unique client key gets an independent bucket that resets every
/// `window` duration. Thread-safe; cheaply cloneable via `Arc`.
pub struct RateLimiter {
    state: RwLock<HashMap<String, Bucket>>,
    max_per_window: u32,
    window: Duration,
}

struct Bucket {
    count: u32,
    window_start: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter with the given per-minute limit.
    ///
    /// Pass `0` to disable rate limiting.
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            max_per_window: max_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Check whether a request from `client_key` is within the limit.
    ///
    /// Returns `Ok(())` if the request is allowed, or `Err(retry_after_secs)`
    /// if the limit is exceeded.
    pub fn check(&self, client_key: &str) -> Result<(), u64> {
        if self.max_per_window == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());

        let bucket = state.entry(client_key.to_string()).or_insert_with(|| Bucket {
            count: 0,
            window_start: now,
        });

        let elapsed = now.duration_since(bucket.window_start);

        if elapsed >= self.window {
            // Window has expired — start a fresh window.
            bucket.count = 1;
            bucket.window_start = now;
            return Ok(());
        }

        if bucket.count >= self.max_per_window {
            let retry_after = (self.window.saturating_sub(elapsed)).as_secs().max(1);
            return Err(retry_after);
        }

        bucket.count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Middleware function
// ---------------------------------------------------------------------------

/// Axum `from_fn` middleware that enforces per-client rate limiting.
pub async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client_key = extract_client_key(&req);

    match limiter.check(&client_key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let body = ErrorResponse::new(codes::RATE_LIMITED, "rate limit exceeded");
            let mut resp = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                resp.headers_mut().insert("retry-after", v);
            }
            resp
        }
    }
}

// ---------------------------------------------------------------------------
// Client key extraction
// ---------------------------------------------------------------------------

/// Pick the bucket key for a request: session token when present, then the
/// client IP from common proxy headers, falling back to `"unknown"`.
fn extract_client_key(req: &Request<Body>) -> String {
    if let Some(token) = req.headers().get(TOKEN_HEADER) {
        if let Ok(s) = token.to_str() {
            if !s.is_empty() {
                return format!("token:{s}");
            }
        }
    }

    // X-Forwarded-For: client, proxy1, proxy2  — leftmost is the real client.
    if let Some(xff) = req.headers().get("x-forwarded-for") {
        if let Ok(s) = xff.to_str() {
            if let Some(ip) = s.split(',').next().map(str::trim) {
                if !ip.is_empty() {
                    return format!("ip:{ip}");
                }
            }
        }
    }

    // X-Real-IP: set by nginx/Caddy.
    if let Some(xri) = req.headers().get("x-real-ip") {
        if let Ok(s) = xri.to_str() {
            if !s.is_empty() {
                return format!("ip:{s}");
            }
        }
    }

    // No identifiable client — apply a shared "unknown" bucket.
    "unknown".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
