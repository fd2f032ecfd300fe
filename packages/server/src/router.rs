//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{account, moderation, thanks, users, AppState},
    middleware::rate_limit::{rate_limit_middleware, RateLimiter},
};

/// Build the complete application router over the given shared state.
///
/// `rate_limit_per_minute` configures the per-client request cap; `0`
/// disables it.
pub fn build_router(state: AppState, rate_limit_per_minute: u32) -> Router {
    // Per-client rate limiter (0 = disabled).
    let rate_limiter = Arc::new(RateLimiter::new(rate_limit_per_minute));

    Router::new()
        // Self account
        .route("/api/v1/user", get(account::current).post(account::update))
        .route("/api/v1/change_room", post(account::change_room))
        // Other users
        .route("/api/v1/user/{id}", get(users::profile))
        .route("/api/v1/latest_users", get(users::latest))
        // Thanks
        .route("/api/v1/thank_user", post(thanks::thank_user))
        // Moderation
        .route("/api/v1/block_user", post(moderation::block_user))
        .route("/api/v1/unblock_user", post(moderation::unblock_user))
        .with_state(state)
        // Rate limiting layer applied after routing so it can see the full request.
        .layer(axum::middleware::from_fn(move |req, next| {
            rate_limit_middleware(Arc::clone(&rate_limiter), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}
