//! Request middleware: session-token auth extractors and rate limiting.

pub mod auth;
pub mod rate_limit;
