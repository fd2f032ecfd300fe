//! Request and response types for the parlor user API.
//!
//! This crate encodes the HTTP contract of the user service as Rust types.
//! The server crate builds its handlers on these, and the conformance suite
//! deserializes responses back into them.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/api/v1/user` | → [`PublicUser`] |
//! | POST | `/api/v1/user` | multipart `name`, `about`, `avatar?` → [`AccountResponse`] |
//! | GET | `/api/v1/user/{id}` | → [`UserProfile`] |
//! | GET | `/api/v1/latest_users` | → `Vec<`[`PublicUser`]`>` |
//! | POST | `/api/v1/change_room` | [`ChangeRoomRequest`] → `"ok"` |
//! | POST | `/api/v1/thank_user` | [`ThankRequest`] → [`ThankResponse`] |
//! | POST | `/api/v1/block_user` | [`ModerationRequest`] → message |
//! | POST | `/api/v1/unblock_user` | [`ModerationRequest`] → message |

pub mod error;
pub mod user;

pub use error::ErrorResponse;
pub use user::{
    AccountResponse, ChangeRoomRequest, ModerationRequest, PublicUser, Role, ThankRequest,
    ThankResponse, UserProfile,
};
