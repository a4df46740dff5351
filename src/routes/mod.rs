//! HTTP route handlers for Discord OAuth.

pub mod auth;

pub use auth::{callback, current_user, login, oauth_router, refresh};
