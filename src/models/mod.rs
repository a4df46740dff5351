//! Data models for Discord OAuth responses.

mod token;
mod user;

pub use token::TokenResponse;
pub(crate) use user::display_name;
pub use user::User;
