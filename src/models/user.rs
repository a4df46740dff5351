//! The authorized Discord user.

use serde_json::{Map, Value};

/// A Discord user object, as returned by the provider.
///
/// The shape is owned by Discord and is not validated here.
pub type User = Map<String, Value>;

/// Returns the display name for the user, preferring `global_name` over `username`.
pub(crate) fn display_name(user: &User) -> Option<&str> {
    user.get("global_name")
        .and_then(Value::as_str)
        .or_else(|| user.get("username").and_then(Value::as_str))
}
