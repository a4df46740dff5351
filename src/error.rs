//! Error types for the Discord OAuth client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Discord OAuth operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input was missing or empty. Raised before any request is sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Discord answered with a non-success status.
    #[error("discord API returned {status}: {body}")]
    Upstream {
        /// HTTP status returned by Discord.
        status: reqwest::StatusCode,
        /// Raw response body.
        body: String,
    },

    /// The response body was not JSON or lacked an expected field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be sent or its body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::InvalidArgument(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Upstream { status, .. } => (
                StatusCode::BAD_GATEWAY,
                format!("discord API returned {status}"),
            ),
            Error::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "failed to reach discord API".to_string(),
            ),
        };

        (status, message).into_response()
    }
}
