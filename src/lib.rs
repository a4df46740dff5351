//! Discord OAuth Client
//!
//! A small client for Discord's `OAuth2` authorization-code flow, plus an
//! optional Axum router exposing it over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use discord_oauth::OAuthClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OAuthClient::new(
//!         "https://discord.com/api/v10",
//!         "http://localhost:3000/auth/callback",
//!         "1234567890",
//!     );
//!
//!     println!("Browse to: {}", client.authorization_url("some-state")?);
//!
//!     let access_token = client.exchange_code("code", "client-secret").await?;
//!     let user = client.fetch_user(&access_token).await?;
//!     println!("{user:?}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;

// Re-exports for convenience
use std::sync::Arc;

pub use client::OAuthClient;
pub use config::{Config, ConfigError, DiscordConfig, ServerConfig, StatusCheck};
pub use error::{Error, Result};
pub use models::{TokenResponse, User};

/// Application state containing configuration and the OAuth client.
///
/// This is designed to be wrapped in `Arc` and used with Axum's state extractor.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for Discord's `OAuth2` endpoints.
    pub client: OAuthClient,
}

impl AppState {
    /// Create a new AppState with the given configuration.
    pub fn new(config: Config) -> Self {
        let client = OAuthClient::from_config(&config.discord);
        Self { config, client }
    }

    /// Create a new AppState with a custom HTTP client.
    pub fn with_http_client(config: Config, http_client: reqwest::Client) -> Self {
        let client = OAuthClient::from_config(&config.discord).with_http_client(http_client);
        Self { config, client }
    }
}

/// Type alias for Arc-wrapped AppState, commonly used with Axum.
pub type SharedState = Arc<AppState>;
