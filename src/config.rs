//! Configuration types for the Discord OAuth client.

use std::str::FromStr;

use serde::Deserialize;

/// Discord API base used when `DISCORD_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Root configuration for the Discord OAuth application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord `OAuth2` configuration.
    pub discord: DiscordConfig,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Discord `OAuth2` and API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Base URL of the Discord REST API, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Discord application client ID.
    pub client_id: String,
    /// Discord application client secret.
    pub client_secret: String,
    /// `OAuth2` redirect URI, unencoded.
    pub redirect_uri: String,
    /// Endpoint whose `/@me` returns the authorized user.
    /// Defaults to the `OAuth2` endpoint under `api_base_url`.
    #[serde(default)]
    pub user_api_url: Option<String>,
    /// Which operations reject non-success responses.
    #[serde(default)]
    pub status_check: StatusCheck,
}

/// Controls which operations turn a non-success HTTP status into
/// [`Error::Upstream`](crate::Error::Upstream).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCheck {
    /// Every operation checks the status before parsing the body.
    #[default]
    Always,
    /// Only the code exchange checks the status. Refresh and user fetch
    /// parse whatever body Discord returns.
    TokenExchangeOnly,
}

impl StatusCheck {
    /// Returns true if refresh and user fetch should check the status.
    pub fn is_strict(self) -> bool {
        self == StatusCheck::Always
    }
}

impl FromStr for StatusCheck {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(StatusCheck::Always),
            "token-exchange-only" => Ok(StatusCheck::TokenExchangeOnly),
            _ => Err(ConfigError::InvalidValue("DISCORD_STATUS_CHECK", s.to_string())),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Expected environment variables:
    /// - `DISCORD_CLIENT_ID`
    /// - `DISCORD_CLIENT_SECRET`
    /// - `DISCORD_REDIRECT_URI`
    /// - `DISCORD_API_BASE_URL` (optional, defaults to `https://discord.com/api/v10`)
    /// - `DISCORD_USER_API_URL` (optional)
    /// - `DISCORD_STATUS_CHECK` (optional, `always` or `token-exchange-only`)
    /// - `HOST` (optional, defaults to "0.0.0.0")
    /// - `PORT` (optional, defaults to 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let status_check = match std::env::var("DISCORD_STATUS_CHECK") {
            Ok(value) => value.parse()?,
            Err(_) => StatusCheck::default(),
        };

        let discord = DiscordConfig {
            api_base_url: std::env::var("DISCORD_API_BASE_URL")
                .unwrap_or_else(|_| default_api_base_url()),
            client_id: std::env::var("DISCORD_CLIENT_ID")
                .map_err(|_| ConfigError::MissingEnv("DISCORD_CLIENT_ID"))?,
            client_secret: std::env::var("DISCORD_CLIENT_SECRET")
                .map_err(|_| ConfigError::MissingEnv("DISCORD_CLIENT_SECRET"))?,
            redirect_uri: std::env::var("DISCORD_REDIRECT_URI")
                .map_err(|_| ConfigError::MissingEnv("DISCORD_REDIRECT_URI"))?,
            user_api_url: std::env::var("DISCORD_USER_API_URL").ok(),
            status_check,
        };

        let server = ServerConfig {
            host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
        };

        Ok(Self { discord, server })
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
