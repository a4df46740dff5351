//! Discord `OAuth2` authorization-code client.
//!
//! [`OAuthClient`] builds the authorization URL and performs the three
//! request/response calls of the flow:
//! - Code exchange (`OAuth2` authorization code -> access token)
//! - Token refresh
//! - Authorized user lookup
//!
//! Each call is a single HTTP round trip. Nothing is cached or retried.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    config::{DiscordConfig, StatusCheck},
    error::{Error, Result},
    models::{TokenResponse, User},
};

/// Scope requested when none is given.
pub const DEFAULT_SCOPE: &str = "identity";
/// Prompt behaviour requested when none is given.
pub const DEFAULT_PROMPT: &str = "none";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Client for Discord's `OAuth2` authorization-code flow.
///
/// Configuration is fixed at construction. The client is cheap to clone and
/// can be shared between tasks.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    /// Redirect URI, percent-encoded once at construction.
    redirect_uri: String,
    /// `{base}/oauth2`
    oauth_api_url: String,
    user_api_url: String,
    status_check: StatusCheck,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Create a new client.
    ///
    /// `redirect_uri` is percent-encoded here, with every reserved character
    /// escaped. No request is made.
    pub fn new(
        api_base_url: impl Into<String>,
        redirect_uri: impl AsRef<str>,
        client_id: impl Into<String>,
    ) -> Self {
        let oauth_api_url = format!("{}/oauth2", api_base_url.into());

        Self {
            client_id: client_id.into(),
            redirect_uri: urlencoding::encode(redirect_uri.as_ref()).into_owned(),
            user_api_url: oauth_api_url.clone(),
            oauth_api_url,
            status_check: StatusCheck::default(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a client from the Discord section of the configuration.
    pub fn from_config(config: &DiscordConfig) -> Self {
        let client = Self::new(
            config.api_base_url.as_str(),
            &config.redirect_uri,
            config.client_id.as_str(),
        )
        .with_status_check(config.status_check);

        match &config.user_api_url {
            Some(url) => client.with_user_api_url(url.as_str()),
            None => client,
        }
    }

    /// Use a custom HTTP client, e.g. one configured with timeouts.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Override the endpoint whose `/@me` returns the authorized user.
    pub fn with_user_api_url(mut self, user_api_url: impl Into<String>) -> Self {
        self.user_api_url = user_api_url.into();
        self
    }

    /// Choose which operations reject non-success responses.
    pub fn with_status_check(mut self, status_check: StatusCheck) -> Self {
        self.status_check = status_check;
        self
    }

    /// The application client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The percent-encoded redirect URI sent with every request.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// The status check policy in effect.
    pub fn status_check(&self) -> StatusCheck {
        self.status_check
    }

    /// Build the URL a user visits to authorize the application, with the
    /// default scope and prompt.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        self.authorization_url_with(state, DEFAULT_SCOPE, DEFAULT_PROMPT)
    }

    /// Build the URL a user visits to authorize the application.
    ///
    /// `state`, `scope` and `prompt` are inserted as given. Callers must pass
    /// URL-safe values.
    pub fn authorization_url_with(&self, state: &str, scope: &str, prompt: &str) -> Result<String> {
        if state.is_empty() {
            return Err(Error::InvalidArgument("A state is required."));
        }

        Ok(format!(
            "{}/authorize?response_type=code&client_id={}&state={}&scope={}&redirect_uri={}&prompt={}",
            self.oauth_api_url, self.client_id, state, scope, self.redirect_uri, prompt
        ))
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str, client_secret: &str) -> Result<String> {
        if code.is_empty() {
            return Err(Error::InvalidArgument("Auth code required."));
        }
        if client_secret.is_empty() {
            return Err(Error::InvalidArgument("Client secret required."));
        }

        tracing::debug!("Exchanging authorization code for access token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", client_secret),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        let body = self.post_token_form(&params, true).await?;

        let tokens = TokenResponse::try_from(parse_json::<Map<String, Value>>(&body)?)?;
        Ok(tokens.access_token)
    }

    /// Use a refresh token to obtain a new token set.
    ///
    /// Unlike [`exchange_code`](Self::exchange_code), this returns the whole
    /// token response as a JSON map. Use [`TokenResponse::try_from`] for typed
    /// access.
    ///
    /// With [`StatusCheck::Always`] a non-success status is an
    /// [`Error::Upstream`] and a body without `access_token` is an
    /// [`Error::MalformedResponse`]. With [`StatusCheck::TokenExchangeOnly`]
    /// any JSON object Discord returns is handed back, error replies included.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        client_secret: &str,
    ) -> Result<Map<String, Value>> {
        if refresh_token.is_empty() {
            return Err(Error::InvalidArgument("Refresh token required."));
        }
        if client_secret.is_empty() {
            return Err(Error::InvalidArgument("Client secret required."));
        }

        tracing::debug!("Refreshing access token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let body = self
            .post_token_form(&params, self.status_check.is_strict())
            .await?;

        let tokens: Map<String, Value> = parse_json(&body)?;
        let has_access_token = tokens.get("access_token").is_some_and(Value::is_string);
        if self.status_check.is_strict() && !has_access_token {
            return Err(Error::MalformedResponse(
                "missing field `access_token`".to_string(),
            ));
        }

        Ok(tokens)
    }

    /// Fetch the user the access token was issued for.
    ///
    /// Returns the `user` field of the response.
    pub async fn fetch_user(&self, access_token: &str) -> Result<User> {
        tracing::debug!("Fetching authorized user");

        let response = self
            .http_client
            .get(format!("{}/@me", self.user_api_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await?;

        let body = read_body(response, self.status_check.is_strict(), "user fetch").await?;

        let mut payload: Map<String, Value> = parse_json(&body)?;
        match payload.remove("user") {
            Some(Value::Object(user)) => Ok(user),
            Some(_) => Err(Error::MalformedResponse("user is not an object".to_string())),
            None => Err(Error::MalformedResponse("missing field `user`".to_string())),
        }
    }

    async fn post_token_form(&self, params: &[(&str, &str)], check_status: bool) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/token", self.oauth_api_url))
            .header("Content-Type", FORM_CONTENT_TYPE)
            .form(params)
            .send()
            .await?;

        read_body(response, check_status, "token request").await
    }
}

async fn read_body(response: reqwest::Response, check_status: bool, what: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if check_status && !status.is_success() {
        tracing::error!("Discord {} failed: {} - {}", what, status, body);
        return Err(Error::Upstream { status, body });
    }

    Ok(body)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}
