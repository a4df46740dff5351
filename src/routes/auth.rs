//! Discord `OAuth2` authentication routes.
//!
//! This module provides HTTP handlers for:
//! - Login (redirect to Discord's authorization page)
//! - Callback (`OAuth2` authorization code -> access token + user)
//! - Token refresh
//! - User info retrieval

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    client::{DEFAULT_PROMPT, DEFAULT_SCOPE},
    error::{Error, Result},
    models::{display_name, User},
    AppState,
};

const STATE_LEN: usize = 32;

/// Create an Axum router with all auth routes.
///
/// Routes:
/// - `GET /login` - Redirect to Discord's authorization page
/// - `GET /callback` - Exchange the authorization code and fetch the user
/// - `POST /refresh` - Refresh the OAuth token
/// - `GET /me` - Get the user for a bearer token
pub fn oauth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/refresh", post(refresh))
        .route("/me", get(current_user))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub scope: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    /// Discord OAuth access token.
    pub access_token: String,
    /// The authorized Discord user.
    pub user: User,
}

/// Redirect the browser to Discord with a fresh state value.
///
/// `scope` and `prompt` arrive decoded from the query string and are
/// percent-encoded again before they go into the authorization URL.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Redirect> {
    let oauth_state = generate_state();
    let scope = urlencoding::encode(params.scope.as_deref().unwrap_or(DEFAULT_SCOPE));
    let prompt = urlencoding::encode(params.prompt.as_deref().unwrap_or(DEFAULT_PROMPT));
    let url = state
        .client
        .authorization_url_with(&oauth_state, &scope, &prompt)?;

    tracing::info!("Redirecting to Discord authorization");
    Ok(Redirect::to(&url))
}

/// Handle Discord's redirect: exchange the code and look up the user.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    if params.state.as_deref().unwrap_or_default().is_empty() {
        tracing::warn!("Callback received without state");
        return Err(Error::InvalidArgument("A state is required."));
    }

    let access_token = state
        .client
        .exchange_code(
            params.code.as_deref().unwrap_or_default(),
            &state.config.discord.client_secret,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to exchange code with Discord: {}", e);
            e
        })?;

    let user = state
        .client
        .fetch_user(&access_token)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get Discord user info: {}", e);
            e
        })?;

    tracing::info!(
        "Successfully authenticated user: {}",
        display_name(&user).unwrap_or("<unknown>")
    );

    Ok(Json(CallbackResponse { access_token, user }))
}

/// Trade a refresh token for a new token set.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<Map<String, Value>>> {
    let tokens = state
        .client
        .refresh_token(&payload.refresh_token, &state.config.discord.client_secret)
        .await
        .map_err(|e| {
            tracing::error!("Failed to refresh Discord token: {}", e);
            e
        })?;

    Ok(Json(tokens))
}

/// Return the user the bearer token belongs to.
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<User>> {
    let user = state.client.fetch_user(bearer.token()).await?;
    Ok(Json(user))
}

/// Random URL-safe state value.
fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::config::{Config, DiscordConfig, ServerConfig, StatusCheck};

    fn make_state(base: &str) -> Arc<AppState> {
        let config = Config {
            discord: DiscordConfig {
                api_base_url: base.to_string(),
                client_id: "1234".to_string(),
                client_secret: "secret1".to_string(),
                redirect_uri: "http://localhost:3000/auth/callback".to_string(),
                user_api_url: None,
                status_check: StatusCheck::Always,
            },
            server: ServerConfig::default(),
        };
        Arc::new(AppState::new(config))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_generate_state_is_url_safe() {
        let state = generate_state();
        assert_eq!(state.len(), STATE_LEN);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(state, generate_state());
    }

    #[tokio::test]
    async fn test_login_redirects_to_discord() {
        let app = oauth_router().with_state(make_state("https://discord.com/api/v10"));

        let response = app
            .oneshot(Request::get("/login?scope=identify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(
            "https://discord.com/api/v10/oauth2/authorize?response_type=code&client_id=1234&state="
        ));
        assert!(location.contains("&scope=identify&"));
        assert!(location.ends_with(
            "&redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback&prompt=none"
        ));
    }

    #[tokio::test]
    async fn test_login_encodes_multiple_scopes() {
        let app = oauth_router().with_state(make_state("https://discord.com/api/v10"));

        let response = app
            .oneshot(
                Request::get("/login?scope=identify%20email&prompt=consent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("&scope=identify%20email&"));
        assert!(location.ends_with("&prompt=consent"));
        assert!(!location.contains(' '));
    }

    #[tokio::test]
    async fn test_login_encodes_control_characters() {
        let app = oauth_router().with_state(make_state("https://discord.com/api/v10"));

        let response = app
            .oneshot(Request::get("/login?scope=a%0Ab").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("&scope=a%0Ab&"));
    }

    #[tokio::test]
    async fn test_callback_requires_state() {
        let app = oauth_router().with_state(make_state("http://127.0.0.1:9"));

        let response = app
            .oneshot(Request::get("/callback?code=abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_exchanges_code_and_fetches_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth2/@me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user": {"id": "42", "username": "bob"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app = oauth_router().with_state(make_state(&server.uri()));
        let response = app
            .oneshot(
                Request::get("/callback?code=code1&state=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"access_token": "abc123", "user": {"id": "42", "username": "bob"}})
        );
    }

    #[tokio::test]
    async fn test_callback_upstream_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let app = oauth_router().with_state(make_state(&server.uri()));
        let response = app
            .oneshot(
                Request::get("/callback?code=bad&state=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_refresh_returns_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "x", "refresh_token": "y"})),
            )
            .mount(&server)
            .await;

        let app = oauth_router().with_state(make_state(&server.uri()));
        let response = app
            .oneshot(
                Request::post("/refresh")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"refresh_token":"r1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"access_token": "x", "refresh_token": "y"})
        );
    }

    #[tokio::test]
    async fn test_me_requires_bearer_token() {
        let app = oauth_router().with_state(make_state("http://127.0.0.1:9"));

        let response = app
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_me_returns_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/@me"))
            .and(wiremock::matchers::header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": "42"}})))
            .expect(1)
            .mount(&server)
            .await;

        let app = oauth_router().with_state(make_state(&server.uri()));
        let response = app
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, "Bearer tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"id": "42"}));
    }
}
