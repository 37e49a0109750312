//! Google sign-in via the OAuth 2.0 authorization-code flow.
//!
//! The callback state parameter is a one-time nonce from the
//! [`NonceStore`](super::NonceStore); the exchanged access token is used
//! once, to read the OpenID userinfo endpoint, and then dropped. No
//! provider tokens are persisted.

use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tracing::warn;

use crate::config::OAuthProviderConfig;
use crate::error::{AppError, Result};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// The subset of the OpenID userinfo response we act on.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(cfg: &OAuthProviderConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(cfg.client_id.clone()),
            Some(ClientSecret::new(cfg.client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                .map_err(|err| AppError::Config(format!("bad authorization URL: {err}")))?,
            Some(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|err| AppError::Config(format!("bad token URL: {err}")))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(cfg.redirect_url.clone())
                .map_err(|err| AppError::Config(format!("bad OAuth redirect URL: {err}")))?,
        );
        Ok(Self { client, http: reqwest::Client::new() })
    }

    /// Where to send the browser, with `state` carried through the dance.
    pub fn authorize_url(&self, state: &str) -> String {
        let state = state.to_owned();
        let (url, _csrf) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();
        url.to_string()
    }

    /// Trade the callback code for an access token.
    pub async fn exchange(&self, code: String) -> Result<String> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|err| {
                warn!(error = %err, "authorization code exchange failed");
                AppError::Auth("Google sign-in could not be completed".into())
            })?;
        Ok(token.access_token().secret().clone())
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "userinfo request failed");
                AppError::Auth("Google sign-in could not be completed".into())
            })?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "userinfo request rejected");
            return Err(AppError::Auth("Google sign-in could not be completed".into()));
        }
        response.json::<GoogleProfile>().await.map_err(|err| {
            warn!(error = %err, "userinfo response unparseable");
            AppError::Auth("Google sign-in could not be completed".into())
        })
    }
}
