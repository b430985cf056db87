//! Ways of obtaining a fresh OAuth2 access token

use crate::error::{DriveError, Result};
use crate::models::Token;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Google OAuth2 token endpoint
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Issues access tokens, without any caching
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn request_token(&self, scope: &str) -> Result<Token>;
}

/// Error body of the token endpoint
#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges a long-lived refresh token for access tokens
pub struct RefreshTokenSource {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl RefreshTokenSource {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: TOKEN_ENDPOINT.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        })
    }

    /// Uses another token endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn request_token(&self, scope: &str) -> Result<Token> {
        info!("Requesting access token from {}", self.endpoint);

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];

        let response = self.client.post(&self.endpoint).form(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<OAuthError>(&text) {
                let reason = match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                };
                warn!("Token request denied: {}", reason);
                return Err(DriveError::TokenDenied(reason));
            }
            return Err(DriveError::from_status_code(status.as_u16(), text));
        }

        let mut token: Token = serde_json::from_str(&text)?;
        if token.scope.is_empty() {
            token.scope = scope.to_string();
        }
        debug!(expires_in = token.expires_in, "Access token issued");
        Ok(token)
    }
}

/// Hands out a pre-issued access token
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self::new(Token::bearer(access_token))
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn request_token(&self, _scope: &str) -> Result<Token> {
        if self.token.access_token.is_empty() {
            return Err(DriveError::MissingCredentials("empty access token".into()));
        }
        Ok(self.token.clone())
    }
}
