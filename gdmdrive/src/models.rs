//! Data structures exchanged with Google Drive and the OAuth endpoint

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Audio file of the user's Drive
///
/// Identity is `id`. `name` is the display name and may change when the
/// listing is refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAudio {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub web_view_link: String,
}

impl GoogleAudio {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: String::new(),
            web_view_link: String::new(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// One page of `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<GoogleAudio>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Margin subtracted from `expires_in` so a token is never used at the edge
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth2 access token
///
/// `expires_in == 0` means the lifetime is unknown and the token is treated
/// as valid until the account releases it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    #[serde(skip, default = "Instant::now")]
    obtained_at: Instant,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: u64,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            scope: scope.into(),
            obtained_at: Instant::now(),
        }
    }

    /// Bearer token without known expiry
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self::new(access_token, default_token_type(), 0, "")
    }

    /// Value of the `Authorization` header: `"<token_type> <access_token>"`
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    pub fn obtained_at(&self) -> Instant {
        self.obtained_at
    }

    /// Instant after which the token must not be used, if known
    pub fn expires_at(&self) -> Option<Instant> {
        if self.expires_in == 0 {
            return None;
        }
        let lifetime = Duration::from_secs(self.expires_in).saturating_sub(EXPIRY_MARGIN);
        Some(self.obtained_at + lifetime)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}
