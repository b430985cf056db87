//! Access layer for the Google Drive v3 REST API
//!
//! Low-level requests only: every call takes the [`Token`] to present, the
//! caching of tokens belongs to [`crate::Account`].

pub mod files;

use crate::error::{DriveError, Result};
use crate::models::Token;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the Drive v3 API
pub const API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Audio MIME types listed by default
pub const AUDIO_MIME_TYPES: [&str; 7] = [
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/flac",
    "audio/mp4",
    "audio/x-m4a",
    "audio/aac",
];

const DEFAULT_PAGE_SIZE: u32 = 1000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body returned by Google APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Low-level Drive client
#[derive(Debug, Clone)]
pub struct DriveApi {
    client: Client,
    base_url: String,
    mime_types: Vec<String>,
    page_size: u32,
}

impl DriveApi {
    /// Client for the public Drive endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(API_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Client for another endpoint (proxy, test server)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gdmusic/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mime_types: AUDIO_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Builds the client from gdmconfig
    pub fn from_config(config: &gdmconfig::Config) -> Result<Self> {
        use crate::config_ext::DriveConfigExt;

        let mut api = Self::with_base_url(config.get_drive_api_base_url(), config.get_drive_timeout())?;
        api.set_mime_types(config.get_drive_mime_types());
        api.set_page_size(config.get_drive_page_size());
        Ok(api)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// MIME types accepted by [`DriveApi::list_audio_files`]
    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    pub fn set_mime_types(&mut self, mime_types: Vec<String>) {
        if mime_types.is_empty() {
            warn!("Ignoring empty MIME type list, keeping {:?}", self.mime_types);
            return;
        }
        self.mime_types = mime_types;
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.clamp(1, 1000);
    }

    /// Authenticated GET returning the response once its status was checked
    pub(crate) async fn get(
        &self,
        token: &Token,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .query(params)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Authenticated GET decoding a JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        token: &Token,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.get(token, endpoint, params).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            DriveError::JsonParse(e)
        })
    }

    /// Maps non-success statuses to [`DriveError`]
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        warn!("Drive API error ({}): {}", code, message);
        Err(DriveError::from_status_code(code, message))
    }
}
