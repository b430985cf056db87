//! Extension to store the Drive and Google account settings in gdmconfig
//!
//! Secrets (`client_secret`, `refresh_token`) are written encrypted and
//! transparently decrypted on read, see `gdmconfig::secrets`.

use crate::api::{API_BASE_URL, AUDIO_MIME_TYPES};
use crate::auth::TOKEN_ENDPOINT;
use anyhow::{anyhow, Result};
use gdmconfig::{secrets, Config};
use serde_yaml::Value;
use std::time::Duration;

/// Read-only Drive scope, enough to list and download
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_PAGE_SIZE: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 50 * 60;

/// Extension trait for `gdmconfig::Config`
pub trait DriveConfigExt {
    fn get_drive_api_base_url(&self) -> String;

    /// OAuth scope requested for Drive access
    fn get_drive_scope(&self) -> String;

    fn get_drive_mime_types(&self) -> Vec<String>;

    fn get_drive_page_size(&self) -> u32;

    fn get_drive_timeout(&self) -> Duration;

    fn get_google_client_id(&self) -> Option<String>;

    /// Decrypted OAuth client secret
    fn get_google_client_secret(&self) -> Result<Option<String>>;

    /// Stores the client secret encrypted
    fn set_google_client_secret(&self, secret: &str) -> Result<()>;

    /// Decrypted refresh token
    fn get_google_refresh_token(&self) -> Result<Option<String>>;

    /// Stores the refresh token encrypted
    fn set_google_refresh_token(&self, token: &str) -> Result<()>;

    /// Pre-issued access token, used when no refresh token is configured
    fn get_google_access_token(&self) -> Result<Option<String>>;

    fn get_google_token_endpoint(&self) -> String;

    fn get_token_refresh_interval(&self) -> Duration;
}

fn get_secret(config: &Config, key: &str) -> Result<Option<String>> {
    match config.get_optional_string(&["accounts", "google", key]) {
        Some(value) => secrets::get_secret(&value)
            .map(Some)
            .map_err(|e| anyhow!("Failed to decrypt accounts.google.{}: {}", key, e)),
        None => Ok(None),
    }
}

fn set_secret(config: &Config, key: &str, value: &str) -> Result<()> {
    let encrypted = secrets::encrypt_secret(value)?;
    config.set_value(&["accounts", "google", key], Value::String(encrypted))
}

impl DriveConfigExt for Config {
    fn get_drive_api_base_url(&self) -> String {
        self.get_string_or(&["drive", "api_base_url"], API_BASE_URL)
    }

    fn get_drive_scope(&self) -> String {
        self.get_string_or(&["drive", "scope"], DEFAULT_SCOPE)
    }

    fn get_drive_mime_types(&self) -> Vec<String> {
        match self.get_string_list(&["drive", "mime_types"]) {
            Some(types) if !types.is_empty() => types,
            _ => AUDIO_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn get_drive_page_size(&self) -> u32 {
        self.get_u64_or(&["drive", "page_size"], DEFAULT_PAGE_SIZE)
            .min(u32::MAX as u64) as u32
    }

    fn get_drive_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64_or(&["drive", "timeout_secs"], DEFAULT_TIMEOUT_SECS))
    }

    fn get_google_client_id(&self) -> Option<String> {
        self.get_optional_string(&["accounts", "google", "client_id"])
    }

    fn get_google_client_secret(&self) -> Result<Option<String>> {
        get_secret(self, "client_secret")
    }

    fn set_google_client_secret(&self, secret: &str) -> Result<()> {
        set_secret(self, "client_secret", secret)
    }

    fn get_google_refresh_token(&self) -> Result<Option<String>> {
        get_secret(self, "refresh_token")
    }

    fn set_google_refresh_token(&self, token: &str) -> Result<()> {
        set_secret(self, "refresh_token", token)
    }

    fn get_google_access_token(&self) -> Result<Option<String>> {
        get_secret(self, "access_token")
    }

    fn get_google_token_endpoint(&self) -> String {
        self.get_string_or(&["accounts", "google", "token_endpoint"], TOKEN_ENDPOINT)
    }

    fn get_token_refresh_interval(&self) -> Duration {
        let secs = self.get_u64_or(
            &["accounts", "google", "refresh_interval_secs"],
            DEFAULT_REFRESH_INTERVAL_SECS,
        );
        Duration::from_secs(secs.max(60))
    }
}
