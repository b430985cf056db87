//! Seams used by the content cache resolver

use crate::account::Account;
use crate::api::DriveApi;
use crate::error::Result;
use crate::models::{GoogleAudio, Token};
use async_trait::async_trait;
use bytes::Bytes;

/// Hands out bearer tokens, possibly after an interactive or network step
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, scope: &str) -> Result<Token>;
}

/// Remote content provider: listing and raw download
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn list_audio(&self, token: &Token) -> Result<Vec<GoogleAudio>>;

    async fn download(&self, token: &Token, id: &str) -> Result<Bytes>;
}

#[async_trait]
impl TokenProvider for Account {
    async fn acquire_token(&self, scope: &str) -> Result<Token> {
        Account::acquire_token(self, scope).await
    }
}

#[async_trait]
impl ContentProvider for DriveApi {
    async fn list_audio(&self, token: &Token) -> Result<Vec<GoogleAudio>> {
        self.list_audio_files(token).await
    }

    async fn download(&self, token: &Token, id: &str) -> Result<Bytes> {
        DriveApi::download(self, token, id).await
    }
}
