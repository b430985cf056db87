//! # gdmdrive - Google Drive client for GDMusic
//!
//! Lists the audio files of a Drive and downloads their content.
//!
//! - [`DriveApi`]: thin layer over the Drive v3 REST API (`files.list`, `alt=media`)
//! - [`Account`]: caches the OAuth access token and refreshes it periodically
//! - [`TokenProvider`] / [`ContentProvider`]: seams used by the content cache,
//!   implemented by [`Account`] and [`DriveApi`]
//!
//! ## Example
//!
//! ```no_run
//! use gdmdrive::{Account, DriveApi, StaticTokenSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> gdmdrive::Result<()> {
//! let account = Account::new(Arc::new(StaticTokenSource::bearer("ya29...")));
//! let api = DriveApi::new()?;
//!
//! let token = account.acquire_token(gdmdrive::DEFAULT_SCOPE).await?;
//! for audio in api.list_audio_files(&token).await? {
//!     println!("{} ({})", audio.name, audio.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod provider;

pub use account::{Account, DEFAULT_REFRESH_INTERVAL};
pub use api::{DriveApi, API_BASE_URL, AUDIO_MIME_TYPES};
pub use auth::{RefreshTokenSource, StaticTokenSource, TokenSource, TOKEN_ENDPOINT};
pub use config_ext::{DriveConfigExt, DEFAULT_SCOPE};
pub use error::{DriveError, Result};
pub use models::{GoogleAudio, Token};
pub use provider::{ContentProvider, TokenProvider};
