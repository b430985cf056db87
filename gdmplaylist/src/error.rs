//! Error types for gdmplaylist

use gdmstore::StoreError;

/// Playlist errors
///
/// An unknown action kind is not an error value: it is a caller bug and
/// panics, see [`crate::PlaylistStore::dispatch_json`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The new state could not be written, the previous state is kept
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Known action kind with a malformed payload
    #[error("Invalid action payload: {0}")]
    InvalidAction(#[from] serde_json::Error),

    #[error("PlaylistStore already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for gdmplaylist
pub type Result<T> = std::result::Result<T, Error>;
