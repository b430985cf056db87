//! Error types for gdmcache

use gdmdrive::DriveError;
use gdmstore::StoreError;

/// Why a track could not be resolved
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No token could be obtained, or the token was refused by Drive
    #[error("Authentication failed: {0}")]
    Auth(#[source] DriveError),

    /// Download failed (transport, HTTP status)
    #[error("Network error: {0}")]
    Network(#[source] DriveError),

    /// Local blob store read or write failed
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Classifies an error of the download call
    pub(crate) fn from_download(err: DriveError) -> Self {
        if err.is_auth_error() {
            Self::Auth(err)
        } else {
            Self::Network(err)
        }
    }

    /// Whether resolving again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Network(_) => true,
            Self::Store(_) => false,
        }
    }
}

/// Result type for gdmcache
pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_errors_are_classified() {
        let err = ResolveError::from_download(DriveError::from_status_code(401, "expired"));
        assert!(matches!(err, ResolveError::Auth(_)));

        let err = ResolveError::from_download(DriveError::from_status_code(503, "busy"));
        assert!(matches!(err, ResolveError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_errors_are_not_retryable() {
        let err = ResolveError::from(StoreError::Io(std::io::Error::other("disk full")));
        assert!(!err.is_retryable());
    }
}
