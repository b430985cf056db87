//! Error handling for the Google Drive client

use thiserror::Error;

/// Result type alias for gdmdrive
pub type Result<T> = std::result::Result<T, DriveError>;

/// Errors raised while talking to Google Drive or the OAuth endpoint
#[derive(Error, Debug)]
pub enum DriveError {
    /// Token rejected by Drive (401/403)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// File not found or not visible with this token
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Transport error (connection, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Other non-success status returned by the API
    #[error("Drive API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    /// The OAuth endpoint refused to issue a token (revoked consent, bad grant...)
    #[error("Token request denied: {0}")]
    TokenDenied(String),

    /// No way to obtain a token with the current configuration
    #[error("Missing Google credentials: {0}")]
    MissingCredentials(String),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl DriveError {
    /// Builds an error from an HTTP status code and a message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Whether the error comes from the credentials rather than the transport
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            DriveError::Unauthorized(_)
                | DriveError::TokenDenied(_)
                | DriveError::MissingCredentials(_)
        )
    }

    /// Whether calling again later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::Http(_)
            | DriveError::RateLimitExceeded
            | DriveError::Unauthorized(_)
            | DriveError::TokenDenied(_) => true,
            DriveError::ApiError { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(matches!(DriveError::from_status_code(401, "x"), DriveError::Unauthorized(_)));
        assert!(matches!(DriveError::from_status_code(403, "x"), DriveError::Unauthorized(_)));
        assert!(matches!(DriveError::from_status_code(404, "x"), DriveError::NotFound(_)));
        assert!(matches!(DriveError::from_status_code(429, "x"), DriveError::RateLimitExceeded));
        assert!(matches!(
            DriveError::from_status_code(500, "x"),
            DriveError::ApiError { code: 500, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(DriveError::from_status_code(503, "busy").is_retryable());
        assert!(!DriveError::from_status_code(400, "bad").is_retryable());
        assert!(!DriveError::from_status_code(404, "gone").is_retryable());
        assert!(DriveError::TokenDenied("access_denied".into()).is_auth_error());
        assert!(!DriveError::MissingCredentials("none".into()).is_retryable());
    }
}
