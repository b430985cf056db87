//! Error types for gdmstore

use thiserror::Error;

/// Result type alias for key-value store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures of the local durable store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in store {store}, key {key}: {source}")]
    Json {
        store: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Store configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
