//! JSON helpers on top of [`KvStore`]

use crate::{KvStore, Result, StoreError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Loads and deserializes a JSON value, `None` if the key is absent
pub async fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        debug!(store = store.name(), key, "No JSON value stored");
        return Ok(None);
    };

    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            store: store.name().to_string(),
            key: key.to_string(),
            source,
        })
}

/// Serializes a value as JSON and stores it under `key`
pub async fn save_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_vec(value).map_err(|source| StoreError::Json {
        store: store.name().to_string(),
        key: key.to_string(),
        source,
    })?;
    store.put(key, raw.into()).await
}
