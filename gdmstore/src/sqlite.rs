//! SQLite-backed store

use crate::{KvStore, Result, StoreConfigExt};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Durable [`KvStore`] backed by one SQLite file
///
/// Several stores share the same file and connection: [`SqliteStore::namespace`]
/// returns a handle on another store name. Every call runs on the blocking
/// thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    name: Arc<str>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and returns the store `name`
    pub fn open(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), store = name, "Opened local store");
        Self::with_connection(conn, name)
    }

    /// Store living only as long as the process, mostly for tests
    pub fn open_in_memory(name: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, name)
    }

    /// Opens the database configured in gdmconfig
    pub fn from_config(config: &gdmconfig::Config, name: &str) -> Result<Self> {
        let path = config.store_db_path()?;
        Self::open(path, name)
    }

    fn with_connection(conn: Connection, name: &str) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                store TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (store, key)
            )",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            name: Arc::from(name),
        })
    }

    /// Handle on another store name sharing this connection
    pub fn namespace(&self, name: &str) -> Self {
        Self {
            conn: self.conn.clone(),
            name: Arc::from(name),
        }
    }

    /// Runs `f` with the connection on the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let name = self.name.clone();
        let value = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            f(&conn, &name)
        })
        .await??;
        Ok(value)
    }

    /// Total size in bytes of the values of this store
    pub async fn size(&self) -> Result<u64> {
        self.run(|conn, name| {
            conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(value)), 0) FROM entries WHERE store = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
        })
        .await
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let key = key.to_string();
        let value = self
            .run(move |conn, name| {
                conn.query_row(
                    "SELECT value FROM entries WHERE store = ?1 AND key = ?2",
                    params![name, key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()
            })
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let owned_key = key.to_string();
        let len = value.len();
        self.run(move |conn, name| {
            conn.execute(
                "INSERT INTO entries (store, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(store, key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![name, owned_key, value.as_ref(), Utc::now().to_rfc3339()],
            )
        })
        .await?;
        debug!(store = %self.name, key, bytes = len, "Stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        let removed = self
            .run(move |conn, name| {
                conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key = ?2",
                    params![name, key],
                )
            })
            .await?;
        Ok(removed > 0)
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.run(move |conn, name| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM entries WHERE store = ?1 AND key = ?2)",
                params![name, key],
                |row| row.get::<_, bool>(0),
            )
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.run(|conn, name| {
            let mut stmt = conn.prepare("SELECT key FROM entries WHERE store = ?1 ORDER BY key")?;
            let keys = stmt
                .query_map(params![name], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let blobs = SqliteStore::open_in_memory("audioBlobs").unwrap();
        let playlist = blobs.namespace("google-drive-audio-list");

        blobs.put("state", Bytes::from_static(b"blob")).await.unwrap();
        playlist.put("state", Bytes::from_static(b"json")).await.unwrap();

        assert_eq!(blobs.get("state").await.unwrap().unwrap(), Bytes::from_static(b"blob"));
        assert_eq!(playlist.get("state").await.unwrap().unwrap(), Bytes::from_static(b"json"));
        assert_eq!(playlist.name(), "google-drive-audio-list");
    }

    #[tokio::test]
    async fn test_put_overwrites_and_size() {
        let store = SqliteStore::open_in_memory("s").unwrap();
        store.put("k", Bytes::from_static(b"12345")).await.unwrap();
        store.put("k", Bytes::from_static(b"123")).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["k".to_string()]);
        assert_eq!(store.size().await.unwrap(), 3);
        assert!(store.contains("k").await.unwrap());
        assert!(!store.contains("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteStore::open_in_memory("s").unwrap();
        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }
}
