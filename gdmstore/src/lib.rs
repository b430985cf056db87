//! # gdmstore - Local durable key-value stores for GDMusic
//!
//! Both the persisted playlist and the audio content cache live in a local
//! key-value store, each under its own store name:
//!
//! ```text
//! gdmusic.db
//!   entries(store, key, value, updated_at)
//!     ├── google-drive-audio-list / state   -> playlist JSON
//!     └── audioBlobs / <drive file id>      -> raw audio bytes
//! ```
//!
//! - [`KvStore`] : async contract used by the playlist store and the resolver
//! - [`SqliteStore`] : durable implementation (one SQLite file, many stores)
//! - [`MemoryStore`] : in-process implementation for tests and ephemeral sessions
//!
//! ```no_run
//! use gdmstore::{KvStore, SqliteStore};
//!
//! # async fn example() -> gdmstore::Result<()> {
//! let blobs = SqliteStore::open("gdmusic.db", "audioBlobs")?;
//! let playlist = blobs.namespace("google-drive-audio-list");
//!
//! blobs.put("1AbC", b"ID3...".to_vec().into()).await?;
//! assert!(playlist.get("1AbC").await?.is_none());
//! # Ok(())
//! # }
//! ```

mod config_ext;
mod error;
mod json;
mod memory;
mod sqlite;

use async_trait::async_trait;
use bytes::Bytes;

pub use config_ext::StoreConfigExt;
pub use error::{Result, StoreError};
pub use json::{load_json, save_json};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A named, durable key-value store
///
/// Implementations must make `put` atomic per key: a failed write leaves the
/// previous value (and every other entry) untouched.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store name (namespace) this handle reads and writes
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Removes a key, returns `true` if it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// All keys of this store, sorted
    async fn keys(&self) -> Result<Vec<String>>;
}
