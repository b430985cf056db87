//! # gdmcache - Local content cache for Drive tracks
//!
//! Turns a track id into playable bytes. Content is looked up in a
//! [`gdmstore::KvStore`] first and downloaded from Drive only when absent,
//! then kept for offline playback. Entries are never evicted.
//!
//! ## Example
//!
//! ```no_run
//! use gdmcache::Resolver;
//! use gdmdrive::{Account, DriveApi, StaticTokenSource};
//! use gdmstore::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let account = Arc::new(Account::new(Arc::new(StaticTokenSource::bearer("ya29..."))));
//! let resolver = Resolver::new(
//!     Arc::new(MemoryStore::new("audioBlobs")),
//!     account,
//!     Arc::new(DriveApi::new()?),
//! );
//!
//! let handle = resolver.resolve("1AbC").await?;
//! println!("{} ({} bytes)", handle.url, handle.len());
//! resolver.release(&handle);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "gdmconfig")]
pub mod config_ext;
pub mod error;
pub mod object_urls;
pub mod resolver;

#[cfg(feature = "gdmconfig")]
pub use config_ext::CacheConfigExt;
pub use error::{ResolveError, Result};
pub use object_urls::{ObjectUrls, URL_PREFIX};
pub use resolver::{
    CacheOutcome, MediaHandle, PrecacheReport, Resolver, DEFAULT_CONCURRENCY, DEFAULT_STORE_NAME,
};
