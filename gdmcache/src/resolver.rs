//! Resolver: track id to playable handle, through the local blob store

use crate::error::{ResolveError, Result};
use crate::object_urls::ObjectUrls;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use gdmdrive::{ContentProvider, TokenProvider, DEFAULT_SCOPE};
use gdmstore::KvStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the store holding downloaded content
pub const DEFAULT_STORE_NAME: &str = "audioBlobs";

/// Parallel downloads of [`Resolver::precache`]
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Playable content of one track
///
/// `url` stays valid until [`Resolver::release`] revokes it or the same id
/// is resolved again.
#[derive(Debug, Clone)]
pub struct MediaHandle {
    pub id: String,
    pub url: String,
    pub content: Bytes,
}

impl MediaHandle {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Outcome of [`Resolver::cache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Downloaded and stored by this call
    Cached,
    /// Already in the store, nothing fetched
    AlreadyCached,
}

/// Summary of a [`Resolver::precache`] batch
#[derive(Debug, Default)]
pub struct PrecacheReport {
    pub cached: Vec<String>,
    pub already_cached: Vec<String>,
    pub failed: Vec<(String, ResolveError)>,
}

impl PrecacheReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.cached.len() + self.already_cached.len() + self.failed.len()
    }
}

/// Content cache in front of Google Drive
///
/// [`Resolver::resolve`] reads the blob store first and only downloads on a
/// miss, storing the bytes under the track id before handing them out. Two
/// resolves of one id fetch it once. Concurrent resolves of the same
/// missing id are not merged and may both download.
pub struct Resolver {
    blobs: Arc<dyn KvStore>,
    tokens: Arc<dyn TokenProvider>,
    content: Arc<dyn ContentProvider>,
    urls: ObjectUrls,
    scope: String,
    concurrency: usize,
}

impl Resolver {
    pub fn new(
        blobs: Arc<dyn KvStore>,
        tokens: Arc<dyn TokenProvider>,
        content: Arc<dyn ContentProvider>,
    ) -> Self {
        Self {
            blobs,
            tokens,
            content,
            urls: ObjectUrls::new(),
            scope: DEFAULT_SCOPE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// OAuth scope requested on a cache miss
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builds the resolver on the configured SQLite database
    #[cfg(feature = "gdmconfig")]
    pub fn from_config(
        config: &gdmconfig::Config,
        tokens: Arc<dyn TokenProvider>,
        content: Arc<dyn ContentProvider>,
    ) -> Result<Self> {
        use crate::config_ext::CacheConfigExt;
        use gdmdrive::DriveConfigExt;

        let blobs = gdmstore::SqliteStore::from_config(config, &config.get_cache_store_name())?;
        Ok(Self::new(Arc::new(blobs), tokens, content)
            .with_scope(config.get_drive_scope())
            .with_concurrency(config.get_precache_concurrency()))
    }

    pub fn urls(&self) -> &ObjectUrls {
        &self.urls
    }

    pub async fn is_cached(&self, id: &str) -> Result<bool> {
        Ok(self.blobs.contains(id).await?)
    }

    /// Returns a playable handle for `id`, downloading it on a cache miss
    ///
    /// The content stays in memory, registered under the handle URL, until
    /// the handle is released or `id` is resolved again, which revokes the
    /// earlier URL. A caller that never releases keeps one copy per
    /// distinct track it resolved.
    pub async fn resolve(&self, id: &str) -> Result<MediaHandle> {
        let content = match self.blobs.get(id).await? {
            Some(content) => {
                debug!(id, bytes = content.len(), "Cache hit");
                content
            }
            None => self.fetch_and_store(id).await?,
        };

        let url = self.urls.create(id, content.clone());
        Ok(MediaHandle {
            id: id.to_string(),
            url,
            content,
        })
    }

    /// Makes sure `id` is in the blob store, without creating a handle
    pub async fn cache(&self, id: &str) -> Result<CacheOutcome> {
        if self.blobs.contains(id).await? {
            debug!(id, "Already cached");
            return Ok(CacheOutcome::AlreadyCached);
        }
        self.fetch_and_store(id).await?;
        Ok(CacheOutcome::Cached)
    }

    /// Caches every id, at most `concurrency` downloads at a time
    ///
    /// A failure is recorded in the report and does not stop the others.
    /// Repeated ids are handled once.
    pub async fn precache<I, S>(&self, ids: I) -> PrecacheReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        info!(count = ids.len(), concurrency = self.concurrency, "Pre-caching tracks");

        let outcomes: Vec<(String, Result<CacheOutcome>)> = stream::iter(ids)
            .map(|id| async move {
                let outcome = self.cache(&id).await;
                (id, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = PrecacheReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(CacheOutcome::Cached) => report.cached.push(id),
                Ok(CacheOutcome::AlreadyCached) => report.already_cached.push(id),
                Err(e) => {
                    warn!(id = %id, "Failed to cache track: {}", e);
                    report.failed.push((id, e));
                }
            }
        }

        info!(
            cached = report.cached.len(),
            already_cached = report.already_cached.len(),
            failed = report.failed.len(),
            "Pre-caching done"
        );
        report
    }

    /// Revokes the URL of a handle, returns `false` if it was already gone
    pub fn release(&self, handle: &MediaHandle) -> bool {
        self.urls.revoke(&handle.url)
    }

    async fn fetch_and_store(&self, id: &str) -> Result<Bytes> {
        info!(id, "Cache miss, downloading from Drive");

        let token = self
            .tokens
            .acquire_token(&self.scope)
            .await
            .map_err(ResolveError::Auth)?;
        let content = self
            .content
            .download(&token, id)
            .await
            .map_err(ResolveError::from_download)?;

        self.blobs.put(id, content.clone()).await?;
        debug!(id, bytes = content.len(), "Stored in cache");
        Ok(content)
    }
}
