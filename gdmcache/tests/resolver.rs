//! Cache-then-fetch behavior of the resolver, with counting fakes

use async_trait::async_trait;
use bytes::Bytes;
use gdmcache::{CacheOutcome, ResolveError, Resolver};
use gdmdrive::{ContentProvider, DriveError, GoogleAudio, Token, TokenProvider};
use gdmstore::{KvStore, MemoryStore, SqliteStore, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct FakeTokens {
    requests: AtomicUsize,
    deny: AtomicBool,
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn acquire_token(&self, scope: &str) -> gdmdrive::Result<Token> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(DriveError::TokenDenied("access_denied".into()));
        }
        Ok(Token::new("ya29.fake", "Bearer", 3600, scope))
    }
}

/// Drive holding a fixed set of files, counting downloads
#[derive(Default)]
struct FakeDrive {
    files: HashMap<String, Bytes>,
    downloads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeDrive {
    fn with_files(ids: &[&str]) -> Self {
        Self {
            files: ids
                .iter()
                .map(|id| (id.to_string(), Bytes::from(format!("audio:{id}"))))
                .collect(),
            ..Default::default()
        }
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for FakeDrive {
    async fn list_audio(&self, _token: &Token) -> gdmdrive::Result<Vec<GoogleAudio>> {
        Ok(self.files.keys().map(|id| GoogleAudio::new(id, id)).collect())
    }

    async fn download(&self, token: &Token, id: &str) -> gdmdrive::Result<Bytes> {
        assert_eq!(token.authorization(), "Bearer ya29.fake");
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match id {
            "broken" => Err(DriveError::from_status_code(500, "backend error")),
            _ => self
                .files
                .get(id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound(id.to_string())),
        }
    }
}

/// Blob store counting reads and writes, writes can be made to fail
struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new("audioBlobs"),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn counts(&self) -> (usize, usize) {
        (self.gets.load(Ordering::SeqCst), self.puts.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl KvStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> gdmstore::Result<Option<Bytes>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> gdmstore::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("quota exceeded")));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> gdmstore::Result<bool> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> gdmstore::Result<Vec<String>> {
        self.inner.keys().await
    }
}

struct Fixture {
    store: Arc<CountingStore>,
    tokens: Arc<FakeTokens>,
    drive: Arc<FakeDrive>,
    resolver: Resolver,
}

fn fixture(drive: FakeDrive) -> Fixture {
    let store = Arc::new(CountingStore::new());
    let tokens = Arc::new(FakeTokens::default());
    let drive = Arc::new(drive);
    let resolver = Resolver::new(store.clone(), tokens.clone(), drive.clone());
    Fixture {
        store,
        tokens,
        drive,
        resolver,
    }
}

#[tokio::test]
async fn test_second_resolve_reads_cache_only() {
    let f = fixture(FakeDrive::with_files(&["a"]));

    let first = f.resolver.resolve("a").await.unwrap();
    assert_eq!(first.content.as_ref(), b"audio:a");
    assert_eq!(f.drive.downloads(), 1);
    assert_eq!(f.store.counts(), (1, 1));

    let second = f.resolver.resolve("a").await.unwrap();
    assert_eq!(second.content, first.content);
    assert_eq!(f.drive.downloads(), 1);
    assert_eq!(f.tokens.requests.load(Ordering::SeqCst), 1);
    assert_eq!(f.store.counts(), (2, 1));
}

#[tokio::test]
async fn test_handles_are_transient() {
    let f = fixture(FakeDrive::with_files(&["a"]));

    let first = f.resolver.resolve("a").await.unwrap();
    let second = f.resolver.resolve("a").await.unwrap();
    assert_ne!(first.url, second.url);

    // the earlier handle no longer holds a live URL
    assert!(f.resolver.urls().get(&first.url).is_none());
    assert!(!f.resolver.release(&first));
    assert_eq!(f.resolver.urls().get(&second.url), Some(second.content.clone()));
    assert_eq!(f.resolver.urls().len(), 1);

    assert!(f.resolver.release(&second));
    assert!(f.resolver.urls().is_empty());
}

#[tokio::test]
async fn test_replaying_tracks_keeps_one_copy_per_track() {
    let f = fixture(FakeDrive::with_files(&["a", "b"]));

    for _ in 0..5 {
        f.resolver.resolve("a").await.unwrap();
        f.resolver.resolve("b").await.unwrap();
    }

    assert_eq!(f.resolver.urls().len(), 2);
    assert_eq!(f.drive.downloads(), 2);
}

#[tokio::test]
async fn test_denied_token_is_retryable_auth_error() {
    let f = fixture(FakeDrive::with_files(&["a"]));
    f.tokens.deny.store(true, Ordering::SeqCst);

    let err = f.resolver.resolve("a").await.unwrap_err();
    assert!(matches!(err, ResolveError::Auth(DriveError::TokenDenied(_))));
    assert!(err.is_retryable());
    assert_eq!(f.drive.downloads(), 0);
    assert!(!f.resolver.is_cached("a").await.unwrap());

    f.tokens.deny.store(false, Ordering::SeqCst);
    assert!(f.resolver.resolve("a").await.is_ok());
}

#[tokio::test]
async fn test_download_failure_is_network_error() {
    let f = fixture(FakeDrive::with_files(&["a"]));

    let err = f.resolver.resolve("broken").await.unwrap_err();
    assert!(matches!(err, ResolveError::Network(DriveError::ApiError { code: 500, .. })));
    assert!(err.is_retryable());
    assert_eq!(f.store.counts().1, 0);
}

#[tokio::test]
async fn test_store_failure_keeps_existing_entries() {
    let f = fixture(FakeDrive::with_files(&["a", "b"]));
    f.resolver.resolve("a").await.unwrap();

    f.store.fail_writes.store(true, Ordering::SeqCst);
    let err = f.resolver.resolve("b").await.unwrap_err();
    assert!(matches!(err, ResolveError::Store(_)));
    assert!(!err.is_retryable());

    let cached = f.resolver.resolve("a").await.unwrap();
    assert_eq!(cached.content.as_ref(), b"audio:a");
    assert_eq!(f.drive.downloads(), 2);
}

#[tokio::test]
async fn test_cache_without_handle() {
    let f = fixture(FakeDrive::with_files(&["a"]));

    assert_eq!(f.resolver.cache("a").await.unwrap(), CacheOutcome::Cached);
    assert_eq!(f.resolver.cache("a").await.unwrap(), CacheOutcome::AlreadyCached);
    assert!(f.resolver.is_cached("a").await.unwrap());
    assert!(f.resolver.urls().is_empty());
    assert_eq!(f.drive.downloads(), 1);
}

#[tokio::test]
async fn test_precache_continues_on_error() {
    let f = fixture(FakeDrive::with_files(&["a", "b", "c"]));
    f.resolver.resolve("b").await.unwrap();

    let report = f
        .resolver
        .precache(["a", "broken", "b", "missing", "c", "a"])
        .await;

    let mut cached = report.cached.clone();
    cached.sort();
    assert_eq!(cached, ["a", "c"]);
    assert_eq!(report.already_cached, ["b"]);

    let mut failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    failed.sort();
    assert_eq!(failed, ["broken", "missing"]);
    assert!(!report.is_complete());
    assert_eq!(report.total(), 5);

    // b was fetched by resolve only, a once despite being listed twice
    assert_eq!(f.drive.downloads(), 5);
    for id in ["a", "b", "c"] {
        assert!(f.resolver.is_cached(id).await.unwrap());
    }
}

#[tokio::test]
async fn test_precache_bounds_parallel_downloads() {
    let ids: Vec<String> = (0..12).map(|n| format!("t{n}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let drive = FakeDrive {
        delay: Some(Duration::from_millis(20)),
        ..FakeDrive::with_files(&id_refs)
    };

    let store = Arc::new(CountingStore::new());
    let drive = Arc::new(drive);
    let resolver = Resolver::new(store, Arc::new(FakeTokens::default()), drive.clone())
        .with_concurrency(3);

    let report = resolver.precache(ids.clone()).await;
    assert_eq!(report.cached.len(), 12);
    assert!(drive.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert!(drive.max_in_flight.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_cached_content_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("gdmusic.db");
    let tokens = Arc::new(FakeTokens::default());
    let drive = Arc::new(FakeDrive::with_files(&["a"]));

    {
        let blobs = SqliteStore::open(&db, "audioBlobs").unwrap();
        let resolver = Resolver::new(Arc::new(blobs), tokens.clone(), drive.clone());
        resolver.resolve("a").await.unwrap();
    }

    // Offline: every token request is refused from now on
    tokens.deny.store(true, Ordering::SeqCst);
    let blobs = SqliteStore::open(&db, "audioBlobs").unwrap();
    let resolver = Resolver::new(Arc::new(blobs), tokens.clone(), drive.clone());

    let handle = resolver.resolve("a").await.unwrap();
    assert_eq!(handle.content.as_ref(), b"audio:a");
    assert_eq!(drive.downloads(), 1);
    assert_eq!(tokens.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolver_from_config() {
    let dir = TempDir::new().unwrap();
    let config = gdmconfig::Config::load_config(dir.path().to_str().unwrap()).unwrap();
    let drive = Arc::new(FakeDrive::with_files(&["a"]));

    let resolver =
        Resolver::from_config(&config, Arc::new(FakeTokens::default()), drive.clone()).unwrap();
    resolver.resolve("a").await.unwrap();

    // Same database, store name from the configuration
    let blobs = SqliteStore::open(dir.path().join("data").join("gdmusic.db"), "audioBlobs").unwrap();
    assert_eq!(blobs.get("a").await.unwrap().unwrap().as_ref(), b"audio:a");
}
