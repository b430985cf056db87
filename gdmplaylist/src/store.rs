//! PlaylistStore: persisted playlist with change notifications

use crate::action::{Direction, PlaylistAction};
use crate::error::{Error, Result};
use crate::playlist::Playlist;
use crate::Track;
use gdmstore::{load_json, save_json, KvStore};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::SystemTime;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Name of the store holding the playlist state
pub const DEFAULT_STORE_NAME: &str = "google-drive-audio-list";

/// Key of the persisted state inside the store
pub const STATE_KEY: &str = "state";

const STATE_VERSION: u32 = 1;

/// Process-wide instance, see [`PlaylistStore::init_global`]
static PLAYLIST_STORE: OnceCell<PlaylistStore> = OnceCell::new();

/// On-disk form of the playlist, the cursor is not kept
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    version: u32,
    audio_list: Vec<Track>,
}

/// Consistent view of the playlist at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub tracks: Vec<Track>,
    pub active: Option<Track>,
}

impl PlaylistSnapshot {
    fn of(playlist: &Playlist) -> Self {
        Self {
            tracks: playlist.tracks().to_vec(),
            active: playlist.active().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistEventKind {
    /// The track list changed and was persisted
    Updated { action: &'static str },
    /// Only the cursor moved
    CursorMoved,
}

/// Change notification, carrying the state after the change
#[derive(Debug, Clone)]
pub struct PlaylistEvent {
    pub kind: PlaylistEventKind,
    pub snapshot: Arc<PlaylistSnapshot>,
    pub timestamp: SystemTime,
}

type Callback = Arc<dyn Fn(&PlaylistEvent) + Send + Sync>;

struct StoreInner {
    kv: Arc<dyn KvStore>,
    // Single entry point for mutations: held from apply to notify
    playlist: Mutex<Playlist>,
    callbacks: StdRwLock<HashMap<u64, Callback>>,
    cb_counter: AtomicU64,
    event_tx: broadcast::Sender<PlaylistEvent>,
}

/// Ordered, persisted playlist with an active cursor
///
/// Every mutation goes through [`PlaylistStore::dispatch`]:
/// 1. the action is applied to a copy of the current state
/// 2. the copy is written to the [`KvStore`]
/// 3. on success the copy becomes the current state and subscribers are
///    notified, on failure the previous state is kept
///
/// Calls are serialized, so writes reach the store in call order and every
/// reader sees a state that was persisted. Cursor moves are notified but
/// not persisted.
#[derive(Clone)]
pub struct PlaylistStore {
    inner: Arc<StoreInner>,
}

impl PlaylistStore {
    /// Opens the store, loading the last persisted list
    ///
    /// A missing state starts an empty playlist. A state that cannot be
    /// decoded is an error.
    pub async fn open(kv: Arc<dyn KvStore>) -> Result<Self> {
        let state: Option<PersistedState> = load_json(kv.as_ref(), STATE_KEY).await?;
        let tracks = match state {
            Some(state) => {
                if state.version != STATE_VERSION {
                    warn!(
                        version = state.version,
                        "Unexpected playlist state version, loading anyway"
                    );
                }
                state.audio_list
            }
            None => Vec::new(),
        };
        info!(store = kv.name(), len = tracks.len(), "Playlist loaded");

        Ok(Self {
            inner: Arc::new(StoreInner {
                kv,
                playlist: Mutex::new(Playlist::new(tracks)),
                callbacks: StdRwLock::new(HashMap::new()),
                cb_counter: AtomicU64::new(1),
                event_tx: broadcast::channel(64).0,
            }),
        })
    }

    /// Opens the store in the SQLite database configured in gdmconfig
    #[cfg(feature = "gdmconfig")]
    pub async fn from_config(config: &gdmconfig::Config) -> Result<Self> {
        use crate::config_ext::PlaylistConfigExt;

        let name = config.get_playlist_store_name();
        let kv = gdmstore::SqliteStore::from_config(config, &name)?;
        Self::open(Arc::new(kv)).await
    }

    /// Opens the store and registers it as the process-wide instance
    ///
    /// The instance lives until the process exits.
    pub async fn init_global(kv: Arc<dyn KvStore>) -> Result<Self> {
        if PLAYLIST_STORE.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let store = Self::open(kv).await?;
        PLAYLIST_STORE
            .set(store.clone())
            .map_err(|_| Error::AlreadyInitialized)?;
        Ok(store)
    }

    /// The process-wide instance, if initialized
    pub fn global() -> Option<&'static PlaylistStore> {
        PLAYLIST_STORE.get()
    }

    pub async fn snapshot(&self) -> PlaylistSnapshot {
        PlaylistSnapshot::of(&*self.inner.playlist.lock().await)
    }

    pub async fn tracks(&self) -> Vec<Track> {
        self.inner.playlist.lock().await.tracks().to_vec()
    }

    pub async fn active(&self) -> Option<Track> {
        self.inner.playlist.lock().await.active().cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.playlist.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.playlist.lock().await.is_empty()
    }

    /// Applies and persists one mutation
    pub async fn dispatch(&self, action: PlaylistAction) -> Result<()> {
        let kind = action.kind();
        debug!(action = %action, "Dispatching playlist action");

        let mut playlist = self.inner.playlist.lock().await;
        let mut next = playlist.clone();
        next.apply(action);

        if let Err(e) = self.persist(&next).await {
            error!(action = kind, "Failed to persist playlist: {}", e);
            return Err(e);
        }

        *playlist = next;
        info!(action = kind, len = playlist.len(), "Playlist updated");
        self.notify(PlaylistEventKind::Updated { action: kind }, &playlist);
        Ok(())
    }

    /// Dispatches an action in its JSON form `{"type": ..., "value": ...}`
    ///
    /// # Panics
    ///
    /// Panics if `type` is missing or is not an action kind. That is a bug
    /// in the caller and is never turned into an error value.
    pub async fn dispatch_json(&self, action: serde_json::Value) -> Result<()> {
        let kind = action.get("type").and_then(serde_json::Value::as_str);
        match kind {
            Some(kind) if PlaylistAction::is_known_kind(kind) => {}
            _ => panic!("Unknown playlist action type: {:?}", action.get("type")),
        }

        let action: PlaylistAction = serde_json::from_value(action)?;
        self.dispatch(action).await
    }

    pub async fn add(&self, tracks: Vec<Track>) -> Result<()> {
        self.dispatch(PlaylistAction::Add(tracks)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.dispatch(PlaylistAction::delete(id)).await
    }

    pub async fn place(&self, target: &str, to: Option<&str>) -> Result<()> {
        self.dispatch(PlaylistAction::place(target, to)).await
    }

    pub async fn set(&self, tracks: Vec<Track>) -> Result<()> {
        self.dispatch(PlaylistAction::Set(tracks)).await
    }

    /// Moves the cursor and returns the new active track
    pub async fn navigate(&self, direction: Direction) -> Option<Track> {
        let mut playlist = self.inner.playlist.lock().await;
        playlist.navigate(direction);
        debug!(?direction, active = ?playlist.active_id(), "Cursor moved");
        self.notify(PlaylistEventKind::CursorMoved, &playlist);
        playlist.active().cloned()
    }

    /// Points the cursor at `id` and returns the active track
    ///
    /// An id outside the playlist selects the first track.
    pub async fn select_active(&self, id: &str) -> Option<Track> {
        let mut playlist = self.inner.playlist.lock().await;
        playlist.select(id);
        debug!(active = ?playlist.active_id(), "Cursor selected");
        self.notify(PlaylistEventKind::CursorMoved, &playlist);
        playlist.active().cloned()
    }

    /// Receiver of every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PlaylistEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Registers a callback run synchronously on each event
    ///
    /// Callbacks run while the store is locked and must not call back
    /// into it. Returns a token for [`PlaylistStore::unregister_callback`].
    pub fn register_callback<F>(&self, cb: F) -> u64
    where
        F: Fn(&PlaylistEvent) + Send + Sync + 'static,
    {
        let token = self.inner.cb_counter.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.callbacks.write().unwrap();
        guard.insert(token, Arc::new(cb));
        token
    }

    pub fn unregister_callback(&self, token: u64) -> bool {
        let mut guard = self.inner.callbacks.write().unwrap();
        guard.remove(&token).is_some()
    }

    async fn persist(&self, playlist: &Playlist) -> Result<()> {
        let state = PersistedState {
            version: STATE_VERSION,
            audio_list: playlist.tracks().to_vec(),
        };
        save_json(self.inner.kv.as_ref(), STATE_KEY, &state).await?;
        Ok(())
    }

    fn notify(&self, kind: PlaylistEventKind, playlist: &Playlist) {
        let event = PlaylistEvent {
            kind,
            snapshot: Arc::new(PlaylistSnapshot::of(playlist)),
            timestamp: SystemTime::now(),
        };

        let guard = self.inner.callbacks.read().unwrap();
        for cb in guard.values() {
            cb(&event);
        }

        // Ignored when nobody listens
        let _ = self.inner.event_tx.send(event);
    }
}
