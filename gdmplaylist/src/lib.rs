//! # gdmplaylist - Persisted playlist for GDMusic
//!
//! The ordered list of Drive tracks the player works on, with its active
//! cursor:
//!
//! - [`PlaylistStore`]: serialized mutations ([`PlaylistAction`]), each one
//!   persisted in a [`gdmstore::KvStore`] before returning, then broadcast
//!   to subscribers
//! - [`Playlist`]: the pure state (no duplicate ids, cursor repair)
//! - [`search`]: name filter with romanized matching
//! - [`Selection`]: multi-selection with "select all" on a filtered view
//!
//! ## Example
//!
//! ```no_run
//! use gdmplaylist::{Direction, PlaylistStore, Track};
//! use gdmstore::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> gdmplaylist::Result<()> {
//! let store = PlaylistStore::open(Arc::new(MemoryStore::new("google-drive-audio-list"))).await?;
//! store.add(vec![Track::new("1AbC", "晴天.mp3"), Track::new("2DeF", "Halo.m4a")]).await?;
//! store.place("2DeF", Some("1AbC")).await?;
//!
//! let active = store.navigate(Direction::Next).await;
//! assert_eq!(active.map(|t| t.id).as_deref(), Some("2DeF"));
//! # Ok(())
//! # }
//! ```

pub mod action;
#[cfg(feature = "gdmconfig")]
pub mod config_ext;
pub mod error;
pub mod playlist;
pub mod search;
pub mod selection;
pub mod store;

/// Track descriptor, as listed by Google Drive
pub type Track = gdmdrive::GoogleAudio;

pub use action::{Direction, PlaylistAction};
#[cfg(feature = "gdmconfig")]
pub use config_ext::PlaylistConfigExt;
pub use error::{Error, Result};
pub use playlist::Playlist;
pub use search::{filter_tracks, search, Matcher};
pub use selection::{CheckState, Selection};
pub use store::{
    PlaylistEvent, PlaylistEventKind, PlaylistSnapshot, PlaylistStore, DEFAULT_STORE_NAME,
    STATE_KEY,
};
