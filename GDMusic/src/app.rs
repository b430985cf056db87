//! Wiring of configuration, stores, Drive client and resolver

use anyhow::{Context, Result, bail};
use gdmcache::{CacheConfigExt, Resolver};
use gdmconfig::Config;
use gdmdrive::{Account, DriveApi, DriveConfigExt, GoogleAudio};
use gdmplaylist::{Direction, PlaylistConfigExt, PlaylistStore, Selection, Track, filter_tracks};
use gdmstore::{KvStore, SqliteStore, load_json, save_json};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Store keeping what the command line needs between runs
const SESSION_STORE: &str = "gdmusic-session";
const ACTIVE_KEY: &str = "active";

pub struct App {
    config: Arc<Config>,
    db: SqliteStore,
    playlist: PlaylistStore,
}

impl App {
    pub async fn open(config: Arc<Config>) -> Result<Self> {
        let db = SqliteStore::from_config(&config, &config.get_playlist_store_name())?;
        let playlist = PlaylistStore::init_global(Arc::new(db.clone())).await?;
        Ok(Self {
            config,
            db,
            playlist,
        })
    }

    fn account(&self) -> Result<Arc<Account>> {
        let account = Account::from_config(&self.config)
            .context("No usable Google credentials in the configuration")?;
        Ok(Arc::new(account))
    }

    fn drive(&self) -> Result<Arc<DriveApi>> {
        Ok(Arc::new(DriveApi::from_config(&self.config)?))
    }

    fn blobs(&self) -> SqliteStore {
        self.db.namespace(&self.config.get_cache_store_name())
    }

    fn resolver(&self, account: Arc<Account>) -> Result<Resolver> {
        Ok(Resolver::new(Arc::new(self.blobs()), account, self.drive()?)
            .with_scope(self.config.get_drive_scope())
            .with_concurrency(self.config.get_precache_concurrency()))
    }

    async fn list_remote(&self) -> Result<Vec<GoogleAudio>> {
        let account = self.account()?;
        let token = account.acquire_token(&self.config.get_drive_scope()).await?;
        let files = self.drive()?.list_audio_files(&token).await;
        account.release_token().await;
        Ok(files?)
    }

    pub async fn remote(&self) -> Result<()> {
        for audio in self.list_remote().await? {
            println!("{}\t{}\t{}", audio.id, audio.mime_type, audio.name);
        }
        Ok(())
    }

    /// Adds the Drive files matching `search` (all of them without a query)
    pub async fn import(&self, replace: bool, search: Option<&str>) -> Result<()> {
        let remote = self.list_remote().await?;
        let visible = filter_tracks(&remote, search.unwrap_or_default());
        info!(count = visible.len(), replace, "Importing Drive files");

        if replace {
            let mut selection = Selection::new();
            selection.select_all_in(visible.iter().copied());
            self.playlist.set(selection.resolve(&remote)).await?;
        } else {
            let new: Vec<Track> = visible.into_iter().cloned().collect();
            self.playlist.add(new).await?;
        }
        println!("{} tracks in playlist", self.playlist.len().await);
        Ok(())
    }

    pub async fn list(&self, search: Option<&str>) -> Result<()> {
        self.restore_cursor().await?;
        let snapshot = self.playlist.snapshot().await;
        let active = snapshot.active.as_ref().map(|t| t.id.as_str());
        let blobs = self.blobs();

        for track in filter_tracks(&snapshot.tracks, search.unwrap_or_default()) {
            let marker = if Some(track.id.as_str()) == active { '>' } else { ' ' };
            let cached = if blobs.contains(&track.id).await? { "cached" } else { "" };
            println!("{} {}\t{}\t{}", marker, track.id, track.name, cached);
        }
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.restore_cursor().await?;
        self.playlist.delete(id).await?;
        self.save_cursor().await
    }

    pub async fn move_track(&self, target: &str, before: Option<&str>) -> Result<()> {
        if self.playlist.tracks().await.iter().all(|t| t.id != target) {
            bail!("{} is not in the playlist", target);
        }
        self.playlist.place(target, before).await?;
        Ok(())
    }

    /// Caches `ids`, or the whole playlist when empty
    pub async fn cache(&self, ids: Vec<String>) -> Result<()> {
        let ids = if ids.is_empty() {
            self.playlist.tracks().await.into_iter().map(|t| t.id).collect()
        } else {
            ids
        };

        let account = self.account()?;
        let report = self.resolver(account.clone())?.precache(ids).await;
        account.release_token().await;

        println!(
            "{} cached, {} already cached, {} failed",
            report.cached.len(),
            report.already_cached.len(),
            report.failed.len()
        );
        for (id, err) in &report.failed {
            println!("  {}: {}", id, err);
        }
        if !report.is_complete() {
            bail!("{} tracks could not be cached", report.failed.len());
        }
        Ok(())
    }

    /// Picks the track to play and writes its content to `output`
    pub async fn play(
        &self,
        id: Option<&str>,
        direction: Option<Direction>,
        output: Option<&Path>,
    ) -> Result<()> {
        self.restore_cursor().await?;
        if let Some(id) = id {
            self.playlist.select_active(id).await;
        }
        let track = match direction {
            Some(direction) => self.playlist.navigate(direction).await,
            None => match self.playlist.active().await {
                Some(track) => Some(track),
                None => self.playlist.navigate(Direction::Next).await,
            },
        };
        let Some(track) = track else {
            bail!("The playlist is empty");
        };
        self.save_cursor().await?;

        let account = self.account()?;
        let resolver = self.resolver(account.clone())?;
        let resolved = resolver.resolve(&track.id).await;
        account.release_token().await;
        let handle = resolved?;

        match output {
            Some(path) => {
                tokio::fs::write(path, &handle.content).await?;
                println!("{} -> {} ({} bytes)", track.name, path.display(), handle.len());
            }
            None => println!("{}\t{}\t{} bytes", track.name, handle.url, handle.len()),
        }
        resolver.release(&handle);
        Ok(())
    }

    /// The cursor is not part of the playlist state, the command line keeps
    /// it in its own store
    async fn restore_cursor(&self) -> Result<()> {
        let session = self.db.namespace(SESSION_STORE);
        if let Some(id) = load_json::<String>(&session, ACTIVE_KEY).await? {
            debug!(id = %id, "Restoring active track");
            self.playlist.select_active(&id).await;
        }
        Ok(())
    }

    async fn save_cursor(&self) -> Result<()> {
        let session = self.db.namespace(SESSION_STORE);
        match self.playlist.active().await {
            Some(track) => save_json(&session, ACTIVE_KEY, &track.id).await?,
            None => {
                session.delete(ACTIVE_KEY).await?;
            }
        }
        Ok(())
    }
}
