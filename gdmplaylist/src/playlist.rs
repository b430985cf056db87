//! Ordered track list with its active cursor
//!
//! Pure state, no I/O: [`crate::PlaylistStore`] applies these operations to
//! a copy and commits it once persisted.

use crate::action::{Direction, PlaylistAction};
use crate::Track;
use std::collections::HashSet;
use tracing::debug;

/// Track list plus the id of the active track
///
/// Invariants kept by every operation:
/// - no two tracks share an id
/// - an empty list has no cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<Track>,
    active: Option<String>,
}

impl Playlist {
    /// Builds a playlist, dropping later duplicates of an id
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: dedup(tracks),
            active: None,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Id held by the cursor, even if stale
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active track, resolved against the current list
    pub fn active(&self) -> Option<&Track> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    pub fn apply(&mut self, action: PlaylistAction) {
        match action {
            PlaylistAction::Add(tracks) => self.add(tracks),
            PlaylistAction::Delete { id } => self.delete(&id),
            PlaylistAction::Place { target, to } => self.place(&target, to.as_deref()),
            PlaylistAction::Set(tracks) => self.set(tracks),
        }
    }

    /// Updates names of known ids in place and appends unknown ones
    ///
    /// The cursor is left alone.
    pub fn add(&mut self, tracks: Vec<Track>) {
        let mut appended: Vec<Track> = Vec::new();
        for track in tracks {
            if let Some(existing) = self.tracks.iter_mut().find(|t| t.id == track.id) {
                existing.name = track.name;
            } else if let Some(pending) = appended.iter_mut().find(|t| t.id == track.id) {
                pending.name = track.name;
            } else {
                appended.push(track);
            }
        }
        self.tracks.extend(appended);
    }

    pub fn delete(&mut self, id: &str) {
        self.tracks.retain(|t| t.id != id);
        self.repair_cursor();
    }

    /// Moves `target` immediately before `to`
    ///
    /// `to` missing or unknown moves `target` to the end. Unknown `target`
    /// is a no-op.
    pub fn place(&mut self, target: &str, to: Option<&str>) {
        let Some(index) = self.position(target) else {
            return;
        };
        let track = self.tracks.remove(index);
        let to_index = to
            .and_then(|to| self.position(to))
            .unwrap_or(self.tracks.len());
        self.tracks.insert(to_index, track);
    }

    pub fn set(&mut self, tracks: Vec<Track>) {
        self.tracks = dedup(tracks);
        self.repair_cursor();
    }

    /// Points the cursor at `id`
    ///
    /// An id absent from the list is repaired to the first track.
    pub fn select(&mut self, id: &str) {
        self.active = Some(id.to_string());
        self.repair_cursor();
    }

    /// Moves the cursor one step, wrapping at both ends
    ///
    /// An unset or stale cursor goes to the first track instead.
    pub fn navigate(&mut self, direction: Direction) {
        let Some(first) = self.tracks.first() else {
            self.active = None;
            return;
        };

        let Some(current) = self.active.as_deref().and_then(|id| self.position(id)) else {
            debug!("Cursor not in playlist, moving to first track");
            self.active = Some(first.id.clone());
            return;
        };

        let len = self.tracks.len();
        let next = match direction {
            Direction::Next => (current + 1) % len,
            Direction::Prev => (current + len - 1) % len,
        };
        self.active = Some(self.tracks[next].id.clone());
    }

    /// Clears the cursor on an empty list, resets a stale one to the first
    /// track
    ///
    /// Returns `true` if the cursor changed.
    pub fn repair_cursor(&mut self) -> bool {
        let repaired = match (&self.active, self.tracks.first()) {
            (None, _) => return false,
            (Some(_), None) => None,
            (Some(id), Some(first)) => {
                if self.tracks.iter().any(|t| &t.id == id) {
                    return false;
                }
                Some(first.id.clone())
            }
        };
        debug!(from = ?self.active, to = ?repaired, "Repaired playlist cursor");
        self.active = repaired;
        true
    }
}

fn dedup(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}
