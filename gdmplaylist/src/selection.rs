//! Multi-selection of tracks, with "select all" scoped to a filtered view

use crate::Track;

/// State of a "select all" checkbox over a filtered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Ordered set of selected track ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection holding the ids of `tracks`
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let mut selection = Self::new();
        for track in tracks {
            selection.select(&track.id);
        }
        selection
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn select(&mut self, id: &str) {
        if !self.is_selected(id) {
            self.ids.push(id.to_string());
        }
    }

    pub fn deselect(&mut self, id: &str) {
        self.ids.retain(|s| s != id);
    }

    /// Flips one id, returns whether it is now selected
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_selected(id) {
            self.deselect(id);
            false
        } else {
            self.select(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// "Select all" over the visible tracks
    ///
    /// Selects every visible track, or deselects them all if they already
    /// were. Selected tracks outside `visible` are kept either way.
    pub fn select_all_in<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a Track>,
        I::IntoIter: Clone,
    {
        let visible = visible.into_iter();
        if self.check_state(visible.clone()) == CheckState::Checked {
            for track in visible {
                self.deselect(&track.id);
            }
        } else {
            for track in visible {
                self.select(&track.id);
            }
        }
    }

    /// Checkbox state for the visible tracks, unchecked when none are visible
    pub fn check_state<'a, I>(&self, visible: I) -> CheckState
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let (mut total, mut selected) = (0usize, 0usize);
        for track in visible {
            total += 1;
            if self.is_selected(&track.id) {
                selected += 1;
            }
        }

        match selected {
            0 => CheckState::Unchecked,
            n if n == total => CheckState::Checked,
            _ => CheckState::Indeterminate,
        }
    }

    /// Selected tracks of `source`, in `source` order
    pub fn resolve(&self, source: &[Track]) -> Vec<Track> {
        source
            .iter()
            .filter(|t| self.is_selected(&t.id))
            .cloned()
            .collect()
    }
}
