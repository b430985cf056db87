//! Mutations accepted by the playlist store

use crate::Track;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One mutation of the ordered track list
///
/// Serialized as `{"type": "...", "value": ...}`, the format used by
/// [`crate::PlaylistStore::dispatch_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PlaylistAction {
    /// Renames known tracks in place, appends the others in input order
    Add(Vec<Track>),
    /// Removes the track with this id, if present
    #[serde(rename = "del", alias = "delete")]
    Delete { id: String },
    /// Moves `target` right before `to`, or to the end
    Place {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    /// Replaces the whole list
    Set(Vec<Track>),
}

impl PlaylistAction {
    /// Wire names of the action kinds, in declaration order
    pub const KINDS: [&'static str; 4] = ["add", "del", "place", "set"];

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    pub fn place(target: impl Into<String>, to: Option<&str>) -> Self {
        Self::Place {
            target: target.into(),
            to: to.map(str::to_string),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Delete { .. } => "del",
            Self::Place { .. } => "place",
            Self::Set(_) => "set",
        }
    }

    /// Whether `kind` names an action, `delete` being accepted for `del`
    pub fn is_known_kind(kind: &str) -> bool {
        kind == "delete" || Self::KINDS.contains(&kind)
    }
}

impl fmt::Display for PlaylistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(tracks) => write!(f, "add({} tracks)", tracks.len()),
            Self::Delete { id } => write!(f, "del({})", id),
            Self::Place { target, to: Some(to) } => write!(f, "place({} before {})", target, to),
            Self::Place { target, to: None } => write!(f, "place({} at end)", target),
            Self::Set(tracks) => write!(f, "set({} tracks)", tracks.len()),
        }
    }
}

/// Cursor movement, wrapping at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let action = PlaylistAction::place("b", Some("a"));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "place", "value": {"target": "b", "to": "a"}})
        );

        let action: PlaylistAction =
            serde_json::from_value(json!({"type": "del", "value": {"id": "x"}})).unwrap();
        assert_eq!(action, PlaylistAction::delete("x"));
    }

    #[test]
    fn test_delete_alias() {
        let action: PlaylistAction =
            serde_json::from_value(json!({"type": "delete", "value": {"id": "x"}})).unwrap();
        assert_eq!(action.kind(), "del");
    }

    #[test]
    fn test_place_without_to() {
        let action: PlaylistAction =
            serde_json::from_value(json!({"type": "place", "value": {"target": "b"}})).unwrap();
        assert_eq!(action, PlaylistAction::place("b", None));
        assert_eq!(action.to_string(), "place(b at end)");
    }

    #[test]
    fn test_known_kinds() {
        assert!(PlaylistAction::is_known_kind("add"));
        assert!(PlaylistAction::is_known_kind("delete"));
        assert!(!PlaylistAction::is_known_kind("shuffle"));
    }
}
