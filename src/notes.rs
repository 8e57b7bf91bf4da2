//! In-memory notes
//!
//! Notes are keyed by title and live only as long as the process. They are
//! exposed both through tools and as `note://internal/{title}` resources.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// URI prefix for note resources
pub const NOTE_URI_PREFIX: &str = "note://internal/";

/// A titled note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub title: String,
    pub content: String,
}

impl Note {
    /// Resource URI for this note, title percent-encoded
    pub fn uri(&self) -> String {
        format!("{}{}", NOTE_URI_PREFIX, urlencoding::encode(&self.title))
    }
}

/// Shared note map; clones see the same notes
#[derive(Clone, Default)]
pub struct NoteStore {
    notes: Arc<RwLock<BTreeMap<String, Note>>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by title, returning whether a note was replaced
    pub fn add(&self, title: impl Into<String>, content: impl Into<String>) -> bool {
        let title = title.into();
        let note = Note {
            title: title.clone(),
            content: content.into(),
        };
        let mut notes = self.notes.write().unwrap_or_else(|e| e.into_inner());
        notes.insert(title, note).is_some()
    }

    pub fn get(&self, title: &str) -> Option<Note> {
        let notes = self.notes.read().unwrap_or_else(|e| e.into_inner());
        notes.get(title).cloned()
    }

    /// Look a note up by its resource URI
    pub fn get_by_uri(&self, uri: &str) -> Option<Note> {
        let encoded = uri.strip_prefix(NOTE_URI_PREFIX)?;
        let title = urlencoding::decode(encoded).ok()?;
        self.get(&title)
    }

    /// All notes sorted by title
    pub fn list(&self) -> Vec<Note> {
        let notes = self.notes.read().unwrap_or_else(|e| e.into_inner());
        notes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.notes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_overwrites_by_title() {
        let store = NoteStore::new();
        assert!(!store.add("todo", "first"));
        assert!(store.add("todo", "second"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("todo").unwrap().content, "second");
    }

    #[test]
    fn test_list_is_sorted_and_shared_between_clones() {
        let store = NoteStore::new();
        let clone = store.clone();
        clone.add("zeta", "z");
        clone.add("alpha", "a");

        let titles: Vec<String> = store.list().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_uri_round_trip() {
        let store = NoteStore::new();
        store.add("design", "notes");
        let note = store.get("design").unwrap();

        assert_eq!(note.uri(), "note://internal/design");
        assert_eq!(store.get_by_uri(&note.uri()), Some(note));
        assert!(store.get_by_uri("file:///design").is_none());
    }

    #[test]
    fn test_uri_encodes_spaces_and_slashes() {
        let store = NoteStore::new();
        store.add("my plan/v2", "draft");
        let note = store.get("my plan/v2").unwrap();

        assert_eq!(note.uri(), "note://internal/my%20plan%2Fv2");
        assert_eq!(store.get_by_uri(&note.uri()), Some(note));
        assert!(store.get_by_uri("note://internal/%FF").is_none());
    }
}
