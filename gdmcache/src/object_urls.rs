//! Registry of transient `blob:` URLs pointing at in-memory content

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Scheme and authority of minted URLs
pub const URL_PREFIX: &str = "blob:gdmusic/";

struct Entry {
    id: String,
    content: Bytes,
}

#[derive(Default)]
struct Registry {
    by_url: HashMap<String, Entry>,
    // live URL of each track id
    by_id: HashMap<String, String>,
}

/// Mints URLs for content held in memory until they are revoked
///
/// At most one URL is live per track id: minting a new one for an id
/// revokes the previous one, so the registry holds one copy of the content
/// of each track resolved and not yet released.
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct ObjectUrls {
    registry: Arc<RwLock<Registry>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `content` and returns a new `blob:gdmusic/<uuid>` URL
    ///
    /// A URL previously created for `id` is revoked.
    pub fn create(&self, id: &str, content: Bytes) -> String {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        let mut registry = self.registry.write().unwrap();

        if let Some(previous) = registry.by_id.insert(id.to_string(), url.clone()) {
            registry.by_url.remove(&previous);
            debug!(id, url = %previous, "Replaced object URL");
        }
        registry.by_url.insert(
            url.clone(),
            Entry {
                id: id.to_string(),
                content,
            },
        );

        debug!(id, url = %url, "Created object URL");
        url
    }

    pub fn get(&self, url: &str) -> Option<Bytes> {
        self.registry
            .read()
            .unwrap()
            .by_url
            .get(url)
            .map(|entry| entry.content.clone())
    }

    /// Track id the URL was created for
    pub fn id_of(&self, url: &str) -> Option<String> {
        self.registry
            .read()
            .unwrap()
            .by_url
            .get(url)
            .map(|entry| entry.id.clone())
    }

    /// Live URL of a track id, if any
    pub fn url_of(&self, id: &str) -> Option<String> {
        self.registry.read().unwrap().by_id.get(id).cloned()
    }

    /// Forgets the URL, returns `false` if it was unknown
    pub fn revoke(&self, url: &str) -> bool {
        let mut registry = self.registry.write().unwrap();
        let Some(entry) = registry.by_url.remove(url) else {
            return false;
        };
        registry.by_id.remove(&entry.id);
        debug!(url, "Revoked object URL");
        true
    }

    /// Revokes every URL, returns how many there were
    pub fn revoke_all(&self) -> usize {
        let mut registry = self.registry.write().unwrap();
        let count = registry.by_url.len();
        registry.by_url.clear();
        registry.by_id.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.registry.read().unwrap().by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_revoke() {
        let urls = ObjectUrls::new();
        let url = urls.create("a", Bytes::from_static(b"ID3"));

        assert!(url.starts_with(URL_PREFIX));
        assert_eq!(urls.get(&url).unwrap().as_ref(), b"ID3");
        assert_eq!(urls.id_of(&url).as_deref(), Some("a"));
        assert_eq!(urls.url_of("a").as_deref(), Some(url.as_str()));

        assert!(urls.revoke(&url));
        assert!(urls.get(&url).is_none());
        assert!(urls.url_of("a").is_none());
        assert!(!urls.revoke(&url));
    }

    #[test]
    fn test_new_url_replaces_previous_for_same_id() {
        let urls = ObjectUrls::new();
        let first = urls.create("a", Bytes::from_static(b"x"));
        let second = urls.clone().create("a", Bytes::from_static(b"x"));

        assert_ne!(first, second);
        assert!(urls.get(&first).is_none());
        assert!(!urls.revoke(&first));
        assert_eq!(urls.url_of("a").as_deref(), Some(second.as_str()));
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_ids_are_independent() {
        let urls = ObjectUrls::new();
        let a = urls.create("a", Bytes::from_static(b"x"));
        let b = urls.create("b", Bytes::from_static(b"y"));

        assert_eq!(urls.len(), 2);
        assert!(urls.revoke(&a));
        assert_eq!(urls.get(&b).unwrap().as_ref(), b"y");
        assert_eq!(urls.revoke_all(), 1);
        assert!(urls.is_empty());
    }
}
