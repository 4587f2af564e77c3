//! Bookkeeping of local and remote content lines.

use indexmap::IndexMap;
use rjingle_content_core::{ContentDescriptor, MediaType};

/// The two content maps of a leg, keyed by content name.
///
/// Insertion order is the negotiation order and is preserved across
/// updates, so re-offers keep the content lines in their original
/// positions. Updates replace a stored descriptor wholesale.
#[derive(Debug, Default)]
pub struct ContentRegistry {
    local: IndexMap<String, ContentDescriptor>,
    remote: IndexMap<String, ContentDescriptor>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces the local view of a content.
    pub fn upsert_local(&mut self, content: ContentDescriptor) {
        self.local.insert(content.name.clone(), content);
    }

    /// Stores or replaces the remote view of a content.
    pub fn upsert_remote(&mut self, content: ContentDescriptor) {
        self.remote.insert(content.name.clone(), content);
    }

    pub fn local(&self, name: &str) -> Option<&ContentDescriptor> {
        self.local.get(name)
    }

    pub fn remote(&self, name: &str) -> Option<&ContentDescriptor> {
        self.remote.get(name)
    }

    pub fn local_by_media(&self, media: MediaType) -> Option<&ContentDescriptor> {
        self.local.values().find(|c| c.media() == media)
    }

    pub fn remote_by_media(&self, media: MediaType) -> Option<&ContentDescriptor> {
        self.remote.values().find(|c| c.media() == media)
    }

    /// Drops both views of a content. Returns the media type the content
    /// carried, if it was known at all.
    pub fn remove(&mut self, name: &str) -> Option<MediaType> {
        let local = self.local.shift_remove(name);
        let remote = self.remote.shift_remove(name);
        local.or(remote).map(|c| c.media())
    }

    /// Local contents in negotiation order.
    pub fn locals(&self) -> Vec<ContentDescriptor> {
        self.local.values().cloned().collect()
    }

    /// Remote contents in negotiation order.
    pub fn remotes(&self) -> Vec<ContentDescriptor> {
        self.remote.values().cloned().collect()
    }

    pub fn local_names(&self) -> Vec<String> {
        self.local.keys().cloned().collect()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    pub fn clear(&mut self) {
        self.local.clear();
        self.remote.clear();
    }
}
