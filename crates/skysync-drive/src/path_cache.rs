//! Remote folder path cache
//!
//! Resolving a remote path like `/backups/photos/2026` costs one Drive
//! lookup per segment. Within a sync cycle the same prefixes repeat for
//! every file, so resolved prefixes are cached keyed by their normalized
//! path string.
//!
//! The cache is session-scoped: entries hold folder IDs that are only
//! meaningful for the session that resolved them, so the store clears it
//! whenever a session is re-established, and again at the start of every
//! cycle so remote-side deletions are picked up. Callers serialize access
//! through a mutex held across the whole resolve, which also gives
//! single-flight behavior: concurrent resolutions of the same prefix
//! collapse into one lookup.

use std::collections::HashMap;

use tracing::trace;

use skysync_core::domain::newtypes::{RemoteFolderId, RemotePath};

/// Maps resolved remote path prefixes to their Drive folder IDs
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<String, RemoteFolderId>,
}

impl PathCache {
    /// Creates an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a previously resolved path
    pub fn get(&self, path: &RemotePath) -> Option<&RemoteFolderId> {
        let hit = self.entries.get(path.as_str());
        trace!(path = %path, hit = hit.is_some(), "Path cache lookup");
        hit
    }

    /// Records a resolved path
    pub fn insert(&mut self, path: &RemotePath, folder_id: RemoteFolderId) {
        self.entries.insert(path.as_str().to_string(), folder_id);
    }

    /// Drops all entries
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            trace!(entries = self.entries.len(), "Clearing path cache");
        }
        self.entries.clear();
    }

    /// Number of cached prefixes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
