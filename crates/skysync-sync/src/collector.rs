//! Local file collection
//!
//! Enumerates the files under a folder's local root, filtering out
//! anything matching the configured exclude patterns. Patterns are glob
//! expressions tested against the whole path relative to the root, so
//! `*.tmp` drops temp files anywhere in the tree and `target/*` drops a
//! subtree.
//!
//! Traversal is depth-first with entries sorted by file name, so the
//! collected list is deterministic for a given tree. Symbolic links are
//! not followed.

use std::path::Path;

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use skysync_core::domain::{DomainError, LocalFileEntry};

/// Failures while enumerating a local folder
#[derive(Debug, Error)]
pub enum CollectError {
    /// An exclude pattern failed to compile
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern text
        pattern: String,
        /// The glob compile error
        source: glob::PatternError,
    },

    /// An entry could not be read during traversal
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// A traversed path fell outside the root
    #[error(transparent)]
    Domain(#[from] DomainError),
}

// ============================================================================
// FileCollector
// ============================================================================

/// Enumerates sync candidates under a local root
#[derive(Debug)]
pub struct FileCollector {
    excludes: Vec<Pattern>,
}

impl FileCollector {
    /// Compiles the exclude patterns into a collector
    ///
    /// # Errors
    /// Returns [`CollectError::InvalidPattern`] for a malformed glob.
    pub fn new(excludes: &[String]) -> Result<Self, CollectError> {
        let excludes = excludes
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| CollectError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { excludes })
    }

    /// Collects all non-excluded files under `root`
    ///
    /// A root that is itself a regular file yields a single entry whose
    /// relative path is the file name; exclusion applies to it the same
    /// way. A root that does not exist yields an empty set with a warning
    /// so an unmounted drive skips the cycle instead of failing it.
    ///
    /// Exclusion is decided per file: each pattern is tested against the
    /// candidate file's whole relative path, never against intermediate
    /// directory names.
    ///
    /// Blocking; async callers should run this through `spawn_blocking`.
    pub fn collect(&self, root: &Path) -> Result<Vec<LocalFileEntry>, CollectError> {
        if !root.exists() {
            warn!(path = %root.display(), "Local path does not exist, nothing to collect");
            return Ok(Vec::new());
        }

        if root.is_file() {
            let entry = LocalFileEntry::single_file(root)?;
            if self.is_excluded(&entry.relative) {
                debug!(path = %root.display(), "Single-file root excluded");
                return Ok(Vec::new());
            }
            return Ok(vec![entry]);
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

        for dirent in walker {
            let dirent = dirent?;
            if !dirent.file_type().is_file() {
                continue;
            }
            let entry = LocalFileEntry::new(dirent.path(), root)?;
            if self.is_excluded(&entry.relative) {
                trace!(path = %entry.relative.display(), "Excluded file");
                continue;
            }
            trace!(path = %entry.relative.display(), "Collected file");
            entries.push(entry);
        }

        debug!(
            root = %root.display(),
            files = entries.len(),
            "Folder enumeration complete"
        );
        Ok(entries)
    }

    /// Tests a root-relative path against the exclude patterns
    fn is_excluded(&self, relative: &Path) -> bool {
        self.excludes.iter().any(|p| p.matches_path(relative))
    }
}

// ============================================================================
// Unit tests
// ============================================================================
