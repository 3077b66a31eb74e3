//! Local file entries produced by folder enumeration
//!
//! A [`LocalFileEntry`] describes one candidate file within a sync cycle.
//! Entries are created fresh each cycle and discarded when it completes;
//! the content fingerprint is computed lazily by the change detector so
//! files that are later collapsed into an archive are never hashed twice.

use std::path::{Path, PathBuf};

use super::errors::DomainError;

/// One local file selected for synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileEntry {
    /// Absolute path on the local filesystem
    pub absolute: PathBuf,
    /// Path relative to the folder's local root
    pub relative: PathBuf,
}

impl LocalFileEntry {
    /// Builds an entry from an absolute path and the folder root it lives under
    ///
    /// # Errors
    /// Returns [`DomainError::PathNotInRoot`] if `absolute` is not below `root`.
    pub fn new(absolute: impl Into<PathBuf>, root: &Path) -> Result<Self, DomainError> {
        let absolute = absolute.into();
        let relative = absolute
            .strip_prefix(root)
            .map_err(|_| DomainError::PathNotInRoot(absolute.display().to_string()))?
            .to_path_buf();
        Ok(Self { absolute, relative })
    }

    /// Builds an entry for a single-file root (relative path = file name)
    pub fn single_file(absolute: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let absolute = absolute.into();
        let relative = absolute
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| DomainError::PathNotInRoot(absolute.display().to_string()))?;
        Ok(Self { absolute, relative })
    }

    /// The file name component
    ///
    /// Entries always carry at least one path component, so this never
    /// returns an empty string for a well-formed entry.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// The directory part of the relative path (empty for top-level files)
    #[must_use]
    pub fn relative_dir(&self) -> &Path {
        self.relative.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_relative_to_root() {
        let entry =
            LocalFileEntry::new("/data/docs/sub/c.txt", Path::new("/data/docs")).unwrap();
        assert_eq!(entry.relative, PathBuf::from("sub/c.txt"));
        assert_eq!(entry.file_name(), "c.txt");
        assert_eq!(entry.relative_dir(), Path::new("sub"));
    }

    #[test]
    fn test_entry_outside_root() {
        let err = LocalFileEntry::new("/elsewhere/a.txt", Path::new("/data/docs")).unwrap_err();
        assert!(matches!(err, DomainError::PathNotInRoot(_)));
    }

    #[test]
    fn test_single_file_entry() {
        let entry = LocalFileEntry::single_file("/data/notes.txt").unwrap();
        assert_eq!(entry.relative, PathBuf::from("notes.txt"));
        assert_eq!(entry.relative_dir(), Path::new(""));
    }
}
