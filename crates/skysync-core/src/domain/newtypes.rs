//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// ProviderKind
// ============================================================================

/// Closed set of supported cloud providers
///
/// Adding a provider means adding a variant here and registering a
/// constructor for it in the daemon's provider registry; the sync engine
/// itself never dispatches on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Drive (reference implementation)
    #[serde(alias = "gdrive", alias = "googledrive")]
    GoogleDrive,
}

impl ProviderKind {
    /// Stable tag used in configuration files and log output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "google_drive",
        }
    }

    /// Human-readable name used in user-facing notifications
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "Google Drive",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google_drive" | "gdrive" | "googledrive" => Ok(ProviderKind::GoogleDrive),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}

// ============================================================================
// RemotePath
// ============================================================================

/// A normalized, slash-delimited remote folder path
///
/// Construction strips leading and trailing separators, so `"/backup/docs/"`,
/// `"backup/docs"` and `"backup/docs/"` all normalize to `"backup/docs"`.
/// The empty path is the provider's root sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemotePath(String);

impl RemotePath {
    /// Creates a normalized remote path
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRemotePath`] if the path contains an
    /// empty segment (e.g. `"a//b"`).
    pub fn new(path: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = path.as_ref().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        if trimmed.split('/').any(|seg| seg.is_empty()) {
            return Err(DomainError::InvalidRemotePath(path.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The provider's root sentinel (empty path)
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns true if this is the provider root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized path string (empty for root)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from left to right (empty iterator for root)
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Appends a local relative path, converting OS separators to `/`
    ///
    /// Used to preserve subtree structure when a file lives below the
    /// folder's local base path.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRemotePath`] if the relative path
    /// contains non-UTF-8 components.
    pub fn join_relative(&self, rel: &Path) -> Result<Self, DomainError> {
        let mut joined = self.0.clone();
        for component in rel.components() {
            let seg = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| DomainError::InvalidRemotePath(rel.display().to_string()))?;
            if seg == "." {
                continue;
            }
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(seg);
        }
        Self::new(joined)
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0)
        }
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// RemoteFolderId
// ============================================================================

/// Opaque provider-assigned identifier for a remote folder node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteFolderId(String);

impl RemoteFolderId {
    /// Wraps a provider folder id
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidFolderId`] for an empty id.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidFolderId("empty id".to_string()));
        }
        Ok(Self(id))
    }

    /// The provider's root folder sentinel
    ///
    /// Google Drive accepts the literal alias `root` wherever a folder id
    /// is expected.
    #[must_use]
    pub fn root() -> Self {
        Self("root".to_string())
    }

    /// The raw id string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteFolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FileHash
// ============================================================================

/// An MD5 content fingerprint as 32 lowercase hex characters
///
/// MD5 is used because it mirrors the checksum the provider reports for
/// each file; it is a change-detection key, not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHash(String);

impl FileHash {
    /// Validates and wraps an MD5 hex digest (case-insensitive input)
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidHash`] unless the input is exactly
    /// 32 hex characters.
    pub fn new(hash: impl AsRef<str>) -> Result<Self, DomainError> {
        let hash = hash.as_ref();
        if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(hash.to_string()));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// The lowercase hex digest string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// SessionGeneration
// ============================================================================

/// Identifier for one authenticated provider session
///
/// A fresh generation is assigned whenever a session is established or
/// replaced; cached folder resolutions are valid only for the generation
/// that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionGeneration(Uuid);

impl SessionGeneration {
    /// Creates a new random generation id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionGeneration {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionGeneration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Unit tests
// ============================================================================
