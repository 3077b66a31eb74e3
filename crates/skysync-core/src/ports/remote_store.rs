//! Remote store port (driven/secondary port)
//!
//! This module defines the interface for one cloud storage provider. The
//! reference implementation targets Google Drive, but the trait is
//! provider-agnostic: it models a remote object store with folders, files,
//! and content checksums. Adding a provider means implementing this trait
//! and registering a constructor; the sync engine never changes.
//!
//! ## Design Notes
//!
//! - Errors are classified into [`StoreError`] at this boundary so the
//!   engine can decide retry vs. terminal without inspecting provider
//!   detail. Anything outside the taxonomy travels as
//!   [`StoreError::Unexpected`].
//! - Implementations own their authenticated session and their path cache;
//!   both are invisible to callers.

use std::path::Path;

use thiserror::Error;

use crate::domain::entry::LocalFileEntry;
use crate::domain::newtypes::{ProviderKind, RemotePath};

// ============================================================================
// StoreError
// ============================================================================

/// Classified failures surfaced by a remote store
///
/// The four variants map one-to-one onto the engine's retry decisions:
/// operator fix, user re-authorization, silent retry on the next tick,
/// and logged-only failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No persisted credential file exists and interactive login was not
    /// permitted. An operator misconfiguration, distinct from an expired
    /// authorization.
    #[error("Missing credential file: {0}")]
    MissingCredentialFile(std::path::PathBuf),

    /// The provider rejected or cannot refresh the current authorization;
    /// a user must complete an interactive login.
    #[error("Authorization required for {0}")]
    AuthorizationRequired(ProviderKind),

    /// The provider host was unreachable or a call timed out. Retryable
    /// on the next scheduled tick without user involvement.
    #[error("Transient connectivity failure: {0}")]
    TransientConnectivity(String),

    /// Anything else; logged with full context at the cycle boundary.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

// ============================================================================
// UploadReport
// ============================================================================

/// Per-call accounting returned by [`IRemoteStore::upload_files`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Files newly created in the remote store
    pub created: u32,
    /// Files whose remote content was overwritten in place
    pub updated: u32,
    /// Files skipped because the remote checksum matched
    pub skipped: u32,
}

impl UploadReport {
    /// Merges another report into this one
    pub fn absorb(&mut self, other: UploadReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for one cloud storage provider
///
/// ## Contract
///
/// - `ensure_session` is idempotent: a valid live session is reused, an
///   expired one refreshed in place, and `interactive = true` additionally
///   permits a browser-based login.
/// - `upload_files` resolves each file's target folder, applies the
///   create/update/skip decision, and tolerates an empty file list as a
///   no-op.
/// - Implementations must classify connectivity failures as
///   [`StoreError::TransientConnectivity`] rather than propagating a
///   generic fault.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// The provider this store talks to
    fn provider(&self) -> ProviderKind;

    /// Ensures an authenticated session is open
    ///
    /// # Arguments
    /// * `interactive` - Whether a browser-based login flow may be started
    ///   if no persisted credential can be used or refreshed
    async fn ensure_session(&self, interactive: bool) -> Result<(), StoreError>;

    /// Uploads files into the folder tree rooted at `remote_root`
    ///
    /// For each file: if `local_base` is given and the file lives under it,
    /// the target folder is `remote_root` extended by the file's directory
    /// relative to `local_base` (subtree structure preserved). Otherwise
    /// the file uploads flat into `remote_root` (the single-archive case).
    ///
    /// # Returns
    /// Per-file accounting of creates, updates, and skips
    async fn upload_files(
        &self,
        remote_root: &RemotePath,
        files: &[LocalFileEntry],
        local_base: Option<&Path>,
    ) -> Result<UploadReport, StoreError>;

    /// Reserved: download remote content to the local folder
    ///
    /// Not required by the one-way sync scope; implementations may return
    /// [`StoreError::Unexpected`] until a bidirectional mode exists.
    async fn download_files(&self) -> Result<(), StoreError>;
}
