//! Change detection
//!
//! Classifies each local file against the same-named remote file (if any)
//! as create / update / skip. The identity key is the filename within the
//! target remote folder; the checksum is used only to decide whether the
//! content changed, never to identify the file.
//!
//! Fingerprints are full-content MD5 digests, streamed in fixed-size
//! chunks so memory use stays bounded for arbitrarily large files. MD5
//! mirrors the checksum the provider reports; it is not a security
//! boundary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};
use tracing::debug;

use super::newtypes::FileHash;

/// Read chunk size for streaming digests (8 KiB)
const HASH_CHUNK_SIZE: usize = 8 * 1024;

// ============================================================================
// RemoteFileMetadata
// ============================================================================

/// Metadata of a remote file within one target folder
///
/// Retrieved per file on demand; the checksum may be absent when the
/// provider does not report one for the file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileMetadata {
    /// Provider-specific file identifier
    pub id: String,
    /// File name within the folder
    pub name: String,
    /// Content checksum reported by the provider
    pub checksum: Option<FileHash>,
}

// ============================================================================
// FileAction
// ============================================================================

/// Per-file decision produced by change detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// No remote file of this name exists in the target folder
    Create,
    /// A remote file exists but its content differs; overwrite in place,
    /// preserving the remote id
    Update {
        /// Id of the remote file to overwrite
        remote_id: String,
    },
    /// Remote content matches the local fingerprint
    Skip,
}

// ============================================================================
// ChangeDetector
// ============================================================================

/// Classifies local files against remote metadata
///
/// Never mutates remote state; writes are the remote store's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Computes the streaming MD5 fingerprint of a file
    ///
    /// Blocking; async callers should run this through `spawn_blocking`.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn fingerprint(path: &Path) -> std::io::Result<FileHash> {
        let mut file = File::open(path)?;
        let mut hasher = Md5::new();
        let mut buf = [0u8; HASH_CHUNK_SIZE];

        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        // 32 hex chars by construction
        Ok(FileHash::new(hex).expect("md5 digest is valid hex"))
    }

    /// Decides the action for one local file against its remote counterpart
    ///
    /// - No remote file → [`FileAction::Create`] (no hashing needed)
    /// - Remote checksum equals the local fingerprint → [`FileAction::Skip`]
    /// - Otherwise → [`FileAction::Update`]
    ///
    /// A remote file without a reported checksum is treated as changed,
    /// since equality cannot be proven.
    ///
    /// # Errors
    /// Returns an I/O error if the local file cannot be fingerprinted.
    pub fn classify(
        local: &Path,
        remote: Option<&RemoteFileMetadata>,
    ) -> std::io::Result<FileAction> {
        let Some(remote) = remote else {
            return Ok(FileAction::Create);
        };

        let local_hash = Self::fingerprint(local)?;

        match &remote.checksum {
            Some(remote_hash) if *remote_hash == local_hash => {
                debug!(
                    file = %local.display(),
                    hash = %local_hash,
                    "Remote content up to date, skipping"
                );
                Ok(FileAction::Skip)
            }
            _ => Ok(FileAction::Update {
                remote_id: remote.id.clone(),
            }),
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
