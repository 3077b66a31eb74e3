//! Domain types and business logic
//!
//! This module contains the core domain types for SkySync:
//! - Newtypes for validated remote paths, folder ids, and content hashes
//! - Local file entries produced by folder enumeration
//! - The change detector that classifies files as create/update/skip
//! - Per-cycle sync outcomes
//! - Domain-specific error types

pub mod change;
pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod outcome;

// Re-export commonly used types
pub use change::{ChangeDetector, FileAction, RemoteFileMetadata};
pub use entry::LocalFileEntry;
pub use errors::DomainError;
pub use newtypes::{FileHash, ProviderKind, RemoteFolderId, RemotePath, SessionGeneration};
pub use outcome::{CycleStatus, SyncOutcome};
