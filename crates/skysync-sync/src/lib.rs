//! SkySync synchronization engine
//!
//! This crate carries the provider-independent half of a sync cycle:
//! enumerating local files, optionally collapsing them into an archive,
//! driving the remote store through the upload protocol, and scheduling
//! cycles per configured folder.
//!
//! ## Modules
//!
//! - [`collector`]: Folder traversal with glob-based exclusion
//! - [`archive`]: Zip archive assembly for compressed folders
//! - [`engine`]: Cycle orchestration, error classification, reconnection
//! - [`scheduler`]: Per-folder interval timers and shutdown

pub mod archive;
pub mod collector;
pub mod engine;
pub mod scheduler;
