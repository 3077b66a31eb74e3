//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Cloud storage operations (Google Drive, future providers)
//! - [`INotificationService`] - Desktop notifications for reconnection prompts

pub mod notification;
pub mod remote_store;

pub use notification::{INotificationService, ReconnectRequest};
pub use remote_store::{IRemoteStore, StoreError, UploadReport};
