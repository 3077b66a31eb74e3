//! SkySync Drive - Google Drive adapter
//!
//! Provides the Google Drive implementation of the [`IRemoteStore`] port:
//! - OAuth2 authentication (Authorization Code with PKCE, installed-app
//!   client secret, loopback redirect)
//! - Credential persistence with atomic token-file writes
//! - Drive v3 REST operations (folder lookup/create, metadata queries,
//!   multipart create, media update)
//! - Remote-path to folder-id resolution with a session-scoped cache
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 flow components (browser launch, local callback server)
//! - [`credentials`] - Token storage and the credential broker state machine
//! - [`client`] - Google Drive v3 HTTP client
//! - [`path_cache`] - Remote folder path → id memoization
//! - [`provider`] - [`DriveStore`], the `IRemoteStore` implementation
//!
//! [`IRemoteStore`]: skysync_core::ports::remote_store::IRemoteStore
//! [`DriveStore`]: provider::DriveStore

pub mod auth;
pub mod client;
pub mod credentials;
pub mod path_cache;
pub mod provider;
