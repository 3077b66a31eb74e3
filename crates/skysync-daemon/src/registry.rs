//! Provider registry
//!
//! Maps a [`ProviderKind`] to a concrete remote store constructor. Stores
//! are built per folder at startup and injected into the engine, so adding
//! a provider means adding one match arm here; nothing global, nothing
//! lazy.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use skysync_core::config::{AuthConfig, FolderSyncConfig};
use skysync_core::domain::newtypes::ProviderKind;
use skysync_core::ports::remote_store::IRemoteStore;
use skysync_drive::provider::DriveStore;

/// Builds remote stores from provider kinds and credential settings
pub struct ProviderRegistry {
    auth: AuthConfig,
}

impl ProviderRegistry {
    /// Creates a registry using the given credential settings
    pub fn new(auth: AuthConfig) -> Self {
        Self { auth }
    }

    /// Constructs a store for one provider
    ///
    /// Each call returns a fresh store with its own session state; folders
    /// sharing a provider still sync independently.
    pub fn create_store(&self, provider: ProviderKind) -> Arc<dyn IRemoteStore> {
        match provider {
            ProviderKind::GoogleDrive => Arc::new(DriveStore::new(
                self.auth.token_path(),
                self.auth.client_secret_path(),
            )),
        }
    }

    /// Builds the per-folder store map consumed by the sync engine
    pub fn build_stores(
        &self,
        folders: &[FolderSyncConfig],
    ) -> HashMap<String, Arc<dyn IRemoteStore>> {
        folders
            .iter()
            .map(|folder| {
                debug!(
                    folder = %folder.name,
                    provider = %folder.provider,
                    "Registering remote store"
                );
                (folder.name.clone(), self.create_store(folder.provider))
            })
            .collect()
    }
}
