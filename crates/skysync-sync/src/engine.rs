//! Sync cycle orchestration
//!
//! The [`SyncEngine`] runs one folder's cycle end to end: collect local
//! files, optionally collapse them into an archive, drive the remote
//! store's upload protocol, and classify the result. All failures are
//! converted into a [`CycleStatus`] here; callers only log outcomes.
//!
//! ## Reconnection protocol
//!
//! When the store reports [`StoreError::AuthorizationRequired`], the
//! folder enters a pending-reconnect state and exactly one
//! [`ReconnectRequest`] notification goes out. Further failing cycles stay
//! silent. [`SyncEngine::resume`] leaves the state, opens an interactive
//! session, and runs one immediate cycle; if authorization fails again in
//! that cycle the folder returns to pending without a second prompt.
//!
//! ## Overlap guard
//!
//! Each folder runs at most one cycle at a time. A tick that arrives while
//! the previous cycle is still in flight is dropped with
//! [`CycleStatus::SkippedOverlap`] rather than queued, so a slow network
//! can never build a backlog.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, error, info, instrument, warn};

use skysync_core::config::FolderSyncConfig;
use skysync_core::domain::{CycleStatus, LocalFileEntry, SyncOutcome};
use skysync_core::ports::notification::{INotificationService, ReconnectRequest};
use skysync_core::ports::remote_store::{IRemoteStore, StoreError, UploadReport};

use crate::archive::build_archive;
use crate::collector::FileCollector;

/// Where compressed-folder archives are assembled before upload
fn archive_staging_dir() -> PathBuf {
    std::env::temp_dir().join("skysync")
}

/// Removes a folder's in-flight marker when the cycle ends
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Drives sync cycles for all configured folders
///
/// One engine per daemon. Holds a remote store per folder (folders may
/// target different providers or accounts) plus the shared notification
/// service, and keeps per-folder in-flight and pending-reconnect state.
pub struct SyncEngine {
    /// Remote store per folder name
    stores: HashMap<String, Arc<dyn IRemoteStore>>,
    /// Desktop notification sink
    notifier: Arc<dyn INotificationService>,
    /// Folders currently running a cycle
    in_flight: DashMap<String, ()>,
    /// Folders waiting for the user to reconnect
    pending_reconnect: DashMap<String, ()>,
}

impl SyncEngine {
    /// Creates an engine over per-folder stores and a notification sink
    pub fn new(
        stores: HashMap<String, Arc<dyn IRemoteStore>>,
        notifier: Arc<dyn INotificationService>,
    ) -> Self {
        Self {
            stores,
            notifier,
            in_flight: DashMap::new(),
            pending_reconnect: DashMap::new(),
        }
    }

    /// Whether a folder is waiting for user reconnection
    pub fn is_reconnect_pending(&self, folder: &str) -> bool {
        self.pending_reconnect.contains_key(folder)
    }

    /// Runs one sync cycle for a folder
    ///
    /// Never returns an error; every failure mode maps onto the outcome's
    /// [`CycleStatus`] and is logged here.
    #[instrument(skip(self, folder), fields(folder = %folder.name))]
    pub async fn run_cycle(&self, folder: &FolderSyncConfig) -> SyncOutcome {
        self.cycle(folder, false).await
    }

    /// Cycle body shared by scheduled ticks and resume catch-up runs
    ///
    /// `resumed` marks the one cycle that follows an interactive
    /// reconnection; an authorization failure there stays silent instead
    /// of prompting the user a second time.
    async fn cycle(&self, folder: &FolderSyncConfig, resumed: bool) -> SyncOutcome {
        if self.in_flight.insert(folder.name.clone(), ()).is_some() {
            debug!("Previous cycle still in flight, dropping tick");
            return SyncOutcome::empty(CycleStatus::SkippedOverlap);
        }
        let _guard = InFlightGuard {
            map: &self.in_flight,
            key: folder.name.clone(),
        };

        let started = Instant::now();
        let status = match self.upload_pass(folder).await {
            Ok(report) => {
                info!(
                    created = report.created,
                    updated = report.updated,
                    skipped = report.skipped,
                    "Cycle complete"
                );
                let outcome = SyncOutcome {
                    created: report.created,
                    updated: report.updated,
                    skipped: report.skipped,
                    status: CycleStatus::Success,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                if outcome.is_noop() {
                    debug!("Nothing to synchronize");
                }
                return outcome;
            }
            Err(e) => self.classify_failure(folder, e, resumed).await,
        };

        let mut outcome = SyncOutcome::empty(status);
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    /// Resumes a folder after the user reconnected
    ///
    /// Clears the pending state, opens an interactive session (a browser
    /// login may start), and runs one immediate cycle.
    #[instrument(skip(self, folder), fields(folder = %folder.name))]
    pub async fn resume(&self, folder: &FolderSyncConfig) -> SyncOutcome {
        let was_pending = self.pending_reconnect.remove(&folder.name).is_some();
        if !was_pending {
            debug!("Resume requested for a folder not waiting on reconnection");
        }

        let Some(store) = self.stores.get(&folder.name) else {
            error!("No remote store registered for folder");
            return SyncOutcome::empty(CycleStatus::Fatal);
        };

        if let Err(e) = store.ensure_session(true).await {
            error!(error = %e, "Interactive session establishment failed");
            // Back to pending so the next user action can try again; the
            // prompt was already shown, do not notify twice.
            self.pending_reconnect.insert(folder.name.clone(), ());
            return SyncOutcome::empty(CycleStatus::AuthRequired);
        }

        info!("Session re-established, running catch-up cycle");
        self.cycle(folder, true).await
    }

    /// Collects, optionally archives, and uploads one folder's files
    async fn upload_pass(&self, folder: &FolderSyncConfig) -> Result<UploadReport, StoreError> {
        let store = self
            .stores
            .get(&folder.name)
            .ok_or_else(|| {
                StoreError::Unexpected(anyhow::anyhow!(
                    "No remote store registered for folder '{}'",
                    folder.name
                ))
            })?
            .clone();

        // Credential problems surface before any local work happens, even
        // for a folder with nothing to upload.
        store.ensure_session(false).await?;

        let collector = FileCollector::new(&folder.exclude)
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?;

        // Traversal and hashing are blocking filesystem work.
        let local_path = folder.local_path.clone();
        let files = tokio::task::spawn_blocking(move || collector.collect(&local_path))
            .await
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?;

        if files.is_empty() {
            debug!("No files to synchronize");
            return Ok(UploadReport::default());
        }

        let remote_root = folder
            .remote_root()
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?;

        if folder.compress {
            let name = folder.name.clone();
            let archive = tokio::task::spawn_blocking(move || {
                build_archive(&name, &files, &archive_staging_dir())
            })
            .await
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?
            .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?;

            let result = store
                .upload_files(&remote_root, std::slice::from_ref(&archive), None)
                .await;
            remove_staged_archive(&archive);
            result
        } else {
            store
                .upload_files(&remote_root, &files, Some(&folder.local_path))
                .await
        }
    }

    /// Maps a store failure onto a cycle status, with side effects
    ///
    /// Authorization failures enter the pending-reconnect state and
    /// trigger the single notification; transient failures only warn.
    async fn classify_failure(
        &self,
        folder: &FolderSyncConfig,
        e: StoreError,
        resumed: bool,
    ) -> CycleStatus {
        match e {
            StoreError::MissingCredentialFile(path) => {
                error!(
                    path = %path.display(),
                    "Credential file missing; complete the initial authorization"
                );
                CycleStatus::Fatal
            }
            StoreError::AuthorizationRequired(provider) => {
                let newly_pending = self
                    .pending_reconnect
                    .insert(folder.name.clone(), ())
                    .is_none();
                if resumed {
                    // The prompt for this arc already fired and stays
                    // actionable; the folder goes back to pending silently.
                    error!(%provider, "Authorization failed again after reconnecting");
                } else if newly_pending {
                    warn!(%provider, "Authorization required, pausing folder until reconnected");
                    let request = ReconnectRequest::new(folder.name.clone(), provider);
                    if let Err(notify_err) =
                        self.notifier.notify_reconnection_required(&request).await
                    {
                        warn!(error = %format!("{notify_err:#}"), "Reconnect notification failed");
                    }
                } else {
                    warn!(%provider, "Authorization still required, prompt already pending");
                }
                CycleStatus::AuthRequired
            }
            StoreError::TransientConnectivity(detail) => {
                warn!(detail, "Transient connectivity failure, will retry next tick");
                CycleStatus::TransientNetwork
            }
            StoreError::Unexpected(err) => {
                error!(error = %format!("{err:#}"), "Cycle failed unexpectedly");
                // Users get a generic pointer; the detail stays in the log.
                let message = format!(
                    "Synchronization of \"{}\" failed; check the logs",
                    folder.name
                );
                if let Err(notify_err) = self.notifier.notify_generic_error(&message).await {
                    warn!(error = %format!("{notify_err:#}"), "Error notification failed");
                }
                CycleStatus::Fatal
            }
        }
    }
}

/// Removes a staged archive, logging rather than failing on error
fn remove_staged_archive(archive: &LocalFileEntry) {
    if let Err(e) = std::fs::remove_file(&archive.absolute) {
        warn!(
            archive = %archive.absolute.display(),
            error = %e,
            "Failed to remove staged archive"
        );
    }
}

// ============================================================================
// Unit tests
// ============================================================================
