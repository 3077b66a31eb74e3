//! Per-folder cycle scheduling
//!
//! Each configured folder gets its own timer task: an interval at the
//! folder's configured period, with the first cycle running immediately on
//! startup. Folders tick independently, so a slow cycle in one folder
//! never delays another. Overlap within a folder is the engine's problem;
//! a tick that lands mid-cycle comes back as
//! [`CycleStatus::SkippedOverlap`](skysync_core::domain::CycleStatus) and
//! is merely logged here.
//!
//! Shutdown is cooperative through a [`CancellationToken`]: cancelling
//! stops every folder task at its next await point.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skysync_core::config::FolderSyncConfig;
use skysync_core::domain::CycleStatus;

use crate::engine::SyncEngine;

// ============================================================================
// SyncScheduler
// ============================================================================

/// Spawns and owns the timer task of every configured folder
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    cancel: CancellationToken,
}

impl SyncScheduler {
    /// Creates a scheduler driving the given engine
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            cancel: CancellationToken::new(),
        }
    }

    /// A token that is cancelled when the scheduler shuts down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns one timer task per folder
    pub fn spawn_all(&self, folders: &[FolderSyncConfig]) -> Vec<JoinHandle<()>> {
        folders
            .iter()
            .cloned()
            .map(|folder| self.spawn_folder(folder))
            .collect()
    }

    /// Spawns the timer task for a single folder
    ///
    /// The first cycle runs immediately; later cycles follow the folder's
    /// interval.
    pub fn spawn_folder(&self, folder: FolderSyncConfig) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let cancel = self.cancel.clone();

        info!(
            folder = %folder.name,
            interval_secs = folder.interval_secs,
            "Scheduling folder"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(folder.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(folder = %folder.name, "Scheduler task stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let outcome = engine.run_cycle(&folder).await;
                        match outcome.status {
                            CycleStatus::Success => debug!(
                                folder = %folder.name,
                                total = outcome.total(),
                                duration_ms = outcome.duration_ms,
                                "Cycle finished"
                            ),
                            CycleStatus::SkippedOverlap => {
                                debug!(folder = %folder.name, "Tick skipped, cycle in flight")
                            }
                            status => warn!(
                                folder = %folder.name,
                                ?status,
                                "Cycle did not complete"
                            ),
                        }
                    }
                }
            }
        })
    }

    /// Requests cooperative shutdown of all folder tasks
    pub fn shutdown(&self) {
        info!("Scheduler shutting down");
        self.cancel.cancel();
    }
}

// ============================================================================
// Unit tests
// ============================================================================
