//! Per-cycle synchronization outcomes

use serde::{Deserialize, Serialize};

/// Terminal status of one sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// The cycle completed; counts reflect the work performed
    Success,
    /// The provider requires user re-authorization
    AuthRequired,
    /// A transient connectivity failure ended the cycle; the next
    /// scheduled tick retries
    TransientNetwork,
    /// An unrecoverable failure for this cycle (logged with full detail)
    Fatal,
    /// The tick was dropped because a cycle for the same folder was
    /// already in flight
    SkippedOverlap,
}

/// Summary of one sync cycle for one folder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Files created remotely
    pub created: u32,
    /// Files whose remote content was overwritten
    pub updated: u32,
    /// Files left untouched (remote checksum matched)
    pub skipped: u32,
    /// Terminal status of the cycle
    pub status: CycleStatus,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl SyncOutcome {
    /// An outcome with zero counts and the given status
    #[must_use]
    pub fn empty(status: CycleStatus) -> Self {
        Self {
            created: 0,
            updated: 0,
            skipped: 0,
            status,
            duration_ms: 0,
        }
    }

    /// Total number of files examined during the cycle
    #[must_use]
    pub fn total(&self) -> u32 {
        self.created + self.updated + self.skipped
    }

    /// Returns true if the cycle performed no remote writes
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }
}
