//! Notification service port (driven/secondary port)
//!
//! This module defines the interface for prompting the user. SkySync uses
//! notifications for exactly two things: asking the user to re-authorize a
//! provider, and surfacing a generic "check logs" message for unexpected
//! failures. Raw error detail never reaches the notification layer.
//!
//! ## Design Notes
//!
//! - Notifications are fire-and-forget; delivery failure is logged by the
//!   adapter and never fails the sync cycle.
//! - A reconnection prompt carries a [`ReconnectRequest`] value — folder
//!   and provider keys, not a captured closure — so the resume action can
//!   be looked up from a table on whatever task handles the user's click.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::ProviderKind;

// ============================================================================
// ReconnectRequest
// ============================================================================

/// Identity of a folder whose provider needs re-authorization
///
/// Enough to look up and re-invoke the correct resume action; safe to send
/// across task boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectRequest {
    /// Folder name (the engine's reconnect-table key)
    pub folder: String,
    /// Provider needing reconnection (shown to the user)
    pub provider: ProviderKind,
}

impl ReconnectRequest {
    /// Creates a request for the given folder and provider
    pub fn new(folder: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            folder: folder.into(),
            provider,
        }
    }
}

// ============================================================================
// INotificationService trait
// ============================================================================

/// Port trait for user-facing prompts
///
/// ## Implementation Notes
///
/// - `notify_reconnection_required` should present an actionable prompt
///   (e.g. a "Reconnect" button) and deliver the user's acceptance back to
///   the engine out of band.
/// - Implementations must swallow and log their own delivery failures;
///   the returned error exists for adapters that want the caller to log
///   it, and callers treat it as best-effort.
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Prompts the user to re-authorize a provider
    ///
    /// # Arguments
    /// * `request` - Folder/provider identity for the resume lookup
    async fn notify_reconnection_required(
        &self,
        request: &ReconnectRequest,
    ) -> anyhow::Result<()>;

    /// Shows a generic error notification without internal detail
    ///
    /// # Arguments
    /// * `message` - Short, user-safe message (e.g. "check logs")
    async fn notify_generic_error(&self, message: &str) -> anyhow::Result<()>;
}
