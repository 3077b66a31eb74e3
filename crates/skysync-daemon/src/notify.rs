//! Desktop notifications
//!
//! Talks to `org.freedesktop.Notifications` on the session bus. A
//! reconnect notification carries one action button; when the user clicks
//! it, the `ActionInvoked` signal maps the notification id back to the
//! folder name and the daemon resumes that folder interactively.
//!
//! On a headless host without a session bus the daemon degrades to
//! [`LogOnlyNotifier`] instead of failing to start.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use zbus::export::futures_util::StreamExt;

use skysync_core::ports::notification::{INotificationService, ReconnectRequest};

/// Application name shown by the notification daemon
const APP_NAME: &str = "SkySync";

/// Action key attached to reconnect notifications
const RECONNECT_ACTION: &str = "reconnect";

/// Expiry for reconnect notifications; zero means the notification stays
/// until dismissed or acted on
const RECONNECT_TIMEOUT_MS: i32 = 0;

// ============================================================================
// Notifications proxy
// ============================================================================

#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    async fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    #[zbus(signal)]
    async fn action_invoked(&self, id: u32, action_key: String) -> zbus::Result<()>;
}

// ============================================================================
// DesktopNotificationService
// ============================================================================

/// Notification adapter backed by the freedesktop notification daemon
pub struct DesktopNotificationService {
    proxy: NotificationsProxy<'static>,
    /// Notification id to folder name for reconnect notifications
    /// still awaiting an action
    pending: Arc<Mutex<HashMap<u32, String>>>,
}

impl DesktopNotificationService {
    /// Connects to the session bus and starts the action listener
    ///
    /// Invoked reconnect actions are forwarded as folder names over
    /// `resume_tx`.
    ///
    /// # Errors
    /// Returns an error if the session bus is unavailable or the
    /// notification service cannot be reached.
    pub async fn connect(resume_tx: mpsc::Sender<String>) -> anyhow::Result<Self> {
        let connection = zbus::Connection::session().await?;
        let proxy = NotificationsProxy::new(&connection).await?;

        let pending: Arc<Mutex<HashMap<u32, String>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut actions = proxy.receive_action_invoked().await?;
        let listener_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(signal) = actions.next().await {
                let args = match signal.args() {
                    Ok(args) => args,
                    Err(e) => {
                        warn!(error = %e, "Failed to decode ActionInvoked signal");
                        continue;
                    }
                };

                if args.action_key != RECONNECT_ACTION {
                    continue;
                }

                let folder = listener_pending.lock().await.remove(&args.id);
                match folder {
                    Some(folder) => {
                        info!(folder = %folder, "Reconnect action invoked");
                        if resume_tx.send(folder).await.is_err() {
                            // Daemon is shutting down; stop listening.
                            break;
                        }
                    }
                    None => {
                        debug!(id = args.id, "Action for an unknown notification, ignoring");
                    }
                }
            }
        });

        info!("Desktop notification service connected");
        Ok(Self { proxy, pending })
    }
}

#[async_trait]
impl INotificationService for DesktopNotificationService {
    async fn notify_reconnection_required(
        &self,
        request: &ReconnectRequest,
    ) -> anyhow::Result<()> {
        let summary = format!("{APP_NAME}: reconnection required");
        let body = reconnect_body(request);

        let id = self
            .proxy
            .notify(
                APP_NAME,
                0,
                "dialog-password",
                &summary,
                &body,
                &[RECONNECT_ACTION, "Reconnect now"],
                HashMap::new(),
                RECONNECT_TIMEOUT_MS,
            )
            .await?;

        self.pending.lock().await.insert(id, request.folder.clone());
        debug!(id, folder = %request.folder, "Reconnect notification shown");
        Ok(())
    }

    async fn notify_generic_error(&self, message: &str) -> anyhow::Result<()> {
        self.proxy
            .notify(
                APP_NAME,
                0,
                "dialog-error",
                &format!("{APP_NAME} error"),
                message,
                &[],
                HashMap::new(),
                -1,
            )
            .await?;
        Ok(())
    }
}

/// Body text of a reconnect notification
fn reconnect_body(request: &ReconnectRequest) -> String {
    format!(
        "Folder \"{}\" can no longer reach {}. Click to sign in again.",
        request.folder,
        request.provider.display_name()
    )
}

// ============================================================================
// LogOnlyNotifier - headless fallback
// ============================================================================

/// Fallback notifier used when no session bus is available
///
/// Reconnect requests are only logged; the user must restart the daemon
/// in a desktop session to re-authorize.
pub struct LogOnlyNotifier;

#[async_trait]
impl INotificationService for LogOnlyNotifier {
    async fn notify_reconnection_required(
        &self,
        request: &ReconnectRequest,
    ) -> anyhow::Result<()> {
        warn!(
            folder = %request.folder,
            provider = %request.provider,
            "Reconnection required but no notification service is available"
        );
        Ok(())
    }

    async fn notify_generic_error(&self, message: &str) -> anyhow::Result<()> {
        warn!(message, "Sync error");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
