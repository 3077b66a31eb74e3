//! SkySync Daemon - Background folder backup service
//!
//! This binary runs as a systemd user service and handles:
//! - Scheduled one-way synchronization of local folders to cloud storage
//! - Desktop notifications with a reconnect action on authorization loss
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon loads and validates the YAML configuration, builds one
//! remote store per folder, and hands everything to the scheduler, which
//! runs each folder on its own interval task. A `CancellationToken`
//! triggered by SIGTERM or SIGINT stops all tasks.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use skysync_core::config::{Config, FolderSyncConfig, LoggingConfig};
use skysync_core::ports::notification::INotificationService;
use skysync_sync::engine::SyncEngine;
use skysync_sync::scheduler::SyncScheduler;

use crate::notify::{DesktopNotificationService, LogOnlyNotifier};
use crate::registry::ProviderRegistry;

mod notify;
mod registry;

// ============================================================================
// DaemonService struct
// ============================================================================

/// Main daemon service that wires configuration, stores, and the scheduler
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService over validated configuration
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Runs the daemon until a shutdown signal arrives
    ///
    /// 1. Connects the notification adapter (log-only fallback if headless)
    /// 2. Builds one remote store per configured folder
    /// 3. Spawns the per-folder scheduler tasks and the resume consumer
    /// 4. Waits for cancellation, then drains the scheduler tasks
    async fn run(&self) -> Result<()> {
        // Reconnect actions flow back as folder names over this channel.
        let (resume_tx, resume_rx) = mpsc::channel::<String>(16);

        let notifier: Arc<dyn INotificationService> =
            match DesktopNotificationService::connect(resume_tx).await {
                Ok(service) => Arc::new(service),
                Err(e) => {
                    warn!(
                        error = %e,
                        "Session bus unavailable, falling back to log-only notifications"
                    );
                    Arc::new(LogOnlyNotifier)
                }
            };

        let registry = ProviderRegistry::new(self.config.auth.clone());
        let stores = registry.build_stores(&self.config.sync);

        let engine = Arc::new(SyncEngine::new(stores, notifier));
        let scheduler = SyncScheduler::new(Arc::clone(&engine));

        let handles = scheduler.spawn_all(&self.config.sync);
        info!(folders = self.config.sync.len(), "Scheduler started");

        let resume_task = tokio::spawn(resume_consumer(
            Arc::clone(&engine),
            self.config.sync.clone(),
            resume_rx,
            self.shutdown.clone(),
        ));

        self.shutdown.cancelled().await;

        info!("Shutting down scheduler");
        scheduler.shutdown();
        for handle in handles {
            let _ = handle.await;
        }
        let _ = resume_task.await;

        Ok(())
    }
}

// ============================================================================
// Reconnect resume consumer
// ============================================================================

/// Consumes folder names from invoked reconnect actions and resumes them
///
/// Each received name is resolved against the configured folders; the
/// engine then re-authorizes interactively and runs one immediate cycle.
async fn resume_consumer(
    engine: Arc<SyncEngine>,
    folders: Vec<FolderSyncConfig>,
    mut resume_rx: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) {
    loop {
        let name = tokio::select! {
            name = resume_rx.recv() => match name {
                Some(name) => name,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        };

        let Some(folder) = folders.iter().find(|f| f.name == name) else {
            warn!(folder = %name, "Resume requested for an unknown folder");
            continue;
        };

        info!(folder = %name, "Resuming folder after reconnect");
        let outcome = engine.resume(folder).await;
        info!(
            folder = %name,
            status = ?outcome.status,
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            duration_ms = outcome.duration_ms,
            "Resume cycle finished"
        );
    }
}

// ============================================================================
// Tracing initialization
// ============================================================================

/// Initializes tracing from the logging section of the configuration
///
/// `RUST_LOG` overrides the configured level when set. With a log file
/// configured, output goes there without ANSI escapes; otherwise stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .init();
        }
    }

    Ok(())
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let validation_errors = config.validate();
    if !validation_errors.is_empty() {
        for e in &validation_errors {
            eprintln!("configuration error: {e}");
        }
        anyhow::bail!(
            "Invalid configuration ({} error(s)) in {}",
            validation_errors.len(),
            config_path.display()
        );
    }

    init_tracing(&config.logging)?;
    info!(config_path = %config_path.display(), "SkySync daemon starting (skysyncd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("SkySync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "SkySync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
