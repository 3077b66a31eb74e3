//! Google Drive implementation of the remote store port
//!
//! [`DriveStore`] owns the authenticated Drive session and the per-cycle
//! path cache, and implements the create/update/skip upload protocol on
//! top of [`DriveClient`].
//!
//! ## Session lifecycle
//!
//! A session is a bearer-authenticated client plus a generation id. It is
//! opened lazily, refreshed in place when only the token changed, and
//! dropped when Drive rejects the authorization so the next cycle starts
//! clean. The path cache is tied to the session and additionally cleared
//! at the start of every upload call, so folders deleted remotely between
//! cycles are recreated rather than written into a dead parent.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use skysync_core::domain::newtypes::{ProviderKind, RemoteFolderId, RemotePath, SessionGeneration};
use skysync_core::domain::{ChangeDetector, FileAction, LocalFileEntry};
use skysync_core::ports::remote_store::{IRemoteStore, StoreError, UploadReport};

use crate::client::DriveClient;
use crate::credentials::{CredentialBroker, Tokens};
use crate::path_cache::PathCache;

/// An open, authenticated Drive session
struct DriveSession {
    client: DriveClient,
    generation: SessionGeneration,
}

// ============================================================================
// DriveStore
// ============================================================================

/// Remote store backed by the Google Drive API v3
pub struct DriveStore {
    broker: CredentialBroker,
    session: Mutex<Option<DriveSession>>,
    cache: Mutex<PathCache>,
    /// `(base_url, upload_base_url)` override for tests
    base_urls: Option<(String, String)>,
}

impl DriveStore {
    /// Creates a store reading credentials from the given paths
    ///
    /// No session is opened until the first operation needs one.
    pub fn new(
        token_path: impl Into<std::path::PathBuf>,
        client_secret_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            broker: CredentialBroker::new(token_path, client_secret_path),
            session: Mutex::new(None),
            cache: Mutex::new(PathCache::new()),
            base_urls: None,
        }
    }

    /// Points API traffic at custom base URLs (useful for testing)
    pub fn with_base_urls(
        mut self,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        self.base_urls = Some((base_url.into(), upload_base_url.into()));
        self
    }

    /// Builds a fresh session from obtained tokens
    fn make_session(&self, tokens: Tokens) -> DriveSession {
        let client = match &self.base_urls {
            Some((base, upload)) => {
                DriveClient::with_base_urls(tokens.access_token, base.clone(), upload.clone())
            }
            None => DriveClient::new(tokens.access_token),
        };
        let generation = SessionGeneration::new();
        info!(generation = %generation, "Opened Drive session");
        DriveSession { client, generation }
    }

    /// Resolves a remote path to its folder id, creating missing folders
    ///
    /// Walks the path segment by segment from the Drive root, consulting
    /// the cache for each prefix. Every resolved prefix is cached, so a
    /// later file targeting a sibling folder reuses the shared ancestors.
    async fn resolve_folder(
        client: &DriveClient,
        cache: &mut PathCache,
        path: &RemotePath,
    ) -> Result<RemoteFolderId, StoreError> {
        if let Some(id) = cache.get(path) {
            return Ok(id.clone());
        }

        let mut current = RemoteFolderId::root();
        let mut prefix = RemotePath::root();
        cache.insert(&prefix, current.clone());

        for segment in path.segments() {
            prefix = prefix
                .join_relative(Path::new(segment))
                .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?;

            if let Some(id) = cache.get(&prefix) {
                current = id.clone();
                continue;
            }

            current = match client.find_folder(segment, &current).await? {
                Some(id) => id,
                None => {
                    info!(path = %prefix, "Remote folder missing, creating");
                    client.create_folder(segment, &current).await?
                }
            };
            cache.insert(&prefix, current.clone());
        }

        Ok(current)
    }

    /// Uploads one file into its resolved target folder
    async fn upload_one(
        client: &DriveClient,
        cache: &mut PathCache,
        remote_root: &RemotePath,
        file: &LocalFileEntry,
        preserve_structure: bool,
    ) -> Result<FileAction, StoreError> {
        let target = if preserve_structure && file.relative_dir() != Path::new("") {
            remote_root
                .join_relative(file.relative_dir())
                .map_err(|e| StoreError::Unexpected(anyhow::Error::new(e)))?
        } else {
            remote_root.clone()
        };

        let folder_id = Self::resolve_folder(client, cache, &target).await?;
        let remote_meta = client.find_file(file.file_name(), &folder_id).await?;

        // Fingerprinting reads the whole file; keep it off the runtime.
        let local_path = file.absolute.clone();
        let action = tokio::task::spawn_blocking(move || {
            ChangeDetector::classify(&local_path, remote_meta.as_ref())
        })
        .await
        .context("Change detection task panicked")
        .map_err(StoreError::Unexpected)?
        .with_context(|| format!("Failed to fingerprint {}", file.absolute.display()))
        .map_err(StoreError::Unexpected)?;

        match &action {
            FileAction::Create => {
                let content = tokio::fs::read(&file.absolute)
                    .await
                    .with_context(|| format!("Failed to read {}", file.absolute.display()))
                    .map_err(StoreError::Unexpected)?;
                let id = client
                    .create_file(file.file_name(), &folder_id, content)
                    .await?;
                debug!(file = file.file_name(), target = %target, id, "Created remote file");
            }
            FileAction::Update { remote_id } => {
                let content = tokio::fs::read(&file.absolute)
                    .await
                    .with_context(|| format!("Failed to read {}", file.absolute.display()))
                    .map_err(StoreError::Unexpected)?;
                client.update_file(remote_id, content).await?;
                debug!(file = file.file_name(), target = %target, "Updated remote file");
            }
            FileAction::Skip => {
                debug!(file = file.file_name(), target = %target, "Remote file up to date");
            }
        }

        Ok(action)
    }
}

#[async_trait]
impl IRemoteStore for DriveStore {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GoogleDrive
    }

    #[instrument(skip(self))]
    async fn ensure_session(&self, interactive: bool) -> Result<(), StoreError> {
        let mut session = self.session.lock().await;
        let tokens = self.broker.obtain(interactive).await?;

        match session.as_mut() {
            Some(live) if live.client.access_token() == tokens.access_token => {
                debug!(generation = %live.generation, "Reusing live Drive session");
            }
            Some(live) => {
                // Same session, fresher token. Cached folder ids stay valid.
                live.client.set_access_token(tokens.access_token);
                debug!(generation = %live.generation, "Refreshed session token");
            }
            None => {
                *session = Some(self.make_session(tokens));
                self.cache.lock().await.clear();
            }
        }
        Ok(())
    }

    #[instrument(skip(self, files), fields(files = files.len(), root = %remote_root))]
    async fn upload_files(
        &self,
        remote_root: &RemotePath,
        files: &[LocalFileEntry],
        local_base: Option<&Path>,
    ) -> Result<UploadReport, StoreError> {
        if files.is_empty() {
            debug!("Nothing to upload");
            return Ok(UploadReport::default());
        }

        let mut session = self.session.lock().await;
        let live = match session.take() {
            Some(live) => live,
            None => {
                let tokens = self.broker.obtain(false).await?;
                self.make_session(tokens)
            }
        };

        // One cycle, one fresh view of the remote folder tree.
        let mut cache = self.cache.lock().await;
        cache.clear();

        let mut report = UploadReport::default();
        let preserve_structure = local_base.is_some();

        for file in files {
            let action = match Self::upload_one(
                &live.client,
                &mut cache,
                remote_root,
                file,
                preserve_structure,
            )
            .await
            {
                Ok(action) => action,
                Err(e) => {
                    if matches!(e, StoreError::AuthorizationRequired(_)) {
                        warn!("Drive rejected the session authorization, discarding session");
                        cache.clear();
                    } else {
                        *session = Some(live);
                    }
                    return Err(e);
                }
            };

            match action {
                FileAction::Create => report.created += 1,
                FileAction::Update { .. } => report.updated += 1,
                FileAction::Skip => report.skipped += 1,
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Upload pass complete"
        );
        *session = Some(live);
        Ok(report)
    }

    async fn download_files(&self) -> Result<(), StoreError> {
        Err(StoreError::Unexpected(anyhow::anyhow!(
            "Download is not implemented for Google Drive"
        )))
    }
}
