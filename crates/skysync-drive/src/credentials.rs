//! Credential persistence and the session credential broker
//!
//! Tokens persist to a JSON file in the configured credentials directory.
//! Writes go through a temp-file-then-rename sequence so a crash mid-write
//! never corrupts the previous valid token.
//!
//! The [`CredentialBroker`] implements the session lifecycle:
//!
//! ```text
//! NoCredential -(interactive login)-> Valid
//! Valid -(expiry)-> Refreshable -(refresh ok)-> Valid
//! Refreshable -(no refresh token, non-interactive)-> AuthRequired
//! ```
//!
//! A missing token file in non-interactive mode is reported as
//! [`StoreError::MissingCredentialFile`] — an operator misconfiguration —
//! while an unusable token is [`StoreError::AuthorizationRequired`], an
//! expected run-time state that the reconnection protocol handles.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use skysync_core::domain::newtypes::ProviderKind;
use skysync_core::ports::remote_store::StoreError;

use crate::auth::DriveAuthAdapter;

/// Refresh ahead of actual expiry so an in-flight cycle does not race the
/// token's deadline.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ============================================================================
// Tokens
// ============================================================================

/// OAuth tokens received from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired or is about to
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

// ============================================================================
// TokenStorage
// ============================================================================

/// Stores and retrieves OAuth tokens from a JSON token file
///
/// The store path is typically `$XDG_CONFIG_HOME/skysync/token.json`.
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a storage handle for the given token file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The token file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads tokens from the token file
    ///
    /// # Returns
    /// `Some(Tokens)` if the file exists and parses, `None` if it does not
    /// exist
    pub fn load(&self) -> anyhow::Result<Option<Tokens>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file found");
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read token file {}", self.path.display())))
            }
        };

        let tokens: Tokens =
            serde_json::from_str(&json).context("Failed to parse token file")?;
        debug!(path = %self.path.display(), "Loaded tokens from token file");
        Ok(Some(tokens))
    }

    /// Persists tokens, replacing the token file atomically
    ///
    /// Writes to `<path>.tmp` in the same directory and renames over the
    /// target, so a crash mid-write leaves the previous token intact.
    pub fn store(&self, tokens: &Tokens) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;

        let tmp_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };

        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Stored tokens in token file");
        Ok(())
    }
}

// ============================================================================
// CredentialBroker
// ============================================================================

/// Obtains a usable credential, refreshing or logging in as needed
///
/// One broker per provider account. The broker only touches credential
/// state; the live API session built from the returned tokens belongs to
/// the store.
pub struct CredentialBroker {
    storage: TokenStorage,
    auth: DriveAuthAdapter,
}

impl CredentialBroker {
    /// Creates a broker over the given token file and client secret file
    pub fn new(token_path: impl Into<PathBuf>, client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            storage: TokenStorage::new(token_path),
            auth: DriveAuthAdapter::new(client_secret_path.into()),
        }
    }

    /// Produces valid tokens, or a classified failure
    ///
    /// Resolution order:
    /// 1. Persisted tokens that are still valid are reused as-is.
    /// 2. Expired tokens with a refresh token are refreshed in place and
    ///    the result persisted.
    /// 3. With `interactive`, the full browser login flow runs and the
    ///    result is persisted.
    /// 4. Otherwise: no token file at all is
    ///    [`StoreError::MissingCredentialFile`]; an unusable token is
    ///    [`StoreError::AuthorizationRequired`].
    pub async fn obtain(&self, interactive: bool) -> Result<Tokens, StoreError> {
        let persisted = self.storage.load().map_err(StoreError::Unexpected)?;

        match &persisted {
            Some(tokens) if !tokens.is_expired() => {
                debug!("Reusing valid persisted tokens");
                return Ok(tokens.clone());
            }
            Some(tokens) => {
                if let Some(refresh_token) = &tokens.refresh_token {
                    info!("Access token expired, refreshing");
                    match self.auth.refresh(refresh_token).await {
                        Ok(refreshed) => {
                            self.storage.store(&refreshed).map_err(StoreError::Unexpected)?;
                            return Ok(refreshed);
                        }
                        Err(e) => {
                            // A dead refresh token is the normal expiry path,
                            // not a hard error; fall through to interactive.
                            warn!(error = %format!("{e:#}"), "Token refresh failed");
                        }
                    }
                } else {
                    info!("Access token expired and no refresh token present");
                }
            }
            None => {
                if !interactive {
                    return Err(StoreError::MissingCredentialFile(
                        self.storage.path().to_path_buf(),
                    ));
                }
            }
        }

        if interactive {
            info!("Starting interactive authorization flow");
            let tokens = self.auth.login().await.map_err(StoreError::Unexpected)?;
            self.storage.store(&tokens).map_err(StoreError::Unexpected)?;
            return Ok(tokens);
        }

        Err(StoreError::AuthorizationRequired(ProviderKind::GoogleDrive))
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn tokens(expired: bool, refresh: Option<&str>) -> Tokens {
        let expires_at = if expired {
            Utc::now() - Duration::hours(1)
        } else {
            Utc::now() + Duration::hours(1)
        };
        Tokens {
            access_token: "access-123".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at,
        }
    }

    #[test]
    fn test_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));

        assert!(storage.load().unwrap().is_none());

        let t = tokens(false, Some("refresh-456"));
        storage.store(&t).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-123");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh-456"));
    }

    #[test]
    fn test_storage_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested/creds/token.json"));

        storage.store(&tokens(false, None)).unwrap();
        assert!(storage.load().unwrap().is_some());
    }

    #[test]
    fn test_storage_overwrite_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));

        storage.store(&tokens(false, None)).unwrap();
        let mut newer = tokens(false, Some("r2"));
        newer.access_token = "access-v2".to_string();
        storage.store(&newer).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-v2");
        // No stray temp file left behind.
        assert!(!dir.path().join("token.json.tmp").exists());
    }

    #[test]
    fn test_storage_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = TokenStorage::new(&path);
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_expiry_margin() {
        let mut t = tokens(false, None);
        assert!(!t.is_expired());

        // Inside the refresh margin counts as expired.
        t.expires_at = Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS / 2);
        assert!(t.is_expired());
    }

    #[tokio::test]
    async fn test_broker_missing_file_non_interactive() {
        let dir = TempDir::new().unwrap();
        let broker = CredentialBroker::new(
            dir.path().join("token.json"),
            dir.path().join("client_secret.json"),
        );

        let err = broker.obtain(false).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingCredentialFile(_)));
    }

    #[tokio::test]
    async fn test_broker_reuses_valid_tokens() {
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStorage::new(&token_path)
            .store(&tokens(false, None))
            .unwrap();

        let broker =
            CredentialBroker::new(&token_path, dir.path().join("client_secret.json"));
        let obtained = broker.obtain(false).await.unwrap();
        assert_eq!(obtained.access_token, "access-123");
    }

    #[tokio::test]
    async fn test_broker_expired_without_refresh_non_interactive() {
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStorage::new(&token_path)
            .store(&tokens(true, None))
            .unwrap();

        let broker =
            CredentialBroker::new(&token_path, dir.path().join("client_secret.json"));
        let err = broker.obtain(false).await.unwrap_err();
        assert!(matches!(err, StoreError::AuthorizationRequired(_)));
    }
}
