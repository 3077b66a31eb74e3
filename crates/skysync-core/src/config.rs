//! Configuration module for SkySync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults. Folder descriptors are
//! validated once at load; the sync core treats them as read-only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::newtypes::{ProviderKind, RemotePath};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for SkySync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Folder synchronization descriptors; must be non-empty.
    #[serde(default)]
    pub sync: Vec<FolderSyncConfig>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file (None logs to stderr).
    pub file: Option<PathBuf>,
}

/// Authentication / credential storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Directory holding the token file and the OAuth client secret file.
    pub credentials_dir: PathBuf,
}

impl AuthConfig {
    /// Path of the persisted token file.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.credentials_dir.join("token.json")
    }

    /// Path of the OAuth client secret file (interactive login only).
    #[must_use]
    pub fn client_secret_path(&self) -> PathBuf {
        self.credentials_dir.join("client_secret.json")
    }
}

/// Immutable descriptor of one folder to synchronize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSyncConfig {
    /// Unique folder name; used as the scheduling and reconnect key.
    pub name: String,
    /// Cloud provider this folder syncs to.
    pub provider: ProviderKind,
    /// Seconds between sync cycles (must be positive).
    pub interval_secs: u64,
    /// Whether to collapse the folder into one deflate archive per cycle.
    /// Accepts booleans and common truthy/falsy strings ("yes", "0", ...).
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub compress: bool,
    /// Local root (a directory tree or a single file).
    pub local_path: PathBuf,
    /// Remote folder path the files upload into.
    pub remote_path: String,
    /// Ordered shell-glob patterns matched against the whole relative path.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FolderSyncConfig {
    /// The interval between scheduled cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The remote path parsed into its normalized form.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRemotePath`] for a malformed path.
    pub fn remote_root(&self) -> Result<RemotePath, DomainError> {
        RemotePath::new(&self.remote_path)
    }
}

/// Accepts `true`/`false` as well as the string forms users commonly put
/// in YAML ("yes"/"no", "on"/"off", "1"/"0").
fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Int(0) => Ok(false),
        BoolOrString::Int(1) => Ok(true),
        BoolOrString::Int(other) => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {other}"
        ))),
        BoolOrString::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid boolean value: {other:?}"
            ))),
        },
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/skysync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("skysync")
            .join("config.yaml")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_dir: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("~/.config"))
                .join("skysync"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync[0].interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Startup fails fast
    /// on the first non-empty result.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "must be one of {VALID_LOG_LEVELS:?}, got {:?}",
                    self.logging.level
                ),
            });
        }

        if self.sync.is_empty() {
            errors.push(ValidationError {
                field: "sync".into(),
                message: "must be a non-empty list of folder descriptors".into(),
            });
        }

        let mut seen_names = std::collections::HashSet::new();
        for (i, folder) in self.sync.iter().enumerate() {
            let prefix = format!("sync[{i}]");

            if folder.name.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: "must not be empty".into(),
                });
            } else if !seen_names.insert(folder.name.clone()) {
                errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("duplicate folder name {:?}", folder.name),
                });
            }

            if folder.interval_secs == 0 {
                errors.push(ValidationError {
                    field: format!("{prefix}.interval_secs"),
                    message: "must be positive".into(),
                });
            }

            if folder.local_path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: format!("{prefix}.local_path"),
                    message: "must not be empty".into(),
                });
            }

            for (j, pattern) in folder.exclude.iter().enumerate() {
                if let Err(e) = glob::Pattern::new(pattern) {
                    errors.push(ValidationError {
                        field: format!("{prefix}.exclude[{j}]"),
                        message: format!("invalid glob pattern {pattern:?}: {e}"),
                    });
                }
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
sync:
  - name: docs
    provider: gdrive
    interval_secs: 300
    compress: false
    local_path: /data/docs
    remote_path: /backup/docs
    exclude: ["*.tmp"]
"#
    }

    #[test]
    fn test_load_minimal_config() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.sync.len(), 1);

        let folder = &config.sync[0];
        assert_eq!(folder.name, "docs");
        assert_eq!(folder.provider, ProviderKind::GoogleDrive);
        assert_eq!(folder.interval_secs, 300);
        assert!(!folder.compress);
        assert_eq!(folder.exclude, vec!["*.tmp"]);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_compress_lenient_forms() {
        for (form, expected) in [
            ("true", true),
            ("yes", true),
            ("\"1\"", true),
            ("on", true),
            ("false", false),
            ("no", false),
            ("\"0\"", false),
            ("off", false),
        ] {
            let yaml = format!(
                r#"
sync:
  - name: docs
    provider: gdrive
    interval_secs: 60
    compress: {form}
    local_path: /data
    remote_path: /backup
"#
            );
            let config: Config = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(config.sync[0].compress, expected, "form: {form}");
        }
    }

    #[test]
    fn test_compress_rejects_garbage() {
        let yaml = r#"
sync:
  - name: docs
    provider: gdrive
    interval_secs: 60
    compress: maybe
    local_path: /data
    remote_path: /backup
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_unknown_provider_fails_to_parse() {
        let yaml = r#"
sync:
  - name: docs
    provider: dropbox
    interval_secs: 60
    local_path: /data
    remote_path: /backup
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.sync[0].interval_secs = 0;

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "sync[0].interval_secs"));
    }

    #[test]
    fn test_validate_empty_sync_list() {
        let config = Config::default();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "sync"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let yaml = r#"
sync:
  - name: docs
    provider: gdrive
    interval_secs: 60
    local_path: /a
    remote_path: /a
  - name: docs
    provider: gdrive
    interval_secs: 60
    local_path: /b
    remote_path: /b
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "sync[1].name"));
    }

    #[test]
    fn test_validate_bad_exclude_pattern() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.sync[0].exclude.push("[unclosed".to_string());

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "sync[0].exclude[1]"));
    }

    #[test]
    fn test_validate_bad_log_level() {
        let mut config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.logging.level = "loud".to_string();

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn test_auth_paths() {
        let auth = AuthConfig {
            credentials_dir: PathBuf::from("/etc/skysync"),
        };
        assert_eq!(auth.token_path(), PathBuf::from("/etc/skysync/token.json"));
        assert_eq!(
            auth.client_secret_path(),
            PathBuf::from("/etc/skysync/client_secret.json")
        );
    }

    #[test]
    fn test_interval_duration() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.sync[0].interval(), Duration::from_secs(300));
    }
}
