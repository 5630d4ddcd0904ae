//! Configuration module for savesync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Every section and field has a default, so a partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::MountName;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for savesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Mount names to reconcile, e.g. `/saves`.
    pub mounts: Vec<String>,
    /// Maximum number of uploads/downloads/deletes in flight during one pass.
    pub max_concurrent_transfers: usize,
    /// Minimum seconds between automatic passes in watch mode.
    pub watch_interval_secs: u64,
}

/// Remote (Drive v3) endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL for metadata, download and delete calls.
    pub api_base_url: String,
    /// Base URL for resumable uploads.
    pub upload_base_url: String,
    /// Storage space holding the objects (`appDataFolder` keeps them hidden from the user).
    pub space: String,
    /// Upper bound in seconds for the listing call; exceeding it degrades the pass.
    pub list_timeout_secs: u64,
    /// Upper bound in seconds for every other request.
    pub request_timeout_secs: u64,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Keyring account the tokens are stored under.
    pub account: String,
    /// Base URL of the token relay exposing `POST /oauth-refresh`.
    pub relay_url: Option<String>,
    /// OAuth2 client ID for refreshing directly against `token_url`.
    pub client_id: Option<String>,
    /// OAuth2 client secret, if the client has one.
    pub client_secret: Option<String>,
    /// OAuth2 token endpoint.
    pub token_url: String,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding file records and playtime clocks.
    pub database_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/savesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("savesync")
            .join("config.yaml")
    }

    /// Parsed mount names, skipping (and reporting through `validate`) invalid ones.
    pub fn mount_names(&self) -> Vec<MountName> {
        self.sync
            .mounts
            .iter()
            .filter_map(|m| MountName::new(m.clone()).ok())
            .collect()
    }
}

impl RemoteConfig {
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mounts: vec!["/saves".to_string()],
            max_concurrent_transfers: 4,
            watch_interval_secs: 60,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            space: "appDataFolder".to_string(),
            list_timeout_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
            relay_url: None,
            client_id: None,
            client_secret: None,
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("savesync");
        Self {
            database_path: data_dir.join("savesync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.mounts"`.
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

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.mounts.is_empty() {
            errors.push(ValidationError {
                field: "sync.mounts".into(),
                message: "at least one mount is required".into(),
            });
        }
        for (i, mount) in self.sync.mounts.iter().enumerate() {
            if let Err(e) = MountName::new(mount.clone()) {
                errors.push(ValidationError {
                    field: format!("sync.mounts[{i}]"),
                    message: e.to_string(),
                });
            }
        }
        // Each record name belongs to at most one mount
        let names = self.mount_names();
        for (i, mount) in names.iter().enumerate() {
            if let Some(other) = names[i + 1..].iter().find(|other| mount.overlaps(other)) {
                errors.push(ValidationError {
                    field: "sync.mounts".into(),
                    message: format!("mounts '{mount}' and '{other}' overlap"),
                });
            }
        }
        if self.sync.max_concurrent_transfers == 0 || self.sync.max_concurrent_transfers > 32 {
            errors.push(ValidationError {
                field: "sync.max_concurrent_transfers".into(),
                message: "must be in range 1..=32".into(),
            });
        }
        if self.sync.watch_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.watch_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        for (field, value) in [
            ("remote.api_base_url", &self.remote.api_base_url),
            ("remote.upload_base_url", &self.remote.upload_base_url),
        ] {
            if !value.starts_with("https://") && !value.starts_with("http://") {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("must be an http(s) URL: '{value}'"),
                });
            }
        }
        if self.remote.space.is_empty() {
            errors.push(ValidationError {
                field: "remote.space".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.list_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.list_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- auth ---
        if self.auth.account.is_empty() {
            errors.push(ValidationError {
                field: "auth.account".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(relay) = &self.auth.relay_url {
            if url::Url::parse(relay).is_err() {
                errors.push(ValidationError {
                    field: "auth.relay_url".into(),
                    message: format!("not a valid URL: '{relay}'"),
                });
            }
        }
        if self.auth.client_secret.is_some() && self.auth.client_id.is_none() {
            errors.push(ValidationError {
                field: "auth.client_secret".into(),
                message: "requires auth.client_id".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use savesync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .mounts(["/saves"])
///     .max_concurrent_transfers(2)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn mounts<I, S>(mut self, mounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.mounts = mounts.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_concurrent_transfers(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent_transfers = n;
        self
    }

    pub fn watch_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.watch_interval_secs = seconds;
        self
    }

    // --- remote ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.api_base_url = url.into();
        self
    }

    pub fn upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.upload_base_url = url.into();
        self
    }

    pub fn list_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.list_timeout_secs = seconds;
        self
    }

    // --- auth ---

    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth.relay_url = Some(url.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    // --- storage ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
