//! Shared wiring for CLI commands
//!
//! Every command receives a [`CliContext`] holding the loaded configuration
//! and the global output flags. The context builds the adapters a command
//! needs: the state database, the token session and the Drive remote store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use savesync_cache::{SaveDatabase, SqlitePlaytimeClock};
use savesync_core::config::Config;
use savesync_core::domain::newtypes::MountName;
use savesync_core::ports::IAuthProvider;
use savesync_drive::auth::{KeyringTokenStorage, TokenRefresher, TokenSession};
use savesync_drive::client::DriveClient;
use savesync_drive::provider::DriveRemoteStore;
use savesync_sync::SyncEngine;
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Configuration and global flags shared by all commands
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CliContext {
    pub fn new(config_path: PathBuf, config: Config, format: OutputFormat, quiet: bool) -> Self {
        Self {
            config_path,
            config,
            format,
            quiet,
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Fails with every validation error when the configuration is unusable
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.config.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let listed: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!(
            "Invalid configuration in {}: {}",
            self.config_path.display(),
            listed.join("; ")
        )
    }

    /// Configured mounts, or only `selected` when given
    ///
    /// A selected mount must be one of the configured ones.
    pub fn mounts(&self, selected: Option<&str>) -> Result<Vec<MountName>> {
        let configured = self.config.mount_names();
        match selected {
            None => Ok(configured),
            Some(name) => configured
                .into_iter()
                .find(|m| m.as_str() == name)
                .map(|m| vec![m])
                .with_context(|| format!("Mount '{}' is not configured (see sync.mounts)", name)),
        }
    }

    /// Exactly one mount: `selected`, or the only configured one
    pub fn single_mount(&self, selected: Option<&str>) -> Result<MountName> {
        let mut mounts = self.mounts(selected)?;
        match mounts.len() {
            1 => Ok(mounts.remove(0)),
            0 => anyhow::bail!("No mounts configured (see sync.mounts)"),
            _ => anyhow::bail!("Several mounts are configured; choose one with --mount"),
        }
    }

    /// The configured mount holding the record `name`
    ///
    /// Validation keeps mounts from nesting, so at most one matches.
    pub fn mount_for(&self, name: &str) -> Result<MountName> {
        self.config
            .mount_names()
            .into_iter()
            .find(|m| m.contains(name))
            .with_context(|| format!("'{}' is not inside any configured mount", name))
    }

    /// Opens the state database named by `storage.database_path`
    pub async fn open_database(&self) -> Result<SaveDatabase> {
        let db_path = &self.config.storage.database_path;
        debug!(path = %db_path.display(), "Opening database");
        SaveDatabase::open(db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))
    }

    /// Opens the keyring-backed session for `auth.account`
    pub fn open_session(&self) -> Result<Arc<TokenSession>> {
        let storage = KeyringTokenStorage::new(self.config.auth.account.clone());
        let timeout = self.config.remote.request_timeout();
        let refresher = TokenRefresher::from_config(&self.config.auth, timeout)
            .context("Invalid token refresh configuration")?;
        let session =
            TokenSession::open(Box::new(storage), refresher).context("Failed to read keyring")?;
        Ok(Arc::new(session))
    }

    pub fn remote_store(&self, session: Arc<TokenSession>) -> Result<Arc<DriveRemoteStore>> {
        let auth: Arc<dyn IAuthProvider> = session;
        let client =
            DriveClient::new(auth, &self.config.remote).context("Failed to create HTTP client")?;
        Ok(Arc::new(DriveRemoteStore::new(client)))
    }

    /// Builds the engine for one mount; the clock is shared with the caller
    pub fn engine(
        &self,
        db: &SaveDatabase,
        mount: &MountName,
        session: Arc<TokenSession>,
        remote: Arc<DriveRemoteStore>,
        clock: Arc<SqlitePlaytimeClock>,
    ) -> SyncEngine {
        SyncEngine::new(
            mount.clone(),
            Arc::new(db.file_store(mount)),
            remote,
            session,
            clock,
        )
        .with_max_concurrent(self.config.sync.max_concurrent_transfers)
    }
}
