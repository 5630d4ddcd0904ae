//! The savesync state database
//!
//! One SQLite file holds the local replica and playtime clock of every
//! mount. [`SaveDatabase`] opens it, brings its schema up to date and hands
//! out the per-mount adapters.
//!
//! The schema version lives in `PRAGMA user_version`. A database written by
//! a newer savesync is refused instead of being read with the wrong schema.

use std::path::Path;
use std::time::Duration;

use savesync_core::domain::newtypes::MountName;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::{CacheError, SqliteFileStore, SqlitePlaytimeClock};

/// Schema version written by this build
pub const SCHEMA_VERSION: i64 = 1;

const INITIAL_SCHEMA: &str = include_str!("migrations/20261016_initial.sql");

/// A pass and the CLI may write at the same time in watch mode
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the state database
#[derive(Clone)]
pub struct SaveDatabase {
    pool: SqlitePool,
}

impl SaveDatabase {
    /// Opens the database at `path`, creating the file and its directory
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` if the file cannot be opened, or
    /// `CacheError::MigrationFailed` if the schema cannot be brought up to
    /// [`SCHEMA_VERSION`].
    pub async fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot open {}: {e}", path.display()))
            })?;

        let db = Self { pool };
        db.migrate().await?;
        info!(path = %path.display(), "Opened state database");
        Ok(db)
    }

    /// Opens a private in-memory database
    ///
    /// SQLite gives every connection its own in-memory database, so the
    /// pool is limited to one connection.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Local replica of `mount`
    pub fn file_store(&self, mount: &MountName) -> SqliteFileStore {
        SqliteFileStore::new(self.pool.clone(), mount.clone())
    }

    /// Playtime clock of `mount`
    pub fn clock(&self, mount: &MountName) -> SqlitePlaytimeClock {
        SqlitePlaytimeClock::new(self.pool.clone(), mount.clone())
    }

    /// Schema version recorded in the file
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for in-flight queries and closes every connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        let version = self.schema_version().await?;
        if version > SCHEMA_VERSION {
            return Err(CacheError::MigrationFailed(format!(
                "database schema v{version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        if version == SCHEMA_VERSION {
            return Ok(());
        }

        let failed = |e: sqlx::Error| CacheError::MigrationFailed(e.to_string());
        let mut tx = self.pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(INITIAL_SCHEMA)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)?;

        debug!(from = version, to = SCHEMA_VERSION, "Migrated state database");
        Ok(())
    }
}
