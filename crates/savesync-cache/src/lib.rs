//! savesync Cache - Local state persistence
//!
//! SQLite-based storage for:
//! - The local replica of each mount (file records)
//! - The per-mount playtime clock
//!
//! ## Architecture
//!
//! This crate implements the `ILocalStore` and `IPlaytimeClock` ports from
//! `savesync-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`SaveDatabase`] - The state database, its schema version and per-mount adapters
//! - [`SqliteFileStore`] - `ILocalStore` for one mount
//! - [`SqlitePlaytimeClock`] - `IPlaytimeClock` for one mount
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use savesync_cache::SaveDatabase;
//! use savesync_core::domain::newtypes::MountName;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SaveDatabase::open(Path::new("/home/user/.local/share/savesync/savesync.db")).await?;
//! let mount = MountName::new("/saves".to_string())?;
//! let store = db.file_store(&mount);
//! // Use store as ILocalStore...
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod database;
pub mod store;

pub use clock::SqlitePlaytimeClock;
pub use database::SaveDatabase;
pub use store::SqliteFileStore;

use savesync_core::domain::errors::StorageError;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be converted back into a domain value
    #[error("Corrupt row {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A record was written to a store whose mount does not contain it
    #[error("Record {name} is outside mount {mount}")]
    OutsideMount { name: String, mount: String },
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<CacheError> for StorageError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Corrupt { key, reason } => StorageError::Corrupt { key, reason },
            other => StorageError::Backend(other.to_string()),
        }
    }
}
