//! SQLite implementation of ILocalStore
//!
//! Each [`SqliteFileStore`] is scoped to one mount; every query filters on
//! the `mount` column and records outside the mount are refused on write.
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                   |
//! |-----------------|----------|--------------------------------------------|
//! | name            | TEXT     | Full record name, e.g. `/saves/slot1.dat`  |
//! | contents        | BLOB     | Raw bytes                                  |
//! | mode            | INTEGER  | `u32` widened to `i64`                     |
//! | DateTime<Utc>   | TEXT     | RFC 3339 via `to_rfc3339()`                |

use chrono::{DateTime, Utc};
use futures_util::{stream::BoxStream, StreamExt};
use savesync_core::domain::{errors::StorageError, newtypes::MountName, record::FileRecord};
use savesync_core::ports::ILocalStore;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::CacheError;

/// Local replica of one mount, stored in the `file_records` table
pub struct SqliteFileStore {
    pool: SqlitePool,
    mount: MountName,
}

impl SqliteFileStore {
    /// Creates a store for `mount` over the given connection pool
    pub fn new(pool: SqlitePool, mount: MountName) -> Self {
        Self { pool, mount }
    }

    pub fn mount(&self) -> &MountName {
        &self.mount
    }

    /// Looks up a single record by its full name
    pub async fn get(&self, name: &str) -> Result<Option<FileRecord>, CacheError> {
        let row = sqlx::query(
            "SELECT name, contents, mode, timestamp FROM file_records \
             WHERE mount = ? AND name = ?",
        )
        .bind(self.mount.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Number of records stored for the mount
    pub async fn count(&self) -> Result<u64, CacheError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_records WHERE mount = ?")
            .bind(self.mount.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Total size in bytes of the contents stored for the mount
    pub async fn total_size(&self) -> Result<u64, CacheError> {
        let size: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(LENGTH(contents)), 0) FROM file_records WHERE mount = ?",
        )
        .bind(self.mount.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(size as u64)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_datetime(key: &str, s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: format!("invalid timestamp '{s}': {e}"),
        })
}

fn record_from_row(row: &SqliteRow) -> Result<FileRecord, CacheError> {
    let name: String = row.try_get("name")?;
    let contents: Vec<u8> = row.try_get("contents")?;
    let mode: i64 = row.try_get("mode")?;
    let timestamp: String = row.try_get("timestamp")?;

    let mode = u32::try_from(mode).map_err(|_| CacheError::Corrupt {
        key: name.clone(),
        reason: format!("mode {mode} out of range"),
    })?;
    let timestamp = parse_datetime(&name, &timestamp)?;

    Ok(FileRecord::new(name, contents, mode, timestamp))
}

// ============================================================================
// ILocalStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalStore for SqliteFileStore {
    fn enumerate(&self) -> BoxStream<'_, Result<FileRecord, StorageError>> {
        sqlx::query(
            "SELECT name, contents, mode, timestamp FROM file_records \
             WHERE mount = ? ORDER BY name",
        )
        .bind(self.mount.as_str())
        .fetch(&self.pool)
        .map(|row| -> Result<FileRecord, StorageError> {
            let row = row.map_err(CacheError::from)?;
            Ok(record_from_row(&row)?)
        })
        .boxed()
    }

    async fn put(&self, record: &FileRecord) -> Result<(), StorageError> {
        if !self.mount.contains(&record.name) {
            return Err(CacheError::OutsideMount {
                name: record.name.clone(),
                mount: self.mount.to_string(),
            }
            .into());
        }

        sqlx::query(
            "INSERT OR REPLACE INTO file_records (mount, name, contents, mode, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.mount.as_str())
        .bind(&record.name)
        .bind(&record.contents)
        .bind(i64::from(record.mode))
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(
            mount = %self.mount,
            name = %record.name,
            bytes = record.size(),
            "Stored file record"
        );
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM file_records WHERE mount = ? AND name = ?")
            .bind(self.mount.as_str())
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;

        tracing::trace!(
            mount = %self.mount,
            name,
            removed = result.rows_affected(),
            "Deleted file record"
        );
        Ok(())
    }
}
