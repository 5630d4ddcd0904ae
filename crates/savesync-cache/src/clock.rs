//! SQLite implementation of IPlaytimeClock
//!
//! The clock is a single `REAL` per mount in the `playtime` table. A mount
//! that has never stored a value samples as zero.

use chrono::{DateTime, Utc};
use savesync_core::domain::{
    errors::StorageError,
    newtypes::{MountName, Playtime},
};
use savesync_core::ports::IPlaytimeClock;
use sqlx::SqlitePool;

use crate::CacheError;

/// Persisted playtime of one mount
pub struct SqlitePlaytimeClock {
    pool: SqlitePool,
    mount: MountName,
}

impl SqlitePlaytimeClock {
    pub fn new(pool: SqlitePool, mount: MountName) -> Self {
        Self { pool, mount }
    }

    /// When the clock was last stored, `None` if it never was
    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let updated_at: Option<String> =
            sqlx::query_scalar("SELECT updated_at FROM playtime WHERE mount = ?")
                .bind(self.mount.as_str())
                .fetch_optional(&self.pool)
                .await?;

        updated_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| CacheError::Corrupt {
                        key: format!("playtime:{}", self.mount),
                        reason: format!("invalid updated_at '{s}': {e}"),
                    })
            })
            .transpose()
    }
}

#[async_trait::async_trait]
impl IPlaytimeClock for SqlitePlaytimeClock {
    async fn sample(&self) -> Result<Playtime, StorageError> {
        let value: Option<f64> = sqlx::query_scalar("SELECT value FROM playtime WHERE mount = ?")
            .bind(self.mount.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(CacheError::from)?;

        match value {
            None => Ok(Playtime::ZERO),
            Some(v) => Playtime::from_millis(v).map_err(|e| {
                CacheError::Corrupt {
                    key: format!("playtime:{}", self.mount),
                    reason: e.to_string(),
                }
                .into()
            }),
        }
    }

    async fn store(&self, playtime: Playtime) -> Result<(), StorageError> {
        sqlx::query("INSERT OR REPLACE INTO playtime (mount, value, updated_at) VALUES (?, ?, ?)")
            .bind(self.mount.as_str())
            .bind(playtime.as_millis())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;

        tracing::debug!(mount = %self.mount, playtime = %playtime, "Stored playtime");
        Ok(())
    }
}
