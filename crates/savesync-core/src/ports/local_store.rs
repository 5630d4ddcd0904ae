//! Local store port (driven/secondary port)
//!
//! The local replica: a durable key-value store of [`FileRecord`]s keyed by
//! name, scoped to a single mount.
//!
//! ## Design Notes
//!
//! - `enumerate` returns a lazy stream; each call starts a new pass over
//!   the current contents.
//! - `put` and `delete` are each atomic. Nothing spans several calls.
//! - Errors are classified as [`StorageError`] so the engine can stop the
//!   pass instead of continuing on a partial view.

use futures_util::stream::BoxStream;

use crate::domain::{errors::StorageError, record::FileRecord};

/// Port trait for the local replica of one mount
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    /// Streams every record of the mount
    fn enumerate(&self) -> BoxStream<'_, Result<FileRecord, StorageError>>;

    /// Inserts or replaces the record stored under `record.name`
    async fn put(&self, record: &FileRecord) -> Result<(), StorageError>;

    /// Removes the record stored under `name`
    ///
    /// Deleting a name that does not exist succeeds.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}
