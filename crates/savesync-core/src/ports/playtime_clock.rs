//! Playtime clock port (driven/secondary port)
//!
//! One persisted scalar per mount recording cumulative usage. The sync
//! engine samples it once when a pass starts and stores it at most once,
//! at the end, when the remote replica is ahead. The host stores its own
//! usage accounting through the same port.

use crate::domain::{errors::StorageError, newtypes::Playtime};

/// Port trait for the persisted logical clock of one mount
#[async_trait::async_trait]
pub trait IPlaytimeClock: Send + Sync {
    /// Reads the persisted value, [`Playtime::ZERO`] if none was stored yet
    async fn sample(&self) -> Result<Playtime, StorageError>;

    /// Persists a new value
    async fn store(&self, playtime: Playtime) -> Result<(), StorageError>;
}
