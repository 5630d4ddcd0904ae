//! Host-side usage accounting
//!
//! The playtime clock advances while the host runs. [`UsageTracker`]
//! measures that time on top of the persisted value and hands the result to
//! the clock before each automatic pass. When a pass moves the clock
//! forward the tracker is rebased so local accounting continues from the
//! new value.

use savesync_core::domain::{errors::StorageError, newtypes::Playtime};
use savesync_core::ports::IPlaytimeClock;
use tokio::time::Instant;

/// Measures elapsed usage on top of a persisted playtime
#[derive(Debug, Clone)]
pub struct UsageTracker {
    base: Playtime,
    started: Instant,
}

impl UsageTracker {
    /// Starts counting from `base`
    pub fn new(base: Playtime) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }

    /// Starts counting from the clock's persisted value
    pub async fn resume_from(clock: &dyn IPlaytimeClock) -> Result<Self, StorageError> {
        Ok(Self::new(clock.sample().await?))
    }

    /// Current playtime including time elapsed since the last rebase
    pub fn current(&self) -> Playtime {
        self.base.advanced_by(self.started.elapsed())
    }

    /// Restarts counting from `playtime`
    ///
    /// The tracker never moves backwards: a value below the current one
    /// keeps the current one as the new base.
    pub fn rebase(&mut self, playtime: Playtime) {
        self.base = playtime.max(self.current());
        self.started = Instant::now();
    }

    /// Stores the current playtime through `clock` and returns it
    pub async fn persist(&self, clock: &dyn IPlaytimeClock) -> Result<Playtime, StorageError> {
        let playtime = self.current();
        clock.store(playtime).await?;
        Ok(playtime)
    }
}
