//! savesync Sync - Reconciliation engine
//!
//! Provides:
//! - A pure planner deciding one action per file name
//! - The [`SyncEngine`] running one reconciliation pass per mount
//! - Host-side usage accounting feeding the playtime clock
//!
//! ## Modules
//!
//! - [`plan`] - Pairing of both replicas and per-file decisions
//! - [`engine`] - Pass orchestration, execution and outcome reporting
//! - [`usage`] - [`usage::UsageTracker`], the host's playtime accounting

pub mod engine;
pub mod plan;
pub mod usage;

pub use engine::{Outcome, OutcomeStatus, SyncEngine, SyncReport};

use savesync_core::domain::{
    errors::{AuthError, RemoteError, StorageError},
    newtypes::MountName,
};
use thiserror::Error;

/// Errors that end a reconciliation pass
///
/// Network failures are not returned to callers of
/// [`SyncEngine::reconcile`]; they become a degraded [`Outcome`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials are missing or were permanently rejected
    #[error("authentication required: {0}")]
    Auth(#[from] AuthError),

    /// The remote replica could not be reached
    #[error("network error: {0}")]
    Network(RemoteError),

    /// The remote replica answered in a shape this client cannot use
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The local replica or the playtime clock failed
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),

    /// Another pass over the same mount is in flight
    #[error("a reconciliation of {0} is already running")]
    AlreadyRunning(MountName),
}

impl SyncError {
    /// Returns true if the user has to log in again before the next pass
    pub fn requires_login(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Auth(auth) => SyncError::Auth(auth),
            RemoteError::Protocol(message) => SyncError::Protocol(message),
            network => SyncError::Network(network),
        }
    }
}
