//! Domain error types
//!
//! This module defines the validation error used by the newtypes and the
//! error taxonomy shared by every port:
//!
//! - [`AuthError`] - credentials are missing or permanently invalid
//! - [`RemoteError`] - a remote call failed (network, protocol or auth)
//! - [`StorageError`] - a local store or clock operation failed

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid mount name
    #[error("Invalid mount name: {0}")]
    InvalidMountName(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid hash format (expected lowercase hex SHA-256)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid playtime value
    #[error("Invalid playtime: {0}")]
    InvalidPlaytime(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

// ============================================================================
// Port error taxonomy
// ============================================================================

/// Authentication failures surfaced by an `IAuthProvider`
///
/// Every variant except [`AuthError::Unreachable`] means the caller has to
/// obtain new credentials before retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credentials are stored for this account
    #[error("not logged in")]
    NotLoggedIn,

    /// The silent refresh failed; stored credentials were cleared
    #[error("failed to refresh access token: {0}")]
    RefreshFailed(String),

    /// The refreshed credential was rejected as well
    #[error("credential rejected after refreshing access token")]
    Rejected,

    /// The token endpoint could not be reached; stored credentials are kept
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),

    /// The credential store itself failed
    #[error("credential storage error: {0}")]
    Storage(String),
}

/// Failures of a remote store call
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Authentication permanently failed
    #[error(transparent)]
    Auth(AuthError),

    /// The host could not reach the remote service
    #[error("remote unreachable: {0}")]
    Offline(String),

    /// The request did not finish within its time bound
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The remote answered with a non-success status other than 401
    #[error("unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    /// Any other transport failure (connection reset, body read error, ...)
    #[error("network error: {0}")]
    Transport(String),

    /// The response violates the expected shape (pagination, missing fields)
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<AuthError> for RemoteError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unreachable(reason) => RemoteError::Offline(reason),
            other => RemoteError::Auth(other),
        }
    }
}

impl RemoteError {
    /// Returns true for the transient kinds that degrade a pass instead of failing it
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RemoteError::Offline(_)
                | RemoteError::Timeout(_)
                | RemoteError::Status { .. }
                | RemoteError::Transport(_)
        )
    }
}

/// Failures of a local store or playtime clock operation
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A persisted value could not be decoded
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
