//! savesync Drive - Google Drive v3 adapter
//!
//! Implements the remote store and auth ports against the Drive v3 REST API,
//! keeping every object in the hidden `appDataFolder` space:
//! - Listing a mount with a single, unpaginated metadata query
//! - Two-phase resumable uploads annotated with digest and playtime
//! - Media download and delete by object id
//! - Bearer tokens kept in the system keyring, refreshed once on 401
//!
//! ## Modules
//!
//! - [`auth`] - Token storage, refresh strategies and the [`auth::TokenSession`]
//! - [`client`] - HTTP client with the authorized send/retry policy
//! - [`listing`] - Listing query and response parsing
//! - [`upload`] - Resumable upload protocol
//! - [`provider`] - [`IRemoteStore`](savesync_core::ports::IRemoteStore) implementation

pub mod auth;
pub mod client;
pub mod listing;
pub mod provider;
pub mod upload;

use savesync_core::domain::errors::{AuthError, RemoteError};
use thiserror::Error;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication failed permanently
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request could not be sent or its body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not finish within its overall time bound
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The API answered with a non-success status
    #[error("{context} returned HTTP {status}: {message}")]
    Status {
        context: &'static str,
        status: u16,
        message: String,
    },

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A configured endpoint is not a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<DriveError> for RemoteError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Auth(e) => e.into(),
            DriveError::Timeout(context) => RemoteError::Timeout(format!("{context} timed out")),
            DriveError::Http(e) if e.is_timeout() => RemoteError::Timeout(e.to_string()),
            DriveError::Http(e) if e.is_connect() => RemoteError::Offline(e.to_string()),
            DriveError::Http(e) if e.is_decode() => RemoteError::Protocol(e.to_string()),
            DriveError::Http(e) => RemoteError::Transport(e.to_string()),
            DriveError::Status {
                context,
                status,
                message,
            } => RemoteError::Status {
                status,
                message: format!("{context}: {message}"),
            },
            DriveError::InvalidResponse(msg) => RemoteError::Protocol(msg),
            DriveError::InvalidUrl(e) => RemoteError::Protocol(e.to_string()),
        }
    }
}
