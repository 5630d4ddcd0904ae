//! Authentication port (driven/secondary port)
//!
//! Supplies bearer credentials to the remote store. A rejected credential
//! gets exactly one silent refresh; when that fails the provider clears its
//! session and every later call reports [`AuthError::NotLoggedIn`] until
//! new tokens are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::AuthError;

// ============================================================================
// Tokens
// ============================================================================

/// OAuth tokens for the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires, if the issuer said so
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Tokens {
    /// Creates tokens without a known expiry
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: None,
        }
    }

    /// Returns true if the access token is known to have expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

// ============================================================================
// IAuthProvider trait
// ============================================================================

/// Port trait for bearer credential management
#[async_trait::async_trait]
pub trait IAuthProvider: Send + Sync {
    /// Returns true if a session exists; makes no network call
    async fn has_credentials(&self) -> bool;

    /// Returns the current access token
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Replaces a rejected access token with a refreshed one
    ///
    /// `rejected` is the token the remote answered 401 to. If the session
    /// already holds a different token (another request refreshed first)
    /// that token is returned without contacting the token endpoint.
    /// A failed refresh clears the session.
    async fn refresh(&self, rejected: &str) -> Result<String, AuthError>;

    /// Clears the session after a refreshed token was rejected as well
    async fn invalidate(&self);
}
