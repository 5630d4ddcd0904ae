//! Token storage and refresh for the Drive API
//!
//! Tokens are obtained outside this crate (through the web token relay's
//! OAuth code exchange) and imported once. From then on the session keeps
//! them fresh without user interaction.
//!
//! ## Components
//!
//! - [`ITokenStorage`] - Where tokens persist between runs
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring
//! - [`MemoryTokenStorage`] - Process-local storage
//! - [`RelayRefresher`] - Refresh through the relay's `POST /oauth-refresh`
//! - [`OAuth2Refresher`] - Refresh directly against an OAuth2 token endpoint
//! - [`TokenSession`] - The [`IAuthProvider`] handed to the Drive client

use std::sync::Mutex as StdMutex;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    RequestTokenError, TokenResponse, TokenUrl,
};
use reqwest::Client;
use savesync_core::{
    config::AuthConfig,
    domain::errors::AuthError,
    ports::{IAuthProvider, Tokens},
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{client::ensure_success, DriveError};

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "savesync";

/// Header the relay requires on every call; it rejects plain navigations
const RELAY_MARKER_HEADER: (&str, &str) = ("X-Requested-With", "fetch");

// ============================================================================
// Token storage
// ============================================================================

/// Persistent home of the session tokens
pub trait ITokenStorage: Send + Sync {
    /// Loads stored tokens, `None` if there are none
    fn load(&self) -> Result<Option<Tokens>, AuthError>;

    /// Replaces stored tokens
    fn store(&self, tokens: &Tokens) -> Result<(), AuthError>;

    /// Removes stored tokens; succeeds when there are none
    fn clear(&self) -> Result<(), AuthError>;
}

/// Stores and retrieves tokens from the system keyring
///
/// Uses the `keyring` crate to store tokens securely in the OS credential
/// store (Secret Service on Linux, Keychain on macOS). Tokens are stored as
/// JSON under service `savesync` and the configured account name.
pub struct KeyringTokenStorage {
    account: String,
}

impl KeyringTokenStorage {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, AuthError> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account)
            .map_err(|e| AuthError::Storage(format!("failed to open keyring entry: {e}")))
    }
}

impl ITokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<Tokens>, AuthError> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let tokens = serde_json::from_str(&json).map_err(|e| {
                    AuthError::Storage(format!("failed to deserialize tokens from keyring: {e}"))
                })?;
                debug!(account = %self.account, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %self.account, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(AuthError::Storage(format!("failed to read from keyring: {e}"))),
        }
    }

    fn store(&self, tokens: &Tokens) -> Result<(), AuthError> {
        let json = serde_json::to_string(tokens)
            .map_err(|e| AuthError::Storage(format!("failed to serialize tokens: {e}")))?;
        self.entry()?
            .set_password(&json)
            .map_err(|e| AuthError::Storage(format!("failed to store tokens in keyring: {e}")))?;
        debug!(account = %self.account, "Stored tokens in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(account = %self.account, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }
}

/// Keeps tokens in memory only
#[derive(Default)]
pub struct MemoryTokenStorage {
    tokens: StdMutex<Option<Tokens>>,
}

impl MemoryTokenStorage {
    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: StdMutex::new(Some(tokens)),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Tokens>>, AuthError> {
        self.tokens
            .lock()
            .map_err(|_| AuthError::Storage("token storage lock poisoned".to_string()))
    }
}

impl ITokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<Tokens>, AuthError> {
        Ok(self.slot()?.clone())
    }

    fn store(&self, tokens: &Tokens) -> Result<(), AuthError> {
        *self.slot()? = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.slot()? = None;
        Ok(())
    }
}

// ============================================================================
// Refresh strategies
// ============================================================================

/// Response from the relay's refresh endpoint
#[derive(Debug, Deserialize)]
struct RelayTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refreshes tokens through the web token relay
///
/// The relay holds the OAuth client secret and forwards
/// `POST {relay}/oauth-refresh?refresh_token=...` to the provider's token
/// endpoint, answering `{"access_token": "..."}`.
pub struct RelayRefresher {
    client: Client,
    endpoint: Url,
}

impl RelayRefresher {
    /// Creates a refresher for the relay rooted at `relay_url` (e.g. `https://host/api`)
    ///
    /// Each refresh call is bounded by `timeout`.
    pub fn new(relay_url: &str, timeout: StdDuration) -> Result<Self, DriveError> {
        let base = Url::parse(relay_url)?;
        let endpoint = Url::parse(&format!(
            "{}/oauth-refresh",
            base.as_str().trim_end_matches('/')
        ))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, DriveError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("refresh_token", refresh_token)])
            .header(RELAY_MARKER_HEADER.0, RELAY_MARKER_HEADER.1)
            .send()
            .await?;
        let response = ensure_success(response, "token refresh").await?;
        let body: RelayTokenResponse = response.json().await?;

        Ok(Tokens {
            access_token: body.access_token,
            refresh_token: body
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: body.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        })
    }
}

/// Refreshes tokens directly against an OAuth2 token endpoint using the `oauth2` crate
pub struct OAuth2Refresher {
    client: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: Client,
}

impl OAuth2Refresher {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        token_url: &str,
        timeout: StdDuration,
    ) -> Result<Self, DriveError> {
        let mut client = BasicClient::new(ClientId::new(client_id.into()))
            .set_token_uri(TokenUrl::new(token_url.to_string())?);
        if let Some(secret) = client_secret {
            client = client.set_client_secret(ClientSecret::new(secret));
        }

        // Token endpoints must not be followed through redirects
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self { client, http })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, DriveError> {
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(inner) => AuthError::Unreachable(inner.to_string()),
                other => AuthError::RefreshFailed(other.to_string()),
            })?;

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: token_result
                .expires_in()
                .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64)),
        })
    }
}

/// How a session obtains a new access token
pub enum TokenRefresher {
    Relay(RelayRefresher),
    OAuth2(OAuth2Refresher),
    /// No endpoint configured; every refresh fails
    Disabled,
}

impl TokenRefresher {
    /// Picks the relay when configured, else direct OAuth2 when a client ID is set
    pub fn from_config(config: &AuthConfig, timeout: StdDuration) -> Result<Self, DriveError> {
        if let Some(relay) = &config.relay_url {
            return Ok(Self::Relay(RelayRefresher::new(relay, timeout)?));
        }
        if let Some(client_id) = &config.client_id {
            return Ok(Self::OAuth2(OAuth2Refresher::new(
                client_id.clone(),
                config.client_secret.clone(),
                &config.token_url,
                timeout,
            )?));
        }
        Ok(Self::Disabled)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, DriveError> {
        match self {
            Self::Relay(relay) => relay.refresh(refresh_token).await,
            Self::OAuth2(oauth2) => oauth2.refresh(refresh_token).await,
            Self::Disabled => Err(AuthError::RefreshFailed(
                "no token refresh endpoint configured".to_string(),
            )
            .into()),
        }
    }
}

// ============================================================================
// TokenSession
// ============================================================================

/// Bearer token session backed by an [`ITokenStorage`]
///
/// Refreshes are serialized: concurrent requests rejected with the same
/// token trigger a single refresh and share its result.
pub struct TokenSession {
    storage: Box<dyn ITokenStorage>,
    refresher: TokenRefresher,
    tokens: Mutex<Option<Tokens>>,
}

impl TokenSession {
    /// Opens a session with whatever tokens the storage holds
    pub fn open(
        storage: Box<dyn ITokenStorage>,
        refresher: TokenRefresher,
    ) -> Result<Self, AuthError> {
        let tokens = storage.load()?;
        Ok(Self {
            storage,
            refresher,
            tokens: Mutex::new(tokens),
        })
    }

    /// Stores new tokens and makes them current
    pub async fn login(&self, tokens: Tokens) -> Result<(), AuthError> {
        self.storage.store(&tokens)?;
        *self.tokens.lock().await = Some(tokens);
        info!("Stored new session tokens");
        Ok(())
    }

    /// Forgets the session; local and remote files are left untouched
    pub async fn logout(&self) -> Result<(), AuthError> {
        *self.tokens.lock().await = None;
        self.storage.clear()
    }

    /// Returns a copy of the current tokens
    pub async fn tokens(&self) -> Option<Tokens> {
        self.tokens.lock().await.clone()
    }

    /// Only a refresh endpoint that could not be reached keeps the session
    fn classify_refresh_error(err: DriveError) -> AuthError {
        match err {
            DriveError::Auth(auth) => auth,
            DriveError::Http(e) if !e.is_decode() && !e.is_status() => {
                AuthError::Unreachable(e.to_string())
            }
            other => AuthError::RefreshFailed(other.to_string()),
        }
    }

    fn clear_after_failure(&self, tokens: &mut Option<Tokens>) {
        *tokens = None;
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}

#[async_trait::async_trait]
impl IAuthProvider for TokenSession {
    async fn has_credentials(&self) -> bool {
        self.tokens.lock().await.is_some()
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        self.tokens
            .lock()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(AuthError::NotLoggedIn)
    }

    async fn refresh(&self, rejected: &str) -> Result<String, AuthError> {
        let mut tokens = self.tokens.lock().await;
        let current = tokens.as_ref().ok_or(AuthError::NotLoggedIn)?;

        if current.access_token != rejected {
            debug!("Access token already refreshed by a concurrent request");
            return Ok(current.access_token.clone());
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("Access token rejected and no refresh token is stored");
            self.clear_after_failure(&mut tokens);
            return Err(AuthError::RefreshFailed("no refresh token".to_string()));
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(fresh) => {
                if let Err(e) = self.storage.store(&fresh) {
                    warn!(error = %e, "Failed to persist refreshed tokens");
                }
                let access_token = fresh.access_token.clone();
                *tokens = Some(fresh);
                info!("Refreshed access token");
                Ok(access_token)
            }
            Err(e) => {
                let err = Self::classify_refresh_error(e);
                if let AuthError::Unreachable(reason) = &err {
                    warn!(error = %reason, "Token endpoint unreachable, keeping session");
                } else {
                    warn!(error = %err, "Token refresh failed, clearing session");
                    self.clear_after_failure(&mut tokens);
                }
                Err(err)
            }
        }
    }

    async fn invalidate(&self) {
        let mut tokens = self.tokens.lock().await;
        self.clear_after_failure(&mut tokens);
    }
}
