//! Drive v3 API client
//!
//! Provides a typed HTTP client for the Drive v3 REST API. Handles endpoint
//! construction, bearer authentication and the single refresh-and-retry on
//! 401 responses.
//!
//! ## Authorization policy
//!
//! Every call goes through [`DriveClient::send_authorized`]:
//! 1. Send with the provider's current access token.
//! 2. On 401, ask the provider for a refreshed token and send once more.
//! 3. On a second 401, invalidate the session and fail with
//!    [`AuthError::Rejected`].

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use savesync_core::{
    config::RemoteConfig,
    domain::{errors::AuthError, newtypes::RemoteId},
    ports::IAuthProvider,
};
use tracing::{debug, info, warn};

use crate::DriveError;

/// Space holding all objects; hidden from the user's Drive UI
pub const DEFAULT_SPACE: &str = "appDataFolder";

/// Default upper bound for the listing call
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of characters of an error body kept in [`DriveError::Status`]
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Drive v3 API calls
///
/// Wraps `reqwest::Client` with the metadata and upload base URLs and an
/// [`IAuthProvider`] supplying bearer tokens.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata, media and delete requests
    api_base_url: String,
    /// Base URL for resumable upload sessions
    upload_base_url: String,
    /// Space objects are created in and listed from
    space: String,
    /// Upper bound for the listing call
    list_timeout: Duration,
    /// Source of bearer tokens
    auth: Arc<dyn IAuthProvider>,
}

impl DriveClient {
    /// Creates a client from the `remote` configuration section
    ///
    /// Every request is bounded by `request_timeout_secs`; the listing call
    /// by the shorter `list_timeout_secs`.
    pub fn new(auth: Arc<dyn IAuthProvider>, config: &RemoteConfig) -> Result<Self, DriveError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            space: config.space.clone(),
            list_timeout: config.list_timeout(),
            auth,
        })
    }

    /// Creates a client rooted at a custom server (useful for testing)
    ///
    /// Metadata calls go to `{base_url}/drive/v3` and uploads to
    /// `{base_url}/upload/drive/v3`, mirroring the production layout.
    pub fn with_base_url(auth: Arc<dyn IAuthProvider>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            api_base_url: format!("{base_url}/drive/v3"),
            upload_base_url: format!("{base_url}/upload/drive/v3"),
            space: DEFAULT_SPACE.to_string(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
            auth,
        }
    }

    /// Overrides the listing timeout
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn list_timeout(&self) -> Duration {
        self.list_timeout
    }

    /// Absolute URL of a metadata endpoint, e.g. `api_url("/files")`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    /// Absolute URL of an upload endpoint
    pub fn upload_url(&self, path: &str) -> String {
        format!("{}{}", self.upload_base_url, path)
    }

    /// Returns true if the auth provider currently holds a session
    pub async fn has_credentials(&self) -> bool {
        self.auth.has_credentials().await
    }

    /// Sends a request built by `build`, with the refresh-once policy
    ///
    /// `build` is called once per attempt and must produce the same request
    /// each time; the bearer header is added here.
    pub async fn send_authorized<F>(&self, build: F) -> Result<Response, DriveError>
    where
        F: Fn(&Client) -> RequestBuilder + Send,
    {
        let token = self.auth.access_token().await?;
        let response = build(&self.client).bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Access token rejected, refreshing");
        let refreshed = self.auth.refresh(&token).await?;

        let response = build(&self.client).bearer_auth(&refreshed).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Refreshed access token was rejected, clearing session");
            self.auth.invalidate().await;
            return Err(AuthError::Rejected.into());
        }

        info!("Request succeeded after token refresh");
        Ok(response)
    }

    /// Downloads the raw contents of an object
    ///
    /// Makes `GET /files/{id}?alt=media`.
    pub async fn download_file(&self, id: &RemoteId) -> Result<Vec<u8>, DriveError> {
        let url = self.api_url(&format!("/files/{}", id.as_str()));
        debug!(id = %id, "Downloading file");

        let response = self
            .send_authorized(|client| client.request(Method::GET, &url).query(&[("alt", "media")]))
            .await?;
        let response = ensure_success(response, "download").await?;
        let bytes = response.bytes().await?;

        debug!(id = %id, bytes = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }

    /// Deletes an object
    ///
    /// Makes `DELETE /files/{id}`. An object that is already gone (404)
    /// counts as deleted.
    pub async fn delete_file(&self, id: &RemoteId) -> Result<(), DriveError> {
        let url = self.api_url(&format!("/files/{}", id.as_str()));
        debug!(id = %id, "Deleting file");

        let response = self
            .send_authorized(|client| client.request(Method::DELETE, &url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id = %id, "File already deleted");
            return Ok(());
        }
        ensure_success(response, "delete").await?;
        Ok(())
    }
}

/// Turns a non-success response into [`DriveError::Status`]
pub(crate) async fn ensure_success(
    response: Response,
    context: &'static str,
) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body.chars().take(MAX_ERROR_BODY).collect()
    };

    Err(DriveError::Status {
        context,
        status: status.as_u16(),
        message,
    })
}
