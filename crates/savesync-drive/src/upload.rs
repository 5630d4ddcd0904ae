//! Resumable uploads
//!
//! Uploads use Drive's two-phase resumable protocol:
//!
//! 1. [`start_session`] sends the object metadata (name, mime type, the
//!    `mode`/`sha256`/`playtime` app properties and `modifiedTime`) with
//!    `POST /files?uploadType=resumable` to create, or
//!    `PATCH /files/{id}?uploadType=resumable` to update in place. The
//!    session URL comes back in the `Location` header.
//! 2. [`send_contents`] streams the bytes to the session URL with an exact
//!    `Content-Length`.
//!
//! A failure in phase 2 leaves at most an unfinished session behind; the
//! whole upload can simply be started again.

use reqwest::{header, Method};
use savesync_core::domain::{
    newtypes::{Playtime, RemoteId},
    record::LocalFile,
};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    client::{ensure_success, DriveClient},
    DriveError,
};

/// Mime type of every uploaded object
const OCTET_STREAM: &str = "application/octet-stream";

// ============================================================================
// Session metadata
// ============================================================================

/// Body of the phase 1 request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata<'a> {
    name: &'a str,
    mime_type: &'static str,
    app_properties: UploadAppProperties,
    modified_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<[&'a str; 1]>,
}

/// App properties are string-valued on the Drive side
#[derive(Debug, Serialize)]
struct UploadAppProperties {
    mode: String,
    sha256: String,
    playtime: String,
}

impl<'a> UploadMetadata<'a> {
    fn new(file: &'a LocalFile, playtime: Playtime, parent: Option<&'a str>) -> Self {
        let record = file.record();
        Self {
            name: &record.name,
            mime_type: OCTET_STREAM,
            app_properties: UploadAppProperties {
                mode: record.mode.to_string(),
                sha256: file.hash().as_str().to_string(),
                playtime: playtime.to_string(),
            },
            modified_time: record
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            parents: parent.map(|p| [p]),
        }
    }
}

// ============================================================================
// Phase 1: start_session
// ============================================================================

/// Opens a resumable upload session and returns its URL
///
/// Creates a new object in the client's space when `existing` is `None`,
/// otherwise updates `existing` in place.
///
/// # Errors
/// [`DriveError::InvalidResponse`] if the response carries no usable
/// `Location` header.
pub async fn start_session(
    client: &DriveClient,
    file: &LocalFile,
    playtime: Playtime,
    existing: Option<&RemoteId>,
) -> Result<Url, DriveError> {
    let (method, url, parent) = match existing {
        Some(id) => (
            Method::PATCH,
            client.upload_url(&format!("/files/{}", id.as_str())),
            None,
        ),
        None => (Method::POST, client.upload_url("/files"), Some(client.space())),
    };
    let metadata = UploadMetadata::new(file, playtime, parent);
    let size = file.record().size().to_string();

    debug!(name = %file.name(), method = %method, "Starting upload session");

    let response = client
        .send_authorized(|http| {
            http.request(method.clone(), &url)
                .query(&[("uploadType", "resumable")])
                .header("X-Upload-Content-Type", OCTET_STREAM)
                .header("X-Upload-Content-Length", &size)
                .json(&metadata)
        })
        .await?;
    let response = ensure_success(response, "upload session").await?;

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            DriveError::InvalidResponse(format!(
                "upload session for {} returned no Location header",
                file.name()
            ))
        })?;

    let base = Url::parse(&url)?;
    base.join(location).map_err(|e| {
        DriveError::InvalidResponse(format!("invalid upload Location '{location}': {e}"))
    })
}

// ============================================================================
// Phase 2: send_contents
// ============================================================================

/// Sends the file bytes to an open session
///
/// Uses `POST` for new objects and `PUT` for in-place updates.
pub async fn send_contents(
    client: &DriveClient,
    session: &Url,
    file: &LocalFile,
    update: bool,
) -> Result<(), DriveError> {
    let method = if update { Method::PUT } else { Method::POST };
    let contents = &file.record().contents;

    debug!(name = %file.name(), bytes = contents.len(), "Sending upload contents");

    let response = client
        .send_authorized(|http| {
            http.request(method.clone(), session.clone())
                .header(header::CONTENT_TYPE, OCTET_STREAM)
                .header(header::CONTENT_LENGTH, contents.len())
                .body(contents.clone())
        })
        .await?;
    ensure_success(response, "upload").await?;
    Ok(())
}

// ============================================================================
// upload_file
// ============================================================================

/// Uploads a local file, annotated with its digest and `playtime`
pub async fn upload_file(
    client: &DriveClient,
    file: &LocalFile,
    playtime: Playtime,
    existing: Option<&RemoteId>,
) -> Result<(), DriveError> {
    let session = start_session(client, file, playtime, existing).await?;
    send_contents(client, &session, file, existing.is_some()).await?;

    info!(
        name = %file.name(),
        bytes = file.record().size(),
        sha256 = %file.hash().short(),
        update = existing.is_some(),
        "Uploaded file"
    );
    Ok(())
}
