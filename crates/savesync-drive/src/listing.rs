//! Listing of a mount's remote objects
//!
//! A mount is listed with a single `GET /files` query:
//!
//! ```text
//! q=name contains '<mount>'
//! spaces=appDataFolder
//! fields=nextPageToken,files(id,name,modifiedTime,size,appProperties)
//! ```
//!
//! Pagination is not followed. `nextPageToken` in the response means the
//! listing is incomplete and is reported as an invalid response. Drive's
//! `contains` operator matches anywhere in the name, so entries that do not
//! start with the mount name are dropped here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Method;
use savesync_core::domain::{
    newtypes::{ContentHash, MountName, Playtime, RemoteId},
    record::{AppProperties, RemoteFileMetadata},
};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::{
    client::{ensure_success, DriveClient},
    DriveError,
};

/// Fields requested for every listed object
const LIST_FIELDS: &str = "nextPageToken,files(id,name,modifiedTime,size,appProperties)";

/// Largest page Drive will return; anything beyond it is an incomplete listing
const PAGE_SIZE: &str = "1000";

// ============================================================================
// Drive API response types
// ============================================================================

/// Response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// One file resource, restricted to the requested fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    modified_time: Option<DateTime<Utc>>,
    /// int64 fields are encoded as JSON strings by Drive
    #[serde(default, deserialize_with = "deserialize_size")]
    size: Option<u64>,
    #[serde(default)]
    app_properties: HashMap<String, serde_json::Value>,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Number(n)) => Ok(Some(n)),
        Some(StringOrNumber::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl DriveFile {
    /// Reads a required app property as a string
    fn property(&self, key: &str) -> Result<String, DriveError> {
        match self.app_properties.get(key) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(DriveError::InvalidResponse(format!(
                "{}: appProperties.{key} has unexpected type: {other}",
                self.name
            ))),
            None => Err(DriveError::InvalidResponse(format!(
                "{}: missing appProperties.{key}",
                self.name
            ))),
        }
    }

    fn into_metadata(self) -> Result<RemoteFileMetadata, DriveError> {
        let invalid =
            |name: &str, e: String| DriveError::InvalidResponse(format!("{name}: {e}"));

        let mode = self
            .property("mode")?
            .parse::<u32>()
            .map_err(|e| invalid(&self.name, format!("invalid mode: {e}")))?;
        let sha256 = ContentHash::new(self.property("sha256")?)
            .map_err(|e| invalid(&self.name, e.to_string()))?;
        let playtime = self
            .property("playtime")?
            .parse::<Playtime>()
            .map_err(|e| invalid(&self.name, e.to_string()))?;
        let id = RemoteId::new(self.id).map_err(|e| invalid(&self.name, e.to_string()))?;

        Ok(RemoteFileMetadata {
            id,
            name: self.name,
            modified_time: self.modified_time,
            size: self.size,
            app_properties: AppProperties {
                mode,
                sha256,
                playtime,
            },
        })
    }
}

// ============================================================================
// Query construction
// ============================================================================

/// Builds the `q` parameter for a mount, escaping quotes and backslashes
pub fn list_query(mount: &MountName) -> String {
    let escaped = mount.as_str().replace('\\', "\\\\").replace('\'', "\\'");
    format!("name contains '{escaped}'")
}

// ============================================================================
// list_files
// ============================================================================

/// Lists every object of a mount
///
/// # Errors
/// - [`DriveError::InvalidResponse`] if the listing is paginated or an entry
///   lacks its `sha256`, `playtime` or `mode` annotations
/// - [`DriveError::Timeout`] when the whole call, including a token
///   refresh, exceeds the client's list timeout
/// - [`DriveError::Http`] when the host is offline
pub async fn list_files(
    client: &DriveClient,
    mount: &MountName,
) -> Result<Vec<RemoteFileMetadata>, DriveError> {
    let url = client.api_url("/files");
    let query = list_query(mount);
    debug!(mount = %mount, "Listing remote files");

    let fetch = async {
        let response = client
            .send_authorized(|http| {
                http.request(Method::GET, &url).query(&[
                    ("q", query.as_str()),
                    ("spaces", client.space()),
                    ("fields", LIST_FIELDS),
                    ("pageSize", PAGE_SIZE),
                ])
            })
            .await?;
        let response = ensure_success(response, "list").await?;
        let body = response.bytes().await?;
        let listing: FileListResponse = serde_json::from_slice(&body)
            .map_err(|e| DriveError::InvalidResponse(format!("file list: {e}")))?;
        Ok::<_, DriveError>(listing)
    };

    let listing = tokio::time::timeout(client.list_timeout(), fetch)
        .await
        .map_err(|_| DriveError::Timeout("list"))??;
    parse_listing(listing, mount)
}

fn parse_listing(
    listing: FileListResponse,
    mount: &MountName,
) -> Result<Vec<RemoteFileMetadata>, DriveError> {
    if listing.next_page_token.is_some() {
        return Err(DriveError::InvalidResponse(format!(
            "listing of {mount} is paginated; more than one page of files is not supported"
        )));
    }

    let mut files = Vec::with_capacity(listing.files.len());
    for file in listing.files {
        if !mount.contains(&file.name) {
            debug!(name = %file.name, mount = %mount, "Skipping file outside mount");
            continue;
        }
        files.push(file.into_metadata()?);
    }

    debug!(mount = %mount, count = files.len(), "Listed remote files");
    Ok(files)
}
