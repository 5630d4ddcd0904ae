//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server. The returned
//! store points at that server and authenticates through a
//! [`TokenSession`] whose relay is mounted at `/api` on the same server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use savesync_core::{
    domain::{newtypes::MountName, record::FileRecord, record::LocalFile},
    ports::Tokens,
};
use savesync_drive::{
    auth::{MemoryTokenStorage, RelayRefresher, TokenRefresher, TokenSession},
    client::DriveClient,
    provider::DriveRemoteStore,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// sha256("abc")
pub const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// Builds a session holding `tokens`, refreshing through the server's relay
pub fn session_for(server: &MockServer, tokens: Option<Tokens>) -> Arc<TokenSession> {
    session_with_relay(&format!("{}/api", server.uri()), tokens)
}

/// Builds a session holding `tokens`, refreshing through the relay at `relay_url`
pub fn session_with_relay(relay_url: &str, tokens: Option<Tokens>) -> Arc<TokenSession> {
    let storage = match tokens {
        Some(t) => MemoryTokenStorage::with_tokens(t),
        None => MemoryTokenStorage::default(),
    };
    let relay = RelayRefresher::new(relay_url, Duration::from_secs(5)).unwrap();
    Arc::new(TokenSession::open(Box::new(storage), TokenRefresher::Relay(relay)).unwrap())
}

/// Starts a mock server and returns a store logged in with `test-token`
pub async fn setup_drive_mock() -> (MockServer, DriveRemoteStore, Arc<TokenSession>) {
    let server = MockServer::start().await;
    let session = session_for(
        &server,
        Some(Tokens::new("test-token", Some("refresh-1".to_string()))),
    );
    let client = DriveClient::with_base_url(session.clone(), server.uri());
    (server, DriveRemoteStore::new(client), session)
}

pub fn mount() -> MountName {
    MountName::new("/saves".to_string()).unwrap()
}

pub fn local_file(name: &str, contents: &[u8]) -> LocalFile {
    LocalFile::new(FileRecord::new(
        name,
        contents.to_vec(),
        33188,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

/// A listed entry carrying all required annotations
pub fn listed_file(id: &str, name: &str, playtime: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "modifiedTime": "2024-05-01T12:00:00.000Z",
        "size": "3",
        "appProperties": {
            "mode": "33188",
            "sha256": ABC_SHA256,
            "playtime": playtime
        }
    })
}

/// Mounts the listing endpoint answering with `files`
pub async fn mount_listing(server: &MockServer, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("spaces", "appDataFolder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts a media download endpoint for one object
pub async fn mount_download(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/drive/v3/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}
