//! Integration tests for listing a mount
//!
//! Covers response parsing, the client-side mount filter and the way
//! listing failures are classified for the sync engine.

use std::time::Duration;

use savesync_core::{domain::errors::RemoteError, ports::IRemoteStore};
use savesync_drive::{client::DriveClient, provider::DriveRemoteStore};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_list_returns_annotated_files() {
    let (server, store, _session) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        serde_json::json!([
            common::listed_file("file-1", "/saves/slot1.dat", "1500"),
            common::listed_file("file-2", "/saves/slot2.dat", "20"),
        ]),
    )
    .await;

    let files = store.list(&common::mount()).await.expect("list failed");

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].id.as_str(), "file-1");
    assert_eq!(files[0].name, "/saves/slot1.dat");
    assert_eq!(files[0].sha256().as_str(), common::ABC_SHA256);
    assert_eq!(files[0].playtime().as_millis(), 1500.0);
    assert_eq!(files[1].playtime().as_millis(), 20.0);
}

#[tokio::test]
async fn test_list_sends_mount_query_and_bearer_token() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "name contains '/saves'"))
        .and(query_param("spaces", "appDataFolder"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let files = store.list(&common::mount()).await.expect("list failed");
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_list_drops_names_outside_mount() {
    let (server, store, _session) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        serde_json::json!([
            common::listed_file("file-1", "/saves/slot1.dat", "1"),
            common::listed_file("file-2", "/old/saves/slot1.dat", "1"),
        ]),
    )
    .await;

    let files = store.list(&common::mount()).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id.as_str(), "file-1");
}

#[tokio::test]
async fn test_paginated_listing_is_a_protocol_error() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Protocol(_)), "got {err:?}");
    assert!(!err.is_network());
}

#[tokio::test]
async fn test_missing_annotation_is_a_protocol_error() {
    let (server, store, _session) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        serde_json::json!([{
            "id": "file-1",
            "name": "/saves/slot1.dat",
            "appProperties": { "mode": "33188", "playtime": "1" }
        }]),
    )
    .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_is_a_network_failure() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    match &err {
        RemoteError::Status { status, message } => {
            assert_eq!(*status, 500);
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
    assert!(err.is_network());
}

#[tokio::test]
async fn test_slow_listing_times_out() {
    let (server, _store, session) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "files": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(session, server.uri())
        .with_list_timeout(Duration::from_millis(100));
    let store = DriveRemoteStore::new(client);

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Timeout(_)), "got {err:?}");
    assert!(err.is_network());
}

#[tokio::test]
async fn test_unreachable_host_is_offline() {
    let server = wiremock::MockServer::start().await;
    let session = common::session_for(
        &server,
        Some(savesync_core::ports::Tokens::new("test-token", None)),
    );
    let client = DriveClient::with_base_url(session, "http://127.0.0.1:1");
    let store = DriveRemoteStore::new(client);

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Offline(_)), "got {err:?}");
    assert!(err.is_network());
}
