//! Integration tests for uploads, downloads and deletes
//!
//! Uploads are checked against both phases of the resumable protocol:
//! the metadata request and the contents request sent to the returned
//! session URL.

use savesync_core::{
    domain::{errors::RemoteError, newtypes::Playtime, newtypes::RemoteId},
    ports::IRemoteStore,
};
use wiremock::{
    matchers::{body_bytes, body_partial_json, header, method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::common;

// ============================================================================
// Upload tests
// ============================================================================

#[tokio::test]
async fn test_upload_creates_object_in_app_data_folder() {
    let (server, store, _session) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("X-Upload-Content-Type", "application/octet-stream"))
        .and(header("X-Upload-Content-Length", "3"))
        .and(body_partial_json(serde_json::json!({
            "name": "/saves/slot1.dat",
            "mimeType": "application/octet-stream",
            "parents": ["appDataFolder"],
            "modifiedTime": "2024-05-01T12:00:00.000Z",
            "appProperties": {
                "mode": "33188",
                "sha256": common::ABC_SHA256,
                "playtime": "1500"
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Location", format!("{}/upload-session/new-1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-session/new-1"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_bytes(b"abc".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "file-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let file = common::local_file("/saves/slot1.dat", b"abc");
    store
        .upload(&file, Playtime::from_millis(1500.0).unwrap(), None)
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_upload_updates_existing_object_in_place() {
    let (server, store, _session) = common::setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/file-1"))
        .and(query_param("uploadType", "resumable"))
        .and(body_partial_json(serde_json::json!({
            "name": "/saves/slot1.dat",
            "appProperties": { "playtime": "42" }
        })))
        .respond_with(
            // A relative Location resolves against the request URL
            ResponseTemplate::new(200).append_header("Location", "/upload-session/update-1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload-session/update-1"))
        .and(body_bytes(b"abc".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = common::local_file("/saves/slot1.dat", b"abc");
    let existing = RemoteId::new("file-1".to_string()).unwrap();
    store
        .upload(&file, Playtime::from_millis(42.0).unwrap(), Some(&existing))
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_upload_without_location_is_a_protocol_error() {
    let (server, store, _session) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let file = common::local_file("/saves/slot1.dat", b"abc");
    let err = store.upload(&file, Playtime::ZERO, None).await.unwrap_err();
    assert!(matches!(err, RemoteError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn test_failed_contents_request_is_a_network_failure() {
    let (server, store, _session) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Location", format!("{}/upload-session/broken", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-session/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let file = common::local_file("/saves/slot1.dat", b"abc");
    let err = store.upload(&file, Playtime::ZERO, None).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 503, .. }), "got {err:?}");
    assert!(err.is_network());
}

// ============================================================================
// Download tests
// ============================================================================

#[tokio::test]
async fn test_download_returns_content() {
    let (server, store, _session) = common::setup_drive_mock().await;
    let content = b"save game contents".to_vec();
    common::mount_download(&server, "file-1", &content).await;

    let id = RemoteId::new("file-1".to_string()).unwrap();
    let data = store.download(&id).await.expect("download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, store, _session) = common::setup_drive_mock().await;
    common::mount_download(&server, "empty-1", &[]).await;

    let id = RemoteId::new("empty-1".to_string()).unwrap();
    let data = store.download(&id).await.expect("download failed");
    assert!(data.is_empty());
}

#[tokio::test]
async fn test_download_missing_object_fails() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = RemoteId::new("gone".to_string()).unwrap();
    let err = store.download(&id).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 404, .. }), "got {err:?}");
}

// ============================================================================
// Delete tests
// ============================================================================

#[tokio::test]
async fn test_delete_object() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/file-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = RemoteId::new("file-1".to_string()).unwrap();
    store.delete(&id).await.expect("delete failed");
}

#[tokio::test]
async fn test_delete_of_missing_object_succeeds() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/file-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = RemoteId::new("file-1".to_string()).unwrap();
    store.delete(&id).await.expect("404 on delete should succeed");
}

#[tokio::test]
async fn test_delete_server_error_fails() {
    let (server, store, _session) = common::setup_drive_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/file-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let id = RemoteId::new("file-1".to_string()).unwrap();
    let err = store.delete(&id).await.unwrap_err();
    assert!(err.is_network());
}
