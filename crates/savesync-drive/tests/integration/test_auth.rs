//! Integration tests for the refresh-once authorization policy
//!
//! The relay's refresh endpoint is mocked at `/api/oauth-refresh` on the
//! same server as the Drive API.

use std::sync::Arc;
use std::time::Duration;

use savesync_core::{
    domain::errors::{AuthError, RemoteError},
    ports::{IAuthProvider, IRemoteStore, Tokens},
};
use savesync_drive::{auth::TokenSession, client::DriveClient, provider::DriveRemoteStore};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

async fn store_with_tokens(
    tokens: Option<Tokens>,
) -> (MockServer, DriveRemoteStore, Arc<TokenSession>) {
    let server = MockServer::start().await;
    let session = common::session_for(&server, tokens);
    let client = DriveClient::with_base_url(session.clone(), server.uri());
    (server, DriveRemoteStore::new(client), session)
}

async fn mount_list_for_token(server: &MockServer, token: &str, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] }))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_retried() {
    let (server, store, session) =
        store_with_tokens(Some(Tokens::new("old", Some("refresh-1".to_string())))).await;

    mount_list_for_token(&server, "old", 401).await;
    mount_list_for_token(&server, "new", 200).await;
    Mock::given(method("POST"))
        .and(path("/api/oauth-refresh"))
        .and(query_param("refresh_token", "refresh-1"))
        .and(header("X-Requested-With", "fetch"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "new" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    store.list(&common::mount()).await.expect("list after refresh failed");

    let tokens = session.tokens().await.expect("session should survive refresh");
    assert_eq!(tokens.access_token, "new");
    // The relay does not rotate refresh tokens; the old one is kept
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_second_rejection_clears_session() {
    let (server, store, session) =
        store_with_tokens(Some(Tokens::new("old", Some("refresh-1".to_string())))).await;

    mount_list_for_token(&server, "old", 401).await;
    mount_list_for_token(&server, "new", 401).await;
    Mock::given(method("POST"))
        .and(path("/api/oauth-refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "new" })),
        )
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Auth(AuthError::Rejected)), "got {err:?}");
    assert!(!err.is_network());
    assert!(!session.has_credentials().await);
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let (server, store, session) =
        store_with_tokens(Some(Tokens::new("old", Some("refresh-1".to_string())))).await;

    mount_list_for_token(&server, "old", 401).await;
    Mock::given(method("POST"))
        .and(path("/api/oauth-refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(
        matches!(err, RemoteError::Auth(AuthError::RefreshFailed(_))),
        "got {err:?}"
    );
    assert!(!session.has_credentials().await);
}

#[tokio::test]
async fn test_request_without_session_is_not_sent() {
    let (server, store, _session) = store_with_tokens(None).await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Auth(AuthError::NotLoggedIn)), "got {err:?}");
}

#[tokio::test]
async fn test_non_auth_errors_do_not_trigger_refresh() {
    let (server, store, session) =
        store_with_tokens(Some(Tokens::new("old", Some("refresh-1".to_string())))).await;

    mount_list_for_token(&server, "old", 403).await;
    Mock::given(method("POST"))
        .and(path("/api/oauth-refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store.list(&common::mount()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 403, .. }), "got {err:?}");
    assert!(session.has_credentials().await);
}

#[tokio::test]
async fn test_unreachable_relay_degrades_without_logout() {
    let server = MockServer::start().await;
    // Nothing listens on the discard port
    let session = common::session_with_relay(
        "http://127.0.0.1:9/api",
        Some(Tokens::new("old", Some("refresh-1".to_string()))),
    );
    let store = DriveRemoteStore::new(DriveClient::with_base_url(session.clone(), server.uri()));
    mount_list_for_token(&server, "old", 401).await;

    let err = store.list(&common::mount()).await.unwrap_err();

    assert!(matches!(err, RemoteError::Offline(_)), "got {err:?}");
    assert!(err.is_network());
    let tokens = session.tokens().await.expect("session should be kept");
    assert_eq!(tokens.access_token, "old");
}

#[tokio::test]
async fn test_hung_relay_is_bounded_by_list_timeout() {
    let (server, _store, session) =
        store_with_tokens(Some(Tokens::new("old", Some("refresh-1".to_string())))).await;
    mount_list_for_token(&server, "old", 401).await;
    Mock::given(method("POST"))
        .and(path("/api/oauth-refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "new" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let client = DriveClient::with_base_url(session.clone(), server.uri())
        .with_list_timeout(Duration::from_millis(200));
    let store = DriveRemoteStore::new(client);

    let err = store.list(&common::mount()).await.unwrap_err();

    assert!(matches!(err, RemoteError::Timeout(_)), "got {err:?}");
    assert!(session.has_credentials().await);
}
