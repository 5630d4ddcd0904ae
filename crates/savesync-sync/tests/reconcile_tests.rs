//! Integration tests for SyncEngine::reconcile
//!
//! The engine runs against in-memory fakes of all four ports. The remote
//! fake records every call so tests can assert exactly which network
//! actions a pass issued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::Notify;

use savesync_core::domain::{
    errors::{AuthError, RemoteError, StorageError},
    newtypes::{MountName, Playtime, RemoteId},
    record::{AppProperties, FileRecord, LocalFile, RemoteFileMetadata},
};
use savesync_core::hasher;
use savesync_core::ports::{IAuthProvider, ILocalStore, IPlaytimeClock, IRemoteStore};
use savesync_sync::{OutcomeStatus, SyncEngine, SyncError};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct MemoryStore {
    records: Mutex<BTreeMap<String, FileRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    fn with(records: Vec<FileRecord>) -> Self {
        let store = Self::default();
        for record in records {
            store.insert(record);
        }
        store
    }

    fn insert(&self, record: FileRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.name.clone(), record);
    }

    fn get(&self, name: &str) -> Option<FileRecord> {
        self.records.lock().unwrap().get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ILocalStore for MemoryStore {
    fn enumerate(&self) -> BoxStream<'_, Result<FileRecord, StorageError>> {
        let records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        stream::iter(records.into_iter().map(Ok)).boxed()
    }

    async fn put(&self, record: &FileRecord) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.insert(record.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.records.lock().unwrap().remove(name);
        Ok(())
    }
}

/// What the remote fails with, checked on every call of the given kind
#[derive(Clone, Copy)]
enum Failure {
    ListTimeout,
    ListProtocol,
    ListAuth,
    DownloadStatus,
}

#[derive(Default)]
struct MemoryRemote {
    objects: Mutex<BTreeMap<String, (RemoteFileMetadata, Vec<u8>)>>,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<Failure>>,
    next_id: AtomicUsize,
    slow_transfers: AtomicBool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryRemote {
    /// Adds an object as if another device had uploaded it
    fn seed(&self, name: &str, contents: &[u8], playtime: f64) -> RemoteId {
        let id = RemoteId::new(format!("seed-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
            .unwrap();
        let meta = RemoteFileMetadata {
            id: id.clone(),
            name: name.to_string(),
            modified_time: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()),
            size: Some(contents.len() as u64),
            app_properties: AppProperties {
                mode: 33152,
                sha256: hasher::compute(contents),
                playtime: pt(playtime),
            },
        };
        self.objects
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), (meta, contents.to_vec()));
        id
    }

    fn fail_with(&self, failure: Failure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    fn failure(&self) -> Option<Failure> {
        *self.failure.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Counts a transfer as in flight, holding it open when transfers are slow
    async fn begin_transfer(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.slow_transfers.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn end_transfer(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than listing
    fn actions(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c != "list").collect()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn by_name(&self, name: &str) -> Option<(RemoteFileMetadata, Vec<u8>)> {
        self.objects
            .lock()
            .unwrap()
            .values()
            .find(|(meta, _)| meta.name == name)
            .cloned()
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MemoryRemote {
    async fn list(&self, mount: &MountName) -> Result<Vec<RemoteFileMetadata>, RemoteError> {
        self.record("list".to_string());
        match self.failure() {
            Some(Failure::ListTimeout) => {
                return Err(RemoteError::Timeout("list timed out".to_string()))
            }
            Some(Failure::ListProtocol) => {
                return Err(RemoteError::Protocol("nextPageToken present".to_string()))
            }
            Some(Failure::ListAuth) => return Err(RemoteError::Auth(AuthError::Rejected)),
            _ => {}
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|(meta, _)| mount.contains(&meta.name))
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    async fn upload(
        &self,
        file: &LocalFile,
        playtime: Playtime,
        existing: Option<&RemoteId>,
    ) -> Result<(), RemoteError> {
        self.record(format!("upload:{}", file.name()));
        self.begin_transfer().await;
        let id = match existing {
            Some(id) => id.clone(),
            None => RemoteId::new(format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
                .unwrap(),
        };
        let record = file.record();
        let meta = RemoteFileMetadata {
            id: id.clone(),
            name: record.name.clone(),
            modified_time: Some(record.timestamp),
            size: Some(record.size()),
            app_properties: AppProperties {
                mode: record.mode,
                sha256: file.hash().clone(),
                playtime,
            },
        };
        self.objects
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), (meta, record.contents.clone()));
        self.end_transfer();
        Ok(())
    }

    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>, RemoteError> {
        self.record(format!("download:{id}"));
        if let Some(Failure::DownloadStatus) = self.failure() {
            return Err(RemoteError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .get(id.as_str())
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        self.record(format!("delete:{id}"));
        self.objects.lock().unwrap().remove(id.as_str());
        Ok(())
    }
}

struct FakeAuth {
    logged_in: bool,
}

#[async_trait::async_trait]
impl IAuthProvider for FakeAuth {
    async fn has_credentials(&self) -> bool {
        self.logged_in
    }
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok("token".to_string())
    }
    async fn refresh(&self, _rejected: &str) -> Result<String, AuthError> {
        Err(AuthError::Rejected)
    }
    async fn invalidate(&self) {}
}

struct MemoryClock {
    value: Mutex<Playtime>,
    stores: AtomicUsize,
}

impl MemoryClock {
    fn at(millis: f64) -> Self {
        Self {
            value: Mutex::new(pt(millis)),
            stores: AtomicUsize::new(0),
        }
    }

    fn value(&self) -> Playtime {
        *self.value.lock().unwrap()
    }

    fn set(&self, millis: f64) {
        *self.value.lock().unwrap() = pt(millis);
    }
}

#[async_trait::async_trait]
impl IPlaytimeClock for MemoryClock {
    async fn sample(&self) -> Result<Playtime, StorageError> {
        Ok(self.value())
    }

    async fn store(&self, playtime: Playtime) -> Result<(), StorageError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap() = playtime;
        Ok(())
    }
}

// ============================================================================
// Test helpers
// ============================================================================

fn pt(millis: f64) -> Playtime {
    Playtime::from_millis(millis).unwrap()
}

fn mount() -> MountName {
    MountName::new("/saves".to_string()).unwrap()
}

fn record(name: &str, contents: &[u8]) -> FileRecord {
    FileRecord::new(
        name,
        contents.to_vec(),
        33188,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

struct Harness {
    local: Arc<MemoryStore>,
    remote: Arc<MemoryRemote>,
    clock: Arc<MemoryClock>,
    engine: SyncEngine,
}

fn harness(local: Vec<FileRecord>, local_playtime: f64) -> Harness {
    harness_with_auth(local, local_playtime, true)
}

fn harness_with_auth(local: Vec<FileRecord>, local_playtime: f64, logged_in: bool) -> Harness {
    let local = Arc::new(MemoryStore::with(local));
    let remote = Arc::new(MemoryRemote::default());
    let clock = Arc::new(MemoryClock::at(local_playtime));
    let engine = SyncEngine::new(
        mount(),
        local.clone(),
        remote.clone(),
        Arc::new(FakeAuth { logged_in }),
        clock.clone(),
    )
    .with_max_concurrent(2);
    Harness {
        local,
        remote,
        clock,
        engine,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_local_only_file_is_uploaded() {
    let h = harness(vec![record("/saves/save1", b"H1")], 100.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.status, OutcomeStatus::Applied);
    assert_eq!(outcome.report.uploaded, 1);
    assert_eq!(outcome.report.downloaded, 0);
    assert_eq!(h.remote.actions(), vec!["upload:/saves/save1"]);

    let (meta, contents) = h.remote.by_name("/saves/save1").unwrap();
    assert_eq!(contents, b"H1");
    assert_eq!(meta.sha256(), &hasher::compute(b"H1"));
    assert_eq!(meta.playtime(), pt(100.0));
    assert_eq!(h.clock.value(), pt(100.0));
}

#[tokio::test]
async fn test_remote_ahead_overwrites_local() {
    let h = harness(vec![record("/saves/save1", b"H1")], 50.0);
    let id = h.remote.seed("/saves/save1", b"H2", 200.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.downloaded, 1);
    assert_eq!(h.remote.actions(), vec![format!("download:{id}")]);
    let stored = h.local.get("/saves/save1").unwrap();
    assert_eq!(hasher::compute(&stored.contents), hasher::compute(b"H2"));
    // Downloaded records carry the remote mode and modification time
    assert_eq!(stored.mode, 33152);
    assert_eq!(stored.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap());
    assert_eq!(outcome.rebased_to, Some(pt(200.0)));
    assert_eq!(h.clock.value(), pt(200.0));
}

#[tokio::test]
async fn test_remote_only_file_is_deleted_when_local_ahead() {
    let h = harness(vec![], 300.0);
    let id = h.remote.seed("/saves/save2", b"old", 10.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.deleted_remote, 1);
    assert_eq!(h.remote.actions(), vec![format!("delete:{id}")]);
    assert!(h.remote.by_name("/saves/save2").is_none());
    assert_eq!(outcome.rebased_to, None);
    assert_eq!(h.clock.value(), pt(300.0));
}

#[tokio::test]
async fn test_second_pass_after_upload_does_nothing() {
    let h = harness(vec![record("/saves/save1", b"H1")], 100.0);
    h.engine.reconcile().await.unwrap();
    h.remote.clear_calls();

    let outcome = h.engine.reconcile().await.unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.report.actions(), 0);
    assert_eq!(outcome.report.unchanged, 1);
    assert!(h.remote.actions().is_empty());
    assert_eq!(h.remote.calls(), vec!["list"]);
}

#[tokio::test]
async fn test_list_timeout_degrades_without_mutation() {
    let h = harness(vec![record("/saves/save1", b"H1")], 100.0);
    h.remote.seed("/saves/save2", b"R", 500.0);
    h.remote.fail_with(Failure::ListTimeout);

    let outcome = h.engine.reconcile().await.unwrap();

    assert!(!outcome.applied);
    assert!(outcome.is_degraded());
    assert!(matches!(
        outcome.status,
        OutcomeStatus::Degraded { ref cause } if cause.contains("timed out")
    ));
    assert!(h.remote.actions().is_empty());
    assert_eq!(h.local.names(), vec!["/saves/save1"]);
    assert_eq!(h.clock.value(), pt(100.0));
    assert_eq!(h.clock.stores.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_equal_digests_issue_no_actions() {
    let h = harness(vec![record("/saves/a", b"same"), record("/saves/b", b"same-b")], 0.0);
    h.remote.seed("/saves/a", b"same", 900.0);
    h.remote.seed("/saves/b", b"same-b", 5.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert!(h.remote.actions().is_empty());
    assert_eq!(outcome.report.unchanged, 2);
    // The clock still follows the remote replica
    assert_eq!(h.clock.value(), pt(900.0));
}

#[tokio::test]
async fn test_tie_favors_local() {
    let h = harness(vec![record("/saves/a", b"local")], 100.0);
    h.remote.seed("/saves/a", b"remote", 100.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.uploaded, 1);
    let (meta, contents) = h.remote.by_name("/saves/a").unwrap();
    assert_eq!(contents, b"local");
    assert_eq!(meta.id.as_str(), "seed-0");
    assert_eq!(outcome.rebased_to, None);
}

#[tokio::test]
async fn test_remote_ahead_deletes_local_only_and_fetches_remote_only() {
    let h = harness(vec![record("/saves/stale", b"x")], 10.0);
    h.remote.seed("/saves/fresh", b"y", 20.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.deleted_local, 1);
    assert_eq!(outcome.report.downloaded, 1);
    assert_eq!(h.local.names(), vec!["/saves/fresh"]);
}

#[tokio::test]
async fn test_clock_is_monotonic_across_passes() {
    let h = harness(vec![record("/saves/a", b"1")], 100.0);

    for (name, remote_playtime) in [("/saves/b", 50.0), ("/saves/c", 400.0), ("/saves/d", 300.0)] {
        let before = h.clock.value();
        h.remote.seed(name, name.as_bytes(), remote_playtime);

        let outcome = h.engine.reconcile().await.unwrap();

        let after = h.clock.value();
        assert!(after >= before);
        assert_eq!(after, before.max(outcome.remote_playtime));
    }
}

#[tokio::test]
async fn test_restart_not_advised_on_first_pass() {
    let h = harness(vec![], 0.0);
    h.remote.seed("/saves/a", b"r", 10.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.downloaded, 1);
    assert!(!outcome.restart_advised);
}

#[tokio::test]
async fn test_restart_advised_when_later_pass_downloads() {
    let h = harness(vec![record("/saves/a", b"v1")], 100.0);
    h.engine.reconcile().await.unwrap();

    // Another device uploads newer contents with more playtime
    let (meta, _) = h.remote.by_name("/saves/a").unwrap();
    h.remote.objects.lock().unwrap().remove(meta.id.as_str());
    h.remote.seed("/saves/a", b"v2", 500.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.downloaded, 1);
    assert!(outcome.restart_advised);
    assert_eq!(h.local.get("/saves/a").unwrap().contents, b"v2");
}

#[tokio::test]
async fn test_degraded_pass_does_not_count_as_first() {
    let h = harness(vec![], 0.0);
    h.remote.fail_with(Failure::ListTimeout);
    assert!(h.engine.reconcile().await.unwrap().is_degraded());

    *h.remote.failure.lock().unwrap() = None;
    h.remote.seed("/saves/a", b"r", 10.0);
    let outcome = h.engine.reconcile().await.unwrap();

    assert!(outcome.applied);
    assert!(!outcome.restart_advised);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_network_failure_during_actions_degrades() {
    let h = harness(vec![], 0.0);
    h.remote.seed("/saves/a", b"r", 10.0);
    h.remote.fail_with(Failure::DownloadStatus);

    let outcome = h.engine.reconcile().await.unwrap();

    assert!(outcome.is_degraded());
    assert!(!outcome.applied);
    assert_eq!(outcome.rebased_to, None);
    assert_eq!(h.clock.value(), Playtime::ZERO);
    assert!(h.local.names().is_empty());
}

#[tokio::test]
async fn test_protocol_error_is_returned() {
    let h = harness(vec![record("/saves/a", b"x")], 0.0);
    h.remote.fail_with(Failure::ListProtocol);

    let err = h.engine.reconcile().await.unwrap_err();

    assert!(matches!(err, SyncError::Protocol(_)), "got {err:?}");
    assert!(h.remote.actions().is_empty());
}

#[tokio::test]
async fn test_auth_loss_requires_login() {
    let h = harness(vec![record("/saves/a", b"x")], 0.0);
    h.remote.fail_with(Failure::ListAuth);

    let err = h.engine.reconcile().await.unwrap_err();

    assert!(err.requires_login());
    assert_eq!(h.local.names(), vec!["/saves/a"]);
}

#[tokio::test]
async fn test_not_logged_in_skips_remote() {
    let h = harness_with_auth(vec![record("/saves/a", b"x")], 0.0, false);

    let err = h.engine.reconcile().await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(AuthError::NotLoggedIn)));
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_storage_failure_stops_pass() {
    let h = harness(vec![], 0.0);
    h.remote.seed("/saves/a", b"r", 10.0);
    h.local.fail_writes.store(true, Ordering::SeqCst);

    let err = h.engine.reconcile().await.unwrap_err();

    assert!(matches!(err, SyncError::Storage(_)), "got {err:?}");
    assert_eq!(h.clock.value(), Playtime::ZERO);
}

#[tokio::test]
async fn test_failed_pass_converges_on_rerun() {
    let h = harness(vec![], 0.0);
    h.remote.seed("/saves/a", b"r", 10.0);
    h.local.fail_writes.store(true, Ordering::SeqCst);
    h.engine.reconcile().await.unwrap_err();

    h.local.fail_writes.store(false, Ordering::SeqCst);
    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.downloaded, 1);
    assert_eq!(h.local.get("/saves/a").unwrap().contents, b"r");
    assert_eq!(h.clock.value(), pt(10.0));
}

#[tokio::test]
async fn test_files_outside_mount_are_ignored() {
    let h = harness(vec![], 0.0);
    h.remote.seed("/config/options.ini", b"c", 999.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.actions(), 0);
    assert_eq!(h.clock.value(), Playtime::ZERO);
}

#[tokio::test]
async fn test_sibling_mount_saves_are_left_alone() {
    let h = harness(vec![record("/saves/a", b"mine")], 500.0);
    h.remote.seed("/saves2/slot", b"theirs", 10.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(h.remote.actions(), vec!["upload:/saves/a"]);
    assert_eq!(outcome.report.deleted_remote, 0);
    assert!(h.remote.by_name("/saves2/slot").is_some());
}

#[tokio::test]
async fn test_sibling_mount_ahead_does_not_download_into_mount() {
    let h = harness(vec![], 10.0);
    h.remote.seed("/saves2/slot", b"theirs", 900.0);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.actions(), 0);
    assert!(h.local.names().is_empty());
    assert_eq!(h.clock.value(), pt(10.0));
}

#[tokio::test]
async fn test_host_clock_advance_wins_next_pass() {
    let h = harness(vec![record("/saves/a", b"v1")], 100.0);
    h.engine.reconcile().await.unwrap();

    // The host keeps playing and writes a new save
    h.clock.set(150.0);
    h.local.insert(record("/saves/a", b"v2"));
    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.uploaded, 1);
    let (meta, contents) = h.remote.by_name("/saves/a").unwrap();
    assert_eq!(contents, b"v2");
    assert_eq!(meta.playtime(), pt(150.0));
}

// ============================================================================
// Concurrency
// ============================================================================

/// Remote whose listing blocks until released
#[derive(Default)]
struct GatedRemote {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl IRemoteStore for GatedRemote {
    async fn list(&self, _mount: &MountName) -> Result<Vec<RemoteFileMetadata>, RemoteError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
    async fn upload(
        &self,
        _file: &LocalFile,
        _playtime: Playtime,
        _existing: Option<&RemoteId>,
    ) -> Result<(), RemoteError> {
        Ok(())
    }
    async fn download(&self, _id: &RemoteId) -> Result<Vec<u8>, RemoteError> {
        Ok(Vec::new())
    }
    async fn delete(&self, _id: &RemoteId) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_transfers_respect_fan_out_limit() {
    let files: Vec<_> = (0..8)
        .map(|i| record(&format!("/saves/slot{i}"), format!("data{i}").as_bytes()))
        .collect();
    let h = harness(files, 100.0);
    h.remote.slow_transfers.store(true, Ordering::SeqCst);

    let outcome = h.engine.reconcile().await.unwrap();

    assert_eq!(outcome.report.uploaded, 8);
    // The harness engine allows two transfers at a time
    assert_eq!(h.remote.peak_in_flight.load(Ordering::SeqCst), 2);
    assert_eq!(h.remote.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_pass_is_rejected() {
    let remote = Arc::new(GatedRemote::default());
    let engine = Arc::new(SyncEngine::new(
        mount(),
        Arc::new(MemoryStore::default()),
        remote.clone(),
        Arc::new(FakeAuth { logged_in: true }),
        Arc::new(MemoryClock::at(0.0)),
    ));

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.reconcile().await }
    });
    remote.entered.notified().await;

    let err = engine.reconcile().await.unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning(ref m) if m.as_str() == "/saves"));

    remote.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.applied);

    // The lock is released once the pass ends
    remote.release.notify_one();
    assert!(engine.reconcile().await.unwrap().applied);
}
