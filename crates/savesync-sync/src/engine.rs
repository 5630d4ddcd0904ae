//! Reconciliation engine
//!
//! The [`SyncEngine`] reconciles the local and remote replicas of one
//! mount.
//!
//! ## Pass Flow
//!
//! 1. **Sample**: read the playtime clock once; it stays fixed for the pass
//! 2. **Snapshot**: enumerate and hash the local replica while listing the
//!    remote one
//! 3. **Plan**: pair by name and decide one action per file ([`crate::plan`])
//! 4. **Execute**: run actions concurrently, bounded by `max_concurrent`
//! 5. **Rebase**: move the clock forward to the remote playtime if it is ahead
//!
//! ## Failure handling
//!
//! Network failures end the pass with a degraded [`Outcome`] instead of an
//! error: nothing is mutated if listing failed, and actions that already
//! completed are kept. Auth, protocol and storage failures are returned as
//! [`SyncError`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{stream, TryStreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use savesync_core::domain::{
    errors::{AuthError, StorageError},
    newtypes::{MountName, Playtime},
    record::LocalFile,
};
use savesync_core::hasher;
use savesync_core::ports::{IAuthProvider, ILocalStore, IPlaytimeClock, IRemoteStore};

use crate::plan::{Action, Plan};
use crate::SyncError;

/// Default bound on concurrently executing actions
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

// ============================================================================
// Outcome
// ============================================================================

/// How a pass ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every planned action completed
    Applied,
    /// The remote replica was unreachable; automatic sync should pause
    Degraded { cause: String },
}

/// Counts of what a pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub deleted_local: usize,
    pub deleted_remote: usize,
    pub unchanged: usize,
}

impl SyncReport {
    /// Number of mutations performed on either replica
    pub fn actions(&self) -> usize {
        self.uploaded + self.downloaded + self.deleted_local + self.deleted_remote
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// True only if the whole plan was carried out
    pub applied: bool,
    /// Local files the host may hold in memory were replaced
    pub restart_advised: bool,
    pub report: SyncReport,
    pub local_playtime: Playtime,
    pub remote_playtime: Playtime,
    /// New clock value when the pass moved the clock forward
    pub rebased_to: Option<Playtime>,
    pub duration_ms: u64,
}

impl Outcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Degraded { .. })
    }
}

/// Per-pass action counters shared by concurrently running actions
#[derive(Default)]
struct Tally {
    uploaded: AtomicUsize,
    downloaded: AtomicUsize,
    deleted_local: AtomicUsize,
    deleted_remote: AtomicUsize,
}

impl Tally {
    fn report(&self, unchanged: usize) -> SyncReport {
        SyncReport {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            deleted_local: self.deleted_local.load(Ordering::Relaxed),
            deleted_remote: self.deleted_remote.load(Ordering::Relaxed),
            unchanged,
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// State carried between passes of one engine
#[derive(Debug, Default)]
struct EngineState {
    /// A pass on this engine has completed with every action applied
    completed_pass: bool,
}

/// Reconciles the local and remote replicas of one mount
///
/// At most one pass runs at a time; a second call while one is in flight
/// fails with [`SyncError::AlreadyRunning`].
pub struct SyncEngine {
    mount: MountName,
    local: Arc<dyn ILocalStore>,
    remote: Arc<dyn IRemoteStore>,
    auth: Arc<dyn IAuthProvider>,
    clock: Arc<dyn IPlaytimeClock>,
    max_concurrent: usize,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    pub fn new(
        mount: MountName,
        local: Arc<dyn ILocalStore>,
        remote: Arc<dyn IRemoteStore>,
        auth: Arc<dyn IAuthProvider>,
        clock: Arc<dyn IPlaytimeClock>,
    ) -> Self {
        Self {
            mount,
            local,
            remote,
            auth,
            clock,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Sets the bound on concurrently executing actions (at least 1)
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn mount(&self) -> &MountName {
        &self.mount
    }

    /// Runs one reconciliation pass
    ///
    /// # Errors
    /// - [`SyncError::Auth`] when no credentials are stored or they were
    ///   permanently rejected; nothing is mutated before the first remote call
    /// - [`SyncError::Protocol`] when the remote listing or an upload
    ///   response has an unusable shape
    /// - [`SyncError::Storage`] when the local replica or the clock fails
    /// - [`SyncError::AlreadyRunning`] when another pass is in flight
    #[tracing::instrument(skip(self), fields(mount = %self.mount))]
    pub async fn reconcile(&self) -> Result<Outcome, SyncError> {
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning(self.mount.clone()))?;
        let started = Instant::now();

        if !self.auth.has_credentials().await {
            debug!("Not logged in, skipping pass");
            return Err(AuthError::NotLoggedIn.into());
        }

        let local_playtime = self.clock.sample().await?;

        let (local, remote) = tokio::join!(self.snapshot_local(), self.remote.list(&self.mount));
        let local = local?;
        let remote = match remote {
            Ok(remote) => remote,
            Err(e) => match SyncError::from(e) {
                SyncError::Network(cause) => {
                    warn!(error = %cause, "Remote replica unreachable, pausing sync");
                    return Ok(Outcome {
                        status: OutcomeStatus::Degraded {
                            cause: cause.to_string(),
                        },
                        applied: false,
                        restart_advised: false,
                        report: SyncReport::default(),
                        local_playtime,
                        remote_playtime: Playtime::ZERO,
                        rebased_to: None,
                        duration_ms: elapsed_ms(started),
                    });
                }
                other => return Err(other),
            },
        };

        let Plan {
            local_playtime,
            remote_playtime,
            actions,
            unchanged,
        } = Plan::build(local, remote, local_playtime);
        debug!(
            actions = actions.len(),
            unchanged,
            local_playtime = %local_playtime,
            remote_playtime = %remote_playtime,
            "Planned pass"
        );

        let tally = Tally::default();
        let executed = stream::iter(actions.into_iter().map(Ok::<_, SyncError>))
            .try_for_each_concurrent(self.max_concurrent, |action| {
                self.execute(action, local_playtime, &tally)
            })
            .await;
        let report = tally.report(unchanged);
        let restart_advised = report.downloaded > 0 && state.completed_pass;

        if let Err(e) = executed {
            let SyncError::Network(cause) = e else {
                return Err(e);
            };
            warn!(
                error = %cause,
                completed = report.actions(),
                "Pass interrupted by network failure, pausing sync"
            );
            return Ok(Outcome {
                status: OutcomeStatus::Degraded {
                    cause: cause.to_string(),
                },
                applied: false,
                restart_advised,
                report,
                local_playtime,
                remote_playtime,
                rebased_to: None,
                duration_ms: elapsed_ms(started),
            });
        }

        let rebased_to = if remote_playtime > local_playtime {
            self.clock.store(remote_playtime).await?;
            Some(remote_playtime)
        } else {
            None
        };
        state.completed_pass = true;

        let outcome = Outcome {
            status: OutcomeStatus::Applied,
            applied: true,
            restart_advised,
            report,
            local_playtime,
            remote_playtime,
            rebased_to,
            duration_ms: elapsed_ms(started),
        };

        info!(
            uploaded = outcome.report.uploaded,
            downloaded = outcome.report.downloaded,
            deleted_local = outcome.report.deleted_local,
            deleted_remote = outcome.report.deleted_remote,
            unchanged = outcome.report.unchanged,
            local_playtime = %local_playtime,
            remote_playtime = %remote_playtime,
            restart_advised,
            duration_ms = outcome.duration_ms,
            "Reconciliation pass completed"
        );

        Ok(outcome)
    }

    /// Enumerates and hashes the local replica
    async fn snapshot_local(&self) -> Result<Vec<LocalFile>, StorageError> {
        self.local.enumerate().map_ok(LocalFile::new).try_collect().await
    }

    async fn execute(
        &self,
        action: Action,
        playtime: Playtime,
        tally: &Tally,
    ) -> Result<(), SyncError> {
        debug!(name = %action.name(), action = action.kind(), "Executing action");

        match action {
            Action::Upload { file, existing } => {
                self.remote.upload(&file, playtime, existing.as_ref()).await?;
                tally.uploaded.fetch_add(1, Ordering::Relaxed);
            }
            Action::Download { remote } => {
                let contents = self.remote.download(&remote.id).await?;
                let digest = hasher::compute(&contents);
                if &digest != remote.sha256() {
                    warn!(
                        name = %remote.name,
                        expected = %remote.sha256().short(),
                        actual = %digest.short(),
                        "Downloaded contents do not match advertised digest"
                    );
                }
                self.local.put(&remote.to_record(contents)).await?;
                tally.downloaded.fetch_add(1, Ordering::Relaxed);
            }
            Action::DeleteLocal { name } => {
                self.local.delete(&name).await?;
                tally.deleted_local.fetch_add(1, Ordering::Relaxed);
            }
            Action::DeleteRemote { id, name } => {
                self.remote.delete(&id).await?;
                debug!(name = %name, id = %id, "Deleted remote object");
                tally.deleted_remote.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
