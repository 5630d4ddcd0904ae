//! Sync command - Reconcile local saves with the remote replica
//!
//! Provides the `savesync sync` CLI command which:
//! 1. Loads configuration and opens the database
//! 2. Opens the keyring-backed session and the Drive remote store
//! 3. Runs one reconciliation pass per mount and displays the outcome
//!
//! With `--watch` the command acts as the host session: it accounts usage
//! as playtime, persists it before every pass and repeats the pass every
//! `sync.watch_interval_secs` until interrupted or logged out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use savesync_cache::SqlitePlaytimeClock;
use savesync_core::domain::{errors::AuthError, newtypes::MountName};
use savesync_sync::{usage::UsageTracker, Outcome, OutcomeStatus, SyncEngine, SyncError};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::context::CliContext;
use crate::output::{format_playtime, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Only reconcile this mount
    #[arg(long)]
    pub mount: Option<String>,

    /// Keep running, reconciling every `sync.watch_interval_secs`
    #[arg(long)]
    pub watch: bool,
}

/// One mount under watch: its engine, clock and tracked usage
struct WatchedMount {
    engine: SyncEngine,
    clock: Arc<SqlitePlaytimeClock>,
    usage: UsageTracker,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        ctx.ensure_valid()?;

        let mounts = ctx.mounts(self.mount.as_deref())?;
        let db = ctx.open_database().await?;
        let session = ctx.open_session()?;
        let remote = ctx.remote_store(session.clone())?;

        let mut engines = Vec::with_capacity(mounts.len());
        for mount in &mounts {
            let clock = Arc::new(db.clock(mount));
            let engine = ctx.engine(&db, mount, session.clone(), remote.clone(), clock.clone());
            engines.push((engine, clock));
        }

        if self.watch {
            let mut watched = Vec::with_capacity(engines.len());
            for (engine, clock) in engines {
                let usage = UsageTracker::resume_from(clock.as_ref())
                    .await
                    .with_context(|| format!("Failed to read playtime of {}", engine.mount()))?;
                watched.push(WatchedMount {
                    engine,
                    clock,
                    usage,
                });
            }
            let interval = Duration::from_secs(ctx.config.sync.watch_interval_secs);
            return watch(ctx, &*formatter, watched, interval).await;
        }

        let mut results = Vec::new();
        for (engine, _) in &engines {
            match engine.reconcile().await {
                Ok(outcome) => {
                    if !ctx.is_json() {
                        report_outcome(&*formatter, engine.mount(), &outcome);
                    }
                    results.push(serde_json::json!({
                        "mount": engine.mount().as_str(),
                        "outcome": outcome,
                    }));
                }
                Err(e) if e.requires_login() => {
                    formatter.error(&format!(
                        "{}. Run 'savesync auth login' first.",
                        login_hint(&e)
                    ));
                    return Ok(());
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Sync of {} failed", engine.mount()));
                }
            }
        }

        if ctx.is_json() {
            formatter.print_json(&serde_json::Value::Array(results));
        }
        Ok(())
    }
}

/// Runs passes on every watched mount until Ctrl-C or auth loss
async fn watch(
    ctx: &CliContext,
    formatter: &dyn OutputFormatter,
    mut mounts: Vec<WatchedMount>,
    interval: Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    formatter.info(&format!(
        "Watching {} mount{} every {}s (Ctrl-C to stop)",
        mounts.len(),
        if mounts.len() == 1 { "" } else { "s" },
        interval.as_secs()
    ));
    info!(mounts = mounts.len(), interval_secs = interval.as_secs(), "Watch started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                persist_usage(&mounts).await;
                formatter.success("Watch stopped");
                return Ok(());
            }
        }

        let mut session_lost = None;
        for watched in &mut mounts {
            let mount = watched.engine.mount().clone();

            if let Err(e) = watched.usage.persist(watched.clock.as_ref()).await {
                warn!(mount = %mount, error = %e, "Failed to persist playtime, skipping pass");
                continue;
            }

            match watched.engine.reconcile().await {
                Ok(outcome) => {
                    if let Some(playtime) = outcome.rebased_to {
                        watched.usage.rebase(playtime);
                    }
                    if ctx.is_json() {
                        formatter.print_json(&serde_json::json!({
                            "mount": mount.as_str(),
                            "outcome": outcome,
                        }));
                    } else {
                        report_outcome(formatter, &mount, &outcome);
                    }
                    if outcome.is_degraded() {
                        formatter.info("Automatic sync paused until the next interval");
                    }
                }
                Err(e) if e.requires_login() => {
                    warn!(mount = %mount, error = %e, "Session lost, stopping watch");
                    session_lost = Some(e);
                    break;
                }
                Err(e) => {
                    formatter.error(&format!("Sync of {} failed: {}", mount, e));
                }
            }
        }

        if let Some(e) = session_lost {
            persist_usage(&mounts).await;
            formatter.error(&format!(
                "{}. Run 'savesync auth login' to resume syncing.",
                login_hint(&e)
            ));
            return Ok(());
        }
    }
}

/// Stores tracked usage of every mount, logging failures
async fn persist_usage(mounts: &[WatchedMount]) {
    for watched in mounts {
        if let Err(e) = watched.usage.persist(watched.clock.as_ref()).await {
            warn!(mount = %watched.engine.mount(), error = %e, "Failed to persist playtime");
        }
    }
}

fn login_hint(error: &SyncError) -> &'static str {
    match error {
        SyncError::Auth(AuthError::NotLoggedIn) => "Not logged in",
        _ => "The remote session was rejected and has been cleared",
    }
}

/// Displays one pass outcome in human-readable form
fn report_outcome(formatter: &dyn OutputFormatter, mount: &MountName, outcome: &Outcome) {
    let duration_display = if outcome.duration_ms >= 1000 {
        format!("{:.1}s", outcome.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", outcome.duration_ms)
    };

    if let OutcomeStatus::Degraded { cause } = &outcome.status {
        formatter.warn(&format!("{}: remote unavailable ({})", mount, cause));
    } else if outcome.report.actions() == 0 {
        formatter.success(&format!("{}: already up to date", mount));
    } else {
        formatter.success(&format!("{}: synced in {}", mount, duration_display));
    }

    let report = &outcome.report;
    for (label, count) in [
        ("Uploaded:      ", report.uploaded),
        ("Downloaded:    ", report.downloaded),
        ("Deleted local: ", report.deleted_local),
        ("Deleted remote:", report.deleted_remote),
    ] {
        if count > 0 {
            formatter.info(&format!(
                "{} {} file{}",
                label,
                count,
                if count == 1 { "" } else { "s" }
            ));
        }
    }

    formatter.info(&format!(
        "Playtime:       local {} / remote {}",
        format_playtime(outcome.local_playtime.as_millis()),
        format_playtime(outcome.remote_playtime.as_millis())
    ));
    if let Some(playtime) = outcome.rebased_to {
        formatter.info(&format!(
            "Clock advanced to {}",
            format_playtime(playtime.as_millis())
        ));
    }
    if outcome.restart_advised {
        formatter.warn(&format!(
            "Saves in {} were replaced while running; restart the host to load them",
            mount
        ));
    }
}
