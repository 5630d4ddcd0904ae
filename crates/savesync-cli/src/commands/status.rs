//! Status command - Display per-mount state
//!
//! Provides the `savesync status` CLI command which shows, for each
//! configured mount, how many records the local replica holds, their total
//! size and the playtime clock, along with whether a session is stored.
//! It never contacts the remote replica.

use anyhow::{Context, Result};
use clap::Args;
use savesync_core::ports::{IAuthProvider, IPlaytimeClock};

use super::context::CliContext;
use crate::output::{format_bytes, format_playtime};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only show this mount
    #[arg(long)]
    pub mount: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let session = ctx.open_session()?;
        let logged_in = session.has_credentials().await;

        let db = ctx.open_database().await?;
        let mut mounts = Vec::new();
        for mount in ctx.mounts(self.mount.as_deref())? {
            let store = db.file_store(&mount);
            let clock = db.clock(&mount);
            let context = || format!("Failed to read state of {}", mount);

            let records = store.count().await.with_context(context)?;
            let bytes = store.total_size().await.with_context(context)?;
            let playtime = clock.sample().await.with_context(context)?;
            let updated_at = clock.updated_at().await.with_context(context)?;

            mounts.push(serde_json::json!({
                "mount": mount.as_str(),
                "records": records,
                "bytes": bytes,
                "playtime_ms": playtime.as_millis(),
                "playtime_updated_at": updated_at.map(|at| at.to_rfc3339()),
            }));

            if !ctx.is_json() {
                formatter.info(&format!("{}", mount));
                formatter.info(&format!(
                    "  Records:  {} ({})",
                    records,
                    format_bytes(bytes)
                ));
                formatter.info(&format!(
                    "  Playtime: {}",
                    format_playtime(playtime.as_millis())
                ));
                if let Some(at) = updated_at {
                    formatter.info(&format!(
                        "  Updated:  {}",
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    ));
                }
            }
        }

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "logged_in": logged_in,
                "account": ctx.config.auth.account,
                "database": ctx.config.storage.database_path.display().to_string(),
                "mounts": mounts,
            }));
        } else if logged_in {
            formatter.success(&format!(
                "Logged in (keyring account '{}')",
                ctx.config.auth.account
            ));
        } else {
            formatter.warn("Not logged in. Run 'savesync auth login' to enable syncing.");
        }

        Ok(())
    }
}
