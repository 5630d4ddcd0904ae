//! Playtime commands - Show or set the per-mount playtime clock

use anyhow::{Context, Result};
use clap::Subcommand;
use savesync_core::domain::newtypes::Playtime;
use savesync_core::ports::IPlaytimeClock;
use tracing::info;

use super::context::CliContext;
use crate::output::format_playtime;

#[derive(Debug, Subcommand)]
pub enum PlaytimeCommand {
    /// Show the playtime of each mount
    Show {
        /// Only show this mount
        #[arg(long)]
        mount: Option<String>,
    },
    /// Overwrite the playtime of a mount
    Set {
        /// New playtime in milliseconds
        #[arg(value_parser = parse_playtime)]
        millis: Playtime,
        /// Mount to update; required when several are configured
        #[arg(long)]
        mount: Option<String>,
    },
}

impl PlaytimeCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let db = ctx.open_database().await?;

        match self {
            PlaytimeCommand::Show { mount } => {
                let mut rows = Vec::new();
                for mount in ctx.mounts(mount.as_deref())? {
                    let clock = db.clock(&mount);
                    let playtime = clock
                        .sample()
                        .await
                        .with_context(|| format!("Failed to read playtime of {}", mount))?;
                    let updated_at = clock
                        .updated_at()
                        .await
                        .with_context(|| format!("Failed to read playtime of {}", mount))?;
                    rows.push((mount, playtime, updated_at));
                }

                if ctx.is_json() {
                    let json: Vec<serde_json::Value> = rows
                        .iter()
                        .map(|(mount, playtime, updated_at)| {
                            serde_json::json!({
                                "mount": mount.as_str(),
                                "playtime_ms": playtime.as_millis(),
                                "updated_at": updated_at.map(|at| at.to_rfc3339()),
                            })
                        })
                        .collect();
                    fmt.print_json(&serde_json::Value::Array(json));
                } else {
                    for (mount, playtime, updated_at) in &rows {
                        fmt.info(&format!(
                            "{:<20} {:>14}  ({} ms){}",
                            mount.as_str(),
                            format_playtime(playtime.as_millis()),
                            playtime,
                            updated_at
                                .map(|at| format!(", updated {}", at.format("%Y-%m-%d %H:%M:%S")))
                                .unwrap_or_default()
                        ));
                    }
                }
            }
            PlaytimeCommand::Set { millis, mount } => {
                let mount = ctx.single_mount(mount.as_deref())?;
                let clock = db.clock(&mount);
                let previous = clock.sample().await?;
                clock
                    .store(*millis)
                    .await
                    .with_context(|| format!("Failed to store playtime of {}", mount))?;

                info!(mount = %mount, previous = %previous, playtime = %millis, "Playtime set");

                if ctx.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "mount": mount.as_str(),
                        "previous_ms": previous.as_millis(),
                        "playtime_ms": millis.as_millis(),
                    }));
                } else {
                    fmt.success(&format!(
                        "Playtime of {} set to {}",
                        mount,
                        format_playtime(millis.as_millis())
                    ));
                    if *millis < previous {
                        fmt.warn("The clock moved backwards; the next sync may prefer remote saves");
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_playtime(value: &str) -> Result<Playtime, String> {
    value.parse::<Playtime>().map_err(|e| e.to_string())
}
