//! Files commands - Inspect and edit the local replica
//!
//! The host application normally writes saves itself; these commands let a
//! user do the same from a shell. Names are full record names such as
//! `/saves/slot1.dat` and must fall inside a configured mount.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use futures_util::TryStreamExt;
use savesync_core::domain::record::{FileRecord, LocalFile};
use savesync_core::ports::ILocalStore;
use tracing::info;

use super::context::CliContext;
use crate::output::format_bytes;

/// Mode of a regular file with `rw-r--r--` permissions
const DEFAULT_MODE: u32 = 0o100644;

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// List local records
    List {
        /// Only list this mount
        #[arg(long)]
        mount: Option<String>,
    },
    /// Store a record from a file, or from stdin when no file is given
    Put {
        /// Record name, e.g. /saves/slot1.dat
        name: String,
        /// File to read the contents from
        file: Option<PathBuf>,
        /// Permission bits to record (octal)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,
    },
    /// Write a record's contents to a file, or to stdout
    Get {
        /// Record name
        name: String,
        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a record
    Rm {
        /// Record name
        name: String,
    },
}

impl FilesCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            FilesCommand::List { mount } => self.execute_list(ctx, mount.as_deref()).await,
            FilesCommand::Put { name, file, mode } => {
                let contents = match file {
                    Some(path) => tokio::fs::read(path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                    None => {
                        let mut buf = Vec::new();
                        std::io::stdin()
                            .read_to_end(&mut buf)
                            .context("Failed to read stdin")?;
                        buf
                    }
                };
                self.execute_put(ctx, name, contents, mode.unwrap_or(DEFAULT_MODE))
                    .await
            }
            FilesCommand::Get { name, output } => {
                self.execute_get(ctx, name, output.as_deref()).await
            }
            FilesCommand::Rm { name } => self.execute_rm(ctx, name).await,
        }
    }

    async fn execute_list(&self, ctx: &CliContext, mount: Option<&str>) -> Result<()> {
        let fmt = ctx.formatter();
        let db = ctx.open_database().await?;

        let mut entries = Vec::new();
        for mount in ctx.mounts(mount)? {
            let store = db.file_store(&mount);
            let files: Vec<LocalFile> = store
                .enumerate()
                .map_ok(LocalFile::new)
                .try_collect()
                .await
                .with_context(|| format!("Failed to read records of {}", mount))?;
            entries.extend(files);
        }

        if ctx.is_json() {
            let json: Vec<serde_json::Value> = entries
                .iter()
                .map(|file| {
                    let record = file.record();
                    serde_json::json!({
                        "name": record.name,
                        "size": record.size(),
                        "mode": format!("{:o}", record.mode),
                        "timestamp": record.timestamp.to_rfc3339(),
                        "sha256": file.hash().as_str(),
                    })
                })
                .collect();
            fmt.print_json(&serde_json::Value::Array(json));
            return Ok(());
        }

        if entries.is_empty() {
            fmt.info("No records stored");
            return Ok(());
        }
        for file in &entries {
            let record = file.record();
            fmt.info(&format!(
                "{:<40} {:>10}  {:o}  {}  {}",
                record.name,
                format_bytes(record.size()),
                record.mode,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                file.hash().short()
            ));
        }
        Ok(())
    }

    async fn execute_put(
        &self,
        ctx: &CliContext,
        name: &str,
        contents: Vec<u8>,
        mode: u32,
    ) -> Result<()> {
        let fmt = ctx.formatter();
        let mount = ctx.mount_for(name)?;
        let db = ctx.open_database().await?;
        let store = db.file_store(&mount);

        let record = FileRecord::new(name, contents, mode, Utc::now());
        let size = record.size();
        store
            .put(&record)
            .await
            .with_context(|| format!("Failed to store {}", name))?;

        info!(name = %name, size, "Stored local record");
        fmt.success(&format!("Stored {} ({})", name, format_bytes(size)));
        Ok(())
    }

    async fn execute_get(
        &self,
        ctx: &CliContext,
        name: &str,
        output: Option<&Path>,
    ) -> Result<()> {
        let fmt = ctx.formatter();
        let mount = ctx.mount_for(name)?;
        let db = ctx.open_database().await?;
        let store = db.file_store(&mount);

        let record = store
            .get(name)
            .await
            .with_context(|| format!("Failed to read {}", name))?
            .with_context(|| format!("No record named {}", name))?;

        match output {
            Some(path) => {
                tokio::fs::write(path, &record.contents)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                fmt.success(&format!(
                    "Wrote {} to {} ({})",
                    name,
                    path.display(),
                    format_bytes(record.size())
                ));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(&record.contents)
                    .and_then(|_| stdout.flush())
                    .context("Failed to write to stdout")?;
            }
        }
        Ok(())
    }

    async fn execute_rm(&self, ctx: &CliContext, name: &str) -> Result<()> {
        let fmt = ctx.formatter();
        let mount = ctx.mount_for(name)?;
        let db = ctx.open_database().await?;
        let store = db.file_store(&mount);

        store
            .delete(name)
            .await
            .with_context(|| format!("Failed to delete {}", name))?;

        info!(name = %name, "Deleted local record");
        fmt.success(&format!("Deleted {}", name));
        Ok(())
    }
}

/// Parses permission bits written in octal, e.g. `100644` or `0o600`
fn parse_mode(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode '{}': {}", value, e))
}
