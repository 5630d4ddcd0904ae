//! savesync CLI - Command-line interface for savesync
//!
//! Provides commands for:
//! - Reconciling local saves with the remote replica, once or continuously
//! - Importing and clearing the remote session
//! - Inspecting and editing the local replica and its playtime clock
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use savesync_core::config::{Config, LoggingConfig};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand,
    context::CliContext, files::FilesCommand, playtime::PlaytimeCommand, status::StatusCommand,
    sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "savesync",
    version,
    about = "Cloud save synchronization ordered by playtime"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile local saves with the remote replica
    Sync(SyncCommand),
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Inspect and edit the local replica
    #[command(subcommand)]
    Files(FilesCommand),
    /// Show or set the playtime clock
    #[command(subcommand)]
    Playtime(PlaytimeCommand),
    /// Show per-mount status
    Status(StatusCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter from the verbosity flags, falling back to `logging.level`
fn log_filter(verbose: u8, quiet: bool, logging: &LoggingConfig) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => logging.level.clone(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries command output (--json, `files get`)
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    init_tracing(
        &log_filter(cli.verbose, cli.quiet, &config.logging),
        config.logging.format == "json",
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(config_path, config, format, cli.quiet);

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Files(cmd) => cmd.execute(&ctx).await,
        Commands::Playtime(cmd) => cmd.execute(&ctx).await,
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }
    result
}
