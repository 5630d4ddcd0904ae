//! Config commands - Show, Set, Validate and locate the configuration file
//!
//! All subcommands act on the file given with `--config`, or on the
//! default path when none is given.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use savesync_core::config::Config;
use tracing::info;

use super::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Set a configuration value, creating the file if needed
    Set {
        /// Dotted key, e.g. sync.watch_interval_secs
        key: String,
        /// New value
        value: String,
    },
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => {
                let fmt = ctx.formatter();
                if ctx.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();

        if ctx.is_json() {
            let json = serde_json::to_value(&ctx.config)?;
            fmt.print_json(&json);
            return Ok(());
        }

        if ctx.config_path.exists() {
            fmt.info(&format!("# {}", ctx.config_path.display()));
        } else {
            fmt.info(&format!(
                "# {} (not found, showing defaults)",
                ctx.config_path.display()
            ));
        }
        let yaml = serde_yaml::to_string(&ctx.config)?;
        for line in yaml.lines() {
            fmt.info(line);
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str) -> Result<()> {
        let fmt = ctx.formatter();

        // A file that fails to parse is reported, never overwritten
        let mut config = load_for_update(&ctx.config_path)?;

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.is_json() {
                fmt.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": format!("{:#}", e),
                }));
            } else {
                fmt.error(&format!("Failed to set '{}': {:#}", key, e));
                fmt.info("");
                fmt.info("Supported keys:");
                for (key, description) in SUPPORTED_KEYS {
                    fmt.info(&format!("  {:<32} - {}", key, description));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if let Some(error) = errors.iter().find(|e| e.field.starts_with(key)) {
            anyhow::bail!("Refusing to save invalid value: {}", error);
        }

        config.save(&ctx.config_path)?;
        info!(key = %key, config_path = %ctx.config_path.display(), "Configuration updated");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
            }));
        } else {
            fmt.success(&format!("Set {} = {}", key, value));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let config_path = &ctx.config_path;

        // Load the file explicitly; parse errors must not fall back to defaults
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {:#}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    fmt.error(&message);
                    fmt.info(&format!("File: {}", config_path.display()));
                } else {
                    fmt.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    fmt.info("Using default configuration. Run 'savesync config set <key> <value>' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            fmt.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            fmt.success("Configuration is valid");
            fmt.info(&format!("File: {}", config_path.display()));
        } else {
            fmt.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            fmt.info(&format!("File: {}", config_path.display()));
            fmt.info("");
            for error in &errors {
                fmt.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

/// Keys accepted by `config set`
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.mounts", "Comma-separated mount names"),
    ("sync.max_concurrent_transfers", "Transfers in flight per pass (1-32)"),
    ("sync.watch_interval_secs", "Seconds between passes in watch mode"),
    ("remote.api_base_url", "Drive API base URL"),
    ("remote.upload_base_url", "Drive upload base URL"),
    ("remote.space", "Drive space holding the saves"),
    ("remote.list_timeout_secs", "Listing timeout in seconds"),
    ("remote.request_timeout_secs", "Timeout of other requests in seconds"),
    ("auth.account", "Keyring account for the session"),
    ("auth.relay_url", "Token relay base URL, or 'none'"),
    ("auth.client_id", "OAuth2 client ID, or 'none'"),
    ("auth.client_secret", "OAuth2 client secret, or 'none'"),
    ("auth.token_url", "OAuth2 token endpoint"),
    ("storage.database_path", "SQLite database file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "text|json"),
];

/// Reads the file at `path`, or defaults when it does not exist yet
fn load_for_update(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.mounts" => {
            config.sync.mounts = value
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        "sync.max_concurrent_transfers" => {
            config.sync.max_concurrent_transfers = value
                .parse::<usize>()
                .context("Expected a positive integer")?;
        }
        "sync.watch_interval_secs" => {
            config.sync.watch_interval_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- remote ---
        "remote.api_base_url" => config.remote.api_base_url = value.to_string(),
        "remote.upload_base_url" => config.remote.upload_base_url = value.to_string(),
        "remote.space" => config.remote.space = value.to_string(),
        "remote.list_timeout_secs" => {
            config.remote.list_timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "remote.request_timeout_secs" => {
            config.remote.request_timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- auth ---
        "auth.account" => config.auth.account = value.to_string(),
        "auth.relay_url" => config.auth.relay_url = optional(value),
        "auth.client_id" => config.auth.client_id = optional(value),
        "auth.client_secret" => config.auth.client_secret = optional(value),
        "auth.token_url" => config.auth.token_url = value.to_string(),

        // --- storage ---
        "storage.database_path" => config.storage.database_path = PathBuf::from(value),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
