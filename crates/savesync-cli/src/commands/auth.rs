//! Auth commands - Login, Logout, and Status for the remote session
//!
//! Provides the `savesync auth` CLI subcommands which:
//! 1. `login`  - Imports tokens obtained through the token relay's OAuth
//!    code exchange and stores them in the system keyring.
//! 2. `logout` - Clears the tokens from the keyring. Local and remote saves
//!    are left untouched.
//! 3. `status` - Shows whether a session is stored and how it refreshes.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Subcommand;
use savesync_core::ports::Tokens;
use savesync_drive::auth::TokenRefresher;
use tracing::info;

use super::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store tokens issued by the token relay
    Login {
        /// Access token for the Drive API
        #[arg(long)]
        access_token: String,
        /// Refresh token used to renew the access token silently
        #[arg(long)]
        refresh_token: Option<String>,
        /// Seconds until the access token expires
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Login {
                access_token,
                refresh_token,
                expires_in,
            } => {
                let mut tokens = Tokens::new(access_token.clone(), refresh_token.clone());
                tokens.expires_at = expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
                self.execute_login(ctx, tokens).await
            }
            AuthCommand::Logout => self.execute_logout(ctx).await,
            AuthCommand::Status => self.execute_status(ctx).await,
        }
    }

    async fn execute_login(&self, ctx: &CliContext, tokens: Tokens) -> Result<()> {
        let fmt = ctx.formatter();

        if tokens.access_token.trim().is_empty() {
            anyhow::bail!("The access token must not be empty");
        }
        if tokens.refresh_token.is_none() {
            fmt.warn("No refresh token given; the session ends when the access token expires");
        }

        let session = ctx.open_session()?;
        session
            .login(tokens)
            .await
            .context("Failed to store tokens in keyring")?;

        info!(account = %ctx.config.auth.account, "Session stored");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "account": ctx.config.auth.account,
            }));
        } else {
            fmt.success(&format!(
                "Logged in (keyring account '{}')",
                ctx.config.auth.account
            ));
        }
        Ok(())
    }

    async fn execute_logout(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();

        let session = ctx.open_session()?;
        let was_logged_in = session.tokens().await.is_some();
        session
            .logout()
            .await
            .context("Failed to clear tokens from keyring")?;

        info!(account = %ctx.config.auth.account, "Session cleared");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "was_logged_in": was_logged_in,
            }));
        } else if was_logged_in {
            fmt.success("Logged out. Local saves were kept.");
        } else {
            fmt.info("No session was stored");
        }
        Ok(())
    }

    async fn execute_status(&self, ctx: &CliContext) -> Result<()> {
        let fmt = ctx.formatter();

        let session = ctx.open_session()?;
        let tokens = session.tokens().await;
        let refresher = refresher_label(&ctx.config)?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "logged_in": tokens.is_some(),
                "account": ctx.config.auth.account,
                "has_refresh_token": tokens.as_ref().is_some_and(|t| t.refresh_token.is_some()),
                "expires_at": tokens.as_ref().and_then(|t| t.expires_at).map(|at| at.to_rfc3339()),
                "expired": tokens.as_ref().is_some_and(Tokens::is_expired),
                "refresh": refresher,
            }));
            return Ok(());
        }

        match tokens {
            Some(tokens) => {
                fmt.success(&format!(
                    "Logged in (keyring account '{}')",
                    ctx.config.auth.account
                ));
                match tokens.expires_at {
                    Some(at) if tokens.is_expired() => {
                        fmt.info(&format!("Access token: expired at {}", at.to_rfc3339()))
                    }
                    Some(at) => fmt.info(&format!("Access token: valid until {}", at.to_rfc3339())),
                    None => fmt.info("Access token: no known expiry"),
                }
                fmt.info(&format!(
                    "Refresh:      {}",
                    if tokens.refresh_token.is_some() {
                        refresher
                    } else {
                        "no refresh token"
                    }
                ));
            }
            None => {
                fmt.info("Not logged in. Run 'savesync auth login' to store a session.");
            }
        }
        Ok(())
    }
}

/// How the configured session refreshes its access token
fn refresher_label(config: &savesync_core::config::Config) -> Result<&'static str> {
    let refresher = TokenRefresher::from_config(&config.auth, config.remote.request_timeout())
        .context("Invalid token refresh configuration")?;
    Ok(match refresher {
        TokenRefresher::Relay(_) => "token relay",
        TokenRefresher::OAuth2(_) => "OAuth2 token endpoint",
        TokenRefresher::Disabled => "disabled",
    })
}
