//! CLI subcommands

pub mod auth;
pub mod completions;
pub mod config;
pub mod context;
pub mod files;
pub mod playtime;
pub mod status;
pub mod sync;
