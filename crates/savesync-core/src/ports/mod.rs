//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync engine depends on them; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ILocalStore`] - Durable store of file records for one mount
//! - [`IRemoteStore`] - Listing, upload, download and delete against the remote replica
//! - [`IAuthProvider`] - Bearer credentials with a single silent refresh
//! - [`IPlaytimeClock`] - Persisted logical clock of one mount

pub mod auth_provider;
pub mod local_store;
pub mod playtime_clock;
pub mod remote_store;

pub use auth_provider::{IAuthProvider, Tokens};
pub use local_store::ILocalStore;
pub use playtime_clock::IPlaytimeClock;
pub use remote_store::IRemoteStore;
