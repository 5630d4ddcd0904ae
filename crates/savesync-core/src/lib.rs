//! savesync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileRecord`, `LocalFile`, `RemoteFileMetadata` and validated newtypes
//! - **Hasher** - SHA-256 content fingerprints used as the only equality test
//! - **Port definitions** - Traits for adapters: `ILocalStore`, `IRemoteStore`,
//!   `IAuthProvider`, `IPlaytimeClock`
//! - **Configuration** - YAML configuration shared by every crate
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait interfaces that the
//! adapter crates (`savesync-drive`, `savesync-cache`) implement and that
//! `savesync-sync` orchestrates.

pub mod config;
pub mod domain;
pub mod hasher;
pub mod ports;
