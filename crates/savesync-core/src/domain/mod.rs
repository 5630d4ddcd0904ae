//! Domain entities and business logic
//!
//! This module contains the core domain types for savesync:
//! - Newtypes for type-safe identifiers and validated values
//! - File records of the local and remote replicas
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod record;

// Re-export commonly used types
pub use errors::{AuthError, DomainError, RemoteError, StorageError};
pub use newtypes::*;
pub use record::{AppProperties, FileRecord, LocalFile, RemoteFileMetadata};
