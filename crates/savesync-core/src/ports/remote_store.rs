//! Remote store port (driven/secondary port)
//!
//! The remote replica: a metadata listing plus upload, download and delete
//! by object id. Implementations make every call through an
//! [`IAuthProvider`](super::IAuthProvider).
//!
//! ## Design Notes
//!
//! - `list` never pages. A listing the remote reports as incomplete is a
//!   [`RemoteError::Protocol`].
//! - `upload` takes a [`LocalFile`] so the digest annotation always matches
//!   the uploaded bytes.
//! - An interrupted upload is safe to retry from the start.

use crate::domain::{
    errors::RemoteError,
    newtypes::{MountName, Playtime, RemoteId},
    record::{LocalFile, RemoteFileMetadata},
};

/// Port trait for the remote replica
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists every remote object whose name starts with the mount name
    async fn list(&self, mount: &MountName) -> Result<Vec<RemoteFileMetadata>, RemoteError>;

    /// Uploads a local file, annotated with its digest and `playtime`
    ///
    /// Updates `existing` in place when given, otherwise creates a new object.
    async fn upload(
        &self,
        file: &LocalFile,
        playtime: Playtime,
        existing: Option<&RemoteId>,
    ) -> Result<(), RemoteError>;

    /// Downloads the raw contents of an object
    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>, RemoteError>;

    /// Deletes an object
    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError>;
}
