//! DriveRemoteStore - IRemoteStore implementation for the Drive v3 API
//!
//! Wraps the [`DriveClient`] and delegates to the listing, upload and client
//! modules to fulfil the [`IRemoteStore`] port contract. Adapter errors are
//! classified into [`RemoteError`] here.

use savesync_core::domain::{
    errors::RemoteError,
    newtypes::{MountName, Playtime, RemoteId},
    record::{LocalFile, RemoteFileMetadata},
};
use savesync_core::ports::IRemoteStore;
use tracing::debug;

use crate::client::DriveClient;
use crate::{listing, upload};

/// Drive-backed remote replica
pub struct DriveRemoteStore {
    client: DriveClient,
}

impl DriveRemoteStore {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveRemoteStore {
    async fn list(&self, mount: &MountName) -> Result<Vec<RemoteFileMetadata>, RemoteError> {
        debug!(mount = %mount, "DriveRemoteStore::list");
        Ok(listing::list_files(&self.client, mount).await?)
    }

    async fn upload(
        &self,
        file: &LocalFile,
        playtime: Playtime,
        existing: Option<&RemoteId>,
    ) -> Result<(), RemoteError> {
        debug!(name = %file.name(), "DriveRemoteStore::upload");
        Ok(upload::upload_file(&self.client, file, playtime, existing).await?)
    }

    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>, RemoteError> {
        debug!(id = %id, "DriveRemoteStore::download");
        Ok(self.client.download_file(id).await?)
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        debug!(id = %id, "DriveRemoteStore::delete");
        Ok(self.client.delete_file(id).await?)
    }
}
