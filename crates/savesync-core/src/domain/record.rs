//! File records on both replicas
//!
//! - [`FileRecord`] is what the local store persists for one name.
//! - [`LocalFile`] pairs a record with its content digest so a record can
//!   never reach the remote without the hash of its exact bytes.
//! - [`RemoteFileMetadata`] is one entry of a remote listing, including the
//!   annotations written at upload time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, Playtime, RemoteId};
use crate::hasher;

/// A named file as stored by the local replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique key within the mount (e.g. `/saves/profile.dat`)
    pub name: String,
    /// Raw file contents
    pub contents: Vec<u8>,
    /// Permission bits as written by the host filesystem
    pub mode: u32,
    /// Last modification time
    pub timestamp: DateTime<Utc>,
}

impl FileRecord {
    /// Creates a new FileRecord
    pub fn new(
        name: impl Into<String>,
        contents: Vec<u8>,
        mode: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            contents,
            mode,
            timestamp,
        }
    }

    /// Size of the contents in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }
}

/// A local record together with the digest of its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    record: FileRecord,
    hash: ContentHash,
}

impl LocalFile {
    /// Fingerprints the record's contents
    pub fn new(record: FileRecord) -> Self {
        let hash = hasher::compute(&record.contents);
        Self { record, hash }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[must_use]
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn into_record(self) -> FileRecord {
        self.record
    }
}

/// Annotations stored on every remote object at upload time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppProperties {
    /// Permission bits of the uploaded record
    pub mode: u32,
    /// Digest of the exact bytes uploaded for this version
    pub sha256: ContentHash,
    /// Playtime of the uploading replica when it uploaded
    pub playtime: Playtime,
}

/// Metadata of one remote object, as returned by a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFileMetadata {
    pub id: RemoteId,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub app_properties: AppProperties,
}

impl RemoteFileMetadata {
    #[must_use]
    pub fn sha256(&self) -> &ContentHash {
        &self.app_properties.sha256
    }

    #[must_use]
    pub fn playtime(&self) -> Playtime {
        self.app_properties.playtime
    }

    /// Builds the local record for downloaded contents of this object
    ///
    /// The timestamp comes from the remote modification time and the mode
    /// from the upload annotations.
    pub fn to_record(&self, contents: Vec<u8>) -> FileRecord {
        FileRecord {
            name: self.name.clone(),
            contents,
            mode: self.app_properties.mode,
            timestamp: self.modified_time.unwrap_or_else(Utc::now),
        }
    }
}
