//! Content fingerprints
//!
//! SHA-256 over the raw bytes, rendered as lowercase hex. Digests are the
//! only equality test between the two replicas; sizes and timestamps are
//! informational.

use sha2::{Digest, Sha256};

use crate::domain::newtypes::ContentHash;

/// Computes the digest of a byte buffer
pub fn compute(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash::from_digest(&hasher.finalize())
}
