//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Mount names
// ============================================================================

/// Name of a mount: one save-data namespace synchronized as a unit
///
/// Every file record of the mount has a name starting with the mount name,
/// e.g. mount `/saves` holds `/saves/profile.dat`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountName(String);

impl MountName {
    /// Create a new MountName
    ///
    /// # Errors
    /// Returns error if the name is empty or contains control characters
    pub fn new(name: String) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidMountName(
                "Mount name cannot be empty".to_string(),
            ));
        }

        if name.chars().any(char::is_control) {
            return Err(DomainError::InvalidMountName(format!(
                "Mount name contains control characters: {name:?}"
            )));
        }

        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if a record name belongs to this mount
    ///
    /// The mount must end at a path component: `/saves` holds
    /// `/saves/a.dat` but not `/saves2/a.dat`.
    #[must_use]
    pub fn contains(&self, record_name: &str) -> bool {
        match record_name.strip_prefix(self.0.as_str()) {
            Some(rest) => self.0.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }

    /// Returns true if one mount is the other or is nested inside it
    #[must_use]
    pub fn overlaps(&self, other: &MountName) -> bool {
        self == other || self.contains(other.as_str()) || other.contains(self.as_str())
    }
}

impl Display for MountName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MountName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for MountName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MountName> for String {
    fn from(name: MountName) -> Self {
        name.0
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Opaque identifier of a remote object
///
/// Format: URL-safe token, typically like "1Bx2Kz9_mQ4-yT"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or would not be safe inside a URL path
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        // IDs are interpolated into request paths
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Content hashes
// ============================================================================

/// SHA-256 digest of a file's contents in lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Length of a SHA-256 digest in bytes
    const DIGEST_LEN: usize = 32;

    /// Create a new ContentHash
    ///
    /// # Errors
    /// Returns error if the string is not 64 lowercase hex characters
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.is_empty() {
            return Err(DomainError::InvalidHash("Hash cannot be empty".to_string()));
        }

        if hash.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidHash(format!(
                "Hash must be lowercase hex: {hash}"
            )));
        }

        let decoded = hex::decode(&hash)
            .map_err(|e| DomainError::InvalidHash(format!("{hash}: {e}")))?;
        if decoded.len() != Self::DIGEST_LEN {
            return Err(DomainError::InvalidHash(format!(
                "Hash has wrong length: expected {} bytes, got {} bytes",
                Self::DIGEST_LEN,
                decoded.len()
            )));
        }

        Ok(Self(hash))
    }

    /// Wraps a digest produced by [`crate::hasher`]
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first 12 hex characters, for display
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

// ============================================================================
// Playtime
// ============================================================================

/// Cumulative usage time of a mount in milliseconds
///
/// Used as a logical clock to break ties between divergent replicas; it is
/// never compared with wall-clock time. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Playtime(f64);

impl Playtime {
    /// No accumulated usage
    pub const ZERO: Playtime = Playtime(0.0);

    /// Create a new Playtime from milliseconds
    ///
    /// # Errors
    /// Returns error if the value is negative, NaN or infinite
    pub fn from_millis(millis: f64) -> Result<Self, DomainError> {
        if !millis.is_finite() {
            return Err(DomainError::InvalidPlaytime(format!(
                "Playtime must be finite: {millis}"
            )));
        }
        if millis < 0.0 {
            return Err(DomainError::InvalidPlaytime(format!(
                "Playtime cannot be negative: {millis}"
            )));
        }
        Ok(Self(millis))
    }

    /// Returns the value in milliseconds
    #[must_use]
    pub fn as_millis(&self) -> f64 {
        self.0
    }

    /// Returns this playtime advanced by `elapsed`
    #[must_use]
    pub fn advanced_by(self, elapsed: Duration) -> Self {
        let next = self.0 + elapsed.as_secs_f64() * 1000.0;
        if next.is_finite() {
            Self(next)
        } else {
            self
        }
    }

    /// Returns the larger of two playtimes
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl Display for Playtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Playtime {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let millis = s
            .trim()
            .parse::<f64>()
            .map_err(|e| DomainError::InvalidPlaytime(format!("{s:?}: {e}")))?;
        Self::from_millis(millis)
    }
}

impl TryFrom<f64> for Playtime {
    type Error = DomainError;

    fn try_from(millis: f64) -> Result<Self, Self::Error> {
        Self::from_millis(millis)
    }
}

impl From<Playtime> for f64 {
    fn from(playtime: Playtime) -> Self {
        playtime.0
    }
}
