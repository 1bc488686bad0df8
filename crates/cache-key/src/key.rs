//! Finished cache keys and their hex form

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a unit of work's inputs.
///
/// Wraps the finalized digest bytes. Two keys are equal iff their digests are
/// bitwise equal; the canonical rendering is lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey {
    digest: Box<[u8]>,
}

impl CacheKey {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_digest(digest: impl Into<Box<[u8]>>) -> Self {
        Self {
            digest: digest.into(),
        }
    }

    /// The raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.digest
    }

    /// Canonical lowercase hex rendering, used as the storage identifier.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digest.len()
    }

    /// Whether the digest is empty. Keys produced by a builder never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digest.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.to_hex())
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_hex(s, "empty key"));
        }
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(Error::invalid_hex(s, "keys are rendered in lowercase hex"));
        }
        let digest = hex::decode(s).map_err(|e| Error::invalid_hex(s, e.to_string()))?;
        Ok(Self::from_digest(digest))
    }
}

impl TryFrom<String> for CacheKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_hex()
    }
}
