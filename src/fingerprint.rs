//! Content fingerprints for deduplication.
//!
//! A [`Fingerprint`] is the SHA-256 digest of an encoded payload, rendered as
//! a 64-character lowercase hex string. It is a pure function of the bytes:
//! file names, requested dimensions and timestamps never contribute.
//!
//! Fingerprints are an **index**, not an identity. The record store buckets
//! records by fingerprint so the import pipeline can find candidates cheaply,
//! but two records are only considered the same image when their payloads
//! compare equal byte for byte (see [`same_content`]). A digest collision
//! therefore costs one extra comparison, never a wrong dedup.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of an encoded image payload, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a payload.
    pub fn of(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an arbitrary digest so tests can force a bucket collision.
    #[cfg(test)]
    pub(crate) fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact content equality, the second phase of dedup after the fingerprint
/// bucket lookup.
pub fn same_content(a: &[u8], b: &[u8]) -> bool {
    a == b
}
