//! Content digests using SHA-256.
//!
//! A [`Digest`] identifies the full content of an asset. Its encodings feed
//! the permalink (`short`), the HTTP validator (`etag`) and subresource
//! integrity attributes (`integrity`).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Number of hex characters kept in the short form.
pub const SHORT_LEN: usize = 12;

/// A 256-bit content digest (SHA-256 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Hash the given bytes.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    /// Create a digest from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero digest, used as the "not yet computed" sentinel.
    #[inline]
    pub const fn zero() -> Self {
        Self([0; 32])
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True only for the all-zero digest.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Full lowercase hex string (64 chars).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// First [`SHORT_LEN`] hex characters.
    pub fn short(self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_LEN);
        hex
    }

    /// Standard base64 of the raw digest bytes.
    pub fn base64(self) -> String {
        STANDARD.encode(self.0)
    }

    /// Subresource integrity value: `sha256-{base64}`.
    pub fn integrity(self) -> String {
        format!("sha256-{}", self.base64())
    }

    /// Entity tag value (unquoted full hex).
    pub fn etag(self) -> String {
        self.to_hex()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
