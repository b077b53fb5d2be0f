use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::format::Format;

/// Byte length of a [`Hash`].
pub const HASH_LEN: usize = 32;

/// Content address of a value or chunk.
///
/// A `Hash` is the BLAKE3 digest of an encoding, prefixed with the domain tag
/// of the [`Format`] it was written under. Identical encodings under the same
/// format always produce the same `Hash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// Hash an encoding under the given binary format.
    pub fn of(format: Format, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format.domain().as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create a `Hash` from a pre-computed digest.
    pub const fn from_raw(raw: [u8; HASH_LEN]) -> Self {
        Self(raw)
    }

    /// The empty hash (all zeros). Never produced by [`Hash::of`] in practice.
    pub const fn empty() -> Self {
        Self([0u8; HASH_LEN])
    }

    /// Returns `true` if this is the empty hash.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Copy from a byte slice of exactly [`HASH_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != HASH_LEN {
            return Err(TypeError::InvalidLength {
                expected: HASH_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; HASH_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}
