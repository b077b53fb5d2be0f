use bytes::{BufMut, Bytes, BytesMut};
use tessera_types::{Format, Hash};

use crate::error::{StoreError, StoreResult};

/// A stored chunk: format tag byte + encoded payload, plus its address.
///
/// Cloning is cheap; the bytes are reference counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    data: Bytes,
}

impl Chunk {
    /// Wrap an encoded payload written under `format`.
    pub fn new(format: Format, payload: &[u8]) -> Self {
        let mut data = BytesMut::with_capacity(1 + payload.len());
        data.put_u8(format.tag());
        data.put_slice(payload);
        Self {
            hash: Hash::of(format, payload),
            data: data.freeze(),
        }
    }

    /// Reassemble a chunk read back from a backend, without verification.
    ///
    /// Call [`Chunk::verify`] before trusting the contents.
    pub fn from_parts(hash: Hash, data: Bytes) -> Self {
        Self { hash, data }
    }

    /// The address this chunk is stored under.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The full stored bytes, format tag included.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Stored size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the chunk has no bytes at all (always corrupt).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The format the payload was written under.
    pub fn format(&self) -> StoreResult<Format> {
        let tag = *self.data.first().ok_or(StoreError::EmptyChunk(self.hash))?;
        Format::from_tag(tag).map_err(|source| StoreError::InvalidFormat {
            hash: self.hash,
            source,
        })
    }

    /// The encoded payload, without the format tag.
    pub fn payload(&self) -> &[u8] {
        self.data.get(1..).unwrap_or(&[])
    }

    /// Recompute the address from the stored bytes.
    pub fn compute_hash(&self) -> StoreResult<Hash> {
        Ok(Hash::of(self.format()?, self.payload()))
    }

    /// Check that the stored bytes hash to the address.
    pub fn verify(&self) -> StoreResult<()> {
        let computed = self.compute_hash()?;
        if computed != self.hash {
            return Err(StoreError::HashMismatch {
                expected: self.hash,
                computed,
            });
        }
        Ok(())
    }
}
