use async_trait::async_trait;
use tessera_types::Hash;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written; the same bytes always produce the
///   same address.
/// - `put` verifies the chunk's address before linking it in.
/// - Reads are idempotent and safe to issue concurrently from any number of
///   independent readers.
/// - Retrying transient failures is the backend's business; callers surface
///   errors unchanged.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Resolve a hash to its chunk.
    ///
    /// Returns `Ok(None)` if the chunk does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    async fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>>;

    /// Check whether a chunk exists.
    async fn has(&self, hash: &Hash) -> StoreResult<bool>;

    /// Write a chunk and return its address.
    ///
    /// Writing a chunk that already exists is a no-op.
    async fn put(&self, chunk: Chunk) -> StoreResult<Hash>;

    /// Resolve several hashes. Backends may override to batch I/O.
    async fn get_many(&self, hashes: &[Hash]) -> StoreResult<Vec<Option<Chunk>>> {
        let mut out = Vec::with_capacity(hashes.len());
        for hash in hashes {
            out.push(self.get(hash).await?);
        }
        Ok(out)
    }

    /// Write several chunks. Backends may override to batch I/O.
    async fn put_many(&self, chunks: Vec<Chunk>) -> StoreResult<Vec<Hash>> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            out.push(self.put(chunk).await?);
        }
        Ok(out)
    }
}
