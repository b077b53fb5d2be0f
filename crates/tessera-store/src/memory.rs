use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tessera_types::Hash;
use tracing::debug;

use crate::chunk::Chunk;
use crate::error::StoreResult;
use crate::traits::ChunkStore;

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. Chunks live behind a `RwLock`; reads
/// clone the reference-counted bytes. The store counts `get` calls so tests
/// can assert how many chunks a traversal actually resolved.
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<Hash, Chunk>>,
    reads: AtomicU64,
}

impl InMemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            reads: AtomicU64::new(0),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Total stored bytes across all chunks.
    pub fn total_bytes(&self) -> u64 {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|c| c.len() as u64)
            .sum()
    }

    /// Number of `get` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Sorted list of every stored address.
    pub fn all_hashes(&self) -> Vec<Hash> {
        let map = self.chunks.read().expect("lock poisoned");
        let mut hashes: Vec<Hash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.get(hash).cloned())
    }

    async fn has(&self, hash: &Hash) -> StoreResult<bool> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }

    async fn put(&self, chunk: Chunk) -> StoreResult<Hash> {
        chunk.verify()?;
        let hash = chunk.hash();
        let mut map = self.chunks.write().expect("lock poisoned");
        if !map.contains_key(&hash) {
            debug!(chunk = %hash.short_hex(), len = chunk.len(), "chunk stored");
            map.insert(hash, chunk);
        }
        Ok(hash)
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore")
            .field("chunk_count", &self.len())
            .finish()
    }
}
