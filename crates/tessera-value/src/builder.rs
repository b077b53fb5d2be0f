use std::sync::Arc;

use tessera_types::Kind;
use tracing::debug;

use crate::error::ValueResult;
use crate::sequence::{LeafItems, MetaTuple, Sequence};
use crate::store::ValueStore;
use crate::value::Value;

/// Default number of items per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Builds chunked collection trees with a fixed fan-out.
///
/// Items are cut into leaf chunks of `chunk_size`, and each interior level
/// groups `chunk_size` children, until one chunk's worth of children
/// remains. That root is returned in memory; everything below it is written
/// to the store. Input that fits in one chunk becomes a single leaf root.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    store: ValueStore,
    chunk_size: usize,
}

impl TreeBuilder {
    pub fn new(store: ValueStore) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the fan-out. Must be at least 2.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size >= 2, "chunk size must be at least 2");
        self.chunk_size = chunk_size;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn list(&self, values: Vec<Value>) -> ValueResult<Value> {
        self.build(LeafItems::List(values)).await
    }

    /// Sorted and deduplicated before chunking.
    pub async fn set(&self, values: Vec<Value>) -> ValueResult<Value> {
        self.build(LeafItems::set(values)).await
    }

    /// Sorted by key before chunking; the last entry for a key wins.
    pub async fn map(&self, entries: Vec<(Value, Value)>) -> ValueResult<Value> {
        self.build(LeafItems::map(entries)).await
    }

    pub async fn blob(&self, bytes: Vec<u8>) -> ValueResult<Value> {
        self.build(LeafItems::Blob(bytes)).await
    }

    /// Chunk `items` as given, without reordering.
    pub async fn build(&self, items: LeafItems) -> ValueResult<Value> {
        let format = self.store.format();
        let kind = items.kind();
        let total = items.len();

        if total <= self.chunk_size {
            return Ok(Value::from_sequence(Arc::new(Sequence::leaf(format, items))));
        }

        let mut tuples = Vec::new();
        for part in items.split(self.chunk_size) {
            tuples.push(self.store.write_sequence(Sequence::leaf(format, part)).await?);
        }

        let mut level = 1;
        while tuples.len() > self.chunk_size {
            tuples = self.write_level(kind, level, tuples).await?;
            level += 1;
        }

        debug!(%kind, items = total, level, children = tuples.len(), "tree built");
        Ok(Value::from_sequence(Arc::new(Sequence::meta(
            kind,
            format,
            level,
            tuples,
            Some(self.store.clone()),
        ))))
    }

    async fn write_level(&self, kind: Kind, level: u64, tuples: Vec<MetaTuple>) -> ValueResult<Vec<MetaTuple>> {
        let format = self.store.format();
        let mut parents = Vec::with_capacity(tuples.len().div_ceil(self.chunk_size));
        for group in tuples.chunks(self.chunk_size) {
            let chunk = Sequence::meta(kind, format, level, group.to_vec(), Some(self.store.clone()));
            parents.push(self.store.write_sequence(chunk).await?);
        }
        Ok(parents)
    }
}
