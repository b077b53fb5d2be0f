//! Content-addressed chunk storage for Tessera.
//!
//! The storage core never reads bytes directly; it resolves a [`Hash`] to a
//! [`Chunk`] through the [`ChunkStore`] trait. A chunk is the format tag byte
//! followed by the encoded value or sequence, and its address is the hash of
//! that encoding under the tagged format.
//!
//! # Storage Backends
//!
//! - [`InMemoryChunkStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileChunkStore`] -- sharded directory of chunk files
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content-addressing guarantees this).
//! 2. Every write verifies the chunk's address before linking it in.
//! 3. Concurrent reads are always safe.
//! 4. The store never interprets chunk contents beyond the format tag.
//! 5. All I/O errors are propagated, never silently ignored.
//!
//! [`Hash`]: tessera_types::Hash

pub mod chunk;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use chunk::Chunk;
pub use error::{StoreError, StoreResult};
pub use file::FileChunkStore;
pub use memory::InMemoryChunkStore;
pub use traits::ChunkStore;
