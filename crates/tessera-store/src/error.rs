use tessera_types::{Hash, TypeError};

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Content hash mismatch (data corruption or a forged chunk).
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: Hash, computed: Hash },

    /// The chunk has no format tag byte.
    #[error("chunk {0} is empty")]
    EmptyChunk(Hash),

    /// The chunk's leading tag is not a known format.
    #[error("chunk {hash} has an invalid format tag: {source}")]
    InvalidFormat {
        hash: Hash,
        #[source]
        source: TypeError,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
