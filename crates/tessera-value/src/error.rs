//! Error types for value decoding, chunk resolution, and traversal.

use tessera_store::StoreError;
use tessera_types::{Format, Hash, TypeError};

/// Errors that can occur while reading, writing, or traversing values.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    /// The encoded bytes ended early.
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof {
        /// What was being read.
        context: &'static str,
    },

    /// The encoded bytes are malformed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The chunk loader failed to produce bytes.
    #[error("load error: {0}")]
    Load(#[from] StoreError),

    /// The chunk loader has no chunk for this hash.
    #[error("chunk not found: {0}")]
    NotFound(Hash),

    /// A chunk was written under a different binary format than the tree
    /// being read or written.
    #[error("format mismatch: expected {expected}, found {actual}")]
    FormatMismatch {
        /// The format of the tree being traversed.
        expected: Format,
        /// The format found on the chunk.
        actual: Format,
    },

    /// A child chunk was requested from a sequence with no store attached.
    #[error("sequence has no store to resolve child chunks")]
    NoStore,

    /// The operation was cancelled through its context.
    #[error("operation cancelled")]
    Cancelled,

    /// The context's deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ValueError {
    /// Returns `true` for cancellation and deadline expiry; the same call may
    /// be retried with a fresh context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<TypeError> for ValueError {
    fn from(e: TypeError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Convenience alias for value results.
pub type ValueResult<T> = Result<T, ValueError>;
