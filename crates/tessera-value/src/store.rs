use std::fmt;
use std::sync::Arc;

use tessera_store::{Chunk, ChunkStore};
use tessera_types::{Format, Hash};
use tracing::debug;

use crate::context::Context;
use crate::error::{ValueError, ValueResult};
use crate::sequence::{MetaTuple, Sequence};
use crate::value::{Ref, Value};

/// Reads and writes encoded values through a [`ChunkStore`].
///
/// Every chunk read or written through one `ValueStore` uses the same binary
/// format; reading a chunk tagged with another format fails with
/// [`ValueError::FormatMismatch`]. Decoded collections carry a clone of the
/// store so their interior chunks can be loaded on demand.
#[derive(Clone)]
pub struct ValueStore {
    chunks: Arc<dyn ChunkStore>,
    format: Format,
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl ValueStore {
    pub fn new(chunks: Arc<dyn ChunkStore>, format: Format) -> Self {
        Self { chunks, format }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The underlying chunk store.
    pub fn chunk_store(&self) -> &Arc<dyn ChunkStore> {
        &self.chunks
    }

    /// Load and decode the value stored at `hash`.
    pub async fn read_value(&self, ctx: &Context, hash: &Hash) -> ValueResult<Value> {
        let chunk = ctx
            .run(async { self.chunks.get(hash).await.map_err(ValueError::from) })
            .await?
            .ok_or(ValueError::NotFound(*hash))?;

        let actual = chunk.format()?;
        if actual != self.format {
            return Err(ValueError::FormatMismatch {
                expected: self.format,
                actual,
            });
        }
        chunk.verify()?;

        let value = Value::decode(chunk.payload(), self.format, Some(self))?;
        debug!(chunk = %hash.short_hex(), kind = %value.kind(), "chunk resolved");
        Ok(value)
    }

    /// Load the collection chunk at `hash`.
    pub async fn read_sequence(&self, ctx: &Context, hash: &Hash) -> ValueResult<Arc<Sequence>> {
        let value = self.read_value(ctx, hash).await?;
        let kind = value.kind();
        value.into_sequence().ok_or_else(|| {
            ValueError::Decode(format!("chunk {} holds a {kind}, not a collection", hash.short_hex()))
        })
    }

    /// Encode `value` as one chunk and store it.
    pub async fn write_value(&self, value: &Value) -> ValueResult<Ref> {
        if let Some(seq) = value.as_sequence() {
            if seq.format() != self.format {
                return Err(ValueError::FormatMismatch {
                    expected: self.format,
                    actual: seq.format(),
                });
            }
        }
        let chunk = Chunk::new(self.format, &value.value_bytes(self.format));
        let hash = self.chunks.put(chunk).await?;
        Ok(Ref::new(hash, value.kind(), value.height()))
    }

    /// Store one chunk of a collection tree and return the tuple that points
    /// at it.
    pub async fn write_sequence(&self, sequence: Sequence) -> ValueResult<MetaTuple> {
        let num_leaves = sequence.num_leaves();
        let r = self
            .write_value(&Value::from_sequence(Arc::new(sequence)))
            .await?;
        Ok(MetaTuple::new(r.target(), num_leaves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::InMemoryChunkStore;
    use tessera_types::Kind;

    fn store(format: Format) -> (Arc<InMemoryChunkStore>, ValueStore) {
        let chunks = Arc::new(InMemoryChunkStore::new());
        (chunks.clone(), ValueStore::new(chunks, format))
    }

    #[tokio::test]
    async fn write_then_read_value() {
        let (_, vs) = store(Format::Ld1);
        let value = Value::list(vec![Value::Int(1), Value::from("two")]);
        let r = vs.write_value(&value).await.unwrap();
        assert_eq!(r.target(), value.hash(Format::Ld1));
        assert_eq!(r.target_kind(), Kind::List);
        assert_eq!(r.height(), 1);

        let back = vs.read_value(&Context::background(), &r.target()).await.unwrap();
        assert_eq!(back, value);
    }

    #[tokio::test]
    async fn missing_chunk_is_not_found() {
        let (_, vs) = store(Format::Ld1);
        let hash = Hash::of(Format::Ld1, b"absent");
        let err = vs.read_value(&Context::background(), &hash).await.unwrap_err();
        assert!(matches!(err, ValueError::NotFound(h) if h == hash));
    }

    #[tokio::test]
    async fn foreign_format_is_rejected() {
        let (chunks, writer) = store(Format::V7_18);
        let r = writer.write_value(&Value::Int(5)).await.unwrap();
        let reader = ValueStore::new(chunks, Format::Ld1);
        let err = reader.read_value(&Context::background(), &r.target()).await.unwrap_err();
        assert!(matches!(
            err,
            ValueError::FormatMismatch {
                expected: Format::Ld1,
                actual: Format::V7_18
            }
        ));
    }

    #[tokio::test]
    async fn writing_foreign_format_sequence_fails() {
        let (_, vs) = store(Format::V7_18);
        // Value::list builds under the default format.
        let err = vs.write_value(&Value::list(vec![])).await.unwrap_err();
        assert!(matches!(err, ValueError::FormatMismatch { .. }));
    }

    #[tokio::test]
    async fn read_sequence_rejects_scalars() {
        let (_, vs) = store(Format::Ld1);
        let r = vs.write_value(&Value::from("scalar")).await.unwrap();
        let err = vs.read_sequence(&Context::background(), &r.target()).await.unwrap_err();
        assert!(matches!(err, ValueError::Decode(_)));
    }

    #[tokio::test]
    async fn cancelled_read_fails_fast() {
        let (chunks, vs) = store(Format::Ld1);
        let r = vs.write_value(&Value::Bool(true)).await.unwrap();
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let err = vs.read_value(&ctx, &r.target()).await.unwrap_err();
        assert!(matches!(err, ValueError::Cancelled));
        assert_eq!(chunks.read_count(), 0);
    }
}
