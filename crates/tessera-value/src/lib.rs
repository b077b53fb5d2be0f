//! # tessera-value
//!
//! The value model and chunked collections of the Tessera store.
//!
//! - [`Value`]: closed enum over scalars, refs, and collections. Equality,
//!   ordering, and hashing all derive from the binary encoding.
//! - [`Sequence`]: one chunk of a collection tree, either a leaf holding items
//!   or a meta chunk holding [`MetaTuple`] references to children.
//! - [`SequenceCursor`]: positional traversal that crosses chunk boundaries,
//!   loading neighbouring chunks on demand.
//! - [`ValueStore`] and [`TreeBuilder`]: reading, writing, and building trees
//!   on top of a [`tessera_store::ChunkStore`].
//!
//! Every operation that may load a chunk takes a [`Context`] and fails with
//! [`ValueError::Cancelled`] or [`ValueError::DeadlineExceeded`] when it is
//! cancelled, without side effects on the caller's cursor.

pub mod builder;
pub mod codec;
pub mod context;
pub mod cursor;
pub mod error;
pub mod sequence;
pub mod store;
pub mod value;

pub use builder::{TreeBuilder, DEFAULT_CHUNK_SIZE};
pub use context::{CancelHandle, Context};
pub use cursor::{CursorFrame, SequenceCursor};
pub use error::{ValueError, ValueResult};
pub use sequence::{LeafItems, MetaTuple, Sequence, SequenceItem};
pub use store::ValueStore;
pub use value::{Ref, Value};
