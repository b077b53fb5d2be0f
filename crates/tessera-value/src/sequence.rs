//! Chunked sequences.
//!
//! A collection is a tree of chunks. Leaf chunks hold items directly; meta
//! chunks hold one [`MetaTuple`] per child chunk, with running leaf counts so
//! that a leaf index can be located without loading siblings.

use std::sync::Arc;

use tessera_types::{Format, Hash, Kind};

use crate::codec::{Reader, Writer};
use crate::context::Context;
use crate::error::{ValueError, ValueResult};
use crate::store::ValueStore;
use crate::value::{Ref, Value};

// =============================================================================
// ITEMS
// =============================================================================

/// Reference from a meta chunk to one child chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MetaTuple {
    target: Hash,
    num_leaves: u64,
}

impl MetaTuple {
    pub fn new(target: Hash, num_leaves: u64) -> Self {
        Self { target, num_leaves }
    }

    /// Address of the child chunk.
    pub fn target(&self) -> Hash {
        self.target
    }

    /// Number of leaf items below the child.
    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }
}

/// One item of a sequence, as returned by [`Sequence::get_item`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceItem {
    /// A list or set element.
    Value(Value),
    /// A map entry.
    Entry(Value, Value),
    /// A blob byte.
    Byte(u8),
    /// A child reference in a meta chunk.
    Child(MetaTuple),
}

/// The items held by a leaf chunk.
#[derive(Clone, Debug)]
pub enum LeafItems {
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Blob(Vec<u8>),
}

impl LeafItems {
    /// No items of the given collection kind.
    pub fn empty(kind: Kind) -> Option<Self> {
        Some(match kind {
            Kind::List => Self::List(Vec::new()),
            Kind::Set => Self::Set(Vec::new()),
            Kind::Map => Self::Map(Vec::new()),
            Kind::Blob => Self::Blob(Vec::new()),
            _ => return None,
        })
    }

    /// Set items in canonical order: sorted, duplicates removed.
    pub fn set(mut values: Vec<Value>) -> Self {
        values.sort();
        values.dedup();
        Self::Set(values)
    }

    /// Map items in canonical order: sorted by key, last entry for a key wins.
    pub fn map(mut entries: Vec<(Value, Value)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            match out.last_mut() {
                Some(last) if last.0 == k => last.1 = v,
                _ => out.push((k, v)),
            }
        }
        Self::Map(out)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::List(_) => Kind::List,
            Self::Set(_) => Kind::Set,
            Self::Map(_) => Kind::Map,
            Self::Blob(_) => Kind::Blob,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::List(v) | Self::Set(v) => v.len(),
            Self::Map(v) => v.len(),
            Self::Blob(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> SequenceItem {
        match self {
            Self::List(v) | Self::Set(v) => SequenceItem::Value(v[index].clone()),
            Self::Map(v) => {
                let (k, val) = &v[index];
                SequenceItem::Entry(k.clone(), val.clone())
            }
            Self::Blob(v) => SequenceItem::Byte(v[index]),
        }
    }

    fn item_eq(&self, i: usize, other: &LeafItems, j: usize) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) | (Self::Set(a), Self::Set(b)) => a[i] == b[j],
            (Self::Map(a), Self::Map(b)) => a[i] == b[j],
            (Self::Blob(a), Self::Blob(b)) => a[i] == b[j],
            _ => false,
        }
    }

    /// Split into consecutive runs of at most `size` items.
    pub fn split(self, size: usize) -> Vec<LeafItems> {
        let size = size.max(1);
        match self {
            Self::List(v) => v.chunks(size).map(|c| Self::List(c.to_vec())).collect(),
            Self::Set(v) => v.chunks(size).map(|c| Self::Set(c.to_vec())).collect(),
            Self::Map(v) => v.chunks(size).map(|c| Self::Map(c.to_vec())).collect(),
            Self::Blob(v) => v.chunks(size).map(|c| Self::Blob(c.to_vec())).collect(),
        }
    }

    fn extend_from(&mut self, other: &LeafItems) -> ValueResult<()> {
        match (self, other) {
            (Self::List(a), Self::List(b)) | (Self::Set(a), Self::Set(b)) => a.extend_from_slice(b),
            (Self::Map(a), Self::Map(b)) => a.extend_from_slice(b),
            (Self::Blob(a), Self::Blob(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(ValueError::Decode(format!(
                    "cannot join {} chunk onto {} chunk",
                    b.kind(),
                    a.kind()
                )))
            }
        }
        Ok(())
    }

    fn walk_values(&self, cb: &mut dyn FnMut(&Value)) {
        match self {
            Self::List(v) | Self::Set(v) => v.iter().for_each(|x| cb(x)),
            Self::Map(v) => {
                for (k, val) in v {
                    cb(k);
                    cb(val);
                }
            }
            Self::Blob(_) => {}
        }
    }
}

// =============================================================================
// SEQUENCES
// =============================================================================

/// A leaf chunk.
#[derive(Clone, Debug)]
pub struct LeafSequence {
    format: Format,
    items: LeafItems,
}

/// An interior chunk.
#[derive(Clone, Debug)]
pub struct MetaSequence {
    kind: Kind,
    format: Format,
    level: u64,
    tuples: Vec<MetaTuple>,
    /// `cumulative[i]` is the leaf count of children `0..=i`.
    cumulative: Vec<u64>,
    store: Option<ValueStore>,
}

/// One chunk of a collection tree.
///
/// Sequences are immutable once built and shared through `Arc`, so a cursor
/// and the value that produced it can hold the same chunk.
#[derive(Clone, Debug)]
pub enum Sequence {
    Leaf(LeafSequence),
    Meta(MetaSequence),
}

impl Sequence {
    /// A leaf chunk holding `items`.
    pub fn leaf(format: Format, items: LeafItems) -> Self {
        Self::Leaf(LeafSequence { format, items })
    }

    /// An interior chunk at `level` (which must be at least 1).
    ///
    /// # Panics
    ///
    /// Panics if `level` is 0, `kind` is not a collection, or the leaf counts
    /// of `tuples` overflow a `u64`.
    pub fn meta(
        kind: Kind,
        format: Format,
        level: u64,
        tuples: Vec<MetaTuple>,
        store: Option<ValueStore>,
    ) -> Self {
        assert!(level > 0, "meta sequences live above the leaf level");
        assert!(kind.is_collection(), "{kind} is not a collection kind");
        let cumulative = cumulative_counts(&tuples);
        assert!(cumulative.len() == tuples.len(), "leaf count overflow");
        Self::Meta(MetaSequence {
            kind,
            format,
            level,
            tuples,
            cumulative,
            store,
        })
    }

    /// An empty chunk of `kind` at `level`.
    pub fn empty(kind: Kind, format: Format, level: u64, store: Option<ValueStore>) -> Self {
        if level == 0 {
            let items = LeafItems::empty(kind)
                .unwrap_or_else(|| panic!("{kind} is not a collection kind"));
            Self::leaf(format, items)
        } else {
            Self::meta(kind, format, level, Vec::new(), store)
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Leaf(l) => l.items.kind(),
            Self::Meta(m) => m.kind,
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Leaf(l) => l.format,
            Self::Meta(m) => m.format,
        }
    }

    /// 0 for leaves, 1 for a chunk whose children are leaves, and so on.
    pub fn tree_level(&self) -> u64 {
        match self {
            Self::Leaf(_) => 0,
            Self::Meta(m) => m.level,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Number of items in this chunk.
    pub fn seq_len(&self) -> usize {
        match self {
            Self::Leaf(l) => l.items.len(),
            Self::Meta(m) => m.tuples.len(),
        }
    }

    /// Number of leaf items below this chunk.
    pub fn num_leaves(&self) -> u64 {
        match self {
            Self::Leaf(l) => l.items.len() as u64,
            Self::Meta(m) => m.cumulative.last().copied().unwrap_or(0),
        }
    }

    /// Leaf items in items `0..=index` of this chunk.
    pub fn cumulative_leaves(&self, index: usize) -> u64 {
        match self {
            Self::Leaf(_) => index as u64 + 1,
            Self::Meta(m) => m.cumulative[index],
        }
    }

    /// Item `index` of this chunk.
    ///
    /// # Panics
    ///
    /// Panics if `index >= seq_len()`.
    pub fn get_item(&self, index: usize) -> SequenceItem {
        match self {
            Self::Leaf(l) => l.items.get(index),
            Self::Meta(m) => SequenceItem::Child(m.tuples[index]),
        }
    }

    /// The leaf items, if this is a leaf chunk.
    pub fn leaf_items(&self) -> Option<&LeafItems> {
        match self {
            Self::Leaf(l) => Some(&l.items),
            Self::Meta(_) => None,
        }
    }

    /// Child references; empty for leaf chunks.
    pub fn tuples(&self) -> &[MetaTuple] {
        match self {
            Self::Leaf(_) => &[],
            Self::Meta(m) => &m.tuples,
        }
    }

    /// The store child chunks are resolved through.
    pub fn store(&self) -> Option<&ValueStore> {
        match self {
            Self::Leaf(_) => None,
            Self::Meta(m) => m.store.as_ref(),
        }
    }

    /// Which child holds leaf item `leaf_index`, and the offset within it.
    /// `None` if the index is past the end.
    pub fn locate_leaf(&self, leaf_index: u64) -> Option<(usize, u64)> {
        match self {
            Self::Leaf(l) => ((leaf_index as usize) < l.items.len())
                .then_some((leaf_index as usize, 0)),
            Self::Meta(m) => {
                let child = m.cumulative.partition_point(|&c| c <= leaf_index);
                if child >= m.tuples.len() {
                    return None;
                }
                let before = if child == 0 { 0 } else { m.cumulative[child - 1] };
                Some((child, leaf_index - before))
            }
        }
    }

    /// Resolve the child chunk at `index`.
    ///
    /// # Panics
    ///
    /// Panics on a leaf chunk, or if `index >= seq_len()`.
    pub async fn get_child_sequence(&self, ctx: &Context, index: usize) -> ValueResult<Arc<Sequence>> {
        match self {
            Self::Leaf(_) => panic!("leaf sequences have no child chunks"),
            Self::Meta(m) => m.get_child_sequence(ctx, index).await,
        }
    }

    /// Concatenate the children `start..start + length` into one sequence
    /// one level down.
    ///
    /// Children at the leaf level are joined item by item; interior children
    /// are joined tuple by tuple. A zero length yields an empty sequence.
    ///
    /// # Panics
    ///
    /// Panics on a leaf chunk, or if the range runs past `seq_len()`.
    pub async fn get_composite_child_sequence(
        &self,
        ctx: &Context,
        start: usize,
        length: usize,
    ) -> ValueResult<Sequence> {
        let Self::Meta(m) = self else {
            panic!("leaf sequences have no child chunks");
        };
        assert!(
            start + length <= m.tuples.len(),
            "child range {start}..{} out of bounds for {} children",
            start + length,
            m.tuples.len()
        );
        let level = m.level - 1;
        if length == 0 {
            return Ok(Self::empty(m.kind, m.format, level, m.store.clone()));
        }

        let mut children = Vec::with_capacity(length);
        for index in start..start + length {
            children.push(m.get_child_sequence(ctx, index).await?);
        }

        if level > 0 {
            let tuples = children
                .iter()
                .flat_map(|c| c.tuples().iter().copied())
                .collect();
            return Ok(Self::meta(m.kind, m.format, level, tuples, m.store.clone()));
        }

        let mut items = LeafItems::empty(m.kind)
            .unwrap_or_else(|| unreachable!("meta sequence of non-collection kind"));
        for child in &children {
            let leaf = child
                .leaf_items()
                .ok_or_else(|| ValueError::Decode("expected leaf chunk".into()))?;
            items.extend_from(leaf)?;
        }
        Ok(Self::leaf(m.format, items))
    }

    /// Item equality between this chunk and `other`, by index.
    ///
    /// Leaf items compare as values; meta items compare by child address. A
    /// leaf never matches a meta chunk.
    pub fn get_compare_fn<'a>(&'a self, other: &'a Sequence) -> impl Fn(usize, usize) -> bool + 'a {
        move |i, j| match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => a.items.item_eq(i, &b.items, j),
            (Self::Meta(a), Self::Meta(b)) => a.tuples[i].target == b.tuples[j].target,
            _ => false,
        }
    }

    pub(crate) fn walk_values(&self, cb: &mut dyn FnMut(&Value)) {
        if let Self::Leaf(l) = self {
            l.items.walk_values(cb);
        }
    }

    pub(crate) fn walk_refs(&self, cb: &mut dyn FnMut(&Ref)) {
        match self {
            Self::Leaf(l) => l.items.walk_values(&mut |v: &Value| v.walk_refs(&mut *cb)),
            Self::Meta(m) => {
                for t in &m.tuples {
                    cb(&Ref::new(t.target, m.kind, m.level));
                }
            }
        }
    }

    /// Encode level, item count, and items. The kind tag is written by the
    /// enclosing value.
    pub(crate) fn write_body(&self, w: &mut Writer) {
        w.write_varint(self.tree_level());
        w.write_varint(self.seq_len() as u64);
        match self {
            Self::Leaf(l) => match &l.items {
                LeafItems::List(v) | LeafItems::Set(v) => v.iter().for_each(|x| x.write_to(w)),
                LeafItems::Map(v) => {
                    for (k, val) in v {
                        k.write_to(w);
                        val.write_to(w);
                    }
                }
                LeafItems::Blob(v) => w.write_bytes(v),
            },
            Self::Meta(m) => {
                for t in &m.tuples {
                    w.write_hash(&t.target);
                    w.write_varint(t.num_leaves);
                }
            }
        }
    }

    pub(crate) fn read_body(kind: Kind, r: &mut Reader<'_>, store: Option<&ValueStore>) -> ValueResult<Self> {
        let format = r.format();
        let level = r.read_varint("sequence.level")?;
        if level > 0 {
            // 32-byte address plus at least one varint byte.
            let count = r.read_count(33, "sequence.tuples")?;
            let mut tuples = Vec::with_capacity(count);
            for _ in 0..count {
                let target = r.read_hash("tuple.target")?;
                let num_leaves = r.read_varint("tuple.num_leaves")?;
                tuples.push(MetaTuple::new(target, num_leaves));
            }
            if cumulative_counts(&tuples).len() != tuples.len() {
                return Err(ValueError::Decode("leaf count overflow".into()));
            }
            return Ok(Self::meta(kind, format, level, tuples, store.cloned()));
        }

        let items = match kind {
            Kind::List | Kind::Set => {
                let count = r.read_count(1, "sequence.items")?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(Value::read_from(r, store)?);
                }
                if kind == Kind::List {
                    LeafItems::List(values)
                } else {
                    LeafItems::Set(values)
                }
            }
            Kind::Map => {
                let count = r.read_count(2, "sequence.entries")?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let k = Value::read_from(r, store)?;
                    let v = Value::read_from(r, store)?;
                    entries.push((k, v));
                }
                LeafItems::Map(entries)
            }
            Kind::Blob => {
                let count = r.read_count(1, "sequence.bytes")?;
                LeafItems::Blob(r.read_bytes(count, "sequence.bytes")?.to_vec())
            }
            other => {
                return Err(ValueError::Decode(format!("{other} has no sequence body")));
            }
        };
        Ok(Self::leaf(format, items))
    }
}

/// Running leaf totals of `tuples`. Stops short of `tuples.len()` when a
/// total would overflow.
fn cumulative_counts(tuples: &[MetaTuple]) -> Vec<u64> {
    tuples
        .iter()
        .scan(0u64, |acc, t| {
            *acc = acc.checked_add(t.num_leaves)?;
            Some(*acc)
        })
        .collect()
}

impl MetaSequence {
    async fn get_child_sequence(&self, ctx: &Context, index: usize) -> ValueResult<Arc<Sequence>> {
        let tuple = self.tuples[index];
        let store = self.store.as_ref().ok_or(ValueError::NoStore)?;
        let child = store.read_sequence(ctx, &tuple.target).await?;

        if child.format() != self.format {
            return Err(ValueError::FormatMismatch {
                expected: self.format,
                actual: child.format(),
            });
        }
        if child.kind() != self.kind || child.tree_level() + 1 != self.level {
            return Err(ValueError::Decode(format!(
                "child {} is a level {} {} chunk under a level {} {} chunk",
                tuple.target.short_hex(),
                child.tree_level(),
                child.kind(),
                self.level,
                self.kind
            )));
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(seed: &[u8], leaves: u64) -> MetaTuple {
        MetaTuple::new(Hash::of(Format::Ld1, seed), leaves)
    }

    fn ints(values: &[i64]) -> Sequence {
        Sequence::leaf(
            Format::Ld1,
            LeafItems::List(values.iter().copied().map(Value::Int).collect()),
        )
    }

    // -----------------------------------------------------------------------
    // Leaf sequences
    // -----------------------------------------------------------------------

    #[test]
    fn leaf_counts() {
        let seq = ints(&[1, 2, 3]);
        assert!(seq.is_leaf());
        assert_eq!(seq.tree_level(), 0);
        assert_eq!(seq.seq_len(), 3);
        assert_eq!(seq.num_leaves(), 3);
        assert_eq!(seq.cumulative_leaves(0), 1);
        assert_eq!(seq.cumulative_leaves(2), 3);
    }

    #[test]
    fn leaf_items_by_index() {
        let seq = ints(&[10, 20]);
        assert_eq!(seq.get_item(1), SequenceItem::Value(Value::Int(20)));
        let blob = Sequence::leaf(Format::Ld1, LeafItems::Blob(vec![7, 8]));
        assert_eq!(blob.get_item(0), SequenceItem::Byte(7));
    }

    #[test]
    #[should_panic]
    fn get_item_out_of_range_panics() {
        ints(&[1]).get_item(1);
    }

    #[test]
    fn set_items_are_canonical() {
        let items = LeafItems::set(vec![Value::Int(3), Value::Int(1), Value::Int(3)]);
        let LeafItems::Set(v) = items else { panic!("not a set") };
        assert_eq!(v, vec![Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn map_last_write_wins() {
        let items = LeafItems::map(vec![
            (Value::from("b"), Value::Int(1)),
            (Value::from("a"), Value::Int(2)),
            (Value::from("b"), Value::Int(3)),
        ]);
        let LeafItems::Map(v) = items else { panic!("not a map") };
        assert_eq!(
            v,
            vec![(Value::from("a"), Value::Int(2)), (Value::from("b"), Value::Int(3))]
        );
    }

    #[test]
    fn split_preserves_order() {
        let parts = LeafItems::List((0..5).map(Value::Int).collect()).split(2);
        let lens: Vec<_> = parts.iter().map(LeafItems::len).collect();
        assert_eq!(lens, vec![2, 2, 1]);
    }

    // -----------------------------------------------------------------------
    // Meta sequences
    // -----------------------------------------------------------------------

    #[test]
    fn meta_leaf_counts_compose() {
        let seq = Sequence::meta(
            Kind::List,
            Format::Ld1,
            1,
            vec![tuple(b"a", 2), tuple(b"b", 1), tuple(b"c", 4)],
            None,
        );
        assert_eq!(seq.seq_len(), 3);
        assert_eq!(seq.num_leaves(), 7);
        assert_eq!(seq.cumulative_leaves(0), 2);
        assert_eq!(seq.cumulative_leaves(1), 3);
        assert_eq!(seq.cumulative_leaves(2), 7);
    }

    #[test]
    fn locate_leaf_walks_cumulative_counts() {
        let seq = Sequence::meta(
            Kind::List,
            Format::Ld1,
            1,
            vec![tuple(b"a", 2), tuple(b"b", 1), tuple(b"c", 4)],
            None,
        );
        assert_eq!(seq.locate_leaf(0), Some((0, 0)));
        assert_eq!(seq.locate_leaf(1), Some((0, 1)));
        assert_eq!(seq.locate_leaf(2), Some((1, 0)));
        assert_eq!(seq.locate_leaf(6), Some((2, 3)));
        assert_eq!(seq.locate_leaf(7), None);
    }

    #[test]
    fn empty_meta_has_no_leaves() {
        let seq = Sequence::empty(Kind::Map, Format::Ld1, 2, None);
        assert_eq!(seq.tree_level(), 2);
        assert_eq!(seq.num_leaves(), 0);
        assert!(seq.tuples().is_empty());
    }

    #[tokio::test]
    async fn child_without_store_fails() {
        let seq = Sequence::meta(Kind::List, Format::Ld1, 1, vec![tuple(b"a", 1)], None);
        let err = seq.get_child_sequence(&Context::background(), 0).await.unwrap_err();
        assert!(matches!(err, ValueError::NoStore));
    }

    #[tokio::test]
    async fn zero_length_composite_is_empty() {
        let seq = Sequence::meta(Kind::Set, Format::Ld1, 1, vec![tuple(b"a", 1)], None);
        let composite = seq
            .get_composite_child_sequence(&Context::background(), 0, 0)
            .await
            .unwrap();
        assert!(composite.is_leaf());
        assert_eq!(composite.kind(), Kind::Set);
        assert_eq!(composite.seq_len(), 0);
    }

    // -----------------------------------------------------------------------
    // Compare functions
    // -----------------------------------------------------------------------

    #[test]
    fn compare_leaf_items() {
        let a = ints(&[1, 2, 3]);
        let b = ints(&[3, 2]);
        let eq = a.get_compare_fn(&b);
        assert!(eq(1, 1));
        assert!(eq(2, 0));
        assert!(!eq(0, 0));
    }

    #[test]
    fn compare_meta_by_address() {
        let a = Sequence::meta(Kind::List, Format::Ld1, 1, vec![tuple(b"x", 1)], None);
        let b = Sequence::meta(Kind::List, Format::Ld1, 1, vec![tuple(b"y", 9), tuple(b"x", 5)], None);
        let eq = a.get_compare_fn(&b);
        assert!(!eq(0, 0));
        assert!(eq(0, 1));
    }

    #[test]
    fn compare_leaf_with_meta_is_false() {
        let leaf = ints(&[1]);
        let meta = Sequence::meta(Kind::List, Format::Ld1, 1, vec![tuple(b"x", 1)], None);
        assert!(!leaf.get_compare_fn(&meta)(0, 0));
        assert!(!meta.get_compare_fn(&leaf)(0, 0));
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    #[test]
    fn meta_body_survives_reencoding() {
        let seq = Sequence::meta(Kind::Blob, Format::V7_18, 3, vec![tuple(b"a", 300)], None);
        let mut w = Writer::new(Format::V7_18);
        seq.write_body(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes, Format::V7_18);
        let back = Sequence::read_body(Kind::Blob, &mut r, None).unwrap();
        assert_eq!(back.tree_level(), 3);
        assert_eq!(back.tuples(), seq.tuples());
        assert_eq!(back.format(), Format::V7_18);
    }

    #[test]
    fn overflowing_leaf_counts_fail_to_decode() {
        let mut w = Writer::new(Format::Ld1);
        w.write_byte(Kind::List.tag());
        w.write_varint(1);
        w.write_varint(2);
        for seed in [b"a", b"b"] {
            w.write_hash(&Hash::of(Format::Ld1, seed));
            w.write_varint(u64::MAX);
        }
        let err = Value::decode(w.as_bytes(), Format::Ld1, None).unwrap_err();
        assert!(matches!(err, ValueError::Decode(msg) if msg.contains("leaf count overflow")));
    }

    #[test]
    #[should_panic(expected = "leaf count overflow")]
    fn meta_rejects_overflowing_leaf_counts() {
        Sequence::meta(
            Kind::List,
            Format::Ld1,
            1,
            vec![tuple(b"a", u64::MAX), tuple(b"b", 1)],
            None,
        );
    }
}
