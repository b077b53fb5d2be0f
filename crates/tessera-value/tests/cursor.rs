//! Cursor traversal across chunk boundaries, backed by real chunk stores.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tessera_store::{Chunk, ChunkStore, FileChunkStore, InMemoryChunkStore, StoreResult};
use tessera_types::{Format, Hash, Kind};
use tessera_value::{
    Context, LeafItems, Sequence, SequenceCursor, SequenceItem, TreeBuilder, Value, ValueError,
    ValueStore,
};
use tokio::sync::Notify;

// =============================================================================
// Helpers
// =============================================================================

fn item(i: i64) -> SequenceItem {
    SequenceItem::Value(Value::Int(i))
}

/// Write each group as one leaf chunk and return the level-1 root over them.
async fn two_level(store: &ValueStore, groups: &[&[i64]]) -> Arc<Sequence> {
    let mut tuples = Vec::new();
    for group in groups {
        let leaf = Sequence::leaf(
            store.format(),
            LeafItems::List(group.iter().copied().map(Value::Int).collect()),
        );
        tuples.push(store.write_sequence(leaf).await.unwrap());
    }
    Arc::new(Sequence::meta(Kind::List, store.format(), 1, tuples, Some(store.clone())))
}

fn memory_store() -> (Arc<InMemoryChunkStore>, ValueStore) {
    let chunks = Arc::new(InMemoryChunkStore::new());
    (chunks.clone(), ValueStore::new(chunks, Format::Ld1))
}

fn assert_position(cur: &SequenceCursor, index: isize, parent: isize) {
    assert_eq!(cur.index_in_chunk(), index, "leaf index");
    assert_eq!(cur.parent().map(|p| p.index()), Some(parent), "parent index");
}

/// Chunk store that can be told to hang on reads.
struct GatedStore {
    inner: InMemoryChunkStore,
    blocked: AtomicBool,
    entered: Arc<Notify>,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: InMemoryChunkStore::new(),
            blocked: AtomicBool::new(false),
            entered: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ChunkStore for GatedStore {
    async fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        if self.blocked.load(Ordering::SeqCst) {
            self.entered.notify_one();
            std::future::pending::<()>().await;
        }
        self.inner.get(hash).await
    }

    async fn has(&self, hash: &Hash) -> StoreResult<bool> {
        self.inner.has(hash).await
    }

    async fn put(&self, chunk: Chunk) -> StoreResult<Hash> {
        self.inner.put(chunk).await
    }
}

// =============================================================================
// Two-level tree [[100, 101], [102]]
// =============================================================================

#[tokio::test]
async fn advance_and_retreat_across_chunks() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let root = two_level(&store, &[&[100, 101], &[102]]).await;
    let mut cur = SequenceCursor::at_index(&ctx, root, 0).await.unwrap();

    assert!(cur.valid());
    assert_eq!(cur.depth(), 2);
    assert_position(&cur, 0, 0);
    assert_eq!(cur.current(), item(100));

    assert!(cur.advance(&ctx).await.unwrap());
    assert_position(&cur, 1, 0);
    assert_eq!(cur.current(), item(101));

    assert!(cur.advance(&ctx).await.unwrap());
    assert_position(&cur, 0, 1);
    assert_eq!(cur.current(), item(102));

    assert!(!cur.advance(&ctx).await.unwrap());
    assert_position(&cur, 1, 1);
    assert!(!cur.valid());

    assert!(!cur.advance(&ctx).await.unwrap());
    assert_position(&cur, 1, 1);
    assert!(!cur.valid());

    assert!(cur.retreat(&ctx).await.unwrap());
    assert_position(&cur, 0, 1);
    assert_eq!(cur.current(), item(102));

    assert!(cur.retreat(&ctx).await.unwrap());
    assert_position(&cur, 1, 0);
    assert_eq!(cur.current(), item(101));

    assert!(cur.retreat(&ctx).await.unwrap());
    assert_position(&cur, 0, 0);
    assert_eq!(cur.current(), item(100));

    assert!(!cur.retreat(&ctx).await.unwrap());
    assert_position(&cur, -1, 0);
    assert!(!cur.valid());

    assert!(!cur.retreat(&ctx).await.unwrap());
    assert_position(&cur, -1, 0);
    assert!(!cur.valid());

    assert!(cur.advance(&ctx).await.unwrap());
    assert_position(&cur, 0, 0);
    assert_eq!(cur.current(), item(100));
}

#[tokio::test]
async fn crossing_loads_one_chunk_on_demand() {
    let ctx = Context::background();
    let (chunks, store) = memory_store();
    let root = two_level(&store, &[&[100, 101], &[102]]).await;

    let mut cur = SequenceCursor::at_index(&ctx, root, 0).await.unwrap();
    assert_eq!(chunks.read_count(), 1);

    cur.advance(&ctx).await.unwrap();
    assert_eq!(chunks.read_count(), 1);

    cur.advance(&ctx).await.unwrap();
    assert_eq!(chunks.read_count(), 2);

    // Running off the end does not load anything.
    cur.advance(&ctx).await.unwrap();
    assert_eq!(chunks.read_count(), 2);
}

// =============================================================================
// Deep trees
// =============================================================================

#[tokio::test]
async fn full_walk_over_deep_tree() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let builder = TreeBuilder::new(store).with_chunk_size(3);
    let list = builder.list((0..50).map(Value::Int).collect()).await.unwrap();
    let root = Arc::clone(list.as_sequence().unwrap());
    assert!(root.tree_level() >= 2);

    let mut cur = SequenceCursor::at_index(&ctx, Arc::clone(&root), 0).await.unwrap();
    let forward = cur.collect_forward(&ctx, usize::MAX).await.unwrap();
    assert_eq!(forward, (0..50).map(item).collect::<Vec<_>>());
    assert!(!cur.valid());

    assert!(cur.retreat(&ctx).await.unwrap());
    let backward = cur.collect_backward(&ctx, usize::MAX).await.unwrap();
    assert_eq!(backward, (0..50).rev().map(item).collect::<Vec<_>>());
    assert_eq!(cur.index_in_chunk(), -1);
}

#[tokio::test]
async fn at_index_lands_on_every_leaf() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let builder = TreeBuilder::new(store).with_chunk_size(2);
    let list = builder.list((0..13).map(Value::Int).collect()).await.unwrap();
    let root = Arc::clone(list.as_sequence().unwrap());

    for i in 0..13 {
        let cur = SequenceCursor::at_index(&ctx, Arc::clone(&root), i).await.unwrap();
        assert_eq!(cur.current(), item(i as i64));
        assert_eq!(cur.leaf_index(), Some(i));
        assert_eq!(cur.depth() as u64, root.tree_level() + 1);
    }
}

#[tokio::test]
async fn at_index_past_end_can_retreat_to_last() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let builder = TreeBuilder::new(store).with_chunk_size(2);
    let list = builder.list((0..7).map(Value::Int).collect()).await.unwrap();
    let root = Arc::clone(list.as_sequence().unwrap());

    let mut cur = SequenceCursor::at_index(&ctx, root, 99).await.unwrap();
    assert!(!cur.valid());
    assert!(!cur.advance(&ctx).await.unwrap());
    assert!(cur.retreat(&ctx).await.unwrap());
    assert_eq!(cur.current(), item(6));
    assert!(cur.at_last_item());
}

#[tokio::test]
async fn map_entries_walk_in_key_order() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let builder = TreeBuilder::new(store).with_chunk_size(2);
    let entries = (0..6).rev().map(|i| (Value::Int(i), Value::from(format!("v{i}")))).collect();
    let map = builder.map(entries).await.unwrap();

    let root = Arc::clone(map.as_sequence().unwrap());
    let mut cur = SequenceCursor::at_index(&ctx, root, 0).await.unwrap();
    let keys: Vec<_> = cur
        .collect_forward(&ctx, usize::MAX)
        .await
        .unwrap()
        .into_iter()
        .map(|it| match it {
            SequenceItem::Entry(k, _) => k,
            other => panic!("unexpected item {other:?}"),
        })
        .collect();
    assert_eq!(keys, (0..6).map(Value::Int).collect::<Vec<_>>());
}

#[tokio::test]
async fn file_backed_tree_is_traversable_after_reopen() {
    let ctx = Context::background();
    let dir = tempfile::tempdir().unwrap();

    let root_ref = {
        let chunks = Arc::new(FileChunkStore::open(dir.path()).await.unwrap());
        let store = ValueStore::new(chunks, Format::V7_18);
        let blob = TreeBuilder::new(store.clone())
            .with_chunk_size(4)
            .blob((0..=40u8).collect())
            .await
            .unwrap();
        store.write_value(&blob).await.unwrap()
    };

    let chunks = Arc::new(FileChunkStore::open(dir.path()).await.unwrap());
    let store = ValueStore::new(chunks, Format::V7_18);
    let root = store.read_sequence(&ctx, &root_ref.target()).await.unwrap();
    assert_eq!(root.num_leaves(), 41);

    let mut cur = SequenceCursor::at_index(&ctx, root, 0).await.unwrap();
    let bytes = cur.collect_forward(&ctx, usize::MAX).await.unwrap();
    assert_eq!(bytes, (0..=40u8).map(SequenceItem::Byte).collect::<Vec<_>>());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancelled_crossing_leaves_cursor_untouched() {
    let gated = Arc::new(GatedStore::new());
    let store = ValueStore::new(gated.clone(), Format::Ld1);
    let root = two_level(&store, &[&[100, 101], &[102]]).await;

    let mut cur = SequenceCursor::at_index(&Context::background(), root, 1).await.unwrap();
    assert_position(&cur, 1, 0);

    gated.blocked.store(true, Ordering::SeqCst);
    let (ctx, handle) = Context::with_cancel();
    let entered = Arc::clone(&gated.entered);
    let canceller = tokio::spawn(async move {
        entered.notified().await;
        handle.cancel();
    });

    let err = cur.advance(&ctx).await.unwrap_err();
    assert!(matches!(err, ValueError::Cancelled));
    canceller.await.unwrap();

    assert_position(&cur, 1, 0);
    assert_eq!(cur.current(), item(101));

    gated.blocked.store(false, Ordering::SeqCst);
    assert!(cur.advance(&Context::background()).await.unwrap());
    assert_position(&cur, 0, 1);
    assert_eq!(cur.current(), item(102));
}

#[tokio::test]
async fn deadline_during_crossing_leaves_cursor_untouched() {
    let gated = Arc::new(GatedStore::new());
    let store = ValueStore::new(gated.clone(), Format::Ld1);
    let root = two_level(&store, &[&[100], &[101]]).await;

    let mut cur = SequenceCursor::at_index(&Context::background(), root, 1).await.unwrap();
    assert_position(&cur, 0, 1);

    gated.blocked.store(true, Ordering::SeqCst);
    let ctx = Context::background().with_timeout(Duration::from_millis(20));
    let err = cur.retreat(&ctx).await.unwrap_err();
    assert!(matches!(err, ValueError::DeadlineExceeded));
    assert!(err.is_cancellation());

    assert_position(&cur, 0, 1);
    assert_eq!(cur.current(), item(101));
}

#[tokio::test]
async fn missing_child_chunk_is_not_found() {
    let ctx = Context::background();
    let (_, store) = memory_store();
    let real = two_level(&store, &[&[1]]).await;
    let mut tuples = real.tuples().to_vec();
    tuples.push(tessera_value::MetaTuple::new(Hash::of(Format::Ld1, b"gone"), 1));
    let root = Arc::new(Sequence::meta(Kind::List, Format::Ld1, 1, tuples, Some(store)));

    let mut cur = SequenceCursor::at_index(&ctx, root, 0).await.unwrap();
    let err = cur.advance(&ctx).await.unwrap_err();
    assert!(matches!(err, ValueError::NotFound(_)));
    assert_eq!(cur.current(), item(1));
}
