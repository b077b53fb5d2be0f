//! Positional traversal over chunked sequences.
//!
//! A [`SequenceCursor`] is a stack of frames, root first. The bottom frame is
//! the cursor's own position; each frame above it points at the item of its
//! chunk whose child is the frame below. Crossing a chunk boundary steps the
//! nearest ancestor that can move and reloads every chunk beneath it.
//!
//! The bottom index ranges over `-1..=seq_len`: `-1` is before the start and
//! `seq_len` is past the end. Ancestors never leave their valid range.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{ValueError, ValueResult};
use crate::sequence::{Sequence, SequenceItem};

/// One level of a cursor.
#[derive(Clone, Debug)]
pub struct CursorFrame {
    sequence: Arc<Sequence>,
    index: isize,
}

impl CursorFrame {
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// Position within this frame's chunk.
    pub fn index(&self) -> isize {
        self.index
    }

    fn len(&self) -> isize {
        self.sequence.seq_len() as isize
    }
}

/// Stateful navigator over a sequence tree.
#[derive(Clone, Debug)]
pub struct SequenceCursor {
    frames: Vec<CursorFrame>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl SequenceCursor {
    /// A root cursor over `sequence` at `index`.
    pub fn new(sequence: Arc<Sequence>, index: isize) -> Self {
        Self {
            frames: vec![CursorFrame { sequence, index }],
        }
    }

    /// A cursor over `sequence` whose upper levels are `parent`'s frames.
    ///
    /// `sequence` is expected to be the child at `parent`'s position.
    pub fn with_parent(parent: SequenceCursor, sequence: Arc<Sequence>, index: isize) -> Self {
        let mut frames = parent.frames;
        frames.push(CursorFrame { sequence, index });
        Self { frames }
    }

    /// A cursor positioned at global leaf item `leaf_index` of `root`.
    ///
    /// Descends through `cumulative_leaves`, loading one chunk per level. An
    /// index at or past the end yields a cursor past the end of the last leaf
    /// chunk.
    pub async fn at_index(ctx: &Context, root: Arc<Sequence>, leaf_index: u64) -> ValueResult<Self> {
        let past_end = leaf_index >= root.num_leaves();
        let mut frames = Vec::new();
        let mut sequence = root;
        let mut remaining = leaf_index;

        while !sequence.is_leaf() {
            if sequence.seq_len() == 0 {
                if !frames.is_empty() {
                    return Err(ValueError::Decode(format!(
                        "empty level {} chunk inside a tree",
                        sequence.tree_level()
                    )));
                }
                // An empty tree has nothing to descend into.
                frames.push(CursorFrame { sequence, index: 0 });
                return Ok(Self { frames });
            }
            let (child, offset) = match sequence.locate_leaf(remaining) {
                Some(found) if !past_end => found,
                _ => (sequence.seq_len() - 1, 0),
            };
            let next = sequence.get_child_sequence(ctx, child).await?;
            frames.push(CursorFrame {
                sequence,
                index: child as isize,
            });
            sequence = next;
            remaining = offset;
        }

        let index = if past_end {
            sequence.seq_len() as isize
        } else {
            remaining as isize
        };
        frames.push(CursorFrame { sequence, index });
        Ok(Self { frames })
    }

    /// Number of frames, root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[CursorFrame] {
        &self.frames
    }

    fn bottom(&self) -> &CursorFrame {
        // A cursor is built with at least one frame and never loses one.
        &self.frames[self.frames.len() - 1]
    }

    /// The chunk the cursor is positioned in.
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.bottom().sequence
    }

    pub fn index_in_chunk(&self) -> isize {
        self.bottom().index
    }

    /// The frame one level up, if any.
    pub fn parent(&self) -> Option<&CursorFrame> {
        self.frames.len().checked_sub(2).map(|i| &self.frames[i])
    }

    /// True iff the cursor points at an item.
    pub fn valid(&self) -> bool {
        let bottom = self.bottom();
        bottom.index >= 0 && bottom.index < bottom.len()
    }

    /// The item under the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is not [`valid`](Self::valid).
    pub fn current(&self) -> SequenceItem {
        assert!(self.valid(), "cursor is not positioned on an item");
        let bottom = self.bottom();
        bottom.sequence.get_item(bottom.index as usize)
    }

    /// True iff every frame is on the last item of its chunk.
    pub fn at_last_item(&self) -> bool {
        self.frames.iter().all(|f| f.index == f.len() - 1)
    }

    /// Global position of the cursor among the leaf items under the root,
    /// or `None` when the cursor is not valid.
    pub fn leaf_index(&self) -> Option<u64> {
        if !self.valid() {
            return None;
        }
        let above: u64 = self.frames[..self.frames.len() - 1]
            .iter()
            .filter(|f| f.index > 0)
            .map(|f| f.sequence.cumulative_leaves(f.index as usize - 1))
            .sum();
        Some(above + self.bottom().index as u64)
    }

    /// Step to the next item. Returns `false` once past the end.
    ///
    /// Crossing into the next chunk loads the replacement chunks first and
    /// only then moves the cursor, so any error leaves it unchanged.
    pub async fn advance(&mut self, ctx: &Context) -> ValueResult<bool> {
        self.step(ctx, Direction::Forward).await
    }

    /// Step to the previous item. Returns `false` once before the start.
    pub async fn retreat(&mut self, ctx: &Context) -> ValueResult<bool> {
        self.step(ctx, Direction::Backward).await
    }

    async fn step(&mut self, ctx: &Context, dir: Direction) -> ValueResult<bool> {
        let last = self.frames.len() - 1;
        let bottom = &self.frames[last];
        let (index, len) = (bottom.index, bottom.len());

        match dir {
            Direction::Forward if index + 1 < len => {
                self.frames[last].index += 1;
                return Ok(true);
            }
            Direction::Forward if index >= len => return Ok(false),
            Direction::Backward if index > 0 => {
                self.frames[last].index -= 1;
                return Ok(true);
            }
            Direction::Backward if index < 0 => return Ok(false),
            _ => {}
        }

        let pivot = self.frames[..last].iter().rposition(|f| match dir {
            Direction::Forward => f.index + 1 < f.len(),
            Direction::Backward => f.index > 0,
        });
        let Some(pivot) = pivot else {
            self.frames[last].index = match dir {
                Direction::Forward => len,
                Direction::Backward => -1,
            };
            return Ok(false);
        };

        let pivot_index = match dir {
            Direction::Forward => self.frames[pivot].index + 1,
            Direction::Backward => self.frames[pivot].index - 1,
        };
        let chain = self.load_chain(ctx, pivot, pivot_index, dir).await?;

        self.frames[pivot].index = pivot_index;
        self.frames.truncate(pivot + 1);
        self.frames.extend(chain);
        Ok(true)
    }

    /// Load the frames below `pivot` as they will be once the pivot moves to
    /// `pivot_index`. Leaves `self` untouched.
    async fn load_chain(
        &self,
        ctx: &Context,
        pivot: usize,
        pivot_index: isize,
        dir: Direction,
    ) -> ValueResult<Vec<CursorFrame>> {
        let mut chain = Vec::with_capacity(self.frames.len() - pivot - 1);
        let mut parent = Arc::clone(&self.frames[pivot].sequence);
        let mut index = pivot_index;

        for _ in pivot + 1..self.frames.len() {
            let child = parent.get_child_sequence(ctx, index as usize).await?;
            let len = child.seq_len() as isize;
            if len == 0 {
                return Err(ValueError::Decode(format!(
                    "empty level {} chunk inside a tree",
                    child.tree_level()
                )));
            }
            index = match dir {
                Direction::Forward => 0,
                Direction::Backward => len - 1,
            };
            chain.push(CursorFrame {
                sequence: Arc::clone(&child),
                index,
            });
            parent = child;
        }
        Ok(chain)
    }

    /// Collect up to `limit` items starting at the current position, moving
    /// forward. The cursor ends on the first item not collected.
    pub async fn collect_forward(&mut self, ctx: &Context, limit: usize) -> ValueResult<Vec<SequenceItem>> {
        self.collect(ctx, limit, Direction::Forward).await
    }

    /// Like [`collect_forward`](Self::collect_forward), moving backward.
    pub async fn collect_backward(&mut self, ctx: &Context, limit: usize) -> ValueResult<Vec<SequenceItem>> {
        self.collect(ctx, limit, Direction::Backward).await
    }

    async fn collect(&mut self, ctx: &Context, limit: usize, dir: Direction) -> ValueResult<Vec<SequenceItem>> {
        let mut items = Vec::new();
        while items.len() < limit && self.valid() {
            items.push(self.current());
            self.step(ctx, dir).await?;
        }
        Ok(items)
    }
}
