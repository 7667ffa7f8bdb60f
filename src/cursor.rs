//! Cursor abstractions (C3): the four cursor kinds every representation
//! exposes, and the half-open range type they are positioned with.
//!
//! A cursor is always owned by exactly one `RoTxn`/`RwTxn` borrow and is
//! never shared across threads (§5); callers obtain one from a
//! representation handle, consume it, and `close` it (or let it drop).

use crate::codec::{NodeId, MAX_SENTINEL, MIN_SENTINEL};

/// A half-open `[start, end)` bound over node IDs. `end == MAX_SENTINEL`
/// means "to the end of the table" per I8's range-end convention; there is
/// no way to express an inclusive upper bound other than `end = id + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub start: NodeId,
    pub end: NodeId,
}

impl KeyRange {
    /// The range covering every node/edge in the table.
    pub const ALL: KeyRange = KeyRange {
        start: MIN_SENTINEL,
        end: MAX_SENTINEL,
    };

    pub fn new(start: NodeId, end: NodeId) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id >= self.start && id < self.end
    }
}

/// A half-open `[start, end)` bound over `(src, dst)` pairs, compared
/// lexicographically (`NodeId` tuples order first by `.0`, then by `.1`).
/// Edge keys are genuinely two-dimensional (§4.3/§4.7): a single `KeyRange`
/// over `src` alone cannot express "everything from `(1,4)` up to but not
/// including `(8,1)`", which is exactly the shape [`GraphEngine::get_edge_range`]
/// hands back for edge-table partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRange {
    pub start: (NodeId, NodeId),
    pub end: (NodeId, NodeId),
}

impl PairRange {
    /// The range covering every edge in the table.
    pub const ALL: PairRange = PairRange {
        start: (MIN_SENTINEL, MIN_SENTINEL),
        end: (MAX_SENTINEL, MAX_SENTINEL),
    };

    pub fn new(start: (NodeId, NodeId), end: (NodeId, NodeId)) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pair: (NodeId, NodeId)) -> bool {
        pair >= self.start && pair < self.end
    }
}

/// A node's full out/in adjacency as returned by a neighborhood cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjList {
    pub node_id: NodeId,
    pub degree: u32,
    pub neighbors: Vec<NodeId>,
}

/// A materialized node row: id plus degree counters (read-optimize only;
/// zero when the graph is not read-optimized).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub in_degree: u32,
    pub out_degree: u32,
}

/// A materialized edge: endpoints plus an optional weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRecord {
    pub src_id: NodeId,
    pub dst_id: NodeId,
    pub weight: Option<i32>,
}

/// Common cursor behavior shared by all four kinds: advance, reposition,
/// reset to the start, and release the underlying LMDB cursor.
///
/// Exhausted (`next` returned `None` once) is terminal: a cursor does not
/// wrap around. Call `reset` to scan again from the beginning.
pub trait Cursor {
    type Item;

    /// Advances and returns the next item, or `None` once the cursor's
    /// range is exhausted. Matches the original's convention of a sentinel
    /// "not found" record, surfaced here as `Option::None` instead.
    fn next(&mut self) -> crate::types::Result<Option<Self::Item>>;

    /// Repositions the cursor to the first key `>= start` within `range`,
    /// narrowing subsequent `next` calls to stop at `range.end`.
    fn set_key_range(&mut self, range: KeyRange) -> crate::types::Result<()>;

    /// Repositions to the start of the full table, equivalent to
    /// `set_key_range(KeyRange::ALL)`.
    fn reset(&mut self) -> crate::types::Result<()> {
        self.set_key_range(KeyRange::ALL)
    }
}

/// Iterates the node table in ascending ID order.
pub trait NodeCursor: Cursor<Item = NodeRecord> {}

/// Iterates the edge table in ascending `(src, dst)` order. Keyed by a
/// [`PairRange`] rather than `Cursor`'s `KeyRange`, since an edge cursor's
/// bound is genuinely two-dimensional (§4.3/§4.7); callers needing a
/// specific traversal direction should use `OutNbdCursor`/`InNbdCursor`
/// instead.
pub trait EdgeCursor {
    /// Advances and returns the next item, or `None` once the cursor's
    /// range is exhausted.
    fn next(&mut self) -> crate::types::Result<Option<EdgeRecord>>;

    /// Repositions the cursor to the first key `>= range.start`, narrowing
    /// subsequent `next` calls to stop at `range.end`.
    fn set_key_range(&mut self, range: PairRange) -> crate::types::Result<()>;

    /// Repositions to the start of the full table.
    fn reset(&mut self) -> crate::types::Result<()> {
        self.set_key_range(PairRange::ALL)
    }
}

/// Iterates one node's out-neighborhood, or every node's out-neighborhood
/// in turn when positioned in "all nodes" mode (used by `GraphEngine`'s
/// partitioning scan and by full-graph export).
pub trait OutNbdCursor: Cursor<Item = AdjList> {
    /// Switches between "just this node" and "every node in the range"
    /// iteration. Adjacency-List representations implement this directly
    /// over the adjacency table; Edge-Key families synthesize it by
    /// grouping consecutive edge rows that share a source.
    fn set_all_nodes(&mut self, all: bool);
}

/// Iterates one node's in-neighborhood, or every node's, symmetric to
/// `OutNbdCursor`.
pub trait InNbdCursor: Cursor<Item = AdjList> {
    fn set_all_nodes(&mut self, all: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_range_all_covers_every_real_id() {
        assert!(KeyRange::ALL.contains(0));
        assert!(KeyRange::ALL.contains(NodeId::MAX - 1));
        assert!(!KeyRange::ALL.contains(NodeId::MAX));
    }

    #[test]
    fn key_range_is_half_open() {
        let r = KeyRange::new(5, 10);
        assert!(!r.contains(4));
        assert!(r.contains(5));
        assert!(r.contains(9));
        assert!(!r.contains(10));
    }

    #[test]
    fn pair_range_all_covers_every_real_pair() {
        assert!(PairRange::ALL.contains((0, 0)));
        assert!(PairRange::ALL.contains((NodeId::MAX - 1, NodeId::MAX - 1)));
        assert!(!PairRange::ALL.contains((NodeId::MAX, NodeId::MAX)));
    }

    #[test]
    fn pair_range_compares_lexicographically() {
        let r = PairRange::new((1, 4), (8, 1));
        assert!(!r.contains((1, 3)));
        assert!(r.contains((1, 4)));
        assert!(r.contains((1, 7)));
        assert!(r.contains((5, 6)));
        assert!(r.contains((7, 8)));
        assert!(r.contains((8, 0)));
        assert!(!r.contains((8, 1)));
    }
}
