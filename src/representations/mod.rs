//! The capability trait every physical representation implements, and the
//! factory that picks a concrete implementation from [`GraphOpts`].
//!
//! This mirrors the original's `GraphBase` abstract class: one seam the
//! graph engine and all callers code against, three structs behind it.

pub mod adj;
pub mod ekey;
pub mod split_ekey;

use heed3::{RoTxn, RwTxn};

use crate::codec::NodeId;
use crate::config::{GraphOpts, Representation as RepKind};
use crate::cursor::{AdjList, EdgeRecord, KeyRange, NodeRecord, PairRange};
use crate::metadata::Metadata;
use crate::types::Result;

/// Operations every representation supports, independent of how it lays
/// out keys on disk. `GraphEngine` and any higher-level caller code only
/// ever see this trait, never a concrete `Adj`/`EKey`/`SplitEKey` type.
pub trait GraphRepresentation {
    /// Cursor type this representation hands out for full-node scans.
    type NodeCur<'txn>: crate::cursor::NodeCursor
    where
        Self: 'txn;
    /// Cursor type for full-edge-table scans.
    type EdgeCur<'txn>: crate::cursor::EdgeCursor
    where
        Self: 'txn;
    /// Cursor type for out-neighborhood scans.
    type OutCur<'txn>: crate::cursor::OutNbdCursor
    where
        Self: 'txn;
    /// Cursor type for in-neighborhood scans.
    type InCur<'txn>: crate::cursor::InNbdCursor
    where
        Self: 'txn;

    /// Reads a node by id. `NodeNotFound` if absent or deleted (§3).
    fn get_node(&self, txn: &RoTxn, id: NodeId) -> Result<NodeRecord>;

    /// True iff `id` currently has a live node row.
    fn has_node(&self, txn: &RoTxn, id: NodeId) -> Result<bool>;

    /// Inserts a node. `Ok(false)` (via [`crate::write::classify_insert`])
    /// if `id` already exists; degrees are left untouched in that case.
    /// `meta` is bumped on a genuine insert.
    fn add_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<bool>;

    /// Deletes a node and every edge incident to it (I6's delete-node
    /// cascade). Tolerates `id` already being absent. `meta` is decremented
    /// once per node and once per incident edge actually removed.
    fn delete_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()>;

    /// Reads the edge `(src, dst)`. `EdgeNotFound` if absent.
    fn get_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<EdgeRecord>;

    /// True iff `(src, dst)` currently has a live edge row.
    fn has_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<bool>;

    /// Inserts edge `(src, dst)` with optional `weight`. Auto-vivifies
    /// endpoints that do not yet exist (I1): a missing `src`/`dst` is
    /// created with zero degrees before the edge row is written. For
    /// undirected graphs also creates the mirror `(dst, src)` entry (I2).
    /// `meta` is bumped for every node/edge actually created.
    fn add_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool>;

    /// Deletes edge `(src, dst)` (and its mirror, if undirected).
    /// Tolerates the edge already being absent.
    fn delete_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()>;

    /// Out-degree of `id`. O(1) when read-optimized, O(out-degree)
    /// otherwise (I3).
    fn get_out_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32>;

    /// In-degree of `id`. O(1) when read-optimized, O(in-degree)
    /// otherwise (I3).
    fn get_in_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32>;

    /// Full out-adjacency of `id`, ascending.
    fn get_out_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList>;

    /// Full in-adjacency of `id`, ascending.
    fn get_in_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList>;

    /// Opens a cursor over the node table restricted to `range`.
    fn node_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::NodeCur<'txn>>;

    /// Opens a cursor over the edge table restricted to `range`.
    fn edge_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: PairRange) -> Result<Self::EdgeCur<'txn>>;

    /// Opens a cursor over out-neighborhoods restricted to `range`.
    fn out_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::OutCur<'txn>>;

    /// Opens a cursor over in-neighborhoods restricted to `range`.
    fn in_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::InCur<'txn>>;
}

/// Picks the concrete `GraphOpts::representation` a fresh `GraphEngine`
/// should construct. The enum exists so `GraphEngine` can hold one of three
/// concrete, differently-cursor-typed representations without boxing every
/// cursor behind a trait object on the hot path.
pub fn representation_kind(opts: &GraphOpts) -> RepKind {
    opts.representation
}
