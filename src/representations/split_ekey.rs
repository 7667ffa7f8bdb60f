//! Split Edge-Key representation (C6): node rows live in their own table;
//! edges are mirrored into two key-sorted tables, `out` keyed `(src, dst)`
//! and `in` keyed `(dst, src)`, so both traversal directions are a single
//! ordered scan with no secondary index required — the split-table
//! counterpart to the Unified Edge-Key's single-table-plus-index design.

use std::marker::PhantomData;

use heed3::types::Bytes;
use heed3::{Database, Env, RoTxn, RwTxn};

use crate::codec::{decode_degrees, decode_id, encode_degrees, encode_id, NodeId};
use crate::cursor::{AdjList, Cursor, EdgeCursor, EdgeRecord, InNbdCursor, KeyRange, NodeCursor, NodeRecord, OutNbdCursor, PairRange};
use crate::metadata::Metadata;
use crate::representations::GraphRepresentation;
use crate::types::{GraphError, Result};

pub const DB_NODES: &str = "split_ekey_nodes";
pub const DB_OUT: &str = "split_ekey_out";
pub const DB_IN: &str = "split_ekey_in";

fn pair_key(a: NodeId, b: NodeId) -> Vec<u8> {
    let mut k = Vec::with_capacity(16);
    k.extend_from_slice(&encode_id(a));
    k.extend_from_slice(&encode_id(b));
    k
}

fn split_pair(key: &[u8]) -> Result<(NodeId, NodeId)> {
    let id_width = std::mem::size_of::<NodeId>();
    if key.len() != id_width * 2 {
        return Err(GraphError::SliceLength);
    }
    Ok((decode_id(&key[..id_width])?, decode_id(&key[id_width..])?))
}

pub struct SplitEKeyRepresentation {
    nodes_db: Database<Bytes, Bytes>,
    out_db: Database<Bytes, Bytes>,
    in_db: Database<Bytes, Bytes>,
    is_weighted: bool,
    is_directed: bool,
    read_optimize: bool,
}

impl SplitEKeyRepresentation {
    pub fn create(env: &Env, wtxn: &mut RwTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let nodes_db = env.database_options().types::<Bytes, Bytes>().name(DB_NODES).create(wtxn)?;
        let out_db = env.database_options().types::<Bytes, Bytes>().name(DB_OUT).create(wtxn)?;
        let in_db = env.database_options().types::<Bytes, Bytes>().name(DB_IN).create(wtxn)?;
        Ok(Self { nodes_db, out_db, in_db, is_weighted, is_directed, read_optimize })
    }

    pub fn open(env: &Env, rtxn: &RoTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let nodes_db = env.open_database(rtxn, Some(DB_NODES))?.ok_or(GraphError::Other("split_ekey_nodes table missing".into()))?;
        let out_db = env.open_database(rtxn, Some(DB_OUT))?.ok_or(GraphError::Other("split_ekey_out table missing".into()))?;
        let in_db = env.open_database(rtxn, Some(DB_IN))?.ok_or(GraphError::Other("split_ekey_in table missing".into()))?;
        Ok(Self { nodes_db, out_db, in_db, is_weighted, is_directed, read_optimize })
    }

    fn read_degrees(&self, txn: &RoTxn, id: NodeId) -> Result<(u32, u32)> {
        let bytes = self.nodes_db.get(txn, &encode_id(id))?.ok_or(GraphError::NodeNotFound)?;
        decode_degrees(bytes)
    }

    fn write_degrees(&self, wtxn: &mut RwTxn, id: NodeId, in_degree: u32, out_degree: u32) -> Result<()> {
        self.nodes_db.put(wtxn, &encode_id(id), &encode_degrees(in_degree, out_degree))?;
        Ok(())
    }

    fn bump_degrees(&self, wtxn: &mut RwTxn, id: NodeId, d_in: i64, d_out: i64) -> Result<()> {
        let (in_degree, out_degree) = self.read_degrees(wtxn, id)?;
        let in_degree = (in_degree as i64 + d_in).max(0) as u32;
        let out_degree = (out_degree as i64 + d_out).max(0) as u32;
        self.write_degrees(wtxn, id, in_degree, out_degree)
    }

    fn ensure_node(&self, wtxn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        if self.nodes_db.get(wtxn, &encode_id(id))?.is_none() {
            self.write_degrees(wtxn, id, 0, 0)?;
            meta.on_node_added(id);
        }
        Ok(())
    }
}

impl GraphRepresentation for SplitEKeyRepresentation {
    type NodeCur<'txn> = SplitNodeCursor<'txn>;
    type EdgeCur<'txn> = SplitEdgeCursor<'txn>;
    type OutCur<'txn> = SplitNbdCursor<'txn>;
    type InCur<'txn> = SplitNbdCursor<'txn>;

    fn get_node(&self, txn: &RoTxn, id: NodeId) -> Result<NodeRecord> {
        let (in_degree, out_degree) = self.read_degrees(txn, id)?;
        Ok(NodeRecord { id, in_degree, out_degree })
    }

    fn has_node(&self, txn: &RoTxn, id: NodeId) -> Result<bool> {
        Ok(self.nodes_db.get(txn, &encode_id(id))?.is_some())
    }

    fn add_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<bool> {
        if self.nodes_db.get(txn, &encode_id(id))?.is_some() {
            return Ok(false);
        }
        self.write_degrees(txn, id, 0, 0)?;
        meta.on_node_added(id);
        Ok(true)
    }

    fn delete_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        if self.nodes_db.get(txn, &encode_id(id))?.is_none() {
            // Absent node on delete is tolerated as a no-op (§7/§8).
            return Ok(());
        }

        let out_neighbors: Vec<NodeId> = self
            .out_db
            .prefix_iter(txn, &encode_id(id))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_pair(k).ok())
            .map(|(_, dst)| dst)
            .collect();
        let in_neighbors: Vec<NodeId> = self
            .in_db
            .prefix_iter(txn, &encode_id(id))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_pair(k).ok())
            .map(|(_, src)| src)
            .collect();

        for dst in &out_neighbors {
            self.out_db.delete(txn, &pair_key(id, *dst))?;
            self.in_db.delete(txn, &pair_key(*dst, id))?;
            if self.read_optimize {
                self.bump_degrees(txn, *dst, -1, 0)?;
            }
            meta.on_edge_removed();
        }
        for src in &in_neighbors {
            self.in_db.delete(txn, &pair_key(id, *src))?;
            self.out_db.delete(txn, &pair_key(*src, id))?;
            if self.read_optimize {
                self.bump_degrees(txn, *src, 0, -1)?;
            }
            meta.on_edge_removed();
        }

        self.nodes_db.delete(txn, &encode_id(id))?;
        meta.on_node_removed();
        Ok(())
    }

    fn get_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<EdgeRecord> {
        let bytes = self.out_db.get(txn, &pair_key(src, dst))?.ok_or(GraphError::EdgeNotFound)?;
        let w = i32::from_ne_bytes(bytes.try_into().map_err(|_| GraphError::SliceLength)?);
        let weight = if self.is_weighted { Some(w) } else { None };
        Ok(EdgeRecord { src_id: src, dst_id: dst, weight })
    }

    fn has_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<bool> {
        Ok(self.out_db.get(txn, &pair_key(src, dst))?.is_some())
    }

    fn add_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool> {
        self.ensure_node(txn, src, meta)?;
        self.ensure_node(txn, dst, meta)?;

        if self.out_db.get(txn, &pair_key(src, dst))?.is_some() {
            return Ok(false);
        }

        let w = weight.unwrap_or(0);
        self.out_db.put(txn, &pair_key(src, dst), &w.to_ne_bytes())?;
        self.in_db.put(txn, &pair_key(dst, src), &w.to_ne_bytes())?;
        if self.read_optimize {
            self.bump_degrees(txn, src, 0, 1)?;
            self.bump_degrees(txn, dst, 1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.out_db.put(txn, &pair_key(dst, src), &w.to_ne_bytes())?;
            self.in_db.put(txn, &pair_key(src, dst), &w.to_ne_bytes())?;
            if self.read_optimize {
                self.bump_degrees(txn, dst, 0, 1)?;
                self.bump_degrees(txn, src, 1, 0)?;
            }
        }

        meta.on_edge_added();
        Ok(true)
    }

    fn delete_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()> {
        let existed = self.out_db.delete(txn, &pair_key(src, dst))?;
        if !existed {
            // Absent edge on delete is tolerated as a no-op (§7/§8).
            return Ok(());
        }
        self.in_db.delete(txn, &pair_key(dst, src))?;
        if self.read_optimize {
            self.bump_degrees(txn, src, 0, -1)?;
            self.bump_degrees(txn, dst, -1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.out_db.delete(txn, &pair_key(dst, src))?;
            self.in_db.delete(txn, &pair_key(src, dst))?;
            if self.read_optimize {
                self.bump_degrees(txn, dst, 0, -1)?;
                self.bump_degrees(txn, src, -1, 0)?;
            }
        }

        meta.on_edge_removed();
        Ok(())
    }

    fn get_out_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        if self.read_optimize {
            Ok(self.read_degrees(txn, id)?.1)
        } else {
            Ok(self.get_out_nodes(txn, id)?.degree)
        }
    }

    fn get_in_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        if self.read_optimize {
            Ok(self.read_degrees(txn, id)?.0)
        } else {
            Ok(self.get_in_nodes(txn, id)?.degree)
        }
    }

    fn get_out_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        let mut neighbors: Vec<NodeId> = self
            .out_db
            .prefix_iter(txn, &encode_id(id))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_pair(k).ok())
            .map(|(_, dst)| dst)
            .collect();
        neighbors.sort_unstable();
        Ok(AdjList { node_id: id, degree: neighbors.len() as u32, neighbors })
    }

    fn get_in_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        let mut neighbors: Vec<NodeId> = self
            .in_db
            .prefix_iter(txn, &encode_id(id))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_pair(k).ok())
            .map(|(_, src)| src)
            .collect();
        neighbors.sort_unstable();
        Ok(AdjList { node_id: id, degree: neighbors.len() as u32, neighbors })
    }

    fn node_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::NodeCur<'txn>> {
        let mut items = Vec::new();
        for r in self.nodes_db.iter(txn)? {
            let (k, v) = r?;
            let id = decode_id(k)?;
            if range.contains(id) {
                let (in_degree, out_degree) = decode_degrees(v)?;
                items.push(NodeRecord { id, in_degree, out_degree });
            }
        }
        items.sort_by_key(|n| n.id);
        Ok(SplitNodeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn edge_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: PairRange) -> Result<Self::EdgeCur<'txn>> {
        let mut items = Vec::new();
        for r in self.out_db.iter(txn)? {
            let (k, v) = r?;
            let (src, dst) = split_pair(k)?;
            if !range.contains((src, dst)) {
                continue;
            }
            let w = i32::from_ne_bytes(v.try_into().map_err(|_| GraphError::SliceLength)?);
            let weight = if self.is_weighted { Some(w) } else { None };
            items.push(EdgeRecord { src_id: src, dst_id: dst, weight });
        }
        items.sort_by_key(|e| (e.src_id, e.dst_id));
        Ok(SplitEdgeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn out_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::OutCur<'txn>> {
        build_nbd(&self.nodes_db, &self.out_db, txn, range)
    }

    fn in_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::InCur<'txn>> {
        build_nbd(&self.nodes_db, &self.in_db, txn, range)
    }
}

/// Builds a neighborhood cursor over `db`'s `(owner, neighbor)` rows, plus
/// the full set of node ids in `range` (from `nodes_db`) so "all nodes" mode
/// (§4.3) can synthesize `degree=0` records for nodes with no entries in
/// `db`.
fn build_nbd<'txn>(nodes_db: &Database<Bytes, Bytes>, db: &Database<Bytes, Bytes>, txn: &'txn RoTxn, range: KeyRange) -> Result<SplitNbdCursor<'txn>> {
    let mut grouped: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    for r in db.iter(txn)? {
        let (k, _) = r?;
        let (owner, neighbor) = split_pair(k)?;
        if !range.contains(owner) {
            continue;
        }
        match grouped.last_mut() {
            Some((last_owner, entries)) if *last_owner == owner => entries.push(neighbor),
            _ => grouped.push((owner, vec![neighbor])),
        }
    }
    let with_edges: Vec<AdjList> = grouped
        .into_iter()
        .map(|(owner, mut neighbors)| {
            neighbors.sort_unstable();
            AdjList { node_id: owner, degree: neighbors.len() as u32, neighbors }
        })
        .collect();

    let mut all_ids: Vec<NodeId> = Vec::new();
    for r in nodes_db.iter(txn)? {
        let (k, _) = r?;
        let id = decode_id(k)?;
        if range.contains(id) {
            all_ids.push(id);
        }
    }
    all_ids.sort_unstable();

    Ok(SplitNbdCursor::new(with_edges, all_ids))
}

pub struct SplitNodeCursor<'txn> {
    items: Vec<NodeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> Cursor for SplitNodeCursor<'txn> {
    type Item = NodeRecord;

    fn next(&mut self) -> Result<Option<NodeRecord>> {
        let item = self.items.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }

    fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        self.items.retain(|n| range.contains(n.id));
        self.pos = 0;
        Ok(())
    }
}

impl<'txn> NodeCursor for SplitNodeCursor<'txn> {}

pub struct SplitEdgeCursor<'txn> {
    items: Vec<EdgeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> EdgeCursor for SplitEdgeCursor<'txn> {
    fn next(&mut self) -> Result<Option<EdgeRecord>> {
        let item = self.items.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }

    fn set_key_range(&mut self, range: PairRange) -> Result<()> {
        self.items.retain(|e| range.contains((e.src_id, e.dst_id)));
        self.pos = 0;
        Ok(())
    }
}

pub struct SplitNbdCursor<'txn> {
    with_edges: Vec<AdjList>,
    all_ids: Vec<NodeId>,
    items: Vec<AdjList>,
    pos: usize,
    all_nodes: bool,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> SplitNbdCursor<'txn> {
    fn new(with_edges: Vec<AdjList>, all_ids: Vec<NodeId>) -> Self {
        let items = with_edges.clone();
        Self { with_edges, all_ids, items, pos: 0, all_nodes: false, _marker: PhantomData }
    }

    fn materialize(&mut self) {
        self.items = if self.all_nodes {
            merge_all_nodes(&self.with_edges, &self.all_ids)
        } else {
            self.with_edges.clone()
        };
        self.pos = 0;
    }
}

/// Merges the (sorted, nonempty-only) adjacency list with the full sorted
/// node-id set, filling a `degree=0` placeholder for every id absent from
/// `with_edges`.
fn merge_all_nodes(with_edges: &[AdjList], all_ids: &[NodeId]) -> Vec<AdjList> {
    let mut result = Vec::with_capacity(all_ids.len());
    let mut i = 0;
    for &id in all_ids {
        if i < with_edges.len() && with_edges[i].node_id == id {
            result.push(with_edges[i].clone());
            i += 1;
        } else {
            result.push(AdjList { node_id: id, degree: 0, neighbors: Vec::new() });
        }
    }
    result
}

impl<'txn> Cursor for SplitNbdCursor<'txn> {
    type Item = AdjList;

    fn next(&mut self) -> Result<Option<AdjList>> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }

    fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        self.with_edges.retain(|a| range.contains(a.node_id));
        self.all_ids.retain(|id| range.contains(*id));
        self.materialize();
        Ok(())
    }
}

impl<'txn> OutNbdCursor for SplitNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
    }
}

impl<'txn> InNbdCursor for SplitNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
    }
}
