//! Unified Edge-Key representation (C5): node and edge rows share one
//! table keyed `(a, b)`. A node row is keyed `(id+1, 0)`; an edge row is
//! keyed `(src+1, dst+1)`. The `+1` offset (`MAKE_EKEY`/`OG_KEY` in the
//! original) keeps `0` free as the second key component exclusively for
//! node rows, so a single ordered scan of the table can tell a node row
//! from an edge row by its key shape alone.
//!
//! A secondary index, `(dst+1, src+1) -> ()`, supports in-neighborhood
//! lookups without a full table scan, mirroring the teacher's
//! `secondary_indices` DUP_SORT pattern.

use std::marker::PhantomData;

use heed3::types::Bytes;
use heed3::{Database, DatabaseFlags, Env, RoTxn, RwTxn};

use crate::codec::{decode_id, encode_degrees, decode_degrees, encode_id, NodeId};
use crate::cursor::{AdjList, Cursor, EdgeCursor, EdgeRecord, InNbdCursor, KeyRange, NodeCursor, NodeRecord, OutNbdCursor, PairRange};
use crate::metadata::Metadata;
use crate::representations::GraphRepresentation;
use crate::types::{GraphError, Result};

pub const DB_MAIN: &str = "ekey_main";
pub const DB_DST_INDEX: &str = "ekey_dst_idx";

const OFFSET_NODE_DST: NodeId = 0;

fn off(id: NodeId) -> NodeId {
    id + 1
}

fn unoff(id: NodeId) -> NodeId {
    id - 1
}

fn node_key(id: NodeId) -> Vec<u8> {
    let mut k = Vec::with_capacity(16);
    k.extend_from_slice(&encode_id(off(id)));
    k.extend_from_slice(&encode_id(OFFSET_NODE_DST));
    k
}

fn edge_key(src: NodeId, dst: NodeId) -> Vec<u8> {
    let mut k = Vec::with_capacity(16);
    k.extend_from_slice(&encode_id(off(src)));
    k.extend_from_slice(&encode_id(off(dst)));
    k
}

fn dst_index_key(dst: NodeId, src: NodeId) -> Vec<u8> {
    let mut k = Vec::with_capacity(16);
    k.extend_from_slice(&encode_id(off(dst)));
    k.extend_from_slice(&encode_id(off(src)));
    k
}

fn is_node_row(key: &[u8]) -> Result<bool> {
    let id_width = std::mem::size_of::<NodeId>();
    if key.len() != id_width * 2 {
        return Err(GraphError::SliceLength);
    }
    Ok(decode_id(&key[id_width..])? == OFFSET_NODE_DST)
}

fn split_key(key: &[u8]) -> Result<(NodeId, NodeId)> {
    let id_width = std::mem::size_of::<NodeId>();
    Ok((decode_id(&key[..id_width])?, decode_id(&key[id_width..])?))
}

pub struct EKeyRepresentation {
    main_db: Database<Bytes, Bytes>,
    dst_idx_db: Database<Bytes, Bytes>,
    is_weighted: bool,
    is_directed: bool,
    read_optimize: bool,
}

impl EKeyRepresentation {
    pub fn create(env: &Env, wtxn: &mut RwTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let main_db = env
            .database_options()
            .types::<Bytes, Bytes>()
            .name(DB_MAIN)
            .create(wtxn)?;
        let dst_idx_db = env
            .database_options()
            .types::<Bytes, Bytes>()
            .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
            .name(DB_DST_INDEX)
            .create(wtxn)?;
        Ok(Self { main_db, dst_idx_db, is_weighted, is_directed, read_optimize })
    }

    pub fn open(env: &Env, rtxn: &RoTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let main_db = env
            .open_database(rtxn, Some(DB_MAIN))?
            .ok_or(GraphError::Other("ekey_main table missing".into()))?;
        let dst_idx_db = env
            .open_database(rtxn, Some(DB_DST_INDEX))?
            .ok_or(GraphError::Other("ekey_dst_idx table missing".into()))?;
        Ok(Self { main_db, dst_idx_db, is_weighted, is_directed, read_optimize })
    }

    fn read_node_degrees(&self, txn: &RoTxn, id: NodeId) -> Result<(u32, u32)> {
        let bytes = self.main_db.get(txn, &node_key(id))?.ok_or(GraphError::NodeNotFound)?;
        decode_degrees(bytes)
    }

    fn write_node_degrees(&self, wtxn: &mut RwTxn, id: NodeId, in_degree: u32, out_degree: u32) -> Result<()> {
        self.main_db.put(wtxn, &node_key(id), &encode_degrees(in_degree, out_degree))?;
        Ok(())
    }

    fn bump_node_degrees(&self, wtxn: &mut RwTxn, id: NodeId, d_in: i64, d_out: i64) -> Result<()> {
        let (in_degree, out_degree) = self.read_node_degrees(wtxn, id)?;
        let in_degree = (in_degree as i64 + d_in).max(0) as u32;
        let out_degree = (out_degree as i64 + d_out).max(0) as u32;
        self.write_node_degrees(wtxn, id, in_degree, out_degree)
    }

    fn ensure_node(&self, wtxn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        if self.main_db.get(wtxn, &node_key(id))?.is_none() {
            self.write_node_degrees(wtxn, id, 0, 0)?;
            meta.on_node_added(id);
        }
        Ok(())
    }

    fn write_edge_row(&self, wtxn: &mut RwTxn, src: NodeId, dst: NodeId, weight: i32) -> Result<()> {
        self.main_db.put(wtxn, &edge_key(src, dst), &weight.to_ne_bytes())?;
        self.dst_idx_db.put(wtxn, &dst_index_key(dst, src), &[])?;
        Ok(())
    }

    fn remove_edge_row(&self, wtxn: &mut RwTxn, src: NodeId, dst: NodeId) -> Result<bool> {
        let existed = self.main_db.delete(wtxn, &edge_key(src, dst))?;
        if existed {
            self.dst_idx_db.delete_one_duplicate(wtxn, &dst_index_key(dst, src), &[])?;
        }
        Ok(existed)
    }
}

impl GraphRepresentation for EKeyRepresentation {
    type NodeCur<'txn> = EKeyNodeCursor<'txn>;
    type EdgeCur<'txn> = EKeyEdgeCursor<'txn>;
    type OutCur<'txn> = EKeyNbdCursor<'txn>;
    type InCur<'txn> = EKeyNbdCursor<'txn>;

    fn get_node(&self, txn: &RoTxn, id: NodeId) -> Result<NodeRecord> {
        let (in_degree, out_degree) = self.read_node_degrees(txn, id)?;
        Ok(NodeRecord { id, in_degree, out_degree })
    }

    fn has_node(&self, txn: &RoTxn, id: NodeId) -> Result<bool> {
        Ok(self.main_db.get(txn, &node_key(id))?.is_some())
    }

    fn add_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<bool> {
        if self.main_db.get(txn, &node_key(id))?.is_some() {
            return Ok(false);
        }
        self.write_node_degrees(txn, id, 0, 0)?;
        meta.on_node_added(id);
        Ok(true)
    }

    fn delete_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        if self.main_db.get(txn, &node_key(id))?.is_none() {
            // Absent node on delete is tolerated as a no-op (§7/§8).
            return Ok(());
        }

        let out_neighbors: Vec<NodeId> = self
            .main_db
            .prefix_iter(txn, &encode_id(off(id)))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_key(k).ok())
            .filter(|(_, dst)| *dst != OFFSET_NODE_DST)
            .map(|(_, dst)| unoff(dst))
            .collect();

        let in_neighbors: Vec<NodeId> = self
            .dst_idx_db
            .get_duplicates(txn, &encode_id(off(id)))?
            .map(|it| it.filter_map(|r| r.ok()).filter_map(|(_, v)| decode_id(v).ok()).map(unoff).collect())
            .unwrap_or_default();

        for dst in &out_neighbors {
            self.remove_edge_row(txn, id, *dst)?;
            if self.read_optimize {
                self.bump_node_degrees(txn, *dst, -1, 0)?;
            }
            meta.on_edge_removed();
        }
        for src in &in_neighbors {
            self.remove_edge_row(txn, *src, id)?;
            if self.read_optimize {
                self.bump_node_degrees(txn, *src, 0, -1)?;
            }
            meta.on_edge_removed();
        }

        self.main_db.delete(txn, &node_key(id))?;
        meta.on_node_removed();
        Ok(())
    }

    fn get_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<EdgeRecord> {
        let bytes = self.main_db.get(txn, &edge_key(src, dst))?.ok_or(GraphError::EdgeNotFound)?;
        let w = i32::from_ne_bytes(bytes.try_into().map_err(|_| GraphError::SliceLength)?);
        let weight = if self.is_weighted { Some(w) } else { None };
        Ok(EdgeRecord { src_id: src, dst_id: dst, weight })
    }

    fn has_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<bool> {
        Ok(self.main_db.get(txn, &edge_key(src, dst))?.is_some())
    }

    fn add_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool> {
        self.ensure_node(txn, src, meta)?;
        self.ensure_node(txn, dst, meta)?;

        if self.main_db.get(txn, &edge_key(src, dst))?.is_some() {
            return Ok(false);
        }

        let w = weight.unwrap_or(0);
        self.write_edge_row(txn, src, dst, w)?;
        if self.read_optimize {
            self.bump_node_degrees(txn, src, 0, 1)?;
            self.bump_node_degrees(txn, dst, 1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.write_edge_row(txn, dst, src, w)?;
            if self.read_optimize {
                self.bump_node_degrees(txn, dst, 0, 1)?;
                self.bump_node_degrees(txn, src, 1, 0)?;
            }
        }

        meta.on_edge_added();
        Ok(true)
    }

    fn delete_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()> {
        let existed = self.remove_edge_row(txn, src, dst)?;
        if !existed {
            // Absent edge on delete is tolerated as a no-op (§7/§8).
            return Ok(());
        }
        if self.read_optimize {
            self.bump_node_degrees(txn, src, 0, -1)?;
            self.bump_node_degrees(txn, dst, -1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.remove_edge_row(txn, dst, src)?;
            if self.read_optimize {
                self.bump_node_degrees(txn, dst, 0, -1)?;
                self.bump_node_degrees(txn, src, -1, 0)?;
            }
        }

        meta.on_edge_removed();
        Ok(())
    }

    fn get_out_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        if self.read_optimize {
            Ok(self.read_node_degrees(txn, id)?.1)
        } else {
            Ok(self.get_out_nodes(txn, id)?.degree)
        }
    }

    fn get_in_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        if self.read_optimize {
            Ok(self.read_node_degrees(txn, id)?.0)
        } else {
            Ok(self.get_in_nodes(txn, id)?.degree)
        }
    }

    fn get_out_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        let mut neighbors: Vec<NodeId> = self
            .main_db
            .prefix_iter(txn, &encode_id(off(id)))?
            .filter_map(|r| r.ok())
            .filter_map(|(k, _)| split_key(k).ok())
            .filter(|(_, dst)| *dst != OFFSET_NODE_DST)
            .map(|(_, dst)| unoff(dst))
            .collect();
        neighbors.sort_unstable();
        Ok(AdjList { node_id: id, degree: neighbors.len() as u32, neighbors })
    }

    fn get_in_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        let mut neighbors: Vec<NodeId> = match self.dst_idx_db.get_duplicates(txn, &encode_id(off(id)))? {
            Some(it) => it.filter_map(|r| r.ok()).filter_map(|(_, v)| decode_id(v).ok()).map(unoff).collect(),
            None => Vec::new(),
        };
        neighbors.sort_unstable();
        Ok(AdjList { node_id: id, degree: neighbors.len() as u32, neighbors })
    }

    fn node_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::NodeCur<'txn>> {
        let mut items = Vec::new();
        for r in self.main_db.iter(txn)? {
            let (k, v) = r?;
            if !is_node_row(k)? {
                continue;
            }
            let (off_id, _) = split_key(k)?;
            let id = unoff(off_id);
            if range.contains(id) {
                let (in_degree, out_degree) = decode_degrees(v)?;
                items.push(NodeRecord { id, in_degree, out_degree });
            }
        }
        items.sort_by_key(|n| n.id);
        Ok(EKeyNodeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn edge_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: PairRange) -> Result<Self::EdgeCur<'txn>> {
        let mut items = Vec::new();
        for r in self.main_db.iter(txn)? {
            let (k, v) = r?;
            if is_node_row(k)? {
                continue;
            }
            let (off_src, off_dst) = split_key(k)?;
            let src = unoff(off_src);
            let dst = unoff(off_dst);
            if !range.contains((src, dst)) {
                continue;
            }
            let w = i32::from_ne_bytes(v.try_into().map_err(|_| GraphError::SliceLength)?);
            let weight = if self.is_weighted { Some(w) } else { None };
            items.push(EdgeRecord { src_id: src, dst_id: dst, weight });
        }
        items.sort_by_key(|e| (e.src_id, e.dst_id));
        Ok(EKeyEdgeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn out_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::OutCur<'txn>> {
        let mut grouped: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for r in self.main_db.iter(txn)? {
            let (k, _) = r?;
            if is_node_row(k)? {
                continue;
            }
            let (off_src, off_dst) = split_key(k)?;
            let src = unoff(off_src);
            if !range.contains(src) {
                continue;
            }
            let dst = unoff(off_dst);
            match grouped.last_mut() {
                Some((owner, entries)) if *owner == src => entries.push(dst),
                _ => grouped.push((src, vec![dst])),
            }
        }
        let with_edges = grouped
            .into_iter()
            .map(|(owner, mut neighbors)| {
                neighbors.sort_unstable();
                AdjList { node_id: owner, degree: neighbors.len() as u32, neighbors }
            })
            .collect();
        Ok(EKeyNbdCursor::new(with_edges, self.all_node_ids(txn, range)?))
    }

    fn in_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::InCur<'txn>> {
        let mut grouped: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for r in self.dst_idx_db.iter(txn)? {
            let (k, v) = r?;
            let dst = unoff(decode_id(&k[..std::mem::size_of::<NodeId>()])?);
            if !range.contains(dst) {
                continue;
            }
            let src = unoff(decode_id(v)?);
            match grouped.last_mut() {
                Some((owner, entries)) if *owner == dst => entries.push(src),
                _ => grouped.push((dst, vec![src])),
            }
        }
        let with_edges = grouped
            .into_iter()
            .map(|(owner, mut neighbors)| {
                neighbors.sort_unstable();
                AdjList { node_id: owner, degree: neighbors.len() as u32, neighbors }
            })
            .collect();
        Ok(EKeyNbdCursor::new(with_edges, self.all_node_ids(txn, range)?))
    }
}

impl EKeyRepresentation {
    /// Every node id in `range`, ascending. There is no separate node table
    /// in this representation (C5): node rows live in `main_db` at
    /// `(id+1, 0)`, distinguished from edge rows by [`is_node_row`].
    fn all_node_ids(&self, txn: &RoTxn, range: KeyRange) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        for r in self.main_db.iter(txn)? {
            let (k, _) = r?;
            if !is_node_row(k)? {
                continue;
            }
            let (off_id, _) = split_key(k)?;
            let id = unoff(off_id);
            if range.contains(id) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

pub struct EKeyNodeCursor<'txn> {
    items: Vec<NodeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> Cursor for EKeyNodeCursor<'txn> {
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

impl<'txn> NodeCursor for EKeyNodeCursor<'txn> {}

pub struct EKeyEdgeCursor<'txn> {
    items: Vec<EdgeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> EdgeCursor for EKeyEdgeCursor<'txn> {
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

pub struct EKeyNbdCursor<'txn> {
    with_edges: Vec<AdjList>,
    all_ids: Vec<NodeId>,
    items: Vec<AdjList>,
    pos: usize,
    all_nodes: bool,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> EKeyNbdCursor<'txn> {
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

impl<'txn> Cursor for EKeyNbdCursor<'txn> {
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

impl<'txn> OutNbdCursor for EKeyNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
    }
}

impl<'txn> InNbdCursor for EKeyNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
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
