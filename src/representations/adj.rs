//! Adjacency-List representation (C4): a node table keyed by id, and two
//! DUP_SORT/DUP_FIXED adjacency tables (out, in) keyed by the owning node's
//! id with one duplicate value per neighbor — the same layout the teacher
//! uses for its own `out_edges_db`/`in_edges_db` (minus the edge label,
//! which this crate's edges don't carry).

use std::marker::PhantomData;

use heed3::types::Bytes;
use heed3::{Database, DatabaseFlags, Env, RoTxn, RwTxn};

use crate::codec::{decode_degrees, decode_id, encode_degrees, encode_id, NodeId};
use crate::cursor::{AdjList, Cursor, EdgeCursor, EdgeRecord, InNbdCursor, KeyRange, NodeCursor, NodeRecord, OutNbdCursor, PairRange};
use crate::metadata::Metadata;
use crate::representations::GraphRepresentation;
use crate::types::{GraphError, Result};

pub const DB_NODES: &str = "adj_nodes";
pub const DB_OUT_ADJ: &str = "adj_out";
pub const DB_IN_ADJ: &str = "adj_in";

const ADJ_ENTRY_WIDTH: usize = 8 + 4; // neighbor id (u64-padded BE) + weight (i32 ne)

fn pack_adj_entry(neighbor: NodeId, weight: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ADJ_ENTRY_WIDTH);
    buf.extend_from_slice(&encode_id(neighbor));
    buf.extend_from_slice(&weight.to_ne_bytes());
    buf
}

fn unpack_adj_entry(bytes: &[u8]) -> Result<(NodeId, i32)> {
    let id_width = std::mem::size_of::<NodeId>();
    if bytes.len() != id_width + 4 {
        return Err(GraphError::SliceLength);
    }
    let neighbor = decode_id(&bytes[..id_width])?;
    let weight = i32::from_ne_bytes(bytes[id_width..].try_into().unwrap());
    Ok((neighbor, weight))
}

/// Adjacency-List representation handle. Owns the three tables and a
/// reference to the shared metadata/counters.
pub struct AdjRepresentation {
    nodes_db: Database<Bytes, Bytes>,
    out_adj_db: Database<Bytes, Bytes>,
    in_adj_db: Database<Bytes, Bytes>,
    is_weighted: bool,
    is_directed: bool,
    read_optimize: bool,
}

impl AdjRepresentation {
    pub fn create(env: &Env, wtxn: &mut RwTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let nodes_db = env
            .database_options()
            .types::<Bytes, Bytes>()
            .name(DB_NODES)
            .create(wtxn)?;
        let out_adj_db = env
            .database_options()
            .types::<Bytes, Bytes>()
            .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
            .name(DB_OUT_ADJ)
            .create(wtxn)?;
        let in_adj_db = env
            .database_options()
            .types::<Bytes, Bytes>()
            .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
            .name(DB_IN_ADJ)
            .create(wtxn)?;
        Ok(Self {
            nodes_db,
            out_adj_db,
            in_adj_db,
            is_weighted,
            is_directed,
            read_optimize,
        })
    }

    pub fn open(env: &Env, rtxn: &RoTxn, is_weighted: bool, is_directed: bool, read_optimize: bool) -> Result<Self> {
        let nodes_db = env
            .open_database(rtxn, Some(DB_NODES))?
            .ok_or(GraphError::Other("adj_nodes table missing".into()))?;
        let out_adj_db = env
            .open_database(rtxn, Some(DB_OUT_ADJ))?
            .ok_or(GraphError::Other("adj_out table missing".into()))?;
        let in_adj_db = env
            .open_database(rtxn, Some(DB_IN_ADJ))?
            .ok_or(GraphError::Other("adj_in table missing".into()))?;
        Ok(Self {
            nodes_db,
            out_adj_db,
            in_adj_db,
            is_weighted,
            is_directed,
            read_optimize,
        })
    }

    fn write_degrees(&self, wtxn: &mut RwTxn, id: NodeId, in_degree: u32, out_degree: u32) -> Result<()> {
        self.nodes_db.put(wtxn, &encode_id(id), &encode_degrees(in_degree, out_degree))?;
        Ok(())
    }

    fn read_degrees(&self, txn: &RoTxn, id: NodeId) -> Result<(u32, u32)> {
        let bytes = self
            .nodes_db
            .get(txn, &encode_id(id))?
            .ok_or(GraphError::NodeNotFound)?;
        decode_degrees(bytes)
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

    /// Auto-vivifies `src`/`dst`, writes the out/in adjacency entries (and
    /// their mirror if undirected), and bumps degree counters. Grounded in
    /// the teacher's `drop_node` cascade symmetry: every write here has a
    /// matching removal in [`AdjRepresentation::delete_edge`].
    fn add_edge_inner(&self, wtxn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool> {
        self.ensure_node(wtxn, src, meta)?;
        self.ensure_node(wtxn, dst, meta)?;

        let w = weight.unwrap_or(0);
        let existed = self
            .out_adj_db
            .get_duplicates(wtxn, &encode_id(src))?
            .map(|mut it| it.any(|r| matches!(r, Ok((_, v)) if unpack_adj_entry(v).map(|(n, _)| n) == Ok(dst))))
            .unwrap_or(false);

        if existed {
            return Ok(false);
        }

        self.out_adj_db.put(wtxn, &encode_id(src), &pack_adj_entry(dst, w))?;
        self.in_adj_db.put(wtxn, &encode_id(dst), &pack_adj_entry(src, w))?;
        if self.read_optimize {
            self.bump_degrees(wtxn, src, 0, 1)?;
            self.bump_degrees(wtxn, dst, 1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.out_adj_db.put(wtxn, &encode_id(dst), &pack_adj_entry(src, w))?;
            self.in_adj_db.put(wtxn, &encode_id(src), &pack_adj_entry(dst, w))?;
            if self.read_optimize {
                self.bump_degrees(wtxn, dst, 0, 1)?;
                self.bump_degrees(wtxn, src, 1, 0)?;
            }
        }

        meta.on_edge_added();
        Ok(true)
    }

    fn delete_edge_inner(&self, wtxn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()> {
        let existed = self.remove_adj_entry(wtxn, &self.out_adj_db.clone(), src, dst)?;
        if !existed {
            // Absent edge on delete is tolerated as a no-op (§7/§8), not
            // propagated the way a `get_edge` miss is.
            return Ok(());
        }
        self.remove_adj_entry(wtxn, &self.in_adj_db.clone(), dst, src)?;
        if self.read_optimize {
            self.bump_degrees(wtxn, src, 0, -1)?;
            self.bump_degrees(wtxn, dst, -1, 0)?;
        }

        if !self.is_directed && src != dst {
            self.remove_adj_entry(wtxn, &self.out_adj_db.clone(), dst, src)?;
            self.remove_adj_entry(wtxn, &self.in_adj_db.clone(), src, dst)?;
            if self.read_optimize {
                self.bump_degrees(wtxn, dst, 0, -1)?;
                self.bump_degrees(wtxn, src, -1, 0)?;
            }
        }

        meta.on_edge_removed();
        Ok(())
    }

    fn remove_adj_entry(&self, wtxn: &mut RwTxn, db: &Database<Bytes, Bytes>, owner: NodeId, neighbor: NodeId) -> Result<bool> {
        let matching = db
            .get_duplicates(wtxn, &encode_id(owner))?
            .map(|it| {
                it.filter_map(|r| r.ok())
                    .find(|(_, v)| unpack_adj_entry(v).map(|(n, _)| n) == Ok(neighbor))
                    .map(|(_, v)| v.to_vec())
            })
            .flatten();

        match matching {
            Some(value) => {
                db.delete_one_duplicate(wtxn, &encode_id(owner), &value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cascades a node delete across both adjacency tables and the node
    /// row, tolerating an already-absent node (§4.8).
    fn delete_node_inner(&self, wtxn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        if self.nodes_db.get(wtxn, &encode_id(id))?.is_none() {
            return Ok(());
        }

        let out_neighbors: Vec<NodeId> = self
            .out_adj_db
            .get_duplicates(wtxn, &encode_id(id))?
            .map(|it| it.filter_map(|r| r.ok()).filter_map(|(_, v)| unpack_adj_entry(v).ok().map(|(n, _)| n)).collect())
            .unwrap_or_default();
        let in_neighbors: Vec<NodeId> = self
            .in_adj_db
            .get_duplicates(wtxn, &encode_id(id))?
            .map(|it| it.filter_map(|r| r.ok()).filter_map(|(_, v)| unpack_adj_entry(v).ok().map(|(n, _)| n)).collect())
            .unwrap_or_default();

        for dst in &out_neighbors {
            self.remove_adj_entry(wtxn, &self.in_adj_db.clone(), *dst, id)?;
            meta.on_edge_removed();
        }
        for src in &in_neighbors {
            self.remove_adj_entry(wtxn, &self.out_adj_db.clone(), *src, id)?;
            meta.on_edge_removed();
        }

        self.out_adj_db.delete(wtxn, &encode_id(id))?;
        self.in_adj_db.delete(wtxn, &encode_id(id))?;
        self.nodes_db.delete(wtxn, &encode_id(id))?;
        meta.on_node_removed();
        Ok(())
    }
}

fn adjlist_from_duplicates(owner: NodeId, entries: Vec<(NodeId, i32)>) -> AdjList {
    let mut neighbors: Vec<NodeId> = entries.iter().map(|(n, _)| *n).collect();
    neighbors.sort_unstable();
    AdjList {
        node_id: owner,
        degree: neighbors.len() as u32,
        neighbors,
    }
}

impl GraphRepresentation for AdjRepresentation {
    type NodeCur<'txn> = AdjNodeCursor<'txn>;
    type EdgeCur<'txn> = AdjEdgeCursor<'txn>;
    type OutCur<'txn> = AdjNbdCursor<'txn>;
    type InCur<'txn> = AdjNbdCursor<'txn>;

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
        self.delete_node_inner(txn, id, meta)
    }

    fn get_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<EdgeRecord> {
        let entries = self.out_adj_db.get_duplicates(txn, &encode_id(src))?;
        match entries {
            Some(it) => {
                for r in it {
                    let (_, v) = r?;
                    let (n, w) = unpack_adj_entry(v)?;
                    if n == dst {
                        let weight = if self.is_weighted { Some(w) } else { None };
                        return Ok(EdgeRecord { src_id: src, dst_id: dst, weight });
                    }
                }
                Err(GraphError::EdgeNotFound)
            }
            None => Err(GraphError::EdgeNotFound),
        }
    }

    fn has_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<bool> {
        Ok(self.get_edge(txn, src, dst).is_ok())
    }

    fn add_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool> {
        self.add_edge_inner(txn, src, dst, weight, meta)
    }

    fn delete_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()> {
        self.delete_edge_inner(txn, src, dst, meta)
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
        let entries: Vec<(NodeId, i32)> = match self.out_adj_db.get_duplicates(txn, &encode_id(id))? {
            Some(it) => it.filter_map(|r| r.ok()).filter_map(|(_, v)| unpack_adj_entry(v).ok()).collect(),
            None => Vec::new(),
        };
        Ok(adjlist_from_duplicates(id, entries))
    }

    fn get_in_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        let entries: Vec<(NodeId, i32)> = match self.in_adj_db.get_duplicates(txn, &encode_id(id))? {
            Some(it) => it.filter_map(|r| r.ok()).filter_map(|(_, v)| unpack_adj_entry(v).ok()).collect(),
            None => Vec::new(),
        };
        Ok(adjlist_from_duplicates(id, entries))
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
        Ok(AdjNodeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn edge_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: PairRange) -> Result<Self::EdgeCur<'txn>> {
        let mut items = Vec::new();
        for r in self.out_adj_db.iter(txn)? {
            let (k, v) = r?;
            let src = decode_id(k)?;
            let (dst, w) = unpack_adj_entry(v)?;
            if !range.contains((src, dst)) {
                continue;
            }
            let weight = if self.is_weighted { Some(w) } else { None };
            items.push(EdgeRecord { src_id: src, dst_id: dst, weight });
        }
        items.sort_by_key(|e| (e.src_id, e.dst_id));
        Ok(AdjEdgeCursor { items, pos: 0, _marker: PhantomData })
    }

    fn out_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::OutCur<'txn>> {
        build_nbd_cursor(&self.nodes_db, &self.out_adj_db, txn, range)
    }

    fn in_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<Self::InCur<'txn>> {
        build_nbd_cursor(&self.nodes_db, &self.in_adj_db, txn, range)
    }
}

/// Builds a neighborhood cursor over `db`'s duplicate-value adjacency rows,
/// plus the full set of node ids in `range` (from `nodes_db`) so "all nodes"
/// mode (§4.3) can synthesize `degree=0` records for nodes with no entries
/// in `db`.
fn build_nbd_cursor<'txn>(nodes_db: &Database<Bytes, Bytes>, db: &Database<Bytes, Bytes>, txn: &'txn RoTxn, range: KeyRange) -> Result<AdjNbdCursor<'txn>> {
    let mut grouped: Vec<(NodeId, Vec<(NodeId, i32)>)> = Vec::new();
    for r in db.iter(txn)? {
        let (k, v) = r?;
        let owner = decode_id(k)?;
        if !range.contains(owner) {
            continue;
        }
        let (neighbor, weight) = unpack_adj_entry(v)?;
        match grouped.last_mut() {
            Some((last_owner, entries)) if *last_owner == owner => entries.push((neighbor, weight)),
            _ => grouped.push((owner, vec![(neighbor, weight)])),
        }
    }
    grouped.sort_by_key(|(owner, _)| *owner);
    let with_edges: Vec<AdjList> = grouped.into_iter().map(|(owner, entries)| adjlist_from_duplicates(owner, entries)).collect();

    let mut all_ids: Vec<NodeId> = Vec::new();
    for r in nodes_db.iter(txn)? {
        let (k, _) = r?;
        let id = decode_id(k)?;
        if range.contains(id) {
            all_ids.push(id);
        }
    }
    all_ids.sort_unstable();

    Ok(AdjNbdCursor::new(with_edges, all_ids))
}

pub struct AdjNodeCursor<'txn> {
    items: Vec<NodeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> Cursor for AdjNodeCursor<'txn> {
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

impl<'txn> NodeCursor for AdjNodeCursor<'txn> {}

pub struct AdjEdgeCursor<'txn> {
    items: Vec<EdgeRecord>,
    pos: usize,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> EdgeCursor for AdjEdgeCursor<'txn> {
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

/// A neighborhood cursor. By default (`all_nodes = false`, per §4.3) only
/// nodes with at least one incident edge are emitted; `set_all_nodes(true)`
/// additionally synthesizes a `degree=0` record for every node in range that
/// has none.
pub struct AdjNbdCursor<'txn> {
    with_edges: Vec<AdjList>,
    all_ids: Vec<NodeId>,
    items: Vec<AdjList>,
    pos: usize,
    all_nodes: bool,
    _marker: PhantomData<&'txn ()>,
}

impl<'txn> AdjNbdCursor<'txn> {
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

impl<'txn> Cursor for AdjNbdCursor<'txn> {
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

impl<'txn> OutNbdCursor for AdjNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
    }
}

impl<'txn> InNbdCursor for AdjNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        self.all_nodes = all;
        self.materialize();
    }
}
