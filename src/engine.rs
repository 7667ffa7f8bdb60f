//! Graph engine (C7): owns the shared LMDB environment and metadata table,
//! hands out representation handles, and plans per-thread partitions over
//! the node/edge tables.
//!
//! Mirrors the original's `GraphEngine`/`GraphBase` split: `GraphEngine`
//! manages the connection, checkpoints, and thread-offset bookkeeping;
//! `GraphHandle` is the counterpart to `GraphBase*` — the thing callers
//! actually run node/edge operations through. Where the original's
//! `GraphBase*` is a runtime-polymorphic pointer, `GraphHandle` is a closed
//! enum over the three concrete representations: `GraphRepresentation`'s
//! cursor associated types are not object-safe, so a `dyn` handle is not an
//! option here. `GraphHandle` is cheap to clone (each representation is a
//! handful of `heed3::Database` tokens behind an `Arc`) and carries no
//! transaction state of its own — every thread opens its own `RoTxn`/`RwTxn`
//! against the shared `Env` and calls methods on its own clone of the
//! handle, which is what "one handle per thread, never shared" means here.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use heed3::{CompactionOption, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::{info, warn};

use crate::codec::{NodeId, MAX_SENTINEL};
use crate::config::{GraphOpts, Representation as RepKind};
use crate::cursor::{AdjList, Cursor, EdgeCursor, EdgeRecord, InNbdCursor, KeyRange, NodeCursor, NodeRecord, OutNbdCursor, PairRange};
use crate::metadata::Metadata;
use crate::representations::adj::{AdjEdgeCursor, AdjNbdCursor, AdjNodeCursor, AdjRepresentation};
use crate::representations::ekey::{EKeyEdgeCursor, EKeyNbdCursor, EKeyNodeCursor, EKeyRepresentation};
use crate::representations::split_ekey::{SplitEKeyRepresentation, SplitEdgeCursor, SplitNbdCursor, SplitNodeCursor};
use crate::representations::GraphRepresentation;
use crate::types::{GraphError, Result};

/// A handle to one of the three physical representations, bound to a
/// specific `GraphEngine`'s tables. Construct one via
/// [`GraphEngine::create_graph_handle`].
#[derive(Clone)]
pub enum GraphHandle {
    Adj(Arc<AdjRepresentation>),
    EKey(Arc<EKeyRepresentation>),
    SplitEKey(Arc<SplitEKeyRepresentation>),
}

/// Node-table cursor across any representation.
pub enum EngineNodeCursor<'txn> {
    Adj(AdjNodeCursor<'txn>),
    EKey(EKeyNodeCursor<'txn>),
    SplitEKey(SplitNodeCursor<'txn>),
}

/// Edge-table cursor across any representation.
pub enum EngineEdgeCursor<'txn> {
    Adj(AdjEdgeCursor<'txn>),
    EKey(EKeyEdgeCursor<'txn>),
    SplitEKey(SplitEdgeCursor<'txn>),
}

/// Neighborhood cursor (out or in) across any representation.
pub enum EngineNbdCursor<'txn> {
    Adj(AdjNbdCursor<'txn>),
    EKey(EKeyNbdCursor<'txn>),
    SplitEKey(SplitNbdCursor<'txn>),
}

macro_rules! dispatch {
    ($self:expr, $cur:ident => $body:expr) => {
        match $self {
            GraphHandle::Adj($cur) => $body,
            GraphHandle::EKey($cur) => $body,
            GraphHandle::SplitEKey($cur) => $body,
        }
    };
}

impl GraphHandle {
    pub fn get_node(&self, txn: &RoTxn, id: NodeId) -> Result<NodeRecord> {
        dispatch!(self, r => r.get_node(txn, id))
    }

    pub fn has_node(&self, txn: &RoTxn, id: NodeId) -> Result<bool> {
        dispatch!(self, r => r.has_node(txn, id))
    }

    pub fn add_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<bool> {
        dispatch!(self, r => r.add_node(txn, id, meta))
    }

    pub fn delete_node(&self, txn: &mut RwTxn, id: NodeId, meta: &Metadata) -> Result<()> {
        dispatch!(self, r => r.delete_node(txn, id, meta))
    }

    pub fn get_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<EdgeRecord> {
        dispatch!(self, r => r.get_edge(txn, src, dst))
    }

    pub fn has_edge(&self, txn: &RoTxn, src: NodeId, dst: NodeId) -> Result<bool> {
        dispatch!(self, r => r.has_edge(txn, src, dst))
    }

    pub fn add_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, weight: Option<i32>, meta: &Metadata) -> Result<bool> {
        dispatch!(self, r => r.add_edge(txn, src, dst, weight, meta))
    }

    pub fn delete_edge(&self, txn: &mut RwTxn, src: NodeId, dst: NodeId, meta: &Metadata) -> Result<()> {
        dispatch!(self, r => r.delete_edge(txn, src, dst, meta))
    }

    pub fn get_out_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        dispatch!(self, r => r.get_out_degree(txn, id))
    }

    pub fn get_in_degree(&self, txn: &RoTxn, id: NodeId) -> Result<u32> {
        dispatch!(self, r => r.get_in_degree(txn, id))
    }

    pub fn get_out_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        dispatch!(self, r => r.get_out_nodes(txn, id))
    }

    pub fn get_in_nodes(&self, txn: &RoTxn, id: NodeId) -> Result<AdjList> {
        dispatch!(self, r => r.get_in_nodes(txn, id))
    }

    pub fn node_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<EngineNodeCursor<'txn>> {
        Ok(match self {
            GraphHandle::Adj(r) => EngineNodeCursor::Adj(r.node_cursor(txn, range)?),
            GraphHandle::EKey(r) => EngineNodeCursor::EKey(r.node_cursor(txn, range)?),
            GraphHandle::SplitEKey(r) => EngineNodeCursor::SplitEKey(r.node_cursor(txn, range)?),
        })
    }

    pub fn edge_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: PairRange) -> Result<EngineEdgeCursor<'txn>> {
        Ok(match self {
            GraphHandle::Adj(r) => EngineEdgeCursor::Adj(r.edge_cursor(txn, range)?),
            GraphHandle::EKey(r) => EngineEdgeCursor::EKey(r.edge_cursor(txn, range)?),
            GraphHandle::SplitEKey(r) => EngineEdgeCursor::SplitEKey(r.edge_cursor(txn, range)?),
        })
    }

    pub fn out_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<EngineNbdCursor<'txn>> {
        Ok(match self {
            GraphHandle::Adj(r) => EngineNbdCursor::Adj(r.out_nbd_cursor(txn, range)?),
            GraphHandle::EKey(r) => EngineNbdCursor::EKey(r.out_nbd_cursor(txn, range)?),
            GraphHandle::SplitEKey(r) => EngineNbdCursor::SplitEKey(r.out_nbd_cursor(txn, range)?),
        })
    }

    pub fn in_nbd_cursor<'txn>(&'txn self, txn: &'txn RoTxn, range: KeyRange) -> Result<EngineNbdCursor<'txn>> {
        Ok(match self {
            GraphHandle::Adj(r) => EngineNbdCursor::Adj(r.in_nbd_cursor(txn, range)?),
            GraphHandle::EKey(r) => EngineNbdCursor::EKey(r.in_nbd_cursor(txn, range)?),
            GraphHandle::SplitEKey(r) => EngineNbdCursor::SplitEKey(r.in_nbd_cursor(txn, range)?),
        })
    }
}

impl<'txn> Cursor for EngineNodeCursor<'txn> {
    type Item = NodeRecord;

    fn next(&mut self) -> Result<Option<NodeRecord>> {
        match self {
            EngineNodeCursor::Adj(c) => c.next(),
            EngineNodeCursor::EKey(c) => c.next(),
            EngineNodeCursor::SplitEKey(c) => c.next(),
        }
    }

    fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        match self {
            EngineNodeCursor::Adj(c) => c.set_key_range(range),
            EngineNodeCursor::EKey(c) => c.set_key_range(range),
            EngineNodeCursor::SplitEKey(c) => c.set_key_range(range),
        }
    }
}

impl<'txn> NodeCursor for EngineNodeCursor<'txn> {}

impl<'txn> EdgeCursor for EngineEdgeCursor<'txn> {
    fn next(&mut self) -> Result<Option<EdgeRecord>> {
        match self {
            EngineEdgeCursor::Adj(c) => EdgeCursor::next(c),
            EngineEdgeCursor::EKey(c) => EdgeCursor::next(c),
            EngineEdgeCursor::SplitEKey(c) => EdgeCursor::next(c),
        }
    }

    fn set_key_range(&mut self, range: PairRange) -> Result<()> {
        match self {
            EngineEdgeCursor::Adj(c) => c.set_key_range(range),
            EngineEdgeCursor::EKey(c) => c.set_key_range(range),
            EngineEdgeCursor::SplitEKey(c) => c.set_key_range(range),
        }
    }
}

impl<'txn> Cursor for EngineNbdCursor<'txn> {
    type Item = AdjList;

    fn next(&mut self) -> Result<Option<AdjList>> {
        match self {
            EngineNbdCursor::Adj(c) => c.next(),
            EngineNbdCursor::EKey(c) => c.next(),
            EngineNbdCursor::SplitEKey(c) => c.next(),
        }
    }

    fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        match self {
            EngineNbdCursor::Adj(c) => c.set_key_range(range),
            EngineNbdCursor::EKey(c) => c.set_key_range(range),
            EngineNbdCursor::SplitEKey(c) => c.set_key_range(range),
        }
    }
}

impl<'txn> OutNbdCursor for EngineNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        match self {
            EngineNbdCursor::Adj(c) => OutNbdCursor::set_all_nodes(c, all),
            EngineNbdCursor::EKey(c) => OutNbdCursor::set_all_nodes(c, all),
            EngineNbdCursor::SplitEKey(c) => OutNbdCursor::set_all_nodes(c, all),
        }
    }
}

impl<'txn> InNbdCursor for EngineNbdCursor<'txn> {
    fn set_all_nodes(&mut self, all: bool) {
        match self {
            EngineNbdCursor::Adj(c) => InNbdCursor::set_all_nodes(c, all),
            EngineNbdCursor::EKey(c) => InNbdCursor::set_all_nodes(c, all),
            EngineNbdCursor::SplitEKey(c) => InNbdCursor::set_all_nodes(c, all),
        }
    }
}

fn open_env(opts: &GraphOpts) -> Result<Env> {
    fs::create_dir_all(&opts.db_dir)?;
    let map_size = opts.db_max_size_gb.max(1) * 1024 * 1024 * 1024;
    let env = unsafe {
        EnvOpenOptions::new()
            .map_size(map_size)
            .max_dbs(16)
            .max_readers(opts.num_threads.max(1) as u32 + 8)
            .open(&opts.db_dir)?
    };
    Ok(env)
}

/// Owns the shared LMDB environment for one graph directory: metadata,
/// the representation tables, checkpoints, and the thread-offset
/// bookkeeping used to give each worker thread a disjoint slice of the
/// node/edge tables to operate over.
pub struct GraphEngine {
    env: Env,
    opts: GraphOpts,
    metadata: Arc<Metadata>,
    handle: GraphHandle,
    node_ranges: Mutex<Vec<NodeId>>,
    edge_ranges: Mutex<Vec<(NodeId, NodeId)>>,
    last_checkpoint: Mutex<Option<String>>,
}

impl GraphEngine {
    /// Dispatches to [`GraphEngine::create_new_graph`] or
    /// [`GraphEngine::open_connection`] based on `opts.create_new`, mirroring
    /// the original constructor's branch.
    pub fn open(opts: GraphOpts) -> Result<Self> {
        if opts.create_new {
            Self::create_new_graph(opts)
        } else {
            Self::open_connection(opts)
        }
    }

    /// Creates a fresh graph directory: the LMDB environment, the metadata
    /// table, and the tables for `opts.representation`. Also writes
    /// `opts` out as the directory's persisted config file.
    pub fn create_new_graph(opts: GraphOpts) -> Result<Self> {
        let env = open_env(&opts)?;
        let mut wtxn = env.write_txn()?;

        let metadata = Metadata::create(
            &env,
            &mut wtxn,
            &opts.db_name,
            &opts.db_dir,
            opts.is_weighted,
            opts.read_optimize,
            opts.is_directed,
            &opts.representation.to_string(),
        )?;

        let handle = match opts.representation {
            RepKind::Adj => GraphHandle::Adj(Arc::new(AdjRepresentation::create(
                &env,
                &mut wtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
            RepKind::EKey => GraphHandle::EKey(Arc::new(EKeyRepresentation::create(
                &env,
                &mut wtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
            RepKind::SplitEKey => GraphHandle::SplitEKey(Arc::new(SplitEKeyRepresentation::create(
                &env,
                &mut wtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
        };

        wtxn.commit()?;
        opts.to_file(Path::new(&opts.db_dir).join(GraphOpts::config_file_name()))?;
        info!(db = %opts.db_name, representation = %opts.representation, "created new graph");

        Ok(Self {
            env,
            opts,
            metadata: Arc::new(metadata),
            handle,
            node_ranges: Mutex::new(Vec::new()),
            edge_ranges: Mutex::new(Vec::new()),
            last_checkpoint: Mutex::new(None),
        })
    }

    /// Opens an existing graph directory, reading back metadata counters
    /// and reopening `opts.representation`'s tables.
    pub fn open_connection(opts: GraphOpts) -> Result<Self> {
        let env = open_env(&opts)?;
        let rtxn = env.read_txn()?;

        let metadata = Metadata::open(
            &env,
            &rtxn,
            &opts.db_name,
            &opts.db_dir,
            opts.is_weighted,
            opts.read_optimize,
            opts.is_directed,
            &opts.representation.to_string(),
        )?;

        let handle = match opts.representation {
            RepKind::Adj => GraphHandle::Adj(Arc::new(AdjRepresentation::open(
                &env,
                &rtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
            RepKind::EKey => GraphHandle::EKey(Arc::new(EKeyRepresentation::open(
                &env,
                &rtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
            RepKind::SplitEKey => GraphHandle::SplitEKey(Arc::new(SplitEKeyRepresentation::open(
                &env,
                &rtxn,
                opts.is_weighted,
                opts.is_directed,
                opts.read_optimize,
            )?)),
        };

        drop(rtxn);
        info!(db = %opts.db_name, representation = %opts.representation, "opened existing graph");

        Ok(Self {
            env,
            opts,
            metadata: Arc::new(metadata),
            handle,
            node_ranges: Mutex::new(Vec::new()),
            edge_ranges: Mutex::new(Vec::new()),
            last_checkpoint: Mutex::new(None),
        })
    }

    /// The underlying environment, for callers that need to open their own
    /// transactions (each thread should open its own rather than share one).
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn opts(&self) -> &GraphOpts {
        &self.opts
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Hands out a handle to the graph's representation. `read_only`
    /// requests a checkpoint first, so the handle's caller is guaranteed to
    /// see a point-in-time-consistent view — LMDB's MVCC snapshots already
    /// give every reader that isolation without a checkpoint, so this is
    /// mainly useful to force metadata counters to disk before a consumer
    /// (e.g. an export job) starts reading.
    pub fn create_graph_handle(&self, read_only: bool) -> Result<GraphHandle> {
        if read_only {
            self.make_checkpoint()?;
        }
        Ok(self.handle.clone())
    }

    /// Writes current metadata counters through to the metadata table.
    pub fn force_metadata_sync(&self) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.metadata.sync(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Takes a full hot backup of the environment into
    /// `<db_dir>/checkpoints/<timestamp>/`, the LMDB stand-in for the
    /// original's `session->checkpoint()` (LMDB has no named in-place
    /// checkpoint; a consistent point-in-time copy is the closest
    /// equivalent). Syncs metadata first so the backup's counters are
    /// current.
    pub fn make_checkpoint(&self) -> Result<String> {
        self.force_metadata_sync()?;

        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|_| GraphError::Other("system clock before unix epoch".into()))?;
        let name = format!("{}", now.as_secs());
        let dest = Path::new(&self.opts.db_dir).join("checkpoints").join(&name);
        fs::create_dir_all(&dest)?;

        self.env.copy_to_path(dest.join("data.mdb"), CompactionOption::Disabled)?;
        *self.last_checkpoint.lock().unwrap() = Some(name.clone());
        info!(checkpoint = %name, "created checkpoint");
        Ok(name)
    }

    pub fn get_last_checkpoint(&self) -> Option<String> {
        self.last_checkpoint.lock().unwrap().clone()
    }

    /// Scans the node table (and, if `make_edge`, the edge table) once to
    /// divide it into `opts.num_threads` roughly-equal, contiguous ranges.
    /// Must be re-run after the table's size has changed materially; stale
    /// ranges are not detected automatically.
    pub fn calculate_thread_offsets(&self, make_edge: bool) -> Result<()> {
        let rtxn = self.env.read_txn()?;
        self.compute_node_ranges(&rtxn)?;
        if make_edge {
            self.compute_edge_ranges(&rtxn)?;
        }
        Ok(())
    }

    fn compute_node_ranges(&self, txn: &RoTxn) -> Result<()> {
        let num_nodes = self.metadata.num_nodes();
        let mut ranges = Vec::new();

        if num_nodes > 0 {
            let thread_max = self.opts.num_threads.max(1) as u64;
            let per_partition = num_nodes / thread_max + u64::from(num_nodes % thread_max != 0);

            let mut cursor = self.handle.node_cursor(txn, KeyRange::ALL)?;
            let mut i: u64 = 0;
            while let Some(rec) = cursor.next()? {
                if i % per_partition == 0 {
                    ranges.push(rec.id);
                }
                if i == num_nodes - 1 {
                    ranges.push(rec.id);
                }
                i += 1;
            }

            if i != num_nodes {
                return Err(GraphError::InvariantViolation(format!(
                    "node count drifted during partitioning: metadata said {num_nodes}, scan saw {i}"
                )));
            }
        }

        *self.node_ranges.lock().unwrap() = ranges;
        Ok(())
    }

    fn compute_edge_ranges(&self, txn: &RoTxn) -> Result<()> {
        let num_edges = self.metadata.num_edges();
        let mut ranges = Vec::new();

        if num_edges > 0 {
            let thread_max = self.opts.num_threads.max(1) as u64;
            let per_partition = num_edges / thread_max + u64::from(num_edges % thread_max != 0);

            let mut cursor = self.handle.edge_cursor(txn, PairRange::ALL)?;
            let mut i: u64 = 0;
            while let Some(rec) = cursor.next()? {
                if i % per_partition == 0 {
                    ranges.push((rec.src_id, rec.dst_id));
                }
                if i == num_edges - 1 {
                    ranges.push((rec.src_id, rec.dst_id));
                }
                i += 1;
            }

            if i != num_edges {
                return Err(GraphError::InvariantViolation(format!(
                    "edge count drifted during partitioning: metadata said {num_edges}, scan saw {i}"
                )));
            }
        }

        *self.edge_ranges.lock().unwrap() = ranges;
        Ok(())
    }

    /// The `thread_id`-th contiguous slice of the node table, as computed by
    /// the last [`GraphEngine::calculate_thread_offsets`] call.
    pub fn get_key_range(&self, thread_id: usize) -> Result<KeyRange> {
        let ranges = self.node_ranges.lock().unwrap();
        if ranges.is_empty() {
            return Ok(KeyRange::ALL);
        }
        let start = *ranges
            .get(thread_id)
            .ok_or_else(|| GraphError::Other(format!("thread_id {thread_id} has no node range")))?;
        let end = ranges.get(thread_id + 1).copied().unwrap_or(MAX_SENTINEL);
        Ok(KeyRange::new(start, end))
    }

    /// The `thread_id`-th contiguous slice of the edge table, as computed by
    /// the last `calculate_thread_offsets(true)` call. Unlike
    /// `get_key_range`, both halves of the returned [`PairRange`] are real
    /// `(src, dst)` bounds: the edge table is ordered by the full pair, so a
    /// partition boundary can fall in the middle of one source's out-edges.
    pub fn get_edge_range(&self, thread_id: usize) -> Result<PairRange> {
        let ranges = self.edge_ranges.lock().unwrap();
        if ranges.is_empty() {
            return Ok(PairRange { start: (0, 0), end: (MAX_SENTINEL, MAX_SENTINEL) });
        }
        let start = *ranges
            .get(thread_id)
            .ok_or_else(|| GraphError::Other(format!("thread_id {thread_id} has no edge range")))?;
        let end = ranges.get(thread_id + 1).copied().unwrap_or((MAX_SENTINEL, MAX_SENTINEL));
        Ok(PairRange { start, end })
    }

    /// Flushes metadata and drops the environment handle. The `Env` itself
    /// closes its memory map on drop; this just makes the sync point
    /// explicit rather than relying on it happening implicitly.
    pub fn close_graph(&self) -> Result<()> {
        if let Err(e) = self.force_metadata_sync() {
            warn!(error = %e, "metadata sync failed during shutdown");
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for GraphEngine {
    fn drop(&mut self) {
        if let Err(e) = self.force_metadata_sync() {
            warn!(error = %e, "metadata sync failed while dropping GraphEngine");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Representation;
    use tempfile::TempDir;

    fn opts(dir: &TempDir, rep: Representation) -> GraphOpts {
        GraphOpts::new("g", dir.path().to_str().unwrap(), rep)
    }

    #[test]
    fn creates_and_reopens_a_graph_directory() {
        let dir = TempDir::new().unwrap();
        {
            let engine = GraphEngine::create_new_graph(opts(&dir, Representation::Adj)).unwrap();
            let handle = engine.create_graph_handle(false).unwrap();
            let mut wtxn = engine.env().write_txn().unwrap();
            handle.add_node(&mut wtxn, 1, engine.metadata()).unwrap();
            handle.add_node(&mut wtxn, 2, engine.metadata()).unwrap();
            handle.add_edge(&mut wtxn, 1, 2, None, engine.metadata()).unwrap();
            wtxn.commit().unwrap();
            engine.close_graph().unwrap();
        }

        let mut reopened_opts = opts(&dir, Representation::Adj);
        reopened_opts.create_new = false;
        let engine = GraphEngine::open(reopened_opts).unwrap();
        assert_eq!(engine.metadata().num_nodes(), 2);
        assert_eq!(engine.metadata().num_edges(), 1);
    }

    #[test]
    fn partitions_nodes_into_contiguous_ranges() {
        let dir = TempDir::new().unwrap();
        let mut o = opts(&dir, Representation::EKey);
        o.num_threads = 2;
        let engine = GraphEngine::create_new_graph(o).unwrap();
        let handle = engine.create_graph_handle(false).unwrap();

        let mut wtxn = engine.env().write_txn().unwrap();
        for id in 1..=4u32 {
            handle.add_node(&mut wtxn, id, engine.metadata()).unwrap();
        }
        wtxn.commit().unwrap();

        engine.calculate_thread_offsets(false).unwrap();
        let r0 = engine.get_key_range(0).unwrap();
        let r1 = engine.get_key_range(1).unwrap();
        assert_eq!(r0.end, r1.start);
        assert!(r1.end >= 4);
    }

    #[test]
    fn make_checkpoint_writes_a_timestamped_backup_dir() {
        let dir = TempDir::new().unwrap();
        let engine = GraphEngine::create_new_graph(opts(&dir, Representation::Adj)).unwrap();
        let name = engine.make_checkpoint().unwrap();
        assert!(dir.path().join("checkpoints").join(&name).exists());
        assert_eq!(engine.get_last_checkpoint(), Some(name));
    }
}
