//! Metadata store (C2): a small key/value table of graph-wide facts, plus
//! process-local atomic counters for node/edge counts that are synced into
//! that table only at explicit checkpoints and on close — not on every
//! write, since a transactional counter bump on every add/delete would
//! serialize all writers against the metadata row.

use std::sync::atomic::{AtomicU64, Ordering};

use heed3::types::{Str, U64};
use heed3::{Database, Env, RoTxn, RwTxn};

use crate::codec::NodeId;
use crate::types::Result;

pub const METADATA_TABLE: &str = "metadata";

const KEY_IS_WEIGHTED: &str = "is_weighted";
const KEY_READ_OPTIMIZE: &str = "read_optimize";
const KEY_IS_DIRECTED: &str = "is_directed";
const KEY_NUM_NODES: &str = "num_nodes";
const KEY_NUM_EDGES: &str = "num_edges";
const KEY_MAX_NODE_ID: &str = "max_node_id";
const KEY_MIN_NODE_ID: &str = "min_node_id";

/// In-memory view of the metadata table. `num_nodes`/`num_edges` are
/// maintained as atomics on the hot path and only written through to LMDB
/// by [`Metadata::sync`].
pub struct Metadata {
    db: Database<Str, U64<heed3::byteorder::BE>>,
    db_name: String,
    db_dir: String,
    is_weighted: bool,
    read_optimize: bool,
    is_directed: bool,
    representation: String,
    num_nodes: AtomicU64,
    num_edges: AtomicU64,
    max_node_id: AtomicU64,
    min_node_id: AtomicU64,
}

impl Metadata {
    /// Creates a fresh metadata table and seeds it from `opts`.
    pub fn create(
        env: &Env,
        wtxn: &mut RwTxn,
        db_name: &str,
        db_dir: &str,
        is_weighted: bool,
        read_optimize: bool,
        is_directed: bool,
        representation: &str,
    ) -> Result<Self> {
        let db: Database<Str, U64<heed3::byteorder::BE>> =
            env.create_database(wtxn, Some(METADATA_TABLE))?;

        let meta = Self {
            db,
            db_name: db_name.to_string(),
            db_dir: db_dir.to_string(),
            is_weighted,
            read_optimize,
            is_directed,
            representation: representation.to_string(),
            num_nodes: AtomicU64::new(0),
            num_edges: AtomicU64::new(0),
            max_node_id: AtomicU64::new(0),
            min_node_id: AtomicU64::new(u64::from(crate::codec::MAX_SENTINEL)),
        };
        meta.write_flags(wtxn)?;
        meta.sync(wtxn)?;
        Ok(meta)
    }

    /// Opens a metadata table that already exists, reading back counters.
    pub fn open(
        env: &Env,
        rtxn: &RoTxn,
        db_name: &str,
        db_dir: &str,
        is_weighted: bool,
        read_optimize: bool,
        is_directed: bool,
        representation: &str,
    ) -> Result<Self> {
        let db: Database<Str, U64<heed3::byteorder::BE>> = env
            .open_database(rtxn, Some(METADATA_TABLE))?
            .ok_or(crate::types::GraphError::Other(
                "metadata table missing".to_string(),
            ))?;

        let num_nodes = db.get(rtxn, KEY_NUM_NODES)?.unwrap_or(0);
        let num_edges = db.get(rtxn, KEY_NUM_EDGES)?.unwrap_or(0);
        let max_node_id = db.get(rtxn, KEY_MAX_NODE_ID)?.unwrap_or(0);
        let min_node_id = db
            .get(rtxn, KEY_MIN_NODE_ID)?
            .unwrap_or(u64::from(crate::codec::MAX_SENTINEL));

        Ok(Self {
            db,
            db_name: db_name.to_string(),
            db_dir: db_dir.to_string(),
            is_weighted,
            read_optimize,
            is_directed,
            representation: representation.to_string(),
            num_nodes: AtomicU64::new(num_nodes),
            num_edges: AtomicU64::new(num_edges),
            max_node_id: AtomicU64::new(max_node_id),
            min_node_id: AtomicU64::new(min_node_id),
        })
    }

    fn write_flags(&self, wtxn: &mut RwTxn) -> Result<()> {
        self.db.put(wtxn, KEY_IS_WEIGHTED, &(self.is_weighted as u64))?;
        self.db
            .put(wtxn, KEY_READ_OPTIMIZE, &(self.read_optimize as u64))?;
        self.db.put(wtxn, KEY_IS_DIRECTED, &(self.is_directed as u64))?;
        Ok(())
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn db_dir(&self) -> &str {
        &self.db_dir
    }

    pub fn is_weighted(&self) -> bool {
        self.is_weighted
    }

    pub fn read_optimize(&self) -> bool {
        self.read_optimize
    }

    pub fn is_directed(&self) -> bool {
        self.is_directed
    }

    pub fn representation(&self) -> &str {
        &self.representation
    }

    pub fn num_nodes(&self) -> u64 {
        self.num_nodes.load(Ordering::Relaxed)
    }

    pub fn num_edges(&self) -> u64 {
        self.num_edges.load(Ordering::Relaxed)
    }

    pub fn on_node_added(&self, id: NodeId) {
        self.num_nodes.fetch_add(1, Ordering::Relaxed);
        self.max_node_id.fetch_max(u64::from(id), Ordering::Relaxed);
        self.min_node_id.fetch_min(u64::from(id), Ordering::Relaxed);
    }

    pub fn on_node_removed(&self) {
        self.num_nodes.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_edge_added(&self) {
        self.num_edges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_edge_removed(&self) {
        self.num_edges.fetch_sub(1, Ordering::Relaxed);
    }

    /// Writes the current atomic counters through to the metadata table.
    /// Called at explicit sync points (checkpoint creation) and at
    /// `GraphEngine` shutdown, not after every individual write.
    pub fn sync(&self, wtxn: &mut RwTxn) -> Result<()> {
        self.db.put(wtxn, KEY_NUM_NODES, &self.num_nodes())?;
        self.db.put(wtxn, KEY_NUM_EDGES, &self.num_edges())?;
        self.db
            .put(wtxn, KEY_MAX_NODE_ID, &self.max_node_id.load(Ordering::Relaxed))?;
        self.db
            .put(wtxn, KEY_MIN_NODE_ID, &self.min_node_id.load(Ordering::Relaxed))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_env(dir: &TempDir) -> Env {
        unsafe {
            heed3::EnvOpenOptions::new()
                .map_size(10 * 1024 * 1024)
                .max_dbs(8)
                .open(dir.path())
                .unwrap()
        }
    }

    #[test]
    fn counters_survive_a_create_sync_reopen_cycle() {
        let dir = TempDir::new().unwrap();
        let env = open_env(&dir);

        {
            let mut wtxn = env.write_txn().unwrap();
            let meta = Metadata::create(&env, &mut wtxn, "g", dir.path().to_str().unwrap(), false, true, true, "adj")
                .unwrap();
            meta.on_node_added(1);
            meta.on_node_added(2);
            meta.on_edge_added();
            meta.sync(&mut wtxn).unwrap();
            wtxn.commit().unwrap();
        }

        let rtxn = env.read_txn().unwrap();
        let meta =
            Metadata::open(&env, &rtxn, "g", dir.path().to_str().unwrap(), false, true, true, "adj").unwrap();
        assert_eq!(meta.num_nodes(), 2);
        assert_eq!(meta.num_edges(), 1);
    }
}
