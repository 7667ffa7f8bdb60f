//! Process-wide graph options (C10): the `GraphOpts` table recognized at
//! graph-open time, persisted alongside the graph directory so a caller does
//! not have to re-specify flags on every open.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Result;

/// Which of the three physical representations backs a graph directory.
/// Chosen once at creation time and stored in the metadata table; opening an
/// existing graph with a mismatched `representation` is a configuration
/// error (checked by the caller against the stored metadata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    /// Adjacency-List: node table + separate out/in adjacency tables.
    Adj,
    /// Unified Edge-Key: node and edge rows share one table keyed (id, id).
    EKey,
    /// Split Edge-Key: mirrored out-edges/in-edges tables, no shared table.
    SplitEKey,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Representation::Adj => "adj",
            Representation::EKey => "ekey",
            Representation::SplitEKey => "split_ekey",
        };
        write!(f, "{name}")
    }
}

/// The full set of options recognized when creating or opening a graph.
///
/// Mirrors the teacher's `Config`/`GraphConfig` split: a handful of boolean
/// flags that change on-disk layout and must not vary between create and
/// open, plus a couple of process-local knobs (`num_threads`, `db_max_size_gb`)
/// that may be overridden per-handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphOpts {
    /// Human-readable name, stored in the metadata table.
    pub db_name: String,
    /// Directory the LMDB environment and checkpoints live under.
    pub db_dir: String,
    /// Create a new environment; if false, an existing one at `db_dir` is
    /// opened and must already exist.
    #[serde(default = "default_true")]
    pub create_new: bool,
    /// Maintain in/out degree counters that support O(1) degree queries
    /// (I3). Read-optimized graphs pay an extra write on every add/delete.
    #[serde(default = "default_true")]
    pub read_optimize: bool,
    /// Whether edges carry an independent reverse entry (I2) or are treated
    /// as symmetric.
    #[serde(default = "default_true")]
    pub is_directed: bool,
    /// Whether edges carry a weight attribute.
    #[serde(default)]
    pub is_weighted: bool,
    /// Which physical representation to use. Fixed for the lifetime of the
    /// graph directory.
    pub representation: Representation,
    /// Worker thread count used by `GraphEngine` to plan partitions.
    /// Defaults to the number of logical CPUs when absent from a config file.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Soft cap on the LMDB environment's memory map, in gigabytes. LMDB
    /// requires this up front since its map size cannot grow without a
    /// reopen.
    #[serde(default = "default_map_size_gb")]
    pub db_max_size_gb: usize,
}

fn default_true() -> bool {
    true
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_map_size_gb() -> usize {
    10
}

impl GraphOpts {
    /// Builds options for a brand-new graph directory with otherwise
    /// default settings.
    pub fn new(db_name: impl Into<String>, db_dir: impl Into<String>, representation: Representation) -> Self {
        Self {
            db_name: db_name.into(),
            db_dir: db_dir.into(),
            create_new: true,
            read_optimize: true,
            is_directed: true,
            is_weighted: false,
            representation,
            num_threads: default_num_threads(),
            db_max_size_gb: default_map_size_gb(),
        }
    }

    /// Reads options back from the JSON file written by [`GraphOpts::to_file`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let opts = serde_json::from_str(&contents)?;
        Ok(opts)
    }

    /// Writes options as JSON, overwriting any existing file at `path`.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// The conventional config filename placed alongside the LMDB data
    /// files inside `db_dir`.
    pub fn config_file_name() -> &'static str {
        "graph_opts.json"
    }
}

impl Default for GraphOpts {
    fn default() -> Self {
        Self::new("graph", "./graph_data", Representation::Adj)
    }
}

impl fmt::Display for GraphOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GraphOpts {{ db_name: {}, db_dir: {}, representation: {}, directed: {}, weighted: {}, read_optimize: {}, num_threads: {}, db_max_size_gb: {} }}",
            self.db_name,
            self.db_dir,
            self.representation,
            self.is_directed,
            self.is_weighted,
            self.read_optimize,
            self.num_threads,
            self.db_max_size_gb
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_opts_are_adj_directed_read_optimized() {
        let opts = GraphOpts::default();
        assert_eq!(opts.representation, Representation::Adj);
        assert!(opts.is_directed);
        assert!(opts.read_optimize);
        assert!(!opts.is_weighted);
        assert!(opts.num_threads >= 1);
    }

    #[test]
    fn roundtrips_through_a_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(GraphOpts::config_file_name());

        let mut opts = GraphOpts::new("g1", dir.path().to_str().unwrap(), Representation::SplitEKey);
        opts.is_weighted = true;
        opts.num_threads = 4;
        opts.to_file(&path).unwrap();

        let loaded = GraphOpts::from_file(&path).unwrap();
        assert_eq!(loaded.db_name, "g1");
        assert_eq!(loaded.representation, Representation::SplitEKey);
        assert!(loaded.is_weighted);
        assert_eq!(loaded.num_threads, 4);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{"db_name":"g2","db_dir":"d","representation":"EKey"}"#).unwrap();

        let loaded = GraphOpts::from_file(&path).unwrap();
        assert!(loaded.create_new);
        assert!(loaded.read_optimize);
        assert_eq!(loaded.db_max_size_gb, 10);
    }
}
