use graphstore::{GraphEngine, GraphHandle, GraphOpts, Metadata, Representation};
use tempfile::TempDir;

/// Builds a fresh graph directory under a throwaway `TempDir` and returns the
/// engine alongside the directory (kept alive so the LMDB files survive for
/// the duration of the test) and the handle used to run operations.
pub fn new_graph(representation: Representation, is_directed: bool, is_weighted: bool) -> (TempDir, GraphEngine, GraphHandle) {
    let dir = TempDir::new().expect("tempdir");
    let mut opts = GraphOpts::new("t", dir.path().to_str().unwrap(), representation);
    opts.is_directed = is_directed;
    opts.is_weighted = is_weighted;
    opts.read_optimize = true;
    let engine = GraphEngine::create_new_graph(opts).expect("create graph");
    let handle = engine.create_graph_handle(false).expect("handle");
    (dir, engine, handle)
}

pub struct Scenario {
    pub nodes: Vec<u32>,
    pub edges: Vec<(u32, u32, i32)>,
}

/// The S1/S2 scenario from the spec: nodes 1..=8, six user-level edges.
pub fn s1_scenario() -> Scenario {
    Scenario {
        nodes: vec![1, 2, 3, 4, 5, 6, 7, 8],
        edges: vec![(1, 3, 1), (1, 7, 1), (2, 3, 1), (5, 6, 1), (7, 8, 1), (8, 7, 1)],
    }
}

pub fn load_scenario(engine: &GraphEngine, handle: &GraphHandle, scenario: &Scenario) {
    let mut wtxn = engine.env().write_txn().unwrap();
    for &n in &scenario.nodes {
        handle.add_node(&mut wtxn, n, engine.metadata()).unwrap();
    }
    for &(s, d, w) in &scenario.edges {
        handle.add_edge(&mut wtxn, s, d, Some(w), engine.metadata()).unwrap();
    }
    wtxn.commit().unwrap();
}

#[allow(dead_code)]
pub fn meta<'a>(engine: &'a GraphEngine) -> &'a Metadata {
    engine.metadata()
}
