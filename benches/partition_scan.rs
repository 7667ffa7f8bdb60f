//! Benchmarks comparing the three physical representations on the
//! operations the core is actually built around: partitioned scans and
//! neighborhood reconstruction. Run with `cargo bench`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graphstore::{Cursor, GraphEngine, GraphOpts, KeyRange, Representation};
use tempfile::TempDir;

const ALL_REPS: [Representation; 3] = [Representation::Adj, Representation::EKey, Representation::SplitEKey];

fn build_graph(rep: Representation, num_nodes: u32, avg_degree: u32) -> (TempDir, GraphEngine) {
    let dir = TempDir::new().unwrap();
    let mut opts = GraphOpts::new("bench", dir.path().to_str().unwrap(), rep);
    opts.is_directed = true;
    opts.is_weighted = false;
    opts.read_optimize = true;
    opts.num_threads = 4;
    let engine = GraphEngine::create_new_graph(opts).unwrap();
    let handle = engine.create_graph_handle(false).unwrap();

    let mut wtxn = engine.env().write_txn().unwrap();
    for id in 1..=num_nodes {
        handle.add_node(&mut wtxn, id, engine.metadata()).unwrap();
    }
    for src in 1..=num_nodes {
        for k in 1..=avg_degree {
            let dst = ((src + k) % num_nodes) + 1;
            if dst != src {
                handle.add_edge(&mut wtxn, src, dst, None, engine.metadata()).unwrap();
            }
        }
    }
    wtxn.commit().unwrap();

    (dir, engine)
}

/// Time to compute `k` contiguous partition boundaries over the node table
/// (C7's `calculate_thread_offsets`), the step every parallel benchmark
/// client pays once before fanning out.
fn bench_partition_offsets(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_thread_offsets");

    for &num_nodes in &[1_000u32, 10_000u32] {
        for rep in ALL_REPS {
            let (_dir, engine) = build_graph(rep, num_nodes, 4);
            group.bench_with_input(BenchmarkId::new(format!("{rep:?}"), num_nodes), &engine, |b, engine| {
                b.iter(|| engine.calculate_thread_offsets(black_box(true)).unwrap());
            });
        }
    }
    group.finish();
}

/// Time to fully drain a single thread's node-range partition, exercising
/// each representation's node cursor.
fn bench_node_partition_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_partition_scan");

    for &num_nodes in &[1_000u32, 10_000u32] {
        for rep in ALL_REPS {
            let (_dir, engine) = build_graph(rep, num_nodes, 4);
            engine.calculate_thread_offsets(false).unwrap();
            let handle = engine.create_graph_handle(false).unwrap();
            let range = engine.get_key_range(0).unwrap();

            group.bench_with_input(BenchmarkId::new(format!("{rep:?}"), num_nodes), &range, |b, range| {
                b.iter(|| {
                    let rtxn = engine.env().read_txn().unwrap();
                    let mut cursor = handle.node_cursor(&rtxn, *range).unwrap();
                    let mut count = 0u64;
                    while cursor.next().unwrap().is_some() {
                        count += 1;
                    }
                    black_box(count)
                });
            });
        }
    }
    group.finish();
}

/// Time to reconstruct every node's out-neighborhood across the full
/// table (C3's "all nodes" mode) — this is where Adj's single sequential
/// blob read should separate from EKey/SplitEKey's row-coalescing scan.
fn bench_full_out_neighborhood_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_out_neighborhood_scan");

    for rep in ALL_REPS {
        let (_dir, engine) = build_graph(rep, 5_000, 8);
        let handle = engine.create_graph_handle(false).unwrap();

        group.bench_with_input(BenchmarkId::new(format!("{rep:?}"), 5_000), &handle, |b, handle| {
            b.iter(|| {
                let rtxn = engine.env().read_txn().unwrap();
                let mut cursor = handle.out_nbd_cursor(&rtxn, KeyRange::ALL).unwrap();
                graphstore::OutNbdCursor::set_all_nodes(&mut cursor, true);
                let mut total_neighbors = 0u64;
                while let Some(adj) = cursor.next().unwrap() {
                    total_neighbors += adj.neighbors.len() as u64;
                }
                black_box(total_neighbors)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_partition_offsets, bench_node_partition_scan, bench_full_out_neighborhood_scan);
criterion_main!(benches);
