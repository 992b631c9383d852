//! Query Planner Benchmarks
//!
//! Run with: cargo bench --bench planner
//!
//! - plan: strategy selection for each collection shape
//! - plan_contended: planning while another thread swaps stats
//! - metadata_query: inverted index lookups that back filtered plans

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stratavec::{CollectionStats, IndexType, MetadataIndex, QueryOptimizer, VectorId};

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let shapes: [(&str, u64, Option<f64>); 3] = [
        ("exact_scan", 500, None),
        ("index_search", 1_000_000, None),
        ("oversample_filter", 1_000_000, Some(0.001)),
    ];
    for (name, total, selectivity) in shapes {
        let optimizer = QueryOptimizer::new();
        optimizer.update_stats(CollectionStats::new(total, 768, IndexType::Hnsw));
        group.bench_function(name, |b| {
            b.iter(|| optimizer.plan(black_box(10), black_box(selectivity)))
        });
    }
    group.finish();
}

fn bench_plan_contended(c: &mut Criterion) {
    let optimizer = Arc::new(QueryOptimizer::new());
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let optimizer = Arc::clone(&optimizer);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut total = 0u64;
            while !stop.load(Ordering::Relaxed) {
                total = (total + 10_007) % 5_000_000;
                optimizer.update_stats(CollectionStats::new(total, 384, IndexType::Hnsw));
            }
        })
    };

    c.bench_function("plan_contended", |b| {
        b.iter(|| optimizer.plan(black_box(10), None))
    });

    stop.store(true, Ordering::Relaxed);
    let _ = writer.join();
}

fn bench_metadata_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_query");
    for n in [10_000u64, 100_000] {
        let mut index = MetadataIndex::new();
        for i in 0..n {
            let bucket = (i % 100).to_string();
            index.add("bucket", &bucket, VectorId(i)).unwrap();
            index
                .add("parity", if i % 2 == 0 { "even" } else { "odd" }, VectorId(i))
                .unwrap();
        }
        let mut out = vec![VectorId(0); 1_024];
        group.bench_with_input(BenchmarkId::new("query", n), &n, |b, _| {
            b.iter(|| index.query(black_box("bucket"), black_box("42"), &mut out))
        });
        group.bench_with_input(BenchmarkId::new("intersect", n), &n, |b, _| {
            b.iter(|| index.intersect(black_box(&[("bucket", "42"), ("parity", "even")])))
        });
    }
    group.finish();
}

criterion_group!(
    name = planner_benches;
    config = Criterion::default().sample_size(50);
    targets = bench_plan, bench_plan_contended, bench_metadata_query
);
criterion_main!(planner_benches);
