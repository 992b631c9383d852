//! Query Optimizer Tests
//!
//! Plans against realistic collection shapes, the feedback loop, and a
//! full plan → filter → search round over a migrated index.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use stratavec_core::{DistanceMetric, IndexType, VectorId, MAX_MESSAGE_BYTES};
use stratavec_engine::{
    CollectionStats, IndexConfig, Metadata, MetadataIndex, Migration, OptimizerConfig,
    PlanStrategy, QueryOptimizer,
};

fn optimizer_for(total: u64, dimension: usize) -> QueryOptimizer {
    let optimizer = QueryOptimizer::new();
    optimizer.update_stats(CollectionStats::new(total, dimension, IndexType::Hnsw));
    optimizer
}

// ============================================================================
// Strategy selection
// ============================================================================

#[test]
fn test_threshold_boundary() {
    let at = optimizer_for(1_000, 128).plan(10, None);
    assert_eq!(at.strategy, PlanStrategy::ExactScan);
    assert_eq!(at.estimated_recall, 1.0);

    let above = optimizer_for(1_001, 128).plan(10, None);
    assert_eq!(above.strategy, PlanStrategy::IndexSearch);
}

#[test]
fn test_selective_filter_oversamples() {
    let optimizer = optimizer_for(1_000_000, 384);
    let plan = optimizer.plan(10, Some(0.001));

    assert_eq!(plan.strategy, PlanStrategy::OversampleFilter);
    assert!(plan.use_metadata_index);
    assert!(plan.oversample_k >= 10_000);
    assert!(plan.oversample_k <= 1_000_000);
    assert_eq!(plan.fetch_k(10), plan.oversample_k);
}

#[test]
fn test_broad_filter_uses_index() {
    let plan = optimizer_for(1_000_000, 384).plan(10, Some(0.5));
    assert_eq!(plan.strategy, PlanStrategy::IndexSearch);
    assert!(plan.use_metadata_index);
    assert_eq!(plan.fetch_k(10), 10);
}

#[test]
fn test_custom_thresholds() {
    let optimizer = QueryOptimizer::with_config(OptimizerConfig {
        exact_scan_threshold: 10,
        ef_search_cap: 64,
        ..OptimizerConfig::default()
    });
    optimizer.update_stats(CollectionStats::new(5_000, 64, IndexType::Hnsw));

    let plan = optimizer.plan(100, None);
    assert_eq!(plan.strategy, PlanStrategy::IndexSearch);
    assert_eq!(plan.ef_search, 64);
}

#[test]
fn test_explanation_fits_bound() {
    let plan = optimizer_for(u64::MAX / 2, usize::MAX / 4).plan(usize::MAX / 8, Some(1e-9));
    assert!(!plan.explanation.is_empty());
    assert!(plan.explanation.len() <= MAX_MESSAGE_BYTES);
}

// ============================================================================
// Feedback
// ============================================================================

/// Test: alpha 0.1, samples 1000us then 2000us average to 1100us
#[test]
fn test_latency_ema() {
    let optimizer = optimizer_for(100_000, 128);
    let plan = optimizer.plan(10, None);

    optimizer.record_result(&plan, 1_000, 0.9);
    optimizer.record_result(&plan, 2_000, 0.9);

    let feedback = optimizer.feedback();
    assert!((feedback.avg_latency_us - 1_100.0).abs() < 1e-6);
    assert!((feedback.avg_recall - 0.9).abs() < 1e-9);
    assert_eq!(feedback.sample_count, 2);
}

/// Test: planning, stats swaps and feedback can run concurrently
#[test]
fn test_concurrent_plan_and_update() {
    let optimizer = Arc::new(optimizer_for(10, 32));

    let writer = {
        let o = Arc::clone(&optimizer);
        thread::spawn(move || {
            for i in 0..1_000u64 {
                o.update_stats(CollectionStats::new(i * 1_000, 32, IndexType::Hnsw));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let o = Arc::clone(&optimizer);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let plan = o.plan(10, None);
                    assert!((0.0..=1.0).contains(&plan.estimated_recall));
                    o.record_result(&plan, 500, 1.0);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(optimizer.feedback().sample_count, 4_000);
    assert!((optimizer.feedback().avg_latency_us - 500.0).abs() < 1e-6);
}

// ============================================================================
// Plan → filter → search
// ============================================================================

/// Test: a filtered query over a migrated index returns only tagged vectors
#[test]
fn test_filtered_search_end_to_end() {
    let count = 2_000usize;
    let dimension = 8usize;
    let mut data: Vec<f32> = (0..count * dimension)
        .map(|i| ((i * 17 + 3) % 97) as f32 / 48.0 - 1.0)
        .collect();

    // Every 200th vector is tagged red and is a copy of vector 0
    let mut tags = MetadataIndex::new();
    for i in 0..count {
        let red = i % 200 == 0;
        if red && i > 0 {
            data.copy_within(0..dimension, i * dimension);
        }
        let mut meta = Metadata::new();
        meta.set("color", if red { "red" } else { "blue" });
        tags.update(VectorId(i as u64), None, Some(&meta)).unwrap();
    }

    let migration = Migration::start(
        Some(data.clone().into()),
        count,
        dimension,
        IndexType::BinaryFlat,
        IndexConfig::with_metric(DistanceMetric::Cosine),
    )
    .unwrap();
    migration.wait().unwrap();
    let index = migration.take_index().unwrap();

    let optimizer = QueryOptimizer::new();
    optimizer.update_stats(CollectionStats::new(count as u64, dimension, IndexType::BinaryFlat));
    let selectivity = tags.selectivity("color", "red", count);
    assert!((selectivity - 0.005).abs() < 1e-12);

    let k = 3;
    let plan = optimizer.plan(k, Some(selectivity));
    assert_eq!(plan.strategy, PlanStrategy::OversampleFilter);

    let query = &data[..dimension];
    let candidates = index
        .search(query, plan.fetch_k(k), &plan.search_params())
        .unwrap();
    let hits: Vec<VectorId> = candidates
        .into_iter()
        .map(|(id, _)| id)
        .filter(|&id| tags.contains("color", "red", id))
        .take(k)
        .collect();

    // Equal scores break ties by id
    assert_eq!(hits, vec![VectorId(0), VectorId(200), VectorId(400)]);
}

proptest! {
    #[test]
    fn prop_plan_invariants(
        total in 0u64..10_000_000,
        dimension in 1usize..2048,
        k in 1usize..1000,
        selectivity in proptest::option::of(0.0f64..1.0),
    ) {
        let optimizer = optimizer_for(total, dimension);
        let plan = optimizer.plan(k, selectivity);

        prop_assert!(plan.estimated_cost >= 0.0);
        prop_assert!((0.0..=1.0).contains(&plan.estimated_recall));
        prop_assert!(plan.explanation.len() <= MAX_MESSAGE_BYTES);
        match plan.strategy {
            PlanStrategy::ExactScan => prop_assert!(total <= 1_000),
            PlanStrategy::OversampleFilter => {
                let s = selectivity.unwrap();
                prop_assert!(plan.oversample_k as u64 <= total);
                let needed = (k as f64 / s).ceil() as u64;
                prop_assert!(plan.oversample_k as u64 >= needed.min(total));
            }
            PlanStrategy::IndexSearch => {
                let cap = if total > 100_000 { 200 } else { 500 };
                prop_assert!(plan.ef_search >= (2 * k).max(50).min(cap));
            }
        }
    }
}
