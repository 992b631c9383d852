//! Cost-based query planner
//!
//! Rules, first match wins:
//!
//! 1. Small collection (`total <= exact_scan_threshold`): exact scan.
//! 2. Filter with `0 < selectivity < selective_filter_threshold`: oversample
//!    `ceil(k / s * 1.5)` candidates (at most `total`), then post-filter.
//! 3. Otherwise: index search, pre-filtering through the tag index if a
//!    filter is present.
//!
//! Cost model: exact scan costs `total * dimension`; an index search for
//! `k` results at breadth `ef` costs `k * ef * dimension * log2(max(total, 2))`.

use parking_lot::{Mutex, RwLock};
use stratavec_core::bounded_message;
use tracing::debug;

use super::plan::{PlanStrategy, QueryPlan};
use super::stats::{CollectionStats, FeedbackStats};
use crate::config::OptimizerConfig;

/// Plans queries from published collection stats and tracks result feedback
///
/// All methods take `&self`. Stats are swapped whole under a write lock;
/// feedback averages sit behind their own mutex.
#[derive(Debug)]
pub struct QueryOptimizer {
    config: OptimizerConfig,
    stats: RwLock<CollectionStats>,
    feedback: Mutex<FeedbackStats>,
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryOptimizer {
    /// Optimizer with default tunables
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    /// Optimizer with explicit tunables
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            stats: RwLock::new(CollectionStats::default()),
            feedback: Mutex::new(FeedbackStats::default()),
        }
    }

    /// Tunables in effect
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Replace the collection stats
    pub fn update_stats(&self, stats: CollectionStats) {
        *self.stats.write() = stats;
    }

    /// Snapshot of the current collection stats
    pub fn stats(&self) -> CollectionStats {
        self.stats.read().clone()
    }

    /// Snapshot of the feedback averages
    pub fn feedback(&self) -> FeedbackStats {
        *self.feedback.lock()
    }

    // ========================================================================
    // Heuristics
    // ========================================================================

    fn compute_ef(&self, stats: &CollectionStats, k: usize) -> usize {
        let mut ef = k.saturating_mul(2).max(50);
        if stats.dimension > 256 {
            ef = (ef as f64 * 1.5) as usize;
        }
        if stats.total_vectors > 100_000 {
            ef = ef.min(200);
        }
        ef.min(self.config.ef_search_cap)
    }

    fn compute_nprobe(&self, stats: &CollectionStats) -> usize {
        let n = stats.total_vectors as usize;
        let nprobe = if n < 10_000 {
            (n / 1000).max(4)
        } else if n < 100_000 {
            (n / 5000).max(8)
        } else {
            (n / 20_000).max(16)
        };
        nprobe.min(self.config.nprobe_cap)
    }

    fn index_cost(stats: &CollectionStats, k: usize, ef: usize) -> f64 {
        let log_n = (stats.total_vectors.max(2) as f64).log2();
        k as f64 * ef as f64 * stats.dimension as f64 * log_n
    }

    /// Search breadth the planner would use for `k` results
    pub fn recommend_ef_search(&self, k: usize) -> usize {
        self.compute_ef(&self.stats.read(), k)
    }

    /// Probe count the planner would use; independent of `k`
    pub fn recommend_nprobe(&self, _k: usize) -> usize {
        self.compute_nprobe(&self.stats.read())
    }

    // ========================================================================
    // Planning
    // ========================================================================

    /// Plan a query for `k` results
    ///
    /// `filter_selectivity` is `Some(fraction of vectors matching)` when the
    /// query carries a tag filter. Never mutates optimizer state.
    pub fn plan(&self, k: usize, filter_selectivity: Option<f64>) -> QueryPlan {
        let stats = self.stats.read().clone();
        let plan = self.plan_with(&stats, k, filter_selectivity);
        debug!(
            target: "stratavec::optimizer",
            strategy = %plan.strategy,
            k,
            total_vectors = stats.total_vectors,
            ef_search = plan.ef_search,
            "Planned query"
        );
        plan
    }

    fn plan_with(&self, stats: &CollectionStats, k: usize, filter: Option<f64>) -> QueryPlan {
        let total = stats.total_vectors;

        if total <= self.config.exact_scan_threshold {
            return QueryPlan {
                strategy: PlanStrategy::ExactScan,
                ef_search: 0,
                nprobe: 0,
                rerank_top: 0,
                oversample_k: 0,
                use_metadata_index: false,
                estimated_cost: total as f64 * stats.dimension as f64,
                estimated_recall: 1.0,
                explanation: bounded_message(&format!(
                    "Exact scan: {} vectors is within the {} vector threshold",
                    total, self.config.exact_scan_threshold
                )),
            };
        }

        if let Some(s) = filter {
            if s > 0.0 && s < self.config.selective_filter_threshold {
                let wanted = (k as f64 / s * 1.5).ceil();
                let oversample = wanted.min(total as f64) as usize;
                let ef = self.compute_ef(stats, oversample);
                let nprobe = self.compute_nprobe(stats);
                let cost = Self::index_cost(stats, oversample, ef)
                    + oversample as f64 * stats.dimension as f64;
                return QueryPlan {
                    strategy: PlanStrategy::OversampleFilter,
                    ef_search: ef,
                    nprobe,
                    rerank_top: oversample,
                    oversample_k: oversample,
                    use_metadata_index: true,
                    estimated_cost: cost,
                    estimated_recall: 0.95,
                    explanation: bounded_message(&format!(
                        "Oversample then filter: selectivity {:.4} is below {:.4}, \
                         fetching {} candidates for k={}",
                        s, self.config.selective_filter_threshold, oversample, k
                    )),
                };
            }
        }

        let ef = self.compute_ef(stats, k);
        let nprobe = self.compute_nprobe(stats);
        let ef_ratio = ef as f64 / k.max(1) as f64;
        let recall = (1.0 - 1.0 / (1.0 + ef_ratio)).min(1.0);
        QueryPlan {
            strategy: PlanStrategy::IndexSearch,
            ef_search: ef,
            nprobe,
            rerank_top: k,
            oversample_k: 0,
            use_metadata_index: filter.is_some(),
            estimated_cost: Self::index_cost(stats, k, ef),
            estimated_recall: recall,
            explanation: bounded_message(&format!(
                "Index search over {} vectors: ef_search={}, nprobe={}, recall~{:.2}{}",
                total,
                ef,
                nprobe,
                recall,
                if filter.is_some() {
                    ", tag pre-filter"
                } else {
                    ""
                }
            )),
        }
    }

    // ========================================================================
    // Feedback
    // ========================================================================

    /// Record the observed latency and recall of an executed plan
    ///
    /// The plan is accepted for per-strategy tracking but does not yet
    /// affect the averages.
    pub fn record_result(&self, _plan: &QueryPlan, latency_us: u64, recall: f64) {
        self.feedback
            .lock()
            .record(self.config.ema_alpha, latency_us, recall);
    }
}
