//! Collection statistics and feedback averages

use stratavec_core::IndexType;

/// Statistics published by the owning collection
///
/// Replaced wholesale by `QueryOptimizer::update_stats`; the planner never
/// sees a half-written value.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats {
    /// Live vectors in the collection
    pub total_vectors: u64,
    /// Vector dimension
    pub dimension: usize,
    /// Index currently serving searches
    pub index_type: IndexType,
    /// Fraction of stored vectors marked deleted, in [0, 1]
    pub deleted_ratio: f64,
    /// Mean vectors matched by a filter over recent queries
    pub avg_vectors_per_filter_match: f64,
    /// Latency of the most recent search
    pub last_search_latency_us: u64,
}

impl Default for CollectionStats {
    fn default() -> Self {
        Self {
            total_vectors: 0,
            dimension: 0,
            index_type: IndexType::Flat,
            deleted_ratio: 0.0,
            avg_vectors_per_filter_match: 0.0,
            last_search_latency_us: 0,
        }
    }
}

impl CollectionStats {
    /// Stats with the three fields the planner depends on
    pub fn new(total_vectors: u64, dimension: usize, index_type: IndexType) -> Self {
        Self {
            total_vectors,
            dimension,
            index_type,
            ..Self::default()
        }
    }
}

/// Running averages of observed search results
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedbackStats {
    /// EMA of search latency in microseconds
    pub avg_latency_us: f64,
    /// EMA of measured recall
    pub avg_recall: f64,
    /// Samples recorded so far
    pub sample_count: u64,
}

impl FeedbackStats {
    /// Fold in one observation
    ///
    /// The first sample initializes both averages; later samples are blended
    /// as `alpha * new + (1 - alpha) * old`.
    pub fn record(&mut self, alpha: f64, latency_us: u64, recall: f64) {
        let latency = latency_us as f64;
        if self.sample_count == 0 {
            self.avg_latency_us = latency;
            self.avg_recall = recall;
        } else {
            self.avg_latency_us = alpha * latency + (1.0 - alpha) * self.avg_latency_us;
            self.avg_recall = alpha * recall + (1.0 - alpha) * self.avg_recall;
        }
        self.sample_count += 1;
    }
}
