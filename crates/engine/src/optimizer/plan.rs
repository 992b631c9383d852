//! Query plan produced by the optimizer

use std::fmt;

use crate::index::SearchParams;

/// How a query should be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanStrategy {
    /// Score every vector exactly
    ExactScan,
    /// Approximate search through the index
    IndexSearch,
    /// Fetch many index candidates, then apply the filter
    OversampleFilter,
}

impl PlanStrategy {
    /// Stable numeric code
    pub fn as_code(&self) -> u8 {
        match self {
            PlanStrategy::ExactScan => 0,
            PlanStrategy::IndexSearch => 1,
            PlanStrategy::OversampleFilter => 2,
        }
    }

    /// Look up a strategy by its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PlanStrategy::ExactScan),
            1 => Some(PlanStrategy::IndexSearch),
            2 => Some(PlanStrategy::OversampleFilter),
            _ => None,
        }
    }

    /// Upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            PlanStrategy::ExactScan => "EXACT_SCAN",
            PlanStrategy::IndexSearch => "INDEX_SEARCH",
            PlanStrategy::OversampleFilter => "OVERSAMPLE_FILTER",
        }
    }
}

impl fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable execution plan for one query
///
/// Knobs are zero when they do not apply to the strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Chosen strategy
    pub strategy: PlanStrategy,
    /// Graph search breadth
    pub ef_search: usize,
    /// Partitions to probe
    pub nprobe: usize,
    /// Candidates to rescore exactly
    pub rerank_top: usize,
    /// Candidates fetched before filtering (oversample strategy only)
    pub oversample_k: usize,
    /// Whether to consult the inverted tag index
    pub use_metadata_index: bool,
    /// Relative cost estimate, >= 0
    pub estimated_cost: f64,
    /// Expected recall in [0, 1]
    pub estimated_recall: f64,
    /// Human-readable reason, at most 255 bytes
    pub explanation: String,
}

impl QueryPlan {
    /// Knobs to pass to `VectorIndex::search`
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            ef_search: self.ef_search,
            nprobe: self.nprobe,
            rerank_top: self.rerank_top,
        }
    }

    /// Number of candidates the index should return
    ///
    /// `oversample_k` for the oversample strategy, otherwise `k`.
    pub fn fetch_k(&self, k: usize) -> usize {
        match self.strategy {
            PlanStrategy::OversampleFilter => self.oversample_k.max(k),
            _ => k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_codes() {
        for s in [
            PlanStrategy::ExactScan,
            PlanStrategy::IndexSearch,
            PlanStrategy::OversampleFilter,
        ] {
            assert_eq!(PlanStrategy::from_code(s.as_code()), Some(s));
        }
        assert_eq!(PlanStrategy::OversampleFilter.as_code(), 2);
        assert_eq!(PlanStrategy::from_code(3), None);
        assert_eq!(PlanStrategy::IndexSearch.to_string(), "INDEX_SEARCH");
    }
}
