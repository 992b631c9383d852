//! Vector indices built by migrations
//!
//! Every index family implements [`VectorIndex`] so the collection can swap
//! a freshly built index in without knowing its concrete type:
//!
//! - [`FlatIndex`]: exact brute-force scan
//! - [`HnswIndex`]: hierarchical navigable small world graph
//! - [`IvfFlatIndex`]: k-means partitions, probes the nearest `nprobe`
//! - [`BinaryFlatIndex`]: Hamming candidates over sign bits, exact rerank
//!
//! Scores are "higher = more similar"; results are ordered by
//! (score desc, VectorId asc).

mod binary_flat;
pub mod distance;
mod flat;
mod heap;
mod hnsw;
mod ivf;

use std::fmt::Debug;

use stratavec_core::{DistanceMetric, IndexType, VectorError, VectorId, VectorResult};

pub use binary_flat::BinaryFlatIndex;
pub use flat::FlatIndex;
pub use heap::VectorHeap;
pub use hnsw::HnswIndex;
pub use ivf::IvfFlatIndex;

/// Per-query knobs, usually taken from a `QueryPlan`
///
/// A zero field means "use the index's configured default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Graph beam width (HNSW)
    pub ef_search: usize,
    /// Partitions to probe (IVF)
    pub nprobe: usize,
    /// Candidates to rescore exactly (binary-flat)
    pub rerank_top: usize,
}

/// A built, searchable vector index
pub trait VectorIndex: Send + Sync + Debug {
    /// Up to `k` nearest neighbors of `query` as `(id, score)` pairs
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `query` has the wrong length.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> VectorResult<Vec<(VectorId, f32)>>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Distance metric
    fn metric(&self) -> DistanceMetric;

    /// Which family this index belongs to
    fn index_type(&self) -> IndexType;

    /// Stored embedding for `id`
    fn get(&self, id: VectorId) -> Option<&[f32]>;

    /// Check if a vector exists
    fn contains(&self, id: VectorId) -> bool {
        self.get(id).is_some()
    }
}

pub(crate) fn check_query(dimension: usize, query: &[f32]) -> VectorResult<()> {
    if query.len() != dimension {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            got: query.len(),
        });
    }
    Ok(())
}
