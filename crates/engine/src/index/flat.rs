//! Brute-force index
//!
//! O(n) exact search over a [`VectorHeap`]. The reference the approximate
//! indices are measured against.

use stratavec_core::{DistanceMetric, IndexType, VectorId, VectorResult};

use super::distance::{compute_similarity, rank_results};
use super::heap::VectorHeap;
use super::{check_query, SearchParams, VectorIndex};

/// Exact brute-force index
#[derive(Debug, Clone)]
pub struct FlatIndex {
    heap: VectorHeap,
}

impl FlatIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        FlatIndex {
            heap: VectorHeap::new(dimension, metric),
        }
    }

    /// Insert or overwrite a vector
    pub fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        self.heap.upsert(id, embedding)
    }
}

impl VectorIndex for FlatIndex {
    /// Scores every vector in id order, then sorts by (score desc, id asc).
    fn search(
        &self,
        query: &[f32],
        k: usize,
        _params: &SearchParams,
    ) -> VectorResult<Vec<(VectorId, f32)>> {
        check_query(self.heap.dimension(), query)?;
        if k == 0 || self.heap.is_empty() {
            return Ok(Vec::new());
        }

        let metric = self.heap.metric();
        let mut results: Vec<(VectorId, f32)> = self
            .heap
            .iter()
            .map(|(id, embedding)| (id, compute_similarity(query, embedding, metric)))
            .collect();
        rank_results(&mut results, k);
        Ok(results)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn dimension(&self) -> usize {
        self.heap.dimension()
    }

    fn metric(&self) -> DistanceMetric {
        self.heap.metric()
    }

    fn index_type(&self) -> IndexType {
        IndexType::Flat
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.heap.get(id)
    }
}
