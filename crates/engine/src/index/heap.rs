//! Vector heap: contiguous embedding storage
//!
//! Embeddings live in one `Vec<f32>` for cache-friendly scoring. A BTreeMap
//! from id to offset gives deterministic iteration order, which keeps
//! brute-force results and graph construction reproducible.

use std::collections::BTreeMap;

use stratavec_core::{DistanceMetric, VectorError, VectorId, VectorResult};

/// Contiguous storage for one index's vectors
///
/// `id_to_offset` is the only record of which ids are present.
#[derive(Debug, Clone)]
pub struct VectorHeap {
    dimension: usize,
    metric: DistanceMetric,
    /// Layout: [v0_dim0, .., v0_dimN, v1_dim0, ..]
    data: Vec<f32>,
    /// VectorId -> offset in `data` (in floats)
    id_to_offset: BTreeMap<VectorId, usize>,
}

impl VectorHeap {
    /// Create an empty heap
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        VectorHeap {
            dimension,
            metric,
            data: Vec::new(),
            id_to_offset: BTreeMap::new(),
        }
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.id_to_offset.len()
    }

    /// True if no vectors are stored
    pub fn is_empty(&self) -> bool {
        self.id_to_offset.is_empty()
    }

    /// Insert or overwrite the embedding for `id`
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` for a wrong-length embedding, `OutOfMemory` if the
    /// storage cannot grow.
    pub fn upsert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        if embedding.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                got: embedding.len(),
            });
        }

        if let Some(&offset) = self.id_to_offset.get(&id) {
            self.data[offset..offset + self.dimension].copy_from_slice(embedding);
            return Ok(());
        }

        self.data
            .try_reserve(self.dimension)
            .map_err(|_| VectorError::out_of_memory("vector heap"))?;
        let offset = self.data.len();
        self.data.extend_from_slice(embedding);
        self.id_to_offset.insert(id, offset);
        Ok(())
    }

    /// Embedding for `id`
    pub fn get(&self, id: VectorId) -> Option<&[f32]> {
        let offset = *self.id_to_offset.get(&id)?;
        Some(&self.data[offset..offset + self.dimension])
    }

    /// Whether `id` is stored
    pub fn contains(&self, id: VectorId) -> bool {
        self.id_to_offset.contains_key(&id)
    }

    /// Iterate all vectors in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (VectorId, &[f32])> + '_ {
        self.id_to_offset
            .iter()
            .map(|(&id, &offset)| (id, &self.data[offset..offset + self.dimension]))
    }

    /// All ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = VectorId> + '_ {
        self.id_to_offset.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_basic_operations() {
        let mut heap = VectorHeap::new(3, DistanceMetric::Cosine);
        heap.upsert(VectorId(1), &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(heap.get(VectorId(1)), Some(&[0.1, 0.2, 0.3][..]));

        heap.upsert(VectorId(1), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(heap.get(VectorId(1)), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(heap.len(), 1);
        assert!(heap.contains(VectorId(1)));
        assert!(!heap.contains(VectorId(2)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut heap = VectorHeap::new(3, DistanceMetric::Cosine);
        let err = heap.upsert(VectorId(1), &[1.0]).unwrap_err();
        assert_eq!(
            err,
            VectorError::DimensionMismatch {
                expected: 3,
                got: 1
            }
        );
        assert!(heap.is_empty());
    }

    #[test]
    fn test_deterministic_iteration() {
        let mut heap = VectorHeap::new(1, DistanceMetric::Euclidean);
        for id in [5u64, 1, 3, 2] {
            heap.upsert(VectorId(id), &[id as f32]).unwrap();
        }
        let ids: Vec<u64> = heap.ids().map(|id| id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 5]);
        let values: Vec<f32> = heap.iter().map(|(_, v)| v[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 5.0]);
    }
}
