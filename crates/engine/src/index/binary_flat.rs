//! Binary-flat index: Hamming coarse filter, exact rerank
//!
//! Every vector is stored twice: as sign bits (one byte per 8 dimensions)
//! and as full floats. A search ranks all codes by Hamming distance to the
//! quantized query, keeps the best candidates, then rescores those with
//! the exact metric.

use rustc_hash::FxHashMap;
use stratavec_core::{DistanceMetric, IndexType, VectorId, VectorResult};

use super::distance::{compute_similarity, rank_results};
use super::heap::VectorHeap;
use super::{check_query, SearchParams, VectorIndex};
use crate::config::BinaryConfig;
use crate::quant::{bytes_needed, hamming_distance_fast, BinaryVector};

/// Two-stage index over binary codes
#[derive(Debug, Clone)]
pub struct BinaryFlatIndex {
    config: BinaryConfig,
    heap: VectorHeap,
    /// Concatenated codes, `bytes_needed(dimension)` bytes each
    codes: Vec<u8>,
    /// Code owner, parallel to `codes`
    code_ids: Vec<VectorId>,
    /// id -> position in `code_ids`
    slots: FxHashMap<VectorId, usize>,
}

impl BinaryFlatIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: DistanceMetric, config: BinaryConfig) -> Self {
        Self {
            config,
            heap: VectorHeap::new(dimension, metric),
            codes: Vec::new(),
            code_ids: Vec::new(),
            slots: FxHashMap::default(),
        }
    }

    fn code_len(&self) -> usize {
        bytes_needed(self.heap.dimension())
    }

    /// Quantize and store a vector
    ///
    /// Re-inserting an id replaces both its floats and its code. A failed
    /// insert leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` for a wrong-length embedding, `InvalidArgument`
    /// for an empty one.
    pub fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        // Quantize before touching the heap so a rejected vector stores nothing
        let code = BinaryVector::quantize(embedding)?;
        self.heap.upsert(id, embedding)?;
        let len = self.code_len();

        match self.slots.get(&id) {
            Some(&slot) => {
                self.codes[slot * len..(slot + 1) * len].copy_from_slice(code.as_bytes());
            }
            None => {
                self.slots.insert(id, self.code_ids.len());
                self.codes.extend_from_slice(code.as_bytes());
                self.code_ids.push(id);
            }
        }
        Ok(())
    }

    /// Packed code bytes for `id`, `bytes_needed(dimension)` long
    pub fn code(&self, id: VectorId) -> Option<&[u8]> {
        let slot = *self.slots.get(&id)?;
        let len = self.code_len();
        Some(&self.codes[slot * len..(slot + 1) * len])
    }

    /// Number of candidates kept for exact rerank
    fn candidate_count(&self, k: usize, params: &SearchParams) -> usize {
        params
            .rerank_top
            .max(k.saturating_mul(self.config.rerank_factor))
            .max(k)
    }
}

impl VectorIndex for BinaryFlatIndex {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> VectorResult<Vec<(VectorId, f32)>> {
        let dim = self.heap.dimension();
        check_query(dim, query)?;
        if k == 0 || self.heap.is_empty() {
            return Ok(Vec::new());
        }

        let q = BinaryVector::quantize(query)?;
        let len = self.code_len();
        let mut coarse: Vec<(usize, VectorId)> = Vec::with_capacity(self.code_ids.len());
        for (chunk, &id) in self.codes.chunks_exact(len).zip(&self.code_ids) {
            let code = BinaryVector::wrap(chunk, dim)?;
            coarse.push((hamming_distance_fast(&q, &code)?, id));
        }
        coarse.sort_unstable();
        coarse.truncate(self.candidate_count(k, params));

        let metric = self.heap.metric();
        let mut results: Vec<(VectorId, f32)> = coarse
            .into_iter()
            .filter_map(|(_, id)| {
                self.heap
                    .get(id)
                    .map(|e| (id, compute_similarity(query, e, metric)))
            })
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
        IndexType::BinaryFlat
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.heap.get(id)
    }
}
