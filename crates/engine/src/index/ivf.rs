//! IVF-Flat index
//!
//! Training runs k-means (k-means++ seeding, Lloyd iterations) over the
//! full build set to place `nlist` centroids. Each vector is stored in the
//! list of its nearest centroid; a search scores only the vectors in the
//! `nprobe` lists whose centroids are closest to the query.
//!
//! Centroid assignment uses squared L2 regardless of the scoring metric.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratavec_core::{DistanceMetric, IndexType, VectorError, VectorId, VectorResult};

use super::distance::{compute_similarity, rank_results, squared_l2};
use super::heap::VectorHeap;
use super::{check_query, SearchParams, VectorIndex};
use crate::config::IvfConfig;

/// Mean centroid movement below which k-means stops early
const CONVERGENCE_TOLERANCE: f32 = 1e-4;

/// Inverted-file index over k-means partitions
#[derive(Debug, Clone)]
pub struct IvfFlatIndex {
    config: IvfConfig,
    heap: VectorHeap,
    /// nlist * dimension floats
    centroids: Vec<f32>,
    lists: Vec<Vec<VectorId>>,
    /// id -> list it was placed in
    assignment: BTreeMap<VectorId, usize>,
    trained: bool,
}

impl IvfFlatIndex {
    /// Create an untrained index
    pub fn new(dimension: usize, metric: DistanceMetric, config: IvfConfig) -> Self {
        Self {
            config,
            heap: VectorHeap::new(dimension, metric),
            centroids: Vec::new(),
            lists: Vec::new(),
            assignment: BTreeMap::new(),
            trained: false,
        }
    }

    /// Whether `train` has run
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Number of partitions
    pub fn nlist(&self) -> usize {
        self.lists.len()
    }

    /// Vectors stored in each partition
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    fn centroid(&self, i: usize) -> &[f32] {
        let d = self.heap.dimension();
        &self.centroids[i * d..(i + 1) * d]
    }

    fn nearest_centroid(&self, v: &[f32]) -> usize {
        nearest(&self.centroids, self.heap.dimension(), v).0
    }

    /// Place centroids by running k-means over `data` (row-major, `dimension` floats per row)
    ///
    /// Training on zero rows leaves the index trained with no partitions.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `data` is not a whole number of rows.
    pub fn train(&mut self, data: &[f32]) -> VectorResult<()> {
        let dim = self.heap.dimension();
        if dim == 0 || data.len() % dim != 0 {
            return Err(VectorError::invalid_argument(format!(
                "training buffer of {} floats is not a multiple of dimension {}",
                data.len(),
                dim
            )));
        }
        let n = data.len() / dim;

        let nlist = match self.config.nlist {
            0 => ((n as f64).sqrt().round() as usize).max(1),
            fixed => fixed,
        }
        .min(n);

        self.centroids = kmeans(data, dim, nlist, &self.config);
        self.lists = vec![Vec::new(); nlist];
        self.assignment.clear();
        self.trained = true;
        Ok(())
    }

    /// Store a vector in its nearest partition
    ///
    /// # Errors
    ///
    /// `BuildFailed` if the index has no partitions yet; `DimensionMismatch`
    /// for a wrong-length embedding.
    pub fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        if self.lists.is_empty() {
            return Err(VectorError::build_failed(
                "IVF index must be trained before insert",
            ));
        }
        self.heap.upsert(id, embedding)?;

        let list = self.nearest_centroid(embedding);
        if let Some(prev) = self.assignment.insert(id, list) {
            self.lists[prev].retain(|&x| x != id);
        }
        self.lists[list].push(id);
        Ok(())
    }
}

/// Index and squared distance of the row in `centroids` nearest to `v`
fn nearest(centroids: &[f32], dim: usize, v: &[f32]) -> (usize, f32) {
    centroids
        .chunks_exact(dim)
        .map(|c| squared_l2(v, c))
        .enumerate()
        .fold((0, f32::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

/// k-means++ seeding followed by Lloyd iterations; returns `k * dim` floats
fn kmeans(data: &[f32], dim: usize, k: usize, config: &IvfConfig) -> Vec<f32> {
    if k == 0 {
        return Vec::new();
    }
    let rows: Vec<&[f32]> = data.chunks_exact(dim).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);

    // Seeding: each next centroid drawn with probability proportional to
    // squared distance from the nearest chosen one
    let mut centroids: Vec<f32> = Vec::with_capacity(k * dim);
    centroids.extend_from_slice(rows[rng.gen_range(0..rows.len())]);
    let mut min_dist: Vec<f32> = rows.iter().map(|r| squared_l2(r, &centroids[..dim])).collect();
    while centroids.len() < k * dim {
        let total: f32 = min_dist.iter().sum();
        let pick = if total <= f32::EPSILON {
            rng.gen_range(0..rows.len())
        } else {
            let target = rng.gen::<f32>() * total;
            let mut acc = 0.0;
            min_dist
                .iter()
                .position(|&d| {
                    acc += d;
                    acc >= target
                })
                .unwrap_or(rows.len() - 1)
        };
        let start = centroids.len();
        centroids.extend_from_slice(rows[pick]);
        for (d, r) in min_dist.iter_mut().zip(&rows) {
            *d = d.min(squared_l2(r, &centroids[start..start + dim]));
        }
    }

    let mut assignments = vec![usize::MAX; rows.len()];
    for _ in 0..config.kmeans_iterations {
        let mut changed = false;
        for (slot, r) in assignments.iter_mut().zip(&rows) {
            let (c, _) = nearest(&centroids, dim, r);
            if *slot != c {
                *slot = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![0.0f32; k * dim];
        let mut counts = vec![0usize; k];
        for (&c, r) in assignments.iter().zip(&rows) {
            counts[c] += 1;
            for (s, x) in sums[c * dim..(c + 1) * dim].iter_mut().zip(r.iter()) {
                *s += x;
            }
        }

        let mut movement = 0.0f32;
        for c in 0..k {
            // Empty partitions keep their previous centroid
            if counts[c] == 0 {
                continue;
            }
            let mean: Vec<f32> = sums[c * dim..(c + 1) * dim]
                .iter()
                .map(|s| s / counts[c] as f32)
                .collect();
            movement += squared_l2(&mean, &centroids[c * dim..(c + 1) * dim]).sqrt();
            centroids[c * dim..(c + 1) * dim].copy_from_slice(&mean);
        }
        if movement / (k as f32) < CONVERGENCE_TOLERANCE {
            break;
        }
    }
    centroids
}

impl VectorIndex for IvfFlatIndex {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> VectorResult<Vec<(VectorId, f32)>> {
        check_query(self.heap.dimension(), query)?;
        if k == 0 || self.heap.is_empty() {
            return Ok(Vec::new());
        }

        let nprobe = if params.nprobe > 0 {
            params.nprobe
        } else {
            self.config.nprobe
        }
        .max(1)
        .min(self.lists.len());

        let mut order: Vec<(usize, f32)> = (0..self.lists.len())
            .map(|i| (i, squared_l2(query, self.centroid(i))))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let metric = self.heap.metric();
        let mut results: Vec<(VectorId, f32)> = order
            .iter()
            .take(nprobe)
            .flat_map(|&(list, _)| self.lists[list].iter())
            .filter_map(|&id| {
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
        IndexType::IvfFlat
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.heap.get(id)
    }
}
