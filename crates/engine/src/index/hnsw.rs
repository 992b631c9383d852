//! HNSW (Hierarchical Navigable Small World) index
//!
//! Layer 0 holds every node with up to 2*M links; each higher layer holds a
//! geometrically shrinking subset with up to M links. Search descends
//! greedily from the top layer and runs a beam search of width `ef` on
//! layer 0.
//!
//! Builds are reproducible: levels come from a fixed-seed SplitMix64
//! stream, nodes live in a BTreeMap and neighbor sets are BTreeSets.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use stratavec_core::{DistanceMetric, IndexType, VectorId, VectorResult};

use super::distance::compute_similarity;
use super::heap::VectorHeap;
use super::{check_query, SearchParams, VectorIndex};
use crate::config::HnswConfig;

const LEVEL_SEED: u64 = 42;

#[derive(Debug, Clone)]
struct HnswNode {
    /// neighbors[layer] = linked ids on that layer
    neighbors: Vec<BTreeSet<VectorId>>,
}

impl HnswNode {
    fn new(max_layer: usize) -> Self {
        Self {
            neighbors: (0..=max_layer).map(|_| BTreeSet::new()).collect(),
        }
    }
}

/// Candidate ordered by score, lower id winning ties
#[derive(Debug, Clone, PartialEq)]
struct ScoredId {
    score: f32,
    id: VectorId,
}

impl Eq for ScoredId {}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap<ScoredId> pops the nearest; BinaryHeap<Reverse<_>> pops the worst
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn sort_desc(v: &mut [ScoredId]) {
    v.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// HNSW graph index owning its embeddings
#[derive(Debug, Clone)]
pub struct HnswIndex {
    config: HnswConfig,
    heap: VectorHeap,
    nodes: BTreeMap<VectorId, HnswNode>,
    entry_point: Option<VectorId>,
    max_level: usize,
    rng_counter: u64,
}

impl HnswIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: DistanceMetric, config: HnswConfig) -> Self {
        Self {
            config,
            heap: VectorHeap::new(dimension, metric),
            nodes: BTreeMap::new(),
            entry_point: None,
            max_level: 0,
            rng_counter: 0,
        }
    }

    /// Build parameters
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Highest layer currently in the graph
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn assign_level(&mut self) -> usize {
        self.rng_counter += 1;
        let hash = splitmix64(LEVEL_SEED.wrapping_add(self.rng_counter));
        let uniform = ((hash as f64) / (u64::MAX as f64)).max(1e-15);
        (-uniform.ln() * self.config.ml()) as usize
    }

    fn score(&self, query: &[f32], id: VectorId) -> Option<f32> {
        self.heap
            .get(id)
            .map(|e| compute_similarity(query, e, self.heap.metric()))
    }

    /// Beam search on one layer; returns up to `ef` nodes sorted best first
    fn search_layer(&self, query: &[f32], entry: VectorId, ef: usize, layer: usize) -> Vec<ScoredId> {
        let Some(entry_score) = self.score(query, entry) else {
            return Vec::new();
        };

        let mut visited = BTreeSet::new();
        visited.insert(entry);

        let mut candidates = BinaryHeap::new();
        candidates.push(ScoredId {
            score: entry_score,
            id: entry,
        });
        let mut results: BinaryHeap<Reverse<ScoredId>> = BinaryHeap::new();
        results.push(Reverse(ScoredId {
            score: entry_score,
            id: entry,
        }));

        while let Some(nearest) = candidates.pop() {
            let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
            if nearest.score < worst && results.len() >= ef {
                break;
            }

            let Some(links) = self
                .nodes
                .get(&nearest.id)
                .and_then(|n| n.neighbors.get(layer))
            else {
                continue;
            };

            for &neighbor in links {
                if !visited.insert(neighbor) {
                    continue;
                }
                let Some(score) = self.score(query, neighbor) else {
                    continue;
                };
                let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
                if results.len() < ef || score > worst {
                    candidates.push(ScoredId { score, id: neighbor });
                    results.push(Reverse(ScoredId { score, id: neighbor }));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<ScoredId> = results.into_iter().map(|r| r.0).collect();
        sort_desc(&mut out);
        out
    }

    /// Greedy descent from `from_layer` down to `to_layer`, moving to the
    /// best neighbor until no neighbor improves
    fn greedy_descend(
        &self,
        query: &[f32],
        entry: VectorId,
        from_layer: usize,
        to_layer: usize,
    ) -> VectorId {
        let mut current = entry;
        for layer in (to_layer..=from_layer).rev() {
            loop {
                let Some(mut best_score) = self.score(query, current) else {
                    break;
                };
                let mut best = current;
                if let Some(links) = self.nodes.get(&current).and_then(|n| n.neighbors.get(layer)) {
                    for &neighbor in links {
                        if let Some(score) = self.score(query, neighbor) {
                            if score > best_score || (score == best_score && neighbor < best) {
                                best_score = score;
                                best = neighbor;
                            }
                        }
                    }
                }
                if best == current {
                    break;
                }
                current = best;
            }
        }
        current
    }

    /// Keep only the `max_conn` links of `id` closest to it
    fn prune_links(&mut self, id: VectorId, layer: usize, max_conn: usize) {
        let Some(embedding) = self.heap.get(id).map(<[f32]>::to_vec) else {
            return;
        };
        let Some(links) = self.nodes.get(&id).and_then(|n| n.neighbors.get(layer)) else {
            return;
        };

        let mut scored: Vec<ScoredId> = links
            .iter()
            .filter_map(|&nid| self.score(&embedding, nid).map(|score| ScoredId { score, id: nid }))
            .collect();
        sort_desc(&mut scored);
        let keep: BTreeSet<VectorId> = scored.iter().take(max_conn).map(|s| s.id).collect();

        if let Some(slot) = self.nodes.get_mut(&id).and_then(|n| n.neighbors.get_mut(layer)) {
            *slot = keep;
        }
    }

    /// Insert a vector and link it into the graph
    ///
    /// Re-inserting an existing id overwrites its embedding; links are kept.
    pub fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        let existed = self.heap.contains(id);
        self.heap.upsert(id, embedding)?;
        if existed {
            return Ok(());
        }

        let level = self.assign_level();
        self.nodes.insert(id, HnswNode::new(level));

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return Ok(());
        };

        let mut current = entry;
        if self.max_level > level {
            current = self.greedy_descend(embedding, entry, self.max_level, level + 1);
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(embedding, current, self.config.ef_construction, layer);
            let selected: Vec<VectorId> = candidates
                .iter()
                .filter(|c| c.id != id)
                .take(self.config.m)
                .map(|c| c.id)
                .collect();

            if let Some(links) = self.nodes.get_mut(&id).and_then(|n| n.neighbors.get_mut(layer)) {
                links.extend(selected.iter().copied());
            }

            let max_conn = if layer == 0 {
                self.config.max_connections_layer0()
            } else {
                self.config.m
            };
            for &neighbor in &selected {
                let over = match self
                    .nodes
                    .get_mut(&neighbor)
                    .and_then(|n| n.neighbors.get_mut(layer))
                {
                    Some(links) => {
                        links.insert(id);
                        links.len() > max_conn
                    }
                    None => false,
                };
                if over {
                    self.prune_links(neighbor, layer, max_conn);
                }
            }

            if let Some(closest) = candidates.first() {
                current = closest.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
        Ok(())
    }
}

impl VectorIndex for HnswIndex {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> VectorResult<Vec<(VectorId, f32)>> {
        check_query(self.heap.dimension(), query)?;
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut current = entry;
        if self.max_level > 0 {
            current = self.greedy_descend(query, entry, self.max_level, 1);
        }

        let base = if params.ef_search > 0 {
            params.ef_search
        } else {
            self.config.ef_search
        };
        let ef = base.max(k);
        Ok(self
            .search_layer(query, current, ef, 0)
            .into_iter()
            .take(k)
            .map(|s| (s.id, s.score))
            .collect())
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
        IndexType::Hnsw
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.heap.get(id)
    }
}
