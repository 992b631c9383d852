//! Shared distance functions for vector similarity computation.
//!
//! All scores are normalized to "higher = more similar". Vectors are used
//! as-is; nothing is normalized implicitly.

use std::cmp::Ordering;

use stratavec_core::{DistanceMetric, VectorId};

/// Compute similarity score between two vectors
pub fn compute_similarity(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(
        a.len(),
        b.len(),
        "Dimension mismatch in similarity computation"
    );

    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => euclidean_similarity(a, b),
        DistanceMetric::DotProduct => dot_product(a, b),
    }
}

/// Cosine similarity; 0.0 if either vector has zero norm
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// 1 / (1 + l2_distance)
fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    1.0 / (1.0 + squared_l2(a, b).sqrt())
}

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Squared Euclidean distance, used for centroid assignment
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Sort results by (score desc, VectorId asc) and keep the top `k`
pub fn rank_results(results: &mut Vec<(VectorId, f32)>, k: usize) {
    results.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    results.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = [1.0, 2.0, 3.0];
        let s = compute_similarity(&a, &a, DistanceMetric::Cosine);
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm() {
        let s = compute_similarity(&[0.0, 0.0], &[1.0, 1.0], DistanceMetric::Cosine);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_euclidean_similarity() {
        let s = compute_similarity(&[0.0, 0.0], &[3.0, 4.0], DistanceMetric::Euclidean);
        assert!((s - 1.0 / 6.0).abs() < 1e-6);
        let same = compute_similarity(&[1.0, 1.0], &[1.0, 1.0], DistanceMetric::Euclidean);
        assert!((same - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product() {
        let s = compute_similarity(&[1.0, 2.0], &[3.0, 4.0], DistanceMetric::DotProduct);
        assert!((s - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_results_tie_break() {
        let mut r = vec![
            (VectorId(3), 0.5),
            (VectorId(1), 0.9),
            (VectorId(2), 0.5),
            (VectorId(4), 0.1),
        ];
        rank_results(&mut r, 3);
        assert_eq!(
            r,
            vec![(VectorId(1), 0.9), (VectorId(2), 0.5), (VectorId(3), 0.5)]
        );
    }
}
