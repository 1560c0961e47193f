//! Short k-means run used to seed mixture means
//!
//! A handful of Lloyd iterations is enough to place the initial means near
//! distinct mass concentrations, which cuts the number of EM iterations and
//! the odds of a degenerate restart. Not exposed as a clustering API of its
//! own; EM refines whatever this produces.

use ndarray::Array2;
use rand::rngs::StdRng;

use crate::maybe_rayon::*;

/// Centroid shift below which the refinement stops early.
const SHIFT_TOL: f64 = 1e-3;

/// Run a few k-means iterations and return the centroids, shape `(k, d)`.
///
/// Centroids start as `k` distinct data points drawn with `rng`. Empty
/// clusters keep their previous centroid. Caller guarantees `k <= n`.
pub(crate) fn kmeans_centroids(
    data: &Array2<f64>,
    k: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> Array2<f64> {
    let (n, d) = data.dim();

    let picks = rand::seq::index::sample(rng, n, k);
    let mut centroids = Array2::<f64>::zeros((k, d));
    for (c, idx) in picks.into_iter().enumerate() {
        for j in 0..d {
            centroids[[c, j]] = data[[idx, j]];
        }
    }

    for _iter in 0..max_iterations {
        // Assignment: nearest centroid by squared Euclidean distance
        let labels: Vec<usize> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut best = 0;
                let mut best_dist = f64::INFINITY;
                for c in 0..k {
                    let mut dist = 0.0;
                    for j in 0..d {
                        let diff = data[[i, j]] - centroids[[c, j]];
                        dist += diff * diff;
                    }
                    if dist < best_dist {
                        best_dist = dist;
                        best = c;
                    }
                }
                best
            })
            .collect();

        // Update: mean of assigned points
        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for (i, &c) in labels.iter().enumerate() {
            counts[c] += 1;
            for j in 0..d {
                sums[[c, j]] += data[[i, j]];
            }
        }

        let mut max_shift = 0.0_f64;
        for c in 0..k {
            if counts[c] == 0 {
                continue; // keep previous centroid
            }
            for j in 0..d {
                let updated = sums[[c, j]] / counts[c] as f64;
                max_shift = max_shift.max((updated - centroids[[c, j]]).abs());
                centroids[[c, j]] = updated;
            }
        }

        if max_shift < SHIFT_TOL {
            break;
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_centroids_land_on_groups() {
        let data = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [9.0, 9.0],
            [9.2, 9.1],
            [8.9, 9.2],
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let centroids = kmeans_centroids(&data, 2, 20, &mut rng);

        // One centroid near the origin group, one near (9, 9), either order.
        let near_origin = (0..2).any(|c| centroids[[c, 0]].abs() < 1.0 && centroids[[c, 1]].abs() < 1.0);
        let near_nine = (0..2).any(|c| (centroids[[c, 0]] - 9.0).abs() < 1.0 && (centroids[[c, 1]] - 9.0).abs() < 1.0);
        assert!(near_origin && near_nine, "centroids: {centroids:?}");
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let data = array![[0.0, 0.0], [1.0, 0.5], [5.0, 5.0], [6.0, 5.5]];
        let a = kmeans_centroids(&data, 2, 10, &mut StdRng::seed_from_u64(1));
        let b = kmeans_centroids(&data, 2, 10, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
