//! Seeded k-means (k-means++ initialization, Lloyd iterations).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::squared_distance;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    /// Requested cluster count; capped at the number of points
    pub k: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop when the summed squared centroid shift falls below this
    pub tolerance: f64,
    /// Independent restarts; the lowest inertia wins
    pub n_init: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster id per point, numbered in order of first appearance
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
}

/// Fit k-means. Returns `None` when there is nothing to cluster.
pub fn fit(points: &[Vec<f64>], params: &KMeansParams) -> Option<KMeansFit> {
    let k = params.k.min(points.len());
    if k == 0 {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..params.n_init.max(1) {
        let centroids = init_plus_plus(points, k, &mut rng);
        let run = lloyd(points, centroids, params);
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    best.map(canonicalize)
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    let mut distances: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut pick = points.len() - 1;
            for (i, &d) in distances.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            // All points coincide with a centroid already
            rng.random_range(0..points.len())
        };

        let centroid = points[chosen].clone();
        for (d, p) in distances.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, params: &KMeansParams) -> KMeansFit {
    let dims = points[0].len();
    let mut labels = vec![0; points.len()];
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centroids).0;
        }

        let mut sums = vec![vec![0.0; dims]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&label, point) in labels.iter().zip(points) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for (i, centroid) in centroids.iter_mut().enumerate() {
            // An emptied cluster keeps its previous centroid
            if counts[i] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[i].iter().map(|s| s / counts[i] as f64).collect();
            shift += squared_distance(centroid, &updated);
            *centroid = updated;
        }
        if shift <= params.tolerance {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, point) in labels.iter_mut().zip(points) {
        let (nearest_idx, d) = nearest(point, &centroids);
        *label = nearest_idx;
        inertia += d;
    }

    KMeansFit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Renumber clusters by first appearance so equal partitions print equal ids.
/// Centroids of clusters that ended up with no points are dropped.
fn canonicalize(fit: KMeansFit) -> KMeansFit {
    let mut mapping: Vec<Option<usize>> = vec![None; fit.centroids.len()];
    let mut next = 0;
    for &label in &fit.labels {
        if mapping[label].is_none() {
            mapping[label] = Some(next);
            next += 1;
        }
    }

    let mut centroids = vec![Vec::new(); next];
    for (old, new) in mapping.iter().enumerate() {
        if let Some(new) = new {
            centroids[*new] = fit.centroids[old].clone();
        }
    }
    let labels = fit
        .labels
        .iter()
        .map(|&l| mapping[l].unwrap_or(0))
        .collect();

    KMeansFit {
        labels,
        centroids,
        inertia: fit.inertia,
        iterations: fit.iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
        ]
    }

    #[test]
    fn test_separates_two_blobs() {
        let params = KMeansParams {
            k: 2,
            ..KMeansParams::default()
        };
        let fit = fit(&blobs(), &params).unwrap();
        assert_eq!(fit.labels, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(fit.centroids.len(), 2);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_k_is_capped_at_point_count() {
        let points = vec![vec![0.0], vec![1.0]];
        let fit = fit(&points, &KMeansParams::default()).unwrap();
        assert_eq!(fit.centroids.len(), 2);
        assert_eq!(fit.labels, vec![0, 1]);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(fit(&[], &KMeansParams::default()).is_none());
    }

    #[test]
    fn test_identical_points_do_not_panic() {
        let points = vec![vec![1.0, 1.0]; 4];
        let fit = fit(&points, &KMeansParams::default()).unwrap();
        assert!(fit.labels.iter().all(|&l| l == 0));
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let params = KMeansParams {
            k: 3,
            seed: 7,
            ..KMeansParams::default()
        };
        assert_eq!(fit(&blobs(), &params), fit(&blobs(), &params));
    }
}
