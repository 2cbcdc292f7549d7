//! Density-based clustering (DBSCAN).
//!
//! A point is a core point when at least `min_samples` points, itself
//! included, lie within `eps`. Clusters grow from core points in index order,
//! so cluster ids are deterministic for a given input order.

use rayon::prelude::*;
use std::collections::VecDeque;

use super::squared_distance;

#[derive(Debug, Clone, PartialEq)]
pub struct DbscanParams {
    /// Neighborhood radius in standardized units
    pub eps: f64,
    pub min_samples: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 2,
        }
    }
}

/// Cluster id per point; `None` marks noise.
///
/// Neighborhoods are computed pairwise, quadratic in the number of points.
pub fn fit(points: &[Vec<f64>], params: &DbscanParams) -> Vec<Option<usize>> {
    let eps_sq = params.eps * params.eps;
    let neighborhoods: Vec<Vec<usize>> = points
        .par_iter()
        .map(|p| {
            points
                .iter()
                .enumerate()
                .filter(|(_, q)| squared_distance(p, q) <= eps_sq)
                .map(|(j, _)| j)
                .collect()
        })
        .collect();
    let is_core = |i: usize| neighborhoods[i].len() >= params.min_samples;

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut next_cluster = 0;

    for start in 0..points.len() {
        if visited[start] || !is_core(start) {
            continue;
        }
        let cluster = next_cluster;
        next_cluster += 1;

        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(i) = queue.pop_front() {
            labels[i] = Some(cluster);
            // Border points join but do not expand the cluster
            if !is_core(i) {
                continue;
            }
            for &j in &neighborhoods[i] {
                if !visited[j] {
                    visited[j] = true;
                    queue.push_back(j);
                }
            }
        }
    }

    labels
}
