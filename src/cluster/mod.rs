//! Artist classification strategies.
//!
//! Every strategy consumes the per-artist feature summaries and yields one
//! optional label per artist (same order as the summaries):
//!
//! - `Binning`: equal-width ordinal buckets over one feature's artist means
//! - `Centroid`: k-means over standardized multi-feature vectors
//! - `Density`: DBSCAN over the same standardized vectors
//!
//! Binning is deterministic by construction. The centroid strategy is seeded,
//! so it is reproducible for a fixed seed; its ids carry no meaning across
//! different seeds.

pub mod binning;
pub mod dbscan;
pub mod kmeans;

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::features::{ArtistFeatureSummary, MeanAccumulator};
use crate::models::Feature;

pub use binning::BinningSpec;
pub use dbscan::DbscanParams;
pub use kmeans::KMeansParams;

// ============================================================================
// Labels & Assignments
// ============================================================================

/// Cluster label of one artist under one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterLabel {
    /// Ordinal bucket from a binning vocabulary; orders by `index`
    Bin { index: usize, name: String },
    /// Centroid or density cluster id
    Id(usize),
    /// Density outlier
    Noise,
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterLabel::Bin { name, .. } => f.write_str(name),
            ClusterLabel::Id(id) => write!(f, "{}", id),
            ClusterLabel::Noise => f.write_str("noise"),
        }
    }
}

// Bin labels are strings, ids are integers and noise is -1, the usual
// convention of clustering toolkits.
impl Serialize for ClusterLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClusterLabel::Bin { name, .. } => serializer.serialize_str(name),
            ClusterLabel::Id(id) => serializer.serialize_u64(*id as u64),
            ClusterLabel::Noise => serializer.serialize_i64(-1),
        }
    }
}

/// Strategy-specific facts about a classification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterDetail {
    Binning {
        /// B + 1 edges; empty when no artist has a value
        edges: Vec<f64>,
        degenerate: bool,
    },
    Centroid {
        k: usize,
        inertia: f64,
        iterations: usize,
        centroids: Vec<Vec<f64>>,
    },
    Density {
        clusters: usize,
        noise: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub strategy: &'static str,
    /// Feature(s) the labels were computed from
    pub dimension: String,
    /// Column name in the cluster table
    pub column: String,
    /// Aligned with the summaries passed to `classify`; `None` = unassigned
    pub labels: Vec<Option<ClusterLabel>>,
    pub detail: ClusterDetail,
}

impl ClusterAssignment {
    pub fn label(&self, index: usize) -> Option<&ClusterLabel> {
        self.labels.get(index).and_then(Option::as_ref)
    }

    /// Number of artists per label; unassigned artists are not counted
    pub fn distribution(&self) -> BTreeMap<ClusterLabel, usize> {
        let mut counts = BTreeMap::new();
        for label in self.labels.iter().flatten() {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// Strategy
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterStrategy {
    Binning(BinningSpec),
    Centroid {
        dimensions: Vec<Feature>,
        params: KMeansParams,
    },
    Density {
        dimensions: Vec<Feature>,
        params: DbscanParams,
    },
}

impl ClusterStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterStrategy::Binning(_) => "binning",
            ClusterStrategy::Centroid { .. } => "kmeans",
            ClusterStrategy::Density { .. } => "dbscan",
        }
    }

    pub fn column(&self) -> String {
        match self {
            ClusterStrategy::Binning(spec) => spec.column(),
            _ => format!("{}_cluster", self.name()),
        }
    }

    pub fn classify(&self, summaries: &[ArtistFeatureSummary]) -> ClusterAssignment {
        let (dimension, labels, detail) = match self {
            ClusterStrategy::Binning(spec) => {
                let (labels, detail) = binning::classify(spec, summaries);
                (spec.feature.name().to_string(), labels, detail)
            }
            ClusterStrategy::Centroid { dimensions, params } => {
                let points = standardize(summaries, dimensions);
                let (labels, detail) = match kmeans::fit(&points, params) {
                    Some(fit) => (
                        fit.labels.iter().map(|&c| Some(ClusterLabel::Id(c))).collect(),
                        ClusterDetail::Centroid {
                            k: fit.centroids.len(),
                            inertia: fit.inertia,
                            iterations: fit.iterations,
                            centroids: fit.centroids,
                        },
                    ),
                    None => (
                        vec![None; summaries.len()],
                        ClusterDetail::Centroid {
                            k: 0,
                            inertia: 0.0,
                            iterations: 0,
                            centroids: Vec::new(),
                        },
                    ),
                };
                (dimension_name(dimensions), labels, detail)
            }
            ClusterStrategy::Density { dimensions, params } => {
                let points = standardize(summaries, dimensions);
                let raw = dbscan::fit(&points, params);
                let clusters = raw.iter().flatten().max().map_or(0, |&m| m + 1);
                let noise = raw.iter().filter(|l| l.is_none()).count();
                let labels = raw
                    .into_iter()
                    .map(|l| Some(l.map_or(ClusterLabel::Noise, ClusterLabel::Id)))
                    .collect();
                (
                    dimension_name(dimensions),
                    labels,
                    ClusterDetail::Density { clusters, noise },
                )
            }
        };

        ClusterAssignment {
            strategy: self.name(),
            dimension,
            column: self.column(),
            labels,
            detail,
        }
    }
}

fn dimension_name(dimensions: &[Feature]) -> String {
    dimensions
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join("+")
}

// ============================================================================
// Standardization
// ============================================================================

/// Build zero-mean / unit-variance vectors from the artists' feature means.
///
/// Missing means are imputed with the population mean of that feature, which
/// is 0 after scaling. A feature with zero variance scales to 0 everywhere.
pub fn standardize(summaries: &[ArtistFeatureSummary], dimensions: &[Feature]) -> Vec<Vec<f64>> {
    let scales: Vec<(f64, f64)> = dimensions
        .iter()
        .map(|&feature| {
            let mut acc = MeanAccumulator::default();
            for value in summaries.iter().filter_map(|s| s.mean(feature)) {
                acc.push(value);
            }
            let mean = acc.mean().unwrap_or(0.0);
            let std = acc.population_std().unwrap_or(0.0);
            (mean, std)
        })
        .collect();

    summaries
        .iter()
        .map(|summary| {
            dimensions
                .iter()
                .zip(&scales)
                .map(|(&feature, &(mean, std))| match summary.mean(feature) {
                    Some(v) if std > 0.0 => (v - mean) / std,
                    _ => 0.0,
                })
                .collect()
        })
        .collect()
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::aggregate_features;
    use crate::models::{ArtistList, FeatureVector, TrackRecord};

    fn artist(name: &str, popularity: Option<f64>, energy: Option<f64>) -> TrackRecord {
        let mut features = FeatureVector::new();
        features.set(Feature::Popularity, popularity);
        features.set(Feature::Energy, energy);
        TrackRecord {
            id: format!("{}-t", name),
            title: name.to_string(),
            album: None,
            artists: ArtistList::from_tokens([name]).0,
            features,
            source_playlist: None,
        }
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let summaries = aggregate_features(&[
            artist("A", Some(0.0), Some(1.0)),
            artist("B", Some(10.0), Some(1.0)),
        ]);
        let points = standardize(&summaries, &[Feature::Popularity, Feature::Energy]);
        assert_eq!(points[0], vec![-1.0, 0.0]);
        assert_eq!(points[1], vec![1.0, 0.0]);
    }

    #[test]
    fn test_standardize_imputes_missing_with_mean() {
        let summaries = aggregate_features(&[
            artist("A", Some(0.0), None),
            artist("B", Some(10.0), None),
            artist("C", None, None),
        ]);
        let points = standardize(&summaries, &[Feature::Popularity]);
        assert_eq!(points[2], vec![0.0]);
    }

    #[test]
    fn test_label_serialization() {
        let bin = ClusterLabel::Bin {
            index: 1,
            name: "Low".into(),
        };
        assert_eq!(serde_json::to_string(&bin).unwrap(), "\"Low\"");
        assert_eq!(serde_json::to_string(&ClusterLabel::Id(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&ClusterLabel::Noise).unwrap(), "-1");
    }

    #[test]
    fn test_strategies_share_one_interface() {
        let summaries = aggregate_features(&[
            artist("A", Some(10.0), Some(0.1)),
            artist("B", Some(12.0), Some(0.2)),
            artist("C", Some(90.0), Some(0.9)),
        ]);
        let dims = vec![Feature::Popularity, Feature::Energy];
        let strategies = vec![
            ClusterStrategy::Binning(BinningSpec::popularity()),
            ClusterStrategy::Centroid {
                dimensions: dims.clone(),
                params: KMeansParams {
                    k: 2,
                    ..KMeansParams::default()
                },
            },
            ClusterStrategy::Density {
                dimensions: dims,
                params: DbscanParams::default(),
            },
        ];
        for strategy in &strategies {
            let assignment = strategy.classify(&summaries);
            assert_eq!(assignment.labels.len(), 3);
            assert_eq!(assignment.strategy, strategy.name());
        }
        assert_eq!(strategies[0].column(), "popularity_cluster");
        assert_eq!(strategies[1].column(), "kmeans_cluster");
        assert_eq!(strategies[2].column(), "dbscan_cluster");

        let kmeans = strategies[1].classify(&summaries);
        assert_eq!(kmeans.dimension, "popularity+energy");
        assert_eq!(kmeans.label(0), kmeans.label(1));
        assert_ne!(kmeans.label(0), kmeans.label(2));
    }

    #[test]
    fn test_distribution_counts_labels() {
        let assignment = ClusterAssignment {
            strategy: "dbscan",
            dimension: "popularity".into(),
            column: "dbscan_cluster".into(),
            labels: vec![
                Some(ClusterLabel::Id(0)),
                Some(ClusterLabel::Id(0)),
                Some(ClusterLabel::Noise),
                None,
            ],
            detail: ClusterDetail::Density { clusters: 1, noise: 1 },
        };
        let dist = assignment.distribution();
        assert_eq!(dist.get(&ClusterLabel::Id(0)), Some(&2));
        assert_eq!(dist.get(&ClusterLabel::Noise), Some(&1));
        assert_eq!(dist.values().sum::<usize>(), 3);
    }
}
