//! Equal-width ordinal binning of one feature's per-artist means.
//!
//! The value range [min, max] is cut into B equal-width, right-closed bins
//! (the first bin also includes `min`). B is the size of the label vocabulary,
//! so labels are deterministic given the edges.

use super::{ClusterDetail, ClusterLabel};
use crate::features::ArtistFeatureSummary;
use crate::models::Feature;

#[derive(Debug, Clone, PartialEq)]
pub struct BinningSpec {
    pub feature: Feature,
    /// Ordered vocabulary, lowest bin first
    pub labels: Vec<String>,
}

impl BinningSpec {
    pub fn new(feature: Feature, labels: &[&str]) -> Self {
        Self {
            feature,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn popularity() -> Self {
        Self::new(
            Feature::Popularity,
            &["Very Low", "Low", "Medium", "High", "Very High"],
        )
    }

    pub fn danceability() -> Self {
        Self::new(
            Feature::Danceability,
            &["Low Dance", "Medium Dance", "High Dance"],
        )
    }

    pub fn energy() -> Self {
        Self::new(
            Feature::Energy,
            &["Low Energy", "Medium Energy", "High Energy"],
        )
    }

    pub fn bin_count(&self) -> usize {
        self.labels.len()
    }

    pub fn column(&self) -> String {
        format!("{}_cluster", self.feature.name())
    }
}

/// Index of the bin holding `value`.
///
/// Bins are right-closed against the exact edges `bin_edges` reports, so a
/// value equal to an edge lands in the lower bin. Non-decreasing in `value`.
/// When `min == max` every value lands in the middle bin.
pub fn bin_index(value: f64, min: f64, max: f64, bins: usize) -> usize {
    if bins <= 1 || max <= min {
        return bins / 2;
    }
    let width = bin_width(min, max, bins);
    (1..bins)
        .find(|&i| value <= edge(min, width, i))
        .map_or(bins - 1, |i| i - 1)
}

fn bin_width(min: f64, max: f64, bins: usize) -> f64 {
    (max - min) / bins.max(1) as f64
}

fn edge(min: f64, width: f64, i: usize) -> f64 {
    min + width * i as f64
}

/// B + 1 equally spaced edges from `min` to `max`
pub fn bin_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let width = bin_width(min, max, bins);
    (0..=bins).map(|i| edge(min, width, i)).collect()
}

pub(super) fn classify(
    spec: &BinningSpec,
    summaries: &[ArtistFeatureSummary],
) -> (Vec<Option<ClusterLabel>>, ClusterDetail) {
    let bins = spec.bin_count();
    let values: Vec<Option<f64>> = summaries.iter().map(|s| s.mean(spec.feature)).collect();

    let range = values.iter().flatten().fold(None, |acc: Option<(f64, f64)>, &v| {
        Some(match acc {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        })
    });

    let Some((min, max)) = range.filter(|_| bins > 0) else {
        return (
            vec![None; summaries.len()],
            ClusterDetail::Binning {
                edges: Vec::new(),
                degenerate: false,
            },
        );
    };

    let degenerate = max <= min;
    let labels = values
        .iter()
        .map(|value| {
            value.map(|v| {
                let index = bin_index(v, min, max, bins);
                ClusterLabel::Bin {
                    index,
                    name: spec.labels[index].clone(),
                }
            })
        })
        .collect();
    let edges = if degenerate {
        vec![min, max]
    } else {
        bin_edges(min, max, bins)
    };

    (labels, ClusterDetail::Binning { edges, degenerate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterStrategy;
    use crate::features::aggregate_features;
    use crate::models::{ArtistList, FeatureVector, TrackRecord};

    fn summaries(popularity: &[Option<f64>]) -> Vec<ArtistFeatureSummary> {
        let records: Vec<TrackRecord> = popularity
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut features = FeatureVector::new();
                features.set(Feature::Popularity, *p);
                TrackRecord {
                    id: format!("t{}", i),
                    title: String::new(),
                    album: None,
                    artists: ArtistList::from_tokens([format!("artist{:02}", i)]).0,
                    features,
                    source_playlist: None,
                }
            })
            .collect();
        aggregate_features(&records)
    }

    fn labels_of(values: &[Option<f64>], spec: BinningSpec) -> Vec<Option<String>> {
        ClusterStrategy::Binning(spec)
            .classify(&summaries(values))
            .labels
            .into_iter()
            .map(|l| l.map(|l| l.to_string()))
            .collect()
    }

    #[test]
    fn test_bin_index_boundaries() {
        assert_eq!(bin_index(0.0, 0.0, 100.0, 5), 0);
        assert_eq!(bin_index(20.0, 0.0, 100.0, 5), 0);
        assert_eq!(bin_index(20.5, 0.0, 100.0, 5), 1);
        assert_eq!(bin_index(100.0, 0.0, 100.0, 5), 4);
        assert_eq!(bin_index(7.0, 7.0, 7.0, 5), 2);
    }

    #[test]
    fn test_reported_edges_fall_in_lower_bin() {
        for (min, max, bins) in [(0.0, 1.0, 5), (0.1, 0.7, 3), (12.5, 98.3, 5)] {
            let edges = bin_edges(min, max, bins);
            for (i, &e) in edges.iter().enumerate().skip(1) {
                assert_eq!(bin_index(e, min, max, bins), i - 1, "edge {} of {:?}", i, edges);
            }
            assert_eq!(bin_index(edges[0], min, max, bins), 0);
        }
        // 0.2 * 3 is 0.6000000000000001
        assert_eq!(bin_index(0.2 * 3.0, 0.0, 1.0, 5), 2);
    }

    #[test]
    fn test_bin_index_is_monotonic() {
        let mut last = 0;
        for step in 0..=1000 {
            let v = step as f64 * 0.137;
            let idx = bin_index(v, 0.0, 137.0, 5);
            assert!(idx >= last);
            last = idx;
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn test_popularity_bins() {
        let labels = labels_of(
            &[Some(0.0), Some(50.0), Some(100.0), Some(79.0)],
            BinningSpec::popularity(),
        );
        assert_eq!(
            labels,
            vec![
                Some("Very Low".to_string()),
                Some("Medium".to_string()),
                Some("Very High".to_string()),
                Some("High".to_string()),
            ]
        );
    }

    #[test]
    fn test_degenerate_range_collapses_to_single_bin() {
        let values = [Some(0.5), Some(0.5), Some(0.5)];
        let labels = labels_of(&values, BinningSpec::popularity());
        assert!(labels.iter().all(|l| l.as_deref() == Some("Medium")));

        let assignment =
            ClusterStrategy::Binning(BinningSpec::popularity()).classify(&summaries(&values));
        assert_eq!(assignment.distribution().len(), 1);
        assert!(matches!(
            assignment.detail,
            ClusterDetail::Binning { degenerate: true, .. }
        ));
    }

    #[test]
    fn test_missing_values_are_unassigned() {
        let labels = labels_of(&[Some(1.0), None, Some(3.0)], BinningSpec::popularity());
        assert_eq!(labels[1], None);
        assert_eq!(labels[0].as_deref(), Some("Very Low"));
        assert_eq!(labels[2].as_deref(), Some("Very High"));
    }

    #[test]
    fn test_empty_input_does_not_panic() {
        let assignment = ClusterStrategy::Binning(BinningSpec::popularity()).classify(&[]);
        assert!(assignment.labels.is_empty());
        assert_eq!(
            assignment.detail,
            ClusterDetail::Binning {
                edges: Vec::new(),
                degenerate: false
            }
        );
    }

    #[test]
    fn test_edges_span_observed_range() {
        assert_eq!(bin_edges(0.0, 1.0, 4), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
