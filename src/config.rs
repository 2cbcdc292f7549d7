//! Analysis configuration.
//!
//! `AnalysisConfig::default()` reproduces the constants of the original
//! playlist scripts; binaries override fields from their CLI args and call
//! `validate()` before running the pipeline.

use anyhow::{bail, Result};

use crate::cluster::{BinningSpec, ClusterStrategy, DbscanParams, KMeansParams};
use crate::models::Feature;
use crate::normalize::NormalizeOptions;

/// Default number of entries in every top-N ranking
pub const DEFAULT_TOP_N: usize = 10;

/// Artists in the collaboration weight matrix
pub const DEFAULT_MATRIX_ARTISTS: usize = 20;

/// Artists listed per centroid cluster profile
pub const PROFILE_TOP_ARTISTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub normalize: NormalizeOptions,
    pub top_n: usize,
    /// Top artists by degree included in the collaboration matrix
    pub matrix_artists: usize,
    pub binning: Vec<BinningSpec>,
    /// Feature means used as clustering dimensions
    pub cluster_features: Vec<Feature>,
    /// `None` disables the centroid strategy
    pub kmeans: Option<KMeansParams>,
    /// `None` disables the density strategy
    pub dbscan: Option<DbscanParams>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            top_n: DEFAULT_TOP_N,
            matrix_artists: DEFAULT_MATRIX_ARTISTS,
            binning: vec![
                BinningSpec::popularity(),
                BinningSpec::danceability(),
                BinningSpec::energy(),
            ],
            cluster_features: vec![
                Feature::Popularity,
                Feature::Danceability,
                Feature::Energy,
                Feature::Tempo,
            ],
            kmeans: Some(KMeansParams::default()),
            dbscan: Some(DbscanParams::default()),
        }
    }
}

impl AnalysisConfig {
    /// Strategies in table column order: binning first, then centroid, density.
    pub fn strategies(&self) -> Vec<ClusterStrategy> {
        let mut strategies: Vec<ClusterStrategy> = self
            .binning
            .iter()
            .cloned()
            .map(ClusterStrategy::Binning)
            .collect();
        if let Some(params) = &self.kmeans {
            strategies.push(ClusterStrategy::Centroid {
                dimensions: self.cluster_features.clone(),
                params: params.clone(),
            });
        }
        if let Some(params) = &self.dbscan {
            strategies.push(ClusterStrategy::Density {
                dimensions: self.cluster_features.clone(),
                params: params.clone(),
            });
        }
        strategies
    }

    pub fn validate(&self) -> Result<()> {
        if self.normalize.delimiter.is_whitespace() {
            bail!("Artist delimiter must not be whitespace");
        }
        if self.top_n == 0 {
            bail!("--top must be at least 1");
        }
        for spec in &self.binning {
            if spec.labels.is_empty() {
                bail!("Binning of '{}' needs at least one label", spec.feature);
            }
        }
        let mut columns: Vec<String> = self.binning.iter().map(BinningSpec::column).collect();
        columns.sort();
        if columns.windows(2).any(|w| w[0] == w[1]) {
            bail!("Each feature may be binned only once");
        }
        if (self.kmeans.is_some() || self.dbscan.is_some()) && self.cluster_features.is_empty() {
            bail!("Clustering needs at least one feature dimension");
        }
        if let Some(kmeans) = &self.kmeans {
            if kmeans.k == 0 {
                bail!("k-means cluster count must be at least 1");
            }
            if kmeans.max_iterations == 0 || kmeans.n_init == 0 {
                bail!("k-means needs at least one iteration and one restart");
            }
            if kmeans.tolerance.is_nan() || kmeans.tolerance < 0.0 {
                bail!("k-means tolerance must be non-negative, got {}", kmeans.tolerance);
            }
        }
        if let Some(dbscan) = &self.dbscan {
            if !dbscan.eps.is_finite() || dbscan.eps <= 0.0 {
                bail!("DBSCAN eps must be a positive number, got {}", dbscan.eps);
            }
            if dbscan.min_samples == 0 {
                bail!("DBSCAN min_samples must be at least 1");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        let names: Vec<String> = config.strategies().iter().map(|s| s.column()).collect();
        assert_eq!(
            names,
            vec![
                "popularity_cluster",
                "danceability_cluster",
                "energy_cluster",
                "kmeans_cluster",
                "dbscan_cluster"
            ]
        );
    }

    #[test]
    fn test_disabled_strategies_are_skipped() {
        let config = AnalysisConfig {
            kmeans: None,
            dbscan: None,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.strategies().len(), 3);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.dbscan = Some(DbscanParams {
            eps: 0.0,
            min_samples: 2,
        });
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.kmeans = Some(KMeansParams {
            k: 0,
            ..KMeansParams::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        let mut config = AnalysisConfig::default();
        config.binning.push(BinningSpec::energy());
        assert!(config.validate().is_err());
    }
}
