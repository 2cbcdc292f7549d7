//! Per-artist feature aggregation.
//!
//! Works over the long-format view (one row per credited artist per track) and
//! folds it into count / mean / population standard deviation per feature.
//! Only present values contribute; an artist with no values for a feature
//! gets `None`, never zero.

use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::{Feature, TrackRecord, FEATURE_COUNT};

// ============================================================================
// Online Statistics
// ============================================================================

/// Welford accumulator for count, mean and variance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    count: usize,
    mean: f64,
    m2: f64,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population standard deviation; undefined below two values.
    pub fn population_std(&self) -> Option<f64> {
        (self.count >= 2).then(|| (self.m2 / self.count as f64).max(0.0).sqrt())
    }

    pub fn stats(&self) -> FeatureStats {
        FeatureStats {
            count: self.count,
            mean: self.mean(),
            std: self.population_std(),
        }
    }
}

/// Count / mean / std of one feature for one artist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureStats {
    /// Number of rows with a present value
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

// ============================================================================
// Artist Summary
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistFeatureSummary {
    pub artist: String,
    /// Number of (track, artist) rows, regardless of feature presence
    pub track_count: usize,
    stats: [FeatureStats; FEATURE_COUNT],
}

impl ArtistFeatureSummary {
    pub fn stats(&self, feature: Feature) -> &FeatureStats {
        &self.stats[feature as usize]
    }

    pub fn mean(&self, feature: Feature) -> Option<f64> {
        self.stats(feature).mean
    }
}

impl Serialize for ArtistFeatureSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + FEATURE_COUNT))?;
        map.serialize_entry("artist", &self.artist)?;
        map.serialize_entry("track_count", &self.track_count)?;
        for feature in Feature::ALL {
            map.serialize_entry(feature.name(), self.stats(feature))?;
        }
        map.end()
    }
}

// ============================================================================
// Long Format
// ============================================================================

/// One (track, artist) row of the long-format view.
#[derive(Debug, Clone, Copy)]
pub struct LongRow<'a> {
    pub track: &'a TrackRecord,
    pub artist: &'a str,
}

/// Stream the long-format view without materializing it.
pub fn long_format(records: &[TrackRecord]) -> impl Iterator<Item = LongRow<'_>> {
    records.iter().flat_map(|track| {
        track
            .artists
            .iter()
            .map(move |artist| LongRow { track, artist })
    })
}

/// Aggregate per-artist statistics, sorted by artist name.
pub fn aggregate_features(records: &[TrackRecord]) -> Vec<ArtistFeatureSummary> {
    #[derive(Default)]
    struct Acc {
        rows: usize,
        features: [MeanAccumulator; FEATURE_COUNT],
    }

    let mut by_artist: FxHashMap<&str, Acc> = FxHashMap::default();
    for row in long_format(records) {
        let acc = by_artist.entry(row.artist).or_default();
        acc.rows += 1;
        for (feature, value) in row.track.features.present() {
            acc.features[feature as usize].push(value);
        }
    }

    let mut summaries: Vec<ArtistFeatureSummary> = by_artist
        .into_iter()
        .map(|(artist, acc)| ArtistFeatureSummary {
            artist: artist.to_string(),
            track_count: acc.rows,
            stats: acc.features.map(|a| a.stats()),
        })
        .collect();
    summaries.sort_by(|a, b| a.artist.cmp(&b.artist));
    summaries
}
