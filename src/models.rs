//! Core data models for the artist relations pipeline.
//!
//! This module contains the raw input row shape, the canonical track record
//! produced by the normalizer, and the small value types shared by every
//! downstream stage (features, artist lists, canonical artist pairs).

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Audio Features
// ============================================================================

/// Numeric track attributes recognised by the engine.
///
/// The order of `Feature::ALL` is the column order used by every table export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Popularity,
    Danceability,
    Energy,
    Tempo,
    Valence,
    Acousticness,
    Instrumentalness,
    Liveness,
    Speechiness,
    Loudness,
}

/// Number of entries in `Feature::ALL`
pub const FEATURE_COUNT: usize = 10;

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Popularity,
        Feature::Danceability,
        Feature::Energy,
        Feature::Tempo,
        Feature::Valence,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Liveness,
        Feature::Speechiness,
        Feature::Loudness,
    ];

    /// Column / key name used in catalogs and exports
    pub fn name(self) -> &'static str {
        match self {
            Feature::Popularity => "popularity",
            Feature::Danceability => "danceability",
            Feature::Energy => "energy",
            Feature::Tempo => "tempo",
            Feature::Valence => "valence",
            Feature::Acousticness => "acousticness",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Liveness => "liveness",
            Feature::Speechiness => "speechiness",
            Feature::Loudness => "loudness",
        }
    }

    /// Case-insensitive lookup by column name.
    pub fn from_name(name: &str) -> Option<Feature> {
        let lower = name.trim().to_ascii_lowercase();
        Feature::ALL.into_iter().find(|f| f.name() == lower)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size feature vector. `None` means "not measured", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureVector {
    values: [Option<f64>; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        self.values[feature.index()] = value;
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, Some(value));
        self
    }

    /// Iterate over features that carry a value, in `Feature::ALL` order.
    pub fn present(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }
}

// Serialized as a map of present values only, keyed by feature name.
impl Serialize for FeatureVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        for (feature, value) in self.present() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

// ============================================================================
// Artist List
// ============================================================================

/// Ordered, duplicate-free list of credited artist names.
///
/// Names are trimmed and empty names are dropped on construction; the first
/// occurrence of a name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtistList(Vec<String>);

impl ArtistList {
    /// Build from raw tokens. Returns the list and how many duplicate
    /// credits were dropped.
    pub fn from_tokens<I, S>(tokens: I) -> (Self, usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        let mut duplicates = 0;
        for token in tokens {
            let name = token.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if seen.insert(name.to_string()) {
                names.push(name.to_string());
            } else {
                duplicates += 1;
            }
        }
        (Self(names), duplicates)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Display form used by the long-format table ("A, B, C")
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

// ============================================================================
// Track Records
// ============================================================================

/// Canonical track produced by the normalizer. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub album: Option<String>,
    pub artists: ArtistList,
    pub features: FeatureVector,
    pub source_playlist: Option<String>,
}

impl TrackRecord {
    /// Album name if it is present and non-blank
    pub fn album_name(&self) -> Option<&str> {
        self.album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

// ============================================================================
// Raw Input Rows
// ============================================================================

/// Untyped feature cell as delivered by a catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
    /// Booleans, arrays and objects; never a valid feature value
    Other(serde_json::Value),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

/// One denormalized catalog row, before normalization.
///
/// `artist_slots` holds the positional artist columns (artist1..artistN) in
/// order; `artists` is the free-text combined credit string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTrackRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Option<String>,
    #[serde(default)]
    pub artist_slots: Vec<Option<String>>,
    #[serde(default)]
    pub source_playlist: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, RawValue>,
}

impl RawTrackRow {
    /// Convenience constructor used by tests and small callers.
    pub fn new(id: &str, title: &str, album: Option<&str>, artists: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            album: album.map(str::to_string),
            artists: Some(artists.to_string()),
            ..Self::default()
        }
    }

    pub fn with_feature(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.features.insert(name.to_string(), value.into());
        self
    }

    pub fn with_slots(mut self, slots: &[&str]) -> Self {
        self.artist_slots = slots.iter().map(|s| Some(s.to_string())).collect();
        self
    }
}

// ============================================================================
// Canonical Artist Pair
// ============================================================================

/// Unordered pair of distinct artists, stored lexicographically sorted so
/// (A, B) and (B, A) are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtistPair {
    first: String,
    second: String,
}

impl ArtistPair {
    /// Returns `None` for a self-pair.
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                first: a.to_string(),
                second: b.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                first: b.to_string(),
                second: a.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, artist: &str) -> bool {
        self.first == artist || self.second == artist
    }
}

impl fmt::Display for ArtistPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} & {}", self.first, self.second)
    }
}
