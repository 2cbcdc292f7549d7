//! Bipartite album ↔ artist graph.
//!
//! Tracks without a usable album name are left out entirely rather than being
//! pooled under one "unknown" album.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::features::MeanAccumulator;
use crate::models::{Feature, FeatureVector, TrackRecord, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumNode {
    pub track_count: usize,
    pub artists: BTreeSet<String>,
    /// Per-feature means over the album's tracks, present values only
    pub feature_means: FeatureVector,
}

impl AlbumNode {
    pub fn artists_count(&self) -> usize {
        self.artists.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumGraph {
    albums: BTreeMap<String, AlbumNode>,
    tracks_without_album: usize,
}

impl AlbumGraph {
    pub fn build(records: &[TrackRecord]) -> Self {
        let mut grouped: FxHashMap<&str, Vec<&TrackRecord>> = FxHashMap::default();
        let mut tracks_without_album = 0;
        for record in records {
            match record.album_name() {
                Some(album) => grouped.entry(album).or_default().push(record),
                None => tracks_without_album += 1,
            }
        }

        // Albums are independent; record order inside each group is preserved
        let albums: BTreeMap<String, AlbumNode> = grouped
            .into_par_iter()
            .map(|(album, tracks)| (album.to_string(), aggregate_album(&tracks)))
            .collect();

        Self {
            albums,
            tracks_without_album,
        }
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn album(&self, name: &str) -> Option<&AlbumNode> {
        self.albums.get(name)
    }

    /// Albums sorted by name
    pub fn albums(&self) -> impl Iterator<Item = (&str, &AlbumNode)> {
        self.albums.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn tracks_without_album(&self) -> usize {
        self.tracks_without_album
    }

    /// Distinct artists credited on at least one album, sorted
    pub fn artists(&self) -> BTreeSet<&str> {
        self.albums
            .values()
            .flat_map(|node| node.artists.iter().map(String::as_str))
            .collect()
    }

    /// One (album, artist) edge per credited artist, sorted by album then artist
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.albums.iter().flat_map(|(album, node)| {
            node.artists
                .iter()
                .map(move |artist| (album.as_str(), artist.as_str()))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.albums.values().map(AlbumNode::artists_count).sum()
    }

    /// Number of albums keyed by their distinct-artist count
    pub fn albums_by_artist_count(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for node in self.albums.values() {
            *counts.entry(node.artists_count()).or_insert(0) += 1;
        }
        counts
    }
}

fn aggregate_album(tracks: &[&TrackRecord]) -> AlbumNode {
    let mut artists = BTreeSet::new();
    let mut means = [MeanAccumulator::default(); FEATURE_COUNT];
    for track in tracks {
        artists.extend(track.artists.iter().map(str::to_string));
        for (feature, value) in track.features.present() {
            means[feature as usize].push(value);
        }
    }

    let mut feature_means = FeatureVector::new();
    for feature in Feature::ALL {
        feature_means.set(feature, means[feature as usize].mean());
    }

    AlbumNode {
        track_count: tracks.len(),
        artists,
        feature_means,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistList;

    fn track(
        id: &str,
        album: Option<&str>,
        artists: &[&str],
        popularity: Option<f64>,
    ) -> TrackRecord {
        let mut features = FeatureVector::new();
        features.set(Feature::Popularity, popularity);
        TrackRecord {
            id: id.to_string(),
            title: id.to_string(),
            album: album.map(str::to_string),
            artists: ArtistList::from_tokens(artists).0,
            features,
            source_playlist: None,
        }
    }

    #[test]
    fn test_example_scenario() {
        let records = vec![
            track("T1", Some("Alb1"), &["A", "B"], None),
            track("T2", Some("Alb1"), &["B", "C"], None),
            track("T3", Some("Alb2"), &["A"], None),
        ];
        let graph = AlbumGraph::build(&records);
        assert_eq!(graph.album_count(), 2);
        assert_eq!(graph.album("Alb1").unwrap().artists_count(), 3);
        assert_eq!(graph.album("Alb1").unwrap().track_count, 2);
        assert_eq!(graph.album("Alb2").unwrap().artists_count(), 1);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(
            graph.edges().collect::<Vec<_>>(),
            vec![("Alb1", "A"), ("Alb1", "B"), ("Alb1", "C"), ("Alb2", "A")]
        );
    }

    #[test]
    fn test_blank_albums_are_excluded() {
        let records = vec![
            track("t1", None, &["A", "B"], None),
            track("t2", Some("  "), &["C"], None),
            track("t3", Some("Real"), &["D"], None),
        ];
        let graph = AlbumGraph::build(&records);
        assert_eq!(graph.album_count(), 1);
        assert_eq!(graph.tracks_without_album(), 2);
        assert_eq!(graph.artists().into_iter().collect::<Vec<_>>(), vec!["D"]);
    }

    #[test]
    fn test_feature_means_skip_missing_values() {
        let records = vec![
            track("t1", Some("Alb"), &["A"], Some(10.0)),
            track("t2", Some("Alb"), &["A"], Some(30.0)),
            track("t3", Some("Alb"), &["A"], None),
        ];
        let graph = AlbumGraph::build(&records);
        let node = graph.album("Alb").unwrap();
        assert_eq!(node.track_count, 3);
        assert_eq!(node.feature_means.get(Feature::Popularity), Some(20.0));
        assert_eq!(node.feature_means.get(Feature::Energy), None);
    }

    #[test]
    fn test_albums_by_artist_count() {
        let records = vec![
            track("t1", Some("X"), &["A", "B"], None),
            track("t2", Some("Y"), &["A"], None),
            track("t3", Some("Z"), &["C"], None),
        ];
        let graph = AlbumGraph::build(&records);
        let dist = graph.albums_by_artist_count();
        assert_eq!(dist.get(&1), Some(&2));
        assert_eq!(dist.get(&2), Some(&1));
    }
}
