//! Rankings and network summary statistics.
//!
//! Every ranking has a total order: primary key descending, then name
//! ascending, so two runs over the same input print the same report.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::album::AlbumGraph;
use crate::cluster::{ClusterAssignment, ClusterDetail, ClusterLabel};
use crate::config::PROFILE_TOP_ARTISTS;
use crate::features::{ArtistFeatureSummary, MeanAccumulator};
use crate::graph::CollaborationGraph;
use crate::models::{Feature, TrackRecord};

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedArtist {
    pub artist: String,
    /// Distinct collaborators
    pub collaborations: usize,
    pub weighted_collaborations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPair {
    /// Display key, "A & B"
    pub pair: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAlbum {
    pub album: String,
    pub artists_count: usize,
    pub track_count: usize,
}

/// Aggregate statistics over both graphs. Ratios are `None` when their
/// denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub total_tracks: usize,
    pub total_artists: usize,
    /// Distinct collaborating pairs
    pub total_collaborations: usize,
    /// Sum of pair weights
    pub total_collaboration_weight: u64,
    pub isolated_artists: usize,
    pub total_albums: usize,
    pub album_artist_edges: usize,
    pub tracks_without_album: usize,
    pub avg_collaborations_per_artist: Option<f64>,
    pub avg_weighted_collaborations_per_artist: Option<f64>,
    pub avg_artists_per_album: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: ClusterLabel,
    pub artists: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterDistribution {
    pub strategy: &'static str,
    pub dimension: String,
    pub counts: Vec<LabelCount>,
    pub unassigned: usize,
}

/// One centroid cluster described in raw feature units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    /// Mean of the member artists' feature means, per clustering feature
    pub feature_means: BTreeMap<Feature, Option<f64>>,
    /// Members with the highest popularity mean
    pub top_artists: Vec<String>,
}

/// Pairwise collaboration weights among the most connected artists.
/// `weights[i][j]` is the weight between `artists[i]` and `artists[j]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollaborationMatrix {
    pub artists: Vec<String>,
    pub weights: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: NetworkSummary,
    pub most_collaborative_artist: Option<RankedArtist>,
    pub most_frequent_collaboration: Option<RankedPair>,
    pub top_collaborators: Vec<RankedArtist>,
    pub top_pairs: Vec<RankedPair>,
    pub top_albums: Vec<RankedAlbum>,
    pub tracks_by_artist_count: BTreeMap<usize, usize>,
    pub albums_by_artist_count: BTreeMap<usize, usize>,
    pub tracks_by_playlist: BTreeMap<String, usize>,
    pub cluster_distributions: Vec<ClusterDistribution>,
    pub cluster_profiles: Vec<ClusterProfile>,
    pub collaboration_matrix: CollaborationMatrix,
}

// ============================================================================
// Rankings
// ============================================================================

/// Artists by distinct-collaborator count, ties by name
pub fn top_collaborators(graph: &CollaborationGraph, n: usize) -> Vec<RankedArtist> {
    let mut ranked: Vec<RankedArtist> = graph
        .nodes()
        .map(|(artist, node)| RankedArtist {
            artist: artist.to_string(),
            collaborations: node.degree(),
            weighted_collaborations: node.weighted_degree,
        })
        .collect();
    // nodes() is name-sorted and the sort is stable
    ranked.sort_by(|a, b| b.collaborations.cmp(&a.collaborations));
    ranked.truncate(n);
    ranked
}

/// Pairs by weight, ties by canonical pair
pub fn top_pairs(graph: &CollaborationGraph, n: usize) -> Vec<RankedPair> {
    let mut ranked: Vec<RankedPair> = graph
        .sorted_edges()
        .into_iter()
        .map(|(pair, weight)| RankedPair {
            pair: pair.to_string(),
            weight,
        })
        .collect();
    // Display order differs from tuple order for names like "A #1"
    ranked.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.pair.cmp(&b.pair)));
    ranked.truncate(n);
    ranked
}

/// Albums by distinct-artist count, ties by album name
pub fn top_albums(albums: &AlbumGraph, n: usize) -> Vec<RankedAlbum> {
    let mut ranked: Vec<RankedAlbum> = albums
        .albums()
        .map(|(album, node)| RankedAlbum {
            album: album.to_string(),
            artists_count: node.artists_count(),
            track_count: node.track_count,
        })
        .collect();
    ranked.sort_by(|a, b| b.artists_count.cmp(&a.artists_count));
    ranked.truncate(n);
    ranked
}

/// Weight matrix over the top `n` artists by degree (ties by name).
/// The diagonal is zero.
pub fn collaboration_matrix(graph: &CollaborationGraph, n: usize) -> CollaborationMatrix {
    let artists: Vec<String> = top_collaborators(graph, n)
        .into_iter()
        .map(|a| a.artist)
        .collect();
    let weights = artists
        .iter()
        .map(|a| artists.iter().map(|b| graph.weight(a, b)).collect())
        .collect();
    CollaborationMatrix { artists, weights }
}

fn ratio(numerator: f64, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator / denominator as f64)
}

pub fn network_summary(
    records: &[TrackRecord],
    graph: &CollaborationGraph,
    albums: &AlbumGraph,
) -> NetworkSummary {
    let artists = graph.artist_count();
    NetworkSummary {
        total_tracks: records.len(),
        total_artists: artists,
        total_collaborations: graph.edge_count(),
        total_collaboration_weight: graph.total_weight(),
        isolated_artists: graph.isolated().len(),
        total_albums: albums.album_count(),
        album_artist_edges: albums.edge_count(),
        tracks_without_album: albums.tracks_without_album(),
        // Each edge touches two artists
        avg_collaborations_per_artist: ratio(graph.edge_count() as f64 * 2.0, artists),
        avg_weighted_collaborations_per_artist: ratio(graph.total_weight() as f64 * 2.0, artists),
        avg_artists_per_album: ratio(albums.edge_count() as f64, albums.album_count()),
    }
}

// ============================================================================
// Distributions & Profiles
// ============================================================================

pub fn tracks_by_artist_count(records: &[TrackRecord]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.artists.len()).or_insert(0) += 1;
    }
    counts
}

/// Track counts per source playlist; untagged tracks are not counted
pub fn tracks_by_playlist(records: &[TrackRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for playlist in records.iter().filter_map(|r| r.source_playlist.as_deref()) {
        *counts.entry(playlist.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn cluster_distribution(assignment: &ClusterAssignment) -> ClusterDistribution {
    let counts = assignment
        .distribution()
        .into_iter()
        .map(|(label, artists)| LabelCount { label, artists })
        .collect();
    ClusterDistribution {
        strategy: assignment.strategy,
        dimension: assignment.dimension.clone(),
        counts,
        unassigned: assignment.labels.iter().filter(|l| l.is_none()).count(),
    }
}

/// Describe each centroid cluster by its members' raw feature means.
///
/// `summaries` must be the slice the assignment was computed from. Returns an
/// empty list for non-centroid assignments.
pub fn cluster_profiles(
    summaries: &[ArtistFeatureSummary],
    assignment: &ClusterAssignment,
    dimensions: &[Feature],
) -> Vec<ClusterProfile> {
    let ClusterDetail::Centroid { k, .. } = assignment.detail else {
        return Vec::new();
    };

    let mut members: Vec<Vec<&ArtistFeatureSummary>> = vec![Vec::new(); k];
    for (summary, label) in summaries.iter().zip(&assignment.labels) {
        if let Some(ClusterLabel::Id(id)) = label {
            if let Some(bucket) = members.get_mut(*id) {
                bucket.push(summary);
            }
        }
    }

    members
        .into_iter()
        .enumerate()
        .map(|(cluster, artists)| {
            let feature_means = dimensions
                .iter()
                .map(|&feature| {
                    let mut acc = MeanAccumulator::default();
                    for value in artists.iter().filter_map(|a| a.mean(feature)) {
                        acc.push(value);
                    }
                    (feature, acc.mean())
                })
                .collect();

            let mut by_popularity: Vec<(&str, f64)> = artists
                .iter()
                .filter_map(|a| a.mean(Feature::Popularity).map(|p| (a.artist.as_str(), p)))
                .collect();
            by_popularity.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

            ClusterProfile {
                cluster,
                size: artists.len(),
                feature_means,
                top_artists: by_popularity
                    .into_iter()
                    .take(PROFILE_TOP_ARTISTS)
                    .map(|(name, _)| name.to_string())
                    .collect(),
            }
        })
        .collect()
}

// ============================================================================
// Report
// ============================================================================

pub struct ReportInput<'a> {
    pub records: &'a [TrackRecord],
    pub graph: &'a CollaborationGraph,
    pub albums: &'a AlbumGraph,
    pub summaries: &'a [ArtistFeatureSummary],
    pub assignments: &'a [ClusterAssignment],
    pub cluster_features: &'a [Feature],
    pub top_n: usize,
    /// Artists in the collaboration matrix
    pub matrix_artists: usize,
}

pub fn build_report(input: &ReportInput<'_>) -> AnalysisReport {
    let top_collaborators = top_collaborators(input.graph, input.top_n);
    let top_pairs = top_pairs(input.graph, input.top_n);

    AnalysisReport {
        summary: network_summary(input.records, input.graph, input.albums),
        most_collaborative_artist: top_collaborators
            .first()
            .filter(|a| a.collaborations > 0)
            .cloned(),
        most_frequent_collaboration: top_pairs.first().cloned(),
        top_collaborators,
        top_pairs,
        top_albums: top_albums(input.albums, input.top_n),
        tracks_by_artist_count: tracks_by_artist_count(input.records),
        albums_by_artist_count: input.albums.albums_by_artist_count(),
        tracks_by_playlist: tracks_by_playlist(input.records),
        cluster_distributions: input.assignments.iter().map(cluster_distribution).collect(),
        cluster_profiles: input
            .assignments
            .iter()
            .flat_map(|a| cluster_profiles(input.summaries, a, input.cluster_features))
            .collect(),
        collaboration_matrix: collaboration_matrix(input.graph, input.matrix_artists),
    }
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "NETWORK SUMMARY")?;
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "  Tracks: {}", s.total_tracks)?;
        writeln!(f, "  Artists: {} ({} isolated)", s.total_artists, s.isolated_artists)?;
        writeln!(
            f,
            "  Collaborations: {} pairs, {} total",
            s.total_collaborations, s.total_collaboration_weight
        )?;
        writeln!(
            f,
            "  Avg collaborations per artist: {}",
            fmt_ratio(s.avg_collaborations_per_artist)
        )?;
        writeln!(
            f,
            "  Albums: {} ({} tracks without album)",
            s.total_albums, s.tracks_without_album
        )?;
        writeln!(f, "  Avg artists per album: {}", fmt_ratio(s.avg_artists_per_album))?;

        if let Some(artist) = &self.most_collaborative_artist {
            writeln!(
                f,
                "  Most collaborative artist: {} ({} collaborators)",
                artist.artist, artist.collaborations
            )?;
        }
        if let Some(pair) = &self.most_frequent_collaboration {
            writeln!(f, "  Most frequent collaboration: {} ({} tracks)", pair.pair, pair.weight)?;
        }

        writeln!(f, "\nTop collaborators:")?;
        for (i, a) in self.top_collaborators.iter().enumerate() {
            writeln!(f, "  {:>2}. {} - {} collaborators", i + 1, a.artist, a.collaborations)?;
        }

        writeln!(f, "\nTop collaborating pairs:")?;
        for (i, p) in self.top_pairs.iter().enumerate() {
            writeln!(f, "  {:>2}. {} - {} tracks", i + 1, p.pair, p.weight)?;
        }

        writeln!(f, "\nAlbums with most artists:")?;
        for (i, a) in self.top_albums.iter().enumerate() {
            writeln!(f, "  {:>2}. {} - {} artists", i + 1, a.album, a.artists_count)?;
        }

        writeln!(f, "\nTracks by number of artists:")?;
        for (artists, tracks) in &self.tracks_by_artist_count {
            writeln!(f, "  {} artist(s): {} tracks", artists, tracks)?;
        }

        if !self.tracks_by_playlist.is_empty() {
            writeln!(f, "\nTracks by playlist:")?;
            for (playlist, tracks) in &self.tracks_by_playlist {
                writeln!(f, "  {}: {}", playlist, tracks)?;
            }
        }

        for dist in &self.cluster_distributions {
            writeln!(f, "\n{} clusters ({}):", dist.strategy, dist.dimension)?;
            for entry in &dist.counts {
                writeln!(f, "  {}: {} artists", entry.label, entry.artists)?;
            }
            if dist.unassigned > 0 {
                writeln!(f, "  unassigned: {} artists", dist.unassigned)?;
            }
        }

        for profile in &self.cluster_profiles {
            writeln!(f, "\nCluster {} ({} artists):", profile.cluster, profile.size)?;
            for (feature, mean) in &profile.feature_means {
                writeln!(f, "  {}: {}", feature, fmt_ratio(*mean))?;
            }
            writeln!(f, "  Top artists: {}", profile.top_artists.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterStrategy, KMeansParams};
    use crate::features::aggregate_features;
    use crate::models::{ArtistList, FeatureVector};

    fn track(id: &str, album: Option<&str>, artists: &[&str]) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: id.to_string(),
            album: album.map(str::to_string),
            artists: ArtistList::from_tokens(artists).0,
            features: FeatureVector::new(),
            source_playlist: None,
        }
    }

    fn scenario() -> Vec<TrackRecord> {
        vec![
            track("T1", Some("Alb1"), &["A", "B"]),
            track("T2", Some("Alb1"), &["B", "C"]),
            track("T3", Some("Alb2"), &["A"]),
        ]
    }

    #[test]
    fn test_example_scenario_rankings() {
        let records = scenario();
        let graph = CollaborationGraph::build(&records);
        let albums = AlbumGraph::build(&records);

        let top = top_collaborators(&graph, 1);
        assert_eq!(top[0].artist, "B");
        assert_eq!(top[0].collaborations, 2);

        let pairs = top_pairs(&graph, 10);
        assert_eq!(
            pairs.iter().map(|p| p.pair.as_str()).collect::<Vec<_>>(),
            vec!["A & B", "B & C"]
        );

        let albums_ranked = top_albums(&albums, 10);
        assert_eq!(albums_ranked[0].album, "Alb1");
        assert_eq!(albums_ranked[0].artists_count, 3);

        let summary = network_summary(&records, &graph, &albums);
        assert_eq!(summary.total_artists, 3);
        assert_eq!(summary.total_collaborations, 2);
        assert_eq!(summary.avg_artists_per_album, Some(2.0));
        let avg = summary.avg_collaborations_per_artist.unwrap();
        assert!((avg - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_break_by_name() {
        let records = vec![
            track("t1", None, &["Zed", "Amy"]),
            track("t2", None, &["Bob", "Cat"]),
        ];
        let graph = CollaborationGraph::build(&records);
        let names: Vec<_> = top_collaborators(&graph, 10)
            .into_iter()
            .map(|a| a.artist)
            .collect();
        assert_eq!(names, vec!["Amy", "Bob", "Cat", "Zed"]);
        let pairs: Vec<_> = top_pairs(&graph, 10).into_iter().map(|p| p.pair).collect();
        assert_eq!(pairs, vec!["Amy & Zed", "Bob & Cat"]);
    }

    #[test]
    fn test_collaboration_matrix_of_example_scenario() {
        let records = scenario();
        let graph = CollaborationGraph::build(&records);
        let matrix = collaboration_matrix(&graph, 20);
        assert_eq!(matrix.artists, vec!["B", "A", "C"]);
        assert_eq!(matrix.weights, vec![vec![0, 1, 1], vec![1, 0, 0], vec![1, 0, 0]]);

        let top = collaboration_matrix(&graph, 1);
        assert_eq!(top.artists, vec!["B"]);
        assert_eq!(top.weights, vec![vec![0]]);
    }

    #[test]
    fn test_pair_ties_follow_display_string() {
        let records = vec![
            track("t1", None, &["A", "Z"]),
            track("t2", None, &["A #1", "B"]),
        ];
        let graph = CollaborationGraph::build(&records);
        let pairs: Vec<_> = top_pairs(&graph, 10).into_iter().map(|p| p.pair).collect();
        assert_eq!(pairs, vec!["A #1 & B", "A & Z"]);
    }

    #[test]
    fn test_empty_input_has_no_ratios() {
        let graph = CollaborationGraph::build(&[]);
        let albums = AlbumGraph::build(&[]);
        let summary = network_summary(&[], &graph, &albums);
        assert_eq!(summary.avg_collaborations_per_artist, None);
        assert_eq!(summary.avg_artists_per_album, None);
        assert!(top_collaborators(&graph, 5).is_empty());
        assert!(top_pairs(&graph, 5).is_empty());
    }

    #[test]
    fn test_most_collaborative_requires_a_collaboration() {
        let records = vec![track("t1", None, &["Solo"])];
        let graph = CollaborationGraph::build(&records);
        let albums = AlbumGraph::build(&records);
        let report = build_report(&ReportInput {
            records: &records,
            graph: &graph,
            albums: &albums,
            summaries: &[],
            assignments: &[],
            cluster_features: &[],
            top_n: 10,
            matrix_artists: 20,
        });
        assert_eq!(report.most_collaborative_artist, None);
        assert_eq!(report.most_frequent_collaboration, None);
        assert_eq!(report.tracks_by_artist_count.get(&1), Some(&1));
    }

    #[test]
    fn test_cluster_profiles_list_popular_artists() {
        let mut records = Vec::new();
        for (name, popularity) in [("A", 10.0), ("B", 12.0), ("C", 90.0), ("D", 95.0)] {
            let mut t = track(name, None, &[name]);
            t.features = FeatureVector::new().with(Feature::Popularity, popularity);
            records.push(t);
        }
        let summaries = aggregate_features(&records);
        let dims = vec![Feature::Popularity];
        let assignment = ClusterStrategy::Centroid {
            dimensions: dims.clone(),
            params: KMeansParams {
                k: 2,
                ..KMeansParams::default()
            },
        }
        .classify(&summaries);

        let profiles = cluster_profiles(&summaries, &assignment, &dims);
        assert_eq!(profiles.len(), 2);
        // A is first in summary order, so its cluster is 0
        assert_eq!(profiles[0].top_artists, vec!["B", "A"]);
        assert_eq!(profiles[0].feature_means[&Feature::Popularity], Some(11.0));
        assert_eq!(profiles[1].top_artists, vec!["D", "C"]);
        assert_eq!(profiles[1].size, 2);
    }

    #[test]
    fn test_report_renders_text() {
        let records = scenario();
        let graph = CollaborationGraph::build(&records);
        let albums = AlbumGraph::build(&records);
        let report = build_report(&ReportInput {
            records: &records,
            graph: &graph,
            albums: &albums,
            summaries: &[],
            assignments: &[],
            cluster_features: &[],
            top_n: 3,
            matrix_artists: 3,
        });
        let text = report.to_string();
        assert!(text.contains("Most collaborative artist: B (2 collaborators)"));
        assert!(text.contains("Alb1 - 3 artists"));
    }
}
