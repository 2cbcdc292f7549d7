//! Stable interchange shapes for downstream consumers.
//!
//! Every function here is a pure function of the model. Nodes are sorted by
//! id and edges by (source, target), so serializing the same input twice
//! yields identical bytes.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::album::AlbumGraph;
use crate::cluster::{ClusterAssignment, ClusterLabel};
use crate::features::{long_format, ArtistFeatureSummary};
use crate::graph::CollaborationGraph;
use crate::models::{Feature, FeatureVector, TrackRecord};
use crate::report::CollaborationMatrix;

// ============================================================================
// Networks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistNodeExport {
    pub id: String,
    pub label: String,
    pub collaborations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtistNetworkExport {
    pub nodes: Vec<ArtistNodeExport>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Album,
    Artist,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Album => "album",
            NodeKind::Artist => "artist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumNodeExport {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Album nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artists_count: Option<usize>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlbumNetworkExport {
    pub nodes: Vec<AlbumNodeExport>,
    /// album -> artist, weight 1
    pub edges: Vec<Edge>,
}

pub fn export_artist_network(graph: &CollaborationGraph) -> ArtistNetworkExport {
    let nodes = graph
        .nodes()
        .map(|(artist, node)| ArtistNodeExport {
            id: artist.to_string(),
            label: artist.to_string(),
            collaborations: node.degree(),
        })
        .collect();
    let edges = graph
        .sorted_edges()
        .into_iter()
        .map(|(pair, weight)| Edge {
            source: pair.first().to_string(),
            target: pair.second().to_string(),
            weight,
        })
        .collect();
    ArtistNetworkExport { nodes, edges }
}

/// Album nodes first, then artist nodes, each sorted by id.
pub fn export_album_network(albums: &AlbumGraph) -> AlbumNetworkExport {
    let mut nodes: Vec<AlbumNodeExport> = albums
        .albums()
        .map(|(album, node)| AlbumNodeExport {
            id: album.to_string(),
            kind: NodeKind::Album,
            artists_count: Some(node.artists_count()),
            label: album.to_string(),
        })
        .collect();
    nodes.extend(albums.artists().into_iter().map(|artist| AlbumNodeExport {
        id: artist.to_string(),
        kind: NodeKind::Artist,
        artists_count: None,
        label: artist.to_string(),
    }));

    let edges = albums
        .edges()
        .map(|(album, artist)| Edge {
            source: album.to_string(),
            target: artist.to_string(),
            weight: 1,
        })
        .collect();
    AlbumNetworkExport { nodes, edges }
}

/// "A & B" -> number of shared tracks
pub fn export_collaborations(graph: &CollaborationGraph) -> BTreeMap<String, u32> {
    graph
        .sorted_edges()
        .into_iter()
        .map(|(pair, weight)| (pair.to_string(), weight))
        .collect()
}

// ============================================================================
// Cluster Table
// ============================================================================

/// One artist row of the cluster table: headline feature stats plus one
/// label column per strategy, in strategy order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTableRow {
    pub artist: String,
    pub track_count: usize,
    pub popularity_mean: Option<f64>,
    pub popularity_std: Option<f64>,
    pub popularity_count: usize,
    pub danceability_mean: Option<f64>,
    pub energy_mean: Option<f64>,
    pub tempo_mean: Option<f64>,
    pub clusters: Vec<(String, Option<ClusterLabel>)>,
}

impl ClusterTableRow {
    pub fn cluster(&self, column: &str) -> Option<&ClusterLabel> {
        self.clusters
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, label)| label.as_ref())
    }
}

impl Serialize for ClusterTableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8 + self.clusters.len()))?;
        map.serialize_entry("artist", &self.artist)?;
        map.serialize_entry("track_count", &self.track_count)?;
        map.serialize_entry("popularity_mean", &self.popularity_mean)?;
        map.serialize_entry("popularity_std", &self.popularity_std)?;
        map.serialize_entry("popularity_count", &self.popularity_count)?;
        map.serialize_entry("danceability_mean", &self.danceability_mean)?;
        map.serialize_entry("energy_mean", &self.energy_mean)?;
        map.serialize_entry("tempo_mean", &self.tempo_mean)?;
        for (column, label) in &self.clusters {
            map.serialize_entry(column, label)?;
        }
        map.end()
    }
}

/// Join feature summaries with every assignment. Each assignment's labels
/// must be aligned with `summaries`.
pub fn export_cluster_table(
    summaries: &[ArtistFeatureSummary],
    assignments: &[ClusterAssignment],
) -> Vec<ClusterTableRow> {
    summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| {
            let popularity = summary.stats(Feature::Popularity);
            ClusterTableRow {
                artist: summary.artist.clone(),
                track_count: summary.track_count,
                popularity_mean: popularity.mean,
                popularity_std: popularity.std,
                popularity_count: popularity.count,
                danceability_mean: summary.mean(Feature::Danceability),
                energy_mean: summary.mean(Feature::Energy),
                tempo_mean: summary.mean(Feature::Tempo),
                clusters: assignments
                    .iter()
                    .map(|a| (a.column.clone(), a.label(i).cloned()))
                    .collect(),
            }
        })
        .collect()
}

// ============================================================================
// Long Format
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongFormatRow {
    pub track_id: String,
    pub title: String,
    pub album: Option<String>,
    pub artist: String,
    pub all_artists: String,
    pub source_playlist: Option<String>,
    pub features: FeatureVector,
}

pub fn export_long_format(records: &[TrackRecord]) -> Vec<LongFormatRow> {
    long_format(records)
        .map(|row| LongFormatRow {
            track_id: row.track.id.clone(),
            title: row.track.title.clone(),
            album: row.track.album.clone(),
            artist: row.artist.to_string(),
            all_artists: row.track.artists.joined(),
            source_playlist: row.track.source_playlist.clone(),
            features: row.track.features,
        })
        .collect()
}

// ============================================================================
// Bundle
// ============================================================================

/// Every artifact of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBundle {
    pub artist_network: ArtistNetworkExport,
    pub album_network: AlbumNetworkExport,
    pub cluster_table: Vec<ClusterTableRow>,
    pub collaborations: BTreeMap<String, u32>,
    pub artist_features: Vec<ArtistFeatureSummary>,
    pub collaboration_matrix: CollaborationMatrix,
    /// Only built on request; it has one row per credit
    pub long_format: Option<Vec<LongFormatRow>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{BinningSpec, ClusterStrategy};
    use crate::features::aggregate_features;
    use crate::models::ArtistList;

    fn track(id: &str, album: Option<&str>, artists: &[&str], popularity: f64) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: id.to_string(),
            album: album.map(str::to_string),
            artists: ArtistList::from_tokens(artists).0,
            features: FeatureVector::new().with(Feature::Popularity, popularity),
            source_playlist: Some("mix".to_string()),
        }
    }

    fn scenario() -> Vec<TrackRecord> {
        vec![
            track("T1", Some("Alb1"), &["A", "B"], 10.0),
            track("T2", Some("Alb1"), &["B", "C"], 50.0),
            track("T3", Some("Alb2"), &["A"], 90.0),
        ]
    }

    #[test]
    fn test_artist_network_shape() {
        let graph = CollaborationGraph::build(&scenario());
        let export = export_artist_network(&graph);
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(
            json["nodes"][1],
            serde_json::json!({"id": "B", "label": "B", "collaborations": 2})
        );
        assert_eq!(
            json["edges"],
            serde_json::json!([
                {"source": "A", "target": "B", "weight": 1},
                {"source": "B", "target": "C", "weight": 1}
            ])
        );
    }

    #[test]
    fn test_album_network_shape() {
        let albums = AlbumGraph::build(&scenario());
        let export = export_album_network(&albums);
        let ids: Vec<_> = export.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Alb1", "Alb2", "A", "B", "C"]);
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(
            json["nodes"][0],
            serde_json::json!({"id": "Alb1", "type": "album", "artists_count": 3, "label": "Alb1"})
        );
        assert_eq!(
            json["nodes"][2],
            serde_json::json!({"id": "A", "type": "artist", "label": "A"})
        );
        assert_eq!(export.edges.len(), 4);
        assert!(export.edges.iter().all(|e| e.weight == 1));
    }

    #[test]
    fn test_collaboration_table_keys() {
        let graph = CollaborationGraph::build(&scenario());
        let table = export_collaborations(&graph);
        assert_eq!(table.get("A & B"), Some(&1));
        assert_eq!(table.get("B & C"), Some(&1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cluster_table_joins_assignments() {
        let records = scenario();
        let summaries = aggregate_features(&records);
        let assignment =
            ClusterStrategy::Binning(BinningSpec::popularity()).classify(&summaries);
        let table = export_cluster_table(&summaries, &[assignment]);

        assert_eq!(table.len(), 3);
        let a = &table[0];
        assert_eq!(a.artist, "A");
        assert_eq!(a.popularity_mean, Some(50.0));
        assert_eq!(a.popularity_std, Some(40.0));
        assert_eq!(a.popularity_count, 2);

        // B: mean 30, C: mean 50, A: mean 50 -> range [30, 50]
        let bin = |row: &ClusterTableRow| row.cluster("popularity_cluster").map(|l| l.to_string());
        assert_eq!(bin(&table[1]).as_deref(), Some("Very Low"));
        assert_eq!(bin(a).as_deref(), Some("Very High"));

        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["popularity_cluster"], "Very High");
        assert!(json["danceability_mean"].is_null());
    }

    #[test]
    fn test_long_format_rows() {
        let rows = export_long_format(&scenario());
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].artist, "B");
        assert_eq!(rows[1].all_artists, "A, B");
        assert_eq!(rows[1].track_id, "T1");
    }

    #[test]
    fn test_exports_are_byte_identical() {
        let records = scenario();
        let network = |records: &[TrackRecord]| {
            serde_json::to_string(&export_artist_network(&CollaborationGraph::build(records)))
                .unwrap()
        };
        let first = network(&records);
        let mut reversed = records.clone();
        reversed.reverse();
        let second = network(&reversed);
        assert_eq!(first, second);
    }
}
