//! Artist collaboration graph.
//!
//! Undirected, weighted: edge weight is the number of distinct tracks two
//! artists are credited on together. Every artist seen in the input is a node,
//! including artists that never collaborated.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ArtistPair, TrackRecord};

/// Per-artist node data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistNode {
    /// Ids of every track the artist is credited on
    pub tracks: BTreeSet<String>,
    /// Distinct collaborators
    pub collaborators: BTreeSet<String>,
    /// Sum of the weights of incident edges
    pub weighted_degree: u64,
}

impl ArtistNode {
    pub fn degree(&self) -> usize {
        self.collaborators.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollaborationGraph {
    nodes: BTreeMap<String, ArtistNode>,
    edges: FxHashMap<ArtistPair, u32>,
}

impl CollaborationGraph {
    /// Build the graph in O(T * k^2), k = artists per track.
    pub fn build(records: &[TrackRecord]) -> Self {
        let mut nodes: BTreeMap<String, ArtistNode> = BTreeMap::new();
        let mut edges: FxHashMap<ArtistPair, u32> = FxHashMap::default();

        for record in records {
            let artists = record.artists.as_slice();
            for artist in artists {
                nodes
                    .entry(artist.clone())
                    .or_default()
                    .tracks
                    .insert(record.id.clone());
            }

            // ArtistList is duplicate-free, so every i < j pair is distinct
            for (i, a) in artists.iter().enumerate() {
                for b in &artists[i + 1..] {
                    if let Some(pair) = ArtistPair::new(a, b) {
                        *edges.entry(pair).or_insert(0) += 1;
                    }
                }
            }
        }

        for (pair, &weight) in &edges {
            for (me, other) in [(pair.first(), pair.second()), (pair.second(), pair.first())] {
                if let Some(node) = nodes.get_mut(me) {
                    node.collaborators.insert(other.to_string());
                    node.weighted_degree += u64::from(weight);
                }
            }
        }

        Self { nodes, edges }
    }

    pub fn artist_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, artist: &str) -> Option<&ArtistNode> {
        self.nodes.get(artist)
    }

    /// Nodes sorted by artist name
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &ArtistNode)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn degree(&self, artist: &str) -> usize {
        self.nodes.get(artist).map_or(0, ArtistNode::degree)
    }

    /// Weight of the edge between two artists, in either order
    pub fn weight(&self, a: &str, b: &str) -> u32 {
        ArtistPair::new(a, b)
            .and_then(|pair| self.edges.get(&pair).copied())
            .unwrap_or(0)
    }

    /// Edges sorted by canonical pair
    pub fn sorted_edges(&self) -> Vec<(&ArtistPair, u32)> {
        let mut edges: Vec<(&ArtistPair, u32)> = self.edges.iter().map(|(p, &w)| (p, w)).collect();
        edges.sort_by(|a, b| a.0.cmp(b.0));
        edges
    }

    pub fn total_weight(&self) -> u64 {
        self.edges.values().map(|&w| u64::from(w)).sum()
    }

    /// Artists with no collaborators, sorted
    pub fn isolated(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.collaborators.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
