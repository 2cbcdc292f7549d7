//! End-to-end analysis: raw rows in, every stage's output back.

use tracing::info;

use crate::album::AlbumGraph;
use crate::cluster::ClusterAssignment;
use crate::config::AnalysisConfig;
use crate::export::{
    export_album_network, export_artist_network, export_cluster_table, export_collaborations,
    export_long_format, ExportBundle,
};
use crate::features::{aggregate_features, ArtistFeatureSummary};
use crate::graph::CollaborationGraph;
use crate::models::RawTrackRow;
use crate::normalize::{normalize_rows, NormalizeOutput};
use crate::report::{build_report, AnalysisReport, ReportInput};

/// Output of every pipeline stage for one run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub normalized: NormalizeOutput,
    pub graph: CollaborationGraph,
    pub albums: AlbumGraph,
    pub summaries: Vec<ArtistFeatureSummary>,
    /// One per configured strategy, in `AnalysisConfig::strategies` order
    pub assignments: Vec<ClusterAssignment>,
    pub report: AnalysisReport,
}

impl Analysis {
    pub fn export(&self, include_long_format: bool) -> ExportBundle {
        ExportBundle {
            artist_network: export_artist_network(&self.graph),
            album_network: export_album_network(&self.albums),
            cluster_table: export_cluster_table(&self.summaries, &self.assignments),
            collaborations: export_collaborations(&self.graph),
            artist_features: self.summaries.clone(),
            collaboration_matrix: self.report.collaboration_matrix.clone(),
            long_format: include_long_format
                .then(|| export_long_format(&self.normalized.records)),
        }
    }
}

/// Run normalizer, builders, aggregator, classifiers and reporter.
///
/// Infallible: data problems end up in `normalized.provenance` and
/// `normalized.issues`. `config` is expected to be validated already.
pub fn analyze(rows: &[RawTrackRow], config: &AnalysisConfig) -> Analysis {
    let normalized = normalize_rows(rows, &config.normalize);
    let records = &normalized.records;
    info!(
        rows = normalized.provenance.rows_seen,
        accepted = normalized.provenance.records_accepted,
        rejected = normalized.provenance.rows_rejected(),
        "normalized catalog"
    );

    let graph = CollaborationGraph::build(records);
    info!(
        artists = graph.artist_count(),
        edges = graph.edge_count(),
        "built collaboration graph"
    );

    let albums = AlbumGraph::build(records);
    info!(
        albums = albums.album_count(),
        edges = albums.edge_count(),
        skipped = albums.tracks_without_album(),
        "built album graph"
    );

    let summaries = aggregate_features(records);

    let assignments: Vec<ClusterAssignment> = config
        .strategies()
        .iter()
        .map(|strategy| {
            let assignment = strategy.classify(&summaries);
            info!(
                strategy = assignment.strategy,
                dimension = %assignment.dimension,
                labels = assignment.distribution().len(),
                "classified artists"
            );
            assignment
        })
        .collect();

    let report = build_report(&ReportInput {
        records,
        graph: &graph,
        albums: &albums,
        summaries: &summaries,
        assignments: &assignments,
        cluster_features: &config.cluster_features,
        top_n: config.top_n,
        matrix_artists: config.matrix_artists,
    });

    Analysis {
        normalized,
        graph,
        albums,
        summaries,
        assignments,
        report,
    }
}
