//! Artifact writers: pretty JSON files and an optional SQLite database.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cluster::ClusterLabel;
use crate::export::ExportBundle;
use crate::progress::{create_progress_bar, create_spinner};

const WRITE_BATCH_SIZE: usize = 10_000;

pub const ARTIST_NETWORK_FILE: &str = "artist_network.json";
pub const ALBUM_NETWORK_FILE: &str = "album_network.json";
pub const CLUSTER_TABLE_FILE: &str = "artist_clusters.json";
pub const COLLABORATIONS_FILE: &str = "collaborations.json";
pub const ARTIST_FEATURES_FILE: &str = "artist_features.json";
pub const COLLABORATION_MATRIX_FILE: &str = "collaboration_matrix.json";
pub const LONG_FORMAT_FILE: &str = "artist_song_long_format.json";

// ============================================================================
// JSON
// ============================================================================

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}

/// Write every artifact as a JSON file into `dir`, creating it if needed.
pub fn write_json_artifacts(bundle: &ExportBundle, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    let spinner = create_spinner("Writing JSON artifacts");

    let mut written = vec![
        write_json(dir, ARTIST_NETWORK_FILE, &bundle.artist_network)?,
        write_json(dir, ALBUM_NETWORK_FILE, &bundle.album_network)?,
        write_json(dir, CLUSTER_TABLE_FILE, &bundle.cluster_table)?,
        write_json(dir, COLLABORATIONS_FILE, &bundle.collaborations)?,
        write_json(dir, ARTIST_FEATURES_FILE, &bundle.artist_features)?,
        write_json(dir, COLLABORATION_MATRIX_FILE, &bundle.collaboration_matrix)?,
    ];
    if let Some(rows) = &bundle.long_format {
        written.push(write_json(dir, LONG_FORMAT_FILE, rows)?);
    }

    spinner.finish_with_message(format!("Wrote {} JSON artifacts to {:?}", written.len(), dir));
    Ok(written)
}

// ============================================================================
// SQLite
// ============================================================================

fn label_value(label: &Option<ClusterLabel>) -> Value {
    match label {
        None => Value::Null,
        Some(ClusterLabel::Bin { name, .. }) => Value::Text(name.clone()),
        Some(ClusterLabel::Id(id)) => Value::Integer(*id as i64),
        Some(ClusterLabel::Noise) => Value::Integer(-1),
    }
}

/// Insert `rows` in batched transactions, one progress bar per table.
fn insert_batched<T>(
    conn: &mut Connection,
    table: &str,
    sql: &str,
    rows: &[T],
    to_values: impl Fn(&T) -> Vec<Value>,
) -> Result<()> {
    let pb = create_progress_bar(rows.len() as u64, &format!("Writing {}", table));
    for chunk in rows.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in chunk {
                stmt.execute(params_from_iter(to_values(row)))?;
                pb.inc(1);
            }
        }
        tx.commit()?;
    }
    pb.finish_with_message(format!("Wrote {} rows to {}", rows.len(), table));
    Ok(())
}

/// Write every artifact into its own table. Existing artifact tables are
/// replaced.
pub fn write_sqlite(conn: &mut Connection, bundle: &ExportBundle) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;

        DROP TABLE IF EXISTS artist_nodes;
        DROP TABLE IF EXISTS collaboration_edges;
        DROP TABLE IF EXISTS album_nodes;
        DROP TABLE IF EXISTS album_edges;
        DROP TABLE IF EXISTS artist_clusters;
        DROP TABLE IF EXISTS collaborations;

        CREATE TABLE artist_nodes (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            collaborations INTEGER NOT NULL
        );

        CREATE TABLE collaboration_edges (
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            weight INTEGER NOT NULL,
            PRIMARY KEY (source, target)
        );

        CREATE TABLE album_nodes (
            id TEXT NOT NULL,
            type TEXT NOT NULL,
            artists_count INTEGER,
            label TEXT NOT NULL,
            PRIMARY KEY (type, id)
        );

        CREATE TABLE album_edges (
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            weight INTEGER NOT NULL
        );

        CREATE TABLE collaborations (
            pair TEXT PRIMARY KEY,
            count INTEGER NOT NULL
        );",
    )
    .context("Failed to create artifact tables")?;

    // Label columns are untyped: bins are text, cluster ids are integers
    let cluster_columns: Vec<String> = bundle
        .cluster_table
        .first()
        .map(|row| row.clusters.iter().map(|(c, _)| c.clone()).collect())
        .unwrap_or_default();
    let mut create = String::from(
        "CREATE TABLE artist_clusters (
            artist TEXT PRIMARY KEY,
            track_count INTEGER NOT NULL,
            popularity_mean REAL,
            popularity_std REAL,
            popularity_count INTEGER NOT NULL,
            danceability_mean REAL,
            energy_mean REAL,
            tempo_mean REAL",
    );
    for column in &cluster_columns {
        create.push_str(&format!(",\n            \"{}\"", column));
    }
    create.push_str("\n        )");
    conn.execute(&create, params![])?;

    insert_batched(
        conn,
        "artist_nodes",
        "INSERT INTO artist_nodes (id, label, collaborations) VALUES (?1, ?2, ?3)",
        &bundle.artist_network.nodes,
        |n| {
            vec![
                Value::Text(n.id.clone()),
                Value::Text(n.label.clone()),
                Value::Integer(n.collaborations as i64),
            ]
        },
    )?;

    let edge_values = |e: &crate::export::Edge| {
        vec![
            Value::Text(e.source.clone()),
            Value::Text(e.target.clone()),
            Value::Integer(i64::from(e.weight)),
        ]
    };
    insert_batched(
        conn,
        "collaboration_edges",
        "INSERT INTO collaboration_edges (source, target, weight) VALUES (?1, ?2, ?3)",
        &bundle.artist_network.edges,
        edge_values,
    )?;

    insert_batched(
        conn,
        "album_nodes",
        "INSERT INTO album_nodes (id, type, artists_count, label) VALUES (?1, ?2, ?3, ?4)",
        &bundle.album_network.nodes,
        |n| {
            vec![
                Value::Text(n.id.clone()),
                Value::Text(n.kind.as_str().to_string()),
                n.artists_count
                    .map_or(Value::Null, |c| Value::Integer(c as i64)),
                Value::Text(n.label.clone()),
            ]
        },
    )?;

    insert_batched(
        conn,
        "album_edges",
        "INSERT INTO album_edges (source, target, weight) VALUES (?1, ?2, ?3)",
        &bundle.album_network.edges,
        edge_values,
    )?;

    let placeholders: Vec<String> = (1..=8 + cluster_columns.len())
        .map(|i| format!("?{}", i))
        .collect();
    let quoted: Vec<String> = cluster_columns.iter().map(|c| format!(", \"{}\"", c)).collect();
    let insert_cluster = format!(
        "INSERT INTO artist_clusters (artist, track_count, popularity_mean, popularity_std,
            popularity_count, danceability_mean, energy_mean, tempo_mean{})
         VALUES ({})",
        quoted.concat(),
        placeholders.join(", ")
    );
    let real = |v: Option<f64>| v.map_or(Value::Null, Value::Real);
    insert_batched(conn, "artist_clusters", &insert_cluster, &bundle.cluster_table, |r| {
        let mut values = vec![
            Value::Text(r.artist.clone()),
            Value::Integer(r.track_count as i64),
            real(r.popularity_mean),
            real(r.popularity_std),
            Value::Integer(r.popularity_count as i64),
            real(r.danceability_mean),
            real(r.energy_mean),
            real(r.tempo_mean),
        ];
        values.extend(r.clusters.iter().map(|(_, label)| label_value(label)));
        values
    })?;

    let pairs: Vec<(&String, &u32)> = bundle.collaborations.iter().collect();
    insert_batched(
        conn,
        "collaborations",
        "INSERT INTO collaborations (pair, count) VALUES (?1, ?2)",
        &pairs,
        |(pair, count)| vec![Value::Text((*pair).clone()), Value::Integer(i64::from(**count))],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::models::RawTrackRow;
    use crate::pipeline::analyze;

    fn bundle() -> ExportBundle {
        let rows = vec![
            RawTrackRow::new("T1", "One", Some("Alb1"), "A, B").with_feature("popularity", 10.0),
            RawTrackRow::new("T2", "Two", Some("Alb1"), "B, C").with_feature("popularity", 50.0),
            RawTrackRow::new("T3", "Three", Some("Alb2"), "A").with_feature("popularity", 90.0),
        ];
        analyze(&rows, &AnalysisConfig::default()).export(true)
    }

    #[test]
    fn test_write_json_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("analysis");
        let written = write_json_artifacts(&bundle(), &out).unwrap();
        assert_eq!(written.len(), 7);

        let text = std::fs::read_to_string(out.join(COLLABORATIONS_FILE)).unwrap();
        let table: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(table["A & B"], 1);

        let text = std::fs::read_to_string(out.join(COLLABORATION_MATRIX_FILE)).unwrap();
        let matrix: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(matrix["artists"], serde_json::json!(["B", "A", "C"]));
        assert_eq!(matrix["weights"][0], serde_json::json!([0, 1, 1]));

        let text = std::fs::read_to_string(out.join(ALBUM_NETWORK_FILE)).unwrap();
        let network: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(network["nodes"][0]["type"], "album");
    }

    #[test]
    fn test_write_sqlite_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        let bundle = bundle();
        write_sqlite(&mut conn, &bundle).unwrap();

        let count = |table: &str| -> i64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count("artist_nodes"), 3);
        assert_eq!(count("collaboration_edges"), 2);
        assert_eq!(count("album_nodes"), 5);
        assert_eq!(count("album_edges"), 4);
        assert_eq!(count("artist_clusters"), 3);
        assert_eq!(count("collaborations"), 2);

        let label: String = conn
            .query_row(
                "SELECT popularity_cluster FROM artist_clusters WHERE artist = 'A'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(label, "Very High");

        // Rewriting replaces the tables instead of failing
        write_sqlite(&mut conn, &bundle).unwrap();
        let nodes: i64 = conn
            .query_row("SELECT COUNT(*) FROM artist_nodes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(nodes, 3);
    }
}
