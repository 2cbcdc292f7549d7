//! Catalog sources: raw track rows from SQLite or a JSON dump.
//!
//! Sources only produce `RawTrackRow`s. Everything else (artist splitting,
//! feature parsing, rejection) is the normalizer's job.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::models::{Feature, RawTrackRow, RawValue};
use crate::progress::{create_progress_bar, create_spinner, log_progress};

/// Default catalog table name
pub const DEFAULT_TABLE: &str = "tracks";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static POSITIONAL_ARTIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^artist(\d+)$").unwrap());

const ID_COLUMNS: [&str; 2] = ["track_uri", "id"];
const TITLE_COLUMNS: [&str; 2] = ["track_name", "title"];
const ALBUM_COLUMNS: [&str; 2] = ["album_name", "album"];
const ARTISTS_COLUMNS: [&str; 2] = ["artist_names", "artists"];
const PLAYLIST_COLUMN: &str = "source_playlist";

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    Sqlite { path: PathBuf, table: String },
    Json { path: PathBuf },
}

impl CatalogSource {
    /// Pick the source kind from the file extension (`.json` or SQLite).
    pub fn from_path(path: &Path, table: &str) -> Self {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            CatalogSource::Json {
                path: path.to_path_buf(),
            }
        } else {
            CatalogSource::Sqlite {
                path: path.to_path_buf(),
                table: table.to_string(),
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CatalogSource::Sqlite { path, .. } | CatalogSource::Json { path } => path,
        }
    }

    pub fn load(&self) -> Result<Vec<RawTrackRow>> {
        match self {
            CatalogSource::Sqlite { path, table } => {
                let conn = Connection::open(path)
                    .with_context(|| format!("Failed to open catalog database {:?}", path))?;
                read_sqlite_rows(&conn, table)
            }
            CatalogSource::Json { path } => read_json_rows(path),
        }
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Column layout of a catalog table, resolved from `PRAGMA table_info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogColumns {
    pub id: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub artists: Option<String>,
    pub source_playlist: Option<String>,
    /// Positional artist columns, ordered by slot number
    pub slots: Vec<String>,
    pub features: Vec<(Feature, String)>,
}

impl CatalogColumns {
    pub fn resolve(names: &[String]) -> Self {
        let find = |candidates: &[&str]| {
            candidates.iter().find_map(|c| {
                names
                    .iter()
                    .find(|n| n.eq_ignore_ascii_case(c))
                    .cloned()
            })
        };

        let mut slots: Vec<(u32, String)> = names
            .iter()
            .filter_map(|n| {
                let caps = POSITIONAL_ARTIST.captures(n)?;
                let slot = caps[1].parse::<u32>().ok()?;
                Some((slot, n.clone()))
            })
            .collect();
        slots.sort();

        let features = names
            .iter()
            .filter_map(|n| Feature::from_name(n).map(|f| (f, n.clone())))
            .collect();

        Self {
            id: find(&ID_COLUMNS),
            title: find(&TITLE_COLUMNS),
            album: find(&ALBUM_COLUMNS),
            artists: find(&ARTISTS_COLUMNS),
            source_playlist: find(&[PLAYLIST_COLUMN]),
            slots: slots.into_iter().map(|(_, n)| n).collect(),
            features,
        }
    }

    fn select_list(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        for column in [&self.id, &self.title, &self.album, &self.artists, &self.source_playlist]
            .into_iter()
            .flatten()
        {
            columns.push(column.as_str());
        }
        columns.extend(self.slots.iter().map(String::as_str));
        columns.extend(self.features.iter().map(|(_, c)| c.as_str()));
        columns
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        bail!("Invalid table name '{}': expected a plain SQL identifier", name);
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Blobs are kept as unparseable text so they count as rejected fields
fn raw_of(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Missing,
        ValueRef::Blob(bytes) => RawValue::Text(format!("<blob {} bytes>", bytes.len())),
        ValueRef::Integer(i) => RawValue::Number(i as f64),
        ValueRef::Real(f) => RawValue::Number(f),
        ValueRef::Text(bytes) => RawValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Read every row of a catalog table.
pub fn read_sqlite_rows(conn: &Connection, table: &str) -> Result<Vec<RawTrackRow>> {
    validate_identifier(table)?;
    let names = table_columns(conn, table)?;
    if names.is_empty() {
        bail!("Catalog table '{}' does not exist or has no columns", table);
    }

    let columns = CatalogColumns::resolve(&names);
    if columns.artists.is_none() && columns.slots.is_empty() {
        bail!(
            "Catalog table '{}' has neither a combined artist column nor artist<N> columns",
            table
        );
    }

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
        row.get(0)
    })?;
    let pb = create_progress_bar(count as u64, "Phase 1: Reading catalog");

    let select_list = columns.select_list();
    let quoted: Vec<String> = select_list.iter().map(|c| format!("\"{}\"", c)).collect();
    let sql = format!("SELECT {} FROM \"{}\" ORDER BY rowid", quoted.join(", "), table);
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to query catalog table '{}'", table))?;

    let position = |name: &Option<String>| {
        name.as_ref()
            .and_then(|n| select_list.iter().position(|c| *c == n.as_str()))
    };
    let id_at = position(&columns.id);
    let title_at = position(&columns.title);
    let album_at = position(&columns.album);
    let artists_at = position(&columns.artists);
    let playlist_at = position(&columns.source_playlist);
    let slots_start = select_list.len() - columns.slots.len() - columns.features.len();
    let features_start = slots_start + columns.slots.len();

    let mut out = Vec::with_capacity(count.max(0) as usize);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let text_at = |index: Option<usize>| -> Result<Option<String>> {
            match index {
                Some(i) => Ok(text_of(row.get_ref(i)?)),
                None => Ok(None),
            }
        };

        let mut raw = RawTrackRow {
            id: text_at(id_at)?,
            title: text_at(title_at)?,
            album: text_at(album_at)?,
            artists: text_at(artists_at)?,
            source_playlist: text_at(playlist_at)?,
            ..RawTrackRow::default()
        };
        for i in 0..columns.slots.len() {
            raw.artist_slots.push(text_of(row.get_ref(slots_start + i)?));
        }
        for (i, (feature, _)) in columns.features.iter().enumerate() {
            raw.features
                .insert(feature.name().to_string(), raw_of(row.get_ref(features_start + i)?));
        }
        out.push(raw);

        pb.inc(1);
        log_progress("READ", out.len() as u64, count as u64, 10_000);
    }

    pb.finish_with_message(format!("Phase 1: Read {} catalog rows", out.len()));
    Ok(out)
}

// ============================================================================
// JSON
// ============================================================================

/// Read a JSON array of raw rows.
pub fn read_json_rows(path: &Path) -> Result<Vec<RawTrackRow>> {
    let spinner = create_spinner("Phase 1: Reading catalog");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {:?}", path))?;
    let rows: Vec<RawTrackRow> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse catalog {:?}", path))?;
    spinner.finish_with_message(format!("Phase 1: Read {} catalog rows", rows.len()));
    Ok(rows)
}
