//! Track normalization: raw catalog rows to canonical `TrackRecord`s.
//!
//! The combined-artist field is authoritative. Positional artist columns are a
//! denormalized projection of the same list and are only used to cross-check
//! it (or as a fallback when the combined field is blank).
//!
//! Nothing here fails: bad rows are rejected and counted, bad feature cells are
//! dropped to "no value" and counted. Callers get the full tally back in
//! `Provenance`.

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::{ArtistList, Feature, FeatureVector, RawTrackRow, RawValue, TrackRecord};

/// Default delimiter of the combined-artist field ("A, B, C")
pub const DEFAULT_ARTIST_DELIMITER: char = ',';

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Delimiter of the combined-artist field
    pub delimiter: char,
    /// Number of positional artist slots. `None` = discover from the widest row.
    pub artist_slots: Option<usize>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_ARTIST_DELIMITER,
            artist_slots: None,
        }
    }
}

// ============================================================================
// Issues & Provenance
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Neither the combined field nor the positional slots name an artist
    NoArtist,
    /// Another row with the same id was already accepted
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Rejected {
        reason: RejectReason,
    },
    PositionalMismatch {
        combined: Vec<String>,
        positional: Vec<String>,
    },
    PositionalFallback,
    InvalidFeature {
        feature: Feature,
        raw: String,
    },
}

/// A data-quality finding for one input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: IssueKind,
}

/// Counters describing what the normalizer did with its input.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub rows_seen: usize,
    pub records_accepted: usize,
    pub rejected_no_artist: usize,
    pub rejected_duplicate_id: usize,
    pub synthesized_ids: usize,
    pub positional_slots: usize,
    pub positional_mismatches: usize,
    pub positional_fallbacks: usize,
    pub duplicate_credits_removed: usize,
    /// Feature cells that held unparseable text, per feature
    pub rejected_feature_fields: BTreeMap<Feature, usize>,
    /// Accepted records keyed by number of credited artists
    pub tracks_by_artist_count: BTreeMap<usize, usize>,
}

impl Provenance {
    pub fn rows_rejected(&self) -> usize {
        self.rejected_no_artist + self.rejected_duplicate_id
    }

    pub fn total_rejected_fields(&self) -> usize {
        self.rejected_feature_fields.values().sum()
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Result of normalizing a whole catalog.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutput {
    pub records: Vec<TrackRecord>,
    pub provenance: Provenance,
    pub issues: Vec<RowIssue>,
}

// ============================================================================
// Field Helpers
// ============================================================================

/// Split the combined-artist field into trimmed, non-empty tokens.
/// Duplicates are kept; `ArtistList` removes them.
pub fn split_artists(field: &str, delimiter: char) -> Vec<&str> {
    field
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse one feature cell.
///
/// `Ok(None)` for missing or blank cells, `Err(raw)` for anything that is
/// not a finite number.
pub fn parse_feature(value: &RawValue) -> Result<Option<f64>, String> {
    match value {
        RawValue::Missing => Ok(None),
        RawValue::Number(n) if n.is_finite() => Ok(Some(*n)),
        RawValue::Number(n) => Err(n.to_string()),
        RawValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(text.clone()),
            }
        }
        RawValue::Other(value) => Err(value.to_string()),
    }
}

/// Widest positional slot count seen in the input
pub fn discover_slot_count(rows: &[RawTrackRow]) -> usize {
    rows.iter().map(|r| r.artist_slots.len()).max().unwrap_or(0)
}

fn positional_values(row: &RawTrackRow, slots: usize) -> Vec<String> {
    row.artist_slots
        .iter()
        .take(slots)
        .filter_map(|s| s.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Normalizer
// ============================================================================

/// Normalize every row of a catalog.
pub fn normalize_rows(rows: &[RawTrackRow], options: &NormalizeOptions) -> NormalizeOutput {
    let slots = options
        .artist_slots
        .unwrap_or_else(|| discover_slot_count(rows));

    let mut out = NormalizeOutput::default();
    out.provenance.positional_slots = slots;
    let mut seen_ids: FxHashSet<String> = FxHashSet::default();

    for (index, row) in rows.iter().enumerate() {
        out.provenance.rows_seen += 1;
        let row_id = non_blank(&row.id);

        // Artists: combined field wins, positional slots are the fallback
        let combined = row
            .artists
            .as_deref()
            .map(|f| split_artists(f, options.delimiter))
            .unwrap_or_default();
        let positional = positional_values(row, slots);

        let tokens: Vec<String> = if combined.is_empty() {
            if !positional.is_empty() {
                warn!(
                    row = index,
                    id = ?row_id,
                    "combined artist field is blank, using positional columns"
                );
                out.provenance.positional_fallbacks += 1;
                out.issues.push(RowIssue {
                    row: index,
                    id: row_id.clone(),
                    kind: IssueKind::PositionalFallback,
                });
            }
            positional
        } else {
            if slots > 0 {
                let projected: Vec<String> = combined
                    .iter()
                    .take(slots)
                    .map(|s| s.to_string())
                    .collect();
                if projected != positional {
                    warn!(
                        row = index,
                        id = ?row_id,
                        combined = ?projected,
                        positional = ?positional,
                        "positional artist columns disagree with combined field"
                    );
                    out.provenance.positional_mismatches += 1;
                    out.issues.push(RowIssue {
                        row: index,
                        id: row_id.clone(),
                        kind: IssueKind::PositionalMismatch {
                            combined: projected,
                            positional,
                        },
                    });
                }
            }
            combined.into_iter().map(str::to_string).collect()
        };

        let (artists, duplicates) = ArtistList::from_tokens(&tokens);
        if artists.is_empty() {
            out.provenance.rejected_no_artist += 1;
            out.issues.push(RowIssue {
                row: index,
                id: row_id,
                kind: IssueKind::Rejected {
                    reason: RejectReason::NoArtist,
                },
            });
            continue;
        }

        let id = match row_id {
            Some(id) => id,
            None => {
                let synthetic = format!("row-{}", index);
                debug!(row = index, id = %synthetic, "row has no id, synthesizing one");
                out.provenance.synthesized_ids += 1;
                synthetic
            }
        };
        if !seen_ids.insert(id.clone()) {
            warn!(row = index, id = %id, "duplicate track id, row skipped");
            out.provenance.rejected_duplicate_id += 1;
            out.issues.push(RowIssue {
                row: index,
                id: Some(id),
                kind: IssueKind::Rejected {
                    reason: RejectReason::DuplicateId,
                },
            });
            continue;
        }

        let mut features = FeatureVector::new();
        for (name, raw) in &row.features {
            let Some(feature) = Feature::from_name(name) else {
                continue;
            };
            match parse_feature(raw) {
                Ok(value) => features.set(feature, value),
                Err(raw_text) => {
                    debug!(
                        row = index,
                        feature = %feature,
                        raw = %raw_text,
                        "non-numeric feature value dropped"
                    );
                    *out
                        .provenance
                        .rejected_feature_fields
                        .entry(feature)
                        .or_insert(0) += 1;
                    out.issues.push(RowIssue {
                        row: index,
                        id: Some(id.clone()),
                        kind: IssueKind::InvalidFeature {
                            feature,
                            raw: raw_text,
                        },
                    });
                }
            }
        }

        out.provenance.duplicate_credits_removed += duplicates;
        *out
            .provenance
            .tracks_by_artist_count
            .entry(artists.len())
            .or_insert(0) += 1;
        out.provenance.records_accepted += 1;

        out.records.push(TrackRecord {
            id,
            title: row.title.as_deref().unwrap_or("").trim().to_string(),
            album: non_blank(&row.album),
            artists,
            features,
            source_playlist: non_blank(&row.source_playlist),
        });
    }

    out
}

// ============================================================================
// TESTS
// ============================================================================
