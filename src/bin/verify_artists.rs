//! Verify artist extraction of a track catalog.
//!
//! Runs only the normalizer and reports how artists were resolved: tracks by
//! artist count, examples per count, and disagreements between the combined
//! artist field and the positional artist columns.
//!
//! Usage: verify-artists <catalog.db | catalog.json> [--table tracks]

use anyhow::Result;
use artist_relations::models::TrackRecord;
use artist_relations::normalize::{normalize_rows, IssueKind, NormalizeOptions, RowIssue};
use artist_relations::progress::set_log_only;
use artist_relations::source::{CatalogSource, DEFAULT_TABLE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "verify-artists")]
#[command(about = "Verify artist extraction of a playlist track catalog")]
struct Args {
    source: PathBuf,

    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    #[arg(long, default_value = ",")]
    delimiter: char,

    #[arg(long)]
    artist_slots: Option<usize>,

    /// Examples shown per section
    #[arg(long, default_value = "3")]
    examples: usize,

    /// Write all row issues as JSON
    #[arg(long)]
    issues_json: Option<PathBuf>,

    /// Write normalizer stats as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    #[arg(long)]
    log_only: bool,
}

fn with_credits(records: &[TrackRecord], keep: impl Fn(usize) -> bool) -> Vec<&TrackRecord> {
    records.iter().filter(|r| keep(r.artists.len())).collect()
}

fn print_examples(title: &str, tracks: &[&TrackRecord], limit: usize) {
    if tracks.is_empty() {
        return;
    }
    println!("{}:", title);
    for track in tracks.iter().take(limit) {
        println!("  {} - {}", track.title, track.artists.joined());
    }
}

fn print_issue(issue: &RowIssue) {
    let id = issue.id.as_deref().unwrap_or("<no id>");
    match &issue.kind {
        IssueKind::PositionalMismatch {
            combined,
            positional,
        } => {
            println!("  Row {} ({}):", issue.row, id);
            println!("    Combined:   {:?}", combined);
            println!("    Positional: {:?}", positional);
        }
        IssueKind::PositionalFallback => {
            println!("  Row {} ({}): combined field blank, used positional columns", issue.row, id)
        }
        IssueKind::Rejected { reason } => {
            println!("  Row {} ({}): rejected ({:?})", issue.row, id, reason)
        }
        IssueKind::InvalidFeature { feature, raw } => {
            println!("  Row {} ({}): {} = {:?} is not a number", issue.row, id, feature, raw)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    artist_relations::init_tracing();
    set_log_only(args.log_only);

    let source = CatalogSource::from_path(&args.source, &args.table);
    println!("Opening catalog: {:?}", source.path());
    let rows = source.load()?;

    let options = NormalizeOptions {
        delimiter: args.delimiter,
        artist_slots: args.artist_slots,
    };
    let output = normalize_rows(&rows, &options);
    let provenance = &output.provenance;

    println!("\n=== ARTIST EXTRACTION VERIFICATION ===\n");
    println!("Positional artist columns: {}", provenance.positional_slots);
    println!("Total rows: {}", provenance.rows_seen);
    println!("Accepted tracks: {}", provenance.records_accepted);
    println!(
        "Rejected rows: {} (no artist: {}, duplicate id: {})",
        provenance.rows_rejected(),
        provenance.rejected_no_artist,
        provenance.rejected_duplicate_id
    );
    println!("Duplicate credits removed: {}", provenance.duplicate_credits_removed);
    println!("Rejected feature fields: {}", provenance.total_rejected_fields());

    println!("\n=== TRACKS BY ARTIST COUNT ===");
    for (count, tracks) in &provenance.tracks_by_artist_count {
        println!("  {} artist(s): {}", count, tracks);
    }

    println!("\n=== EXAMPLES ===");
    let single = with_credits(&output.records, |n| n == 1);
    let multi = with_credits(&output.records, |n| n >= 2);
    print_examples("Single artist tracks", &single, args.examples);
    print_examples("Multiple artist tracks", &multi, args.examples);
    if let Some(max) = output.records.iter().map(|r| r.artists.len()).max() {
        let widest = with_credits(&output.records, |n| n == max);
        let title = format!("Most collaborative tracks ({} artists)", max);
        print_examples(&title, &widest, args.examples);
    }

    println!("\n=== VALIDATION ===");
    let mismatches: Vec<&RowIssue> = output
        .issues
        .iter()
        .filter(|i| matches!(i.kind, IssueKind::PositionalMismatch { .. }))
        .collect();
    let others: Vec<&RowIssue> = output
        .issues
        .iter()
        .filter(|i| !matches!(i.kind, IssueKind::PositionalMismatch { .. }))
        .collect();

    if mismatches.is_empty() {
        println!("All positional artist columns agree with the combined artist field.");
    } else {
        println!(
            "{} rows where positional columns disagree ({} positional fallbacks):",
            provenance.positional_mismatches, provenance.positional_fallbacks
        );
        for issue in mismatches.iter().take(args.examples) {
            print_issue(issue);
        }
    }
    if !others.is_empty() {
        println!("{} other row issues, first {}:", others.len(), args.examples.min(others.len()));
        for issue in others.iter().take(args.examples) {
            print_issue(issue);
        }
    }

    if let Some(path) = &args.issues_json {
        std::fs::write(path, serde_json::to_string_pretty(&output.issues)?)?;
        println!("\nWrote {} issues to {:?}", output.issues.len(), path);
    }
    if let Some(path) = &args.stats {
        provenance.write_to_file(path)?;
    }

    Ok(())
}
