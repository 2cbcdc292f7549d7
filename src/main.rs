use anyhow::{Context, Result};
use artist_relations::cluster::{DbscanParams, KMeansParams};
use artist_relations::config::{AnalysisConfig, DEFAULT_TOP_N};
use artist_relations::pipeline::analyze;
use artist_relations::progress::{format_duration, run_phase, set_log_only};
use artist_relations::safety::validate_output_path;
use artist_relations::source::{CatalogSource, DEFAULT_TABLE};
use artist_relations::writer::{write_json_artifacts, write_sqlite};
use clap::Parser;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "artist-relations")]
#[command(about = "Build artist collaboration and album networks from a playlist track catalog")]
struct Args {
    /// Catalog: SQLite database or JSON row dump (.json)
    source: PathBuf,

    /// Directory for the JSON artifacts
    output_dir: PathBuf,

    /// Catalog table name (SQLite sources)
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Entries per ranking
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Delimiter of the combined artist field
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Number of positional artist columns (default: widest row)
    #[arg(long)]
    artist_slots: Option<usize>,

    #[arg(long, default_value = "5")]
    kmeans_k: usize,

    #[arg(long, default_value = "42")]
    seed: u64,

    #[arg(long, default_value = "10")]
    kmeans_restarts: usize,

    #[arg(long, default_value = "0.5")]
    dbscan_eps: f64,

    #[arg(long, default_value = "2")]
    dbscan_min_samples: usize,

    /// Skip k-means clustering
    #[arg(long)]
    no_kmeans: bool,

    /// Skip DBSCAN clustering
    #[arg(long)]
    no_dbscan: bool,

    /// Also export the (track, artist) long-format table
    #[arg(long)]
    long_format: bool,

    /// Also write every artifact into this SQLite database (name must contain "analysis")
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Write normalizer stats as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Write the analysis report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Hide progress bars, print plain phase lines
    #[arg(long)]
    log_only: bool,
}

impl Args {
    fn config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.normalize.delimiter = self.delimiter;
        config.normalize.artist_slots = self.artist_slots;
        config.top_n = self.top;
        config.kmeans = (!self.no_kmeans).then(|| KMeansParams {
            k: self.kmeans_k,
            seed: self.seed,
            n_init: self.kmeans_restarts,
            ..KMeansParams::default()
        });
        config.dbscan = (!self.no_dbscan).then(|| DbscanParams {
            eps: self.dbscan_eps,
            min_samples: self.dbscan_min_samples,
        });
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    artist_relations::init_tracing();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = args.config();
    config.validate()?;
    if let Some(db) = &args.sqlite {
        validate_output_path(db, "analysis", &[args.source.as_path()])?;
    }

    let start = Instant::now();

    let source = CatalogSource::from_path(&args.source, &args.table);
    println!("Opening catalog: {:?}", source.path());
    let rows = source.load()?;

    let analysis = run_phase("Phase 2: Analyzing", || analyze(&rows, &config));
    drop(rows);

    let provenance = &analysis.normalized.provenance;
    provenance.log_phase("normalize");
    if let Some(path) = &args.stats {
        provenance
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
    }

    let bundle = analysis.export(args.long_format);
    let written = write_json_artifacts(&bundle, &args.output_dir)?;

    if let Some(db) = &args.sqlite {
        if db.exists() {
            std::fs::remove_file(db).context("Failed to remove existing output database")?;
        }
        println!("Creating output database: {:?}", db);
        let mut conn = Connection::open(db).context("Failed to create output database")?;
        write_sqlite(&mut conn, &bundle)?;
    }

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&analysis.report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
    }

    println!("\n{}", analysis.report);

    println!("{:=<60}", "");
    println!("Analysis complete!");
    println!(
        "  Tracks: {} accepted, {} rejected",
        provenance.records_accepted,
        provenance.rows_rejected()
    );
    println!("  Artists: {}", analysis.graph.artist_count());
    println!("  Artifacts: {} files in {:?}", written.len(), args.output_dir);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
