//! Artist relations library - collaboration and album networks, per-artist
//! feature statistics and clustering over playlist track catalogs.

pub mod album;
pub mod cluster;
pub mod config;
pub mod export;
pub mod features;
pub mod graph;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod safety;
pub mod source;
pub mod writer;

/// Install the `tracing` subscriber shared by all binaries.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
