//! Feed Normalizer Binary
//!
//! Runs one full-refresh ingestion over the configured source trees.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin feed-normalizer
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `INGEST_CSV_DIR`: Root directory of positional CSV sources
//! - `INGEST_JSON_DIR`: Root directory of key-value JSON sources
//!
//! ## Optional
//! - `INGEST_OUTPUT_DIR`: Output directory, replaced when a run succeeds (default: `ingest_stg`)
//! - `INGEST_PARTITION_COLUMN`: Partition directory name (default: partition)
//! - `INGEST_MAX_THREADS`: Worker thread limit, 0 for one per core (default: 0)
//! - `INGEST_METRICS_FILE`: Write a Prometheus snapshot here after the run
//! - `RUST_LOG`: Log level (default: `feed_normalizer=info`)

use std::sync::Arc;

use anyhow::Context;
use feed_normalizer::infrastructure::metrics::{PrometheusIngestMetrics, get_metrics_handle};
use feed_normalizer::infrastructure::telemetry;
use feed_normalizer::{
    FileLineSource, IngestConfig, IngestReport, IngestService, LineSourcePort,
    PartitionedJsonSink, RecordSinkPort, SourceFormat, discover_sources, init_metrics,
};

fn main() -> anyhow::Result<()> {
    load_dotenv();

    telemetry::init().context("failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting feed normalizer");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder unavailable, continuing without metrics");
    }

    let config = IngestConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let mut sources = discover_sources(&config.csv_dir, SourceFormat::PositionalCsv)
        .context("failed to list CSV sources")?;
    sources.extend(
        discover_sources(&config.json_dir, SourceFormat::KeyValueJson)
            .context("failed to list JSON sources")?,
    );

    let source: Arc<dyn LineSourcePort> = Arc::new(FileLineSource::new());
    let sink: Arc<dyn RecordSinkPort> = Arc::new(PartitionedJsonSink::new(
        &config.output_dir,
        config.partition_layout(),
    ));
    let service = IngestService::new(source, sink, config.ingest_options())
        .with_metrics(Arc::new(PrometheusIngestMetrics));

    let report = service.run(&sources).context("ingestion failed")?;
    log_report(&report);

    if let Some(path) = &config.metrics_file {
        write_metrics_snapshot(path)?;
    }

    tracing::info!("Feed normalizer finished");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &IngestConfig) {
    tracing::info!(
        csv_dir = %config.csv_dir.display(),
        json_dir = %config.json_dir.display(),
        output_dir = %config.output_dir.display(),
        partition_column = %config.partition_column,
        max_threads = config.max_threads,
        "Configuration loaded"
    );
}

/// Log per-kind and per-reason breakdowns of the run.
fn log_report(report: &IngestReport) {
    for (kind, count) in &report.records {
        tracing::info!(kind = %kind, records = count, "Records written");
    }
    for (reason, count) in &report.fallbacks {
        tracing::warn!(reason = %reason, lines = count, "Lines degraded to bad records");
    }
    for (field, count) in &report.degraded_fields {
        tracing::debug!(field = %field, values = count, "Values nulled by coercion");
    }
}

/// Render the Prometheus snapshot to a file.
fn write_metrics_snapshot(path: &std::path::Path) -> anyhow::Result<()> {
    let Some(handle) = get_metrics_handle() else {
        tracing::warn!("Metrics recorder not installed, skipping snapshot");
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, handle.render())
        .with_context(|| format!("failed to write metrics to {}", path.display()))?;

    tracing::info!(path = %path.display(), "Metrics snapshot written");
    Ok(())
}
