//! Prometheus Metrics Module
//!
//! Exposes ingestion metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Files**: Source files ingested by format, and time spent per file
//! - **Records**: Normalized records by partition key
//! - **Fallbacks**: Lines degraded to bad records, by reason
//! - **Degraded fields**: Columns nulled by field-level fallback, by column
//!
//! # Integration
//!
//! A batch run has no scrape endpoint; the rendered snapshot is written to
//! the configured metrics file when the run completes.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::application::ports::IngestMetricsPort;
use crate::domain::record::{Field, SourceFormat};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "feed_normalizer_files_total",
        "Total source files ingested by format"
    );
    describe_counter!(
        "feed_normalizer_lines_total",
        "Total non-blank lines normalized by format"
    );
    describe_counter!(
        "feed_normalizer_records_total",
        "Total normalized records by partition key"
    );
    describe_counter!(
        "feed_normalizer_fallbacks_total",
        "Total lines degraded to bad records by reason"
    );
    describe_counter!(
        "feed_normalizer_degraded_fields_total",
        "Total columns nulled by field-level fallback"
    );
    describe_histogram!(
        "feed_normalizer_file_seconds",
        "Time to read, normalize and write one source file"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one ingested source file.
pub fn record_file(format: SourceFormat, lines: u64, duration: Duration) {
    counter!(
        "feed_normalizer_files_total",
        "format" => format.as_str()
    )
    .increment(1);
    counter!(
        "feed_normalizer_lines_total",
        "format" => format.as_str()
    )
    .increment(lines);
    histogram!(
        "feed_normalizer_file_seconds",
        "format" => format.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record records routed to a partition.
pub fn record_records(partition: &'static str, count: u64) {
    counter!(
        "feed_normalizer_records_total",
        "partition" => partition
    )
    .increment(count);
}

/// Record record-level fallbacks.
pub fn record_fallbacks(reason: &'static str, count: u64) {
    counter!(
        "feed_normalizer_fallbacks_total",
        "reason" => reason
    )
    .increment(count);
}

/// Record field-level fallbacks for a column.
pub fn record_degraded_fields(field: Field, count: u64) {
    counter!(
        "feed_normalizer_degraded_fields_total",
        "field" => field.name()
    )
    .increment(count);
}

// =============================================================================
// Port Adapter
// =============================================================================

/// Routes ingestion metrics to the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusIngestMetrics;

impl IngestMetricsPort for PrometheusIngestMetrics {
    fn file_ingested(&self, format: SourceFormat, lines: u64, elapsed: Duration) {
        record_file(format, lines, elapsed);
    }

    fn records_written(&self, partition: &'static str, count: u64) {
        record_records(partition, count);
    }

    fn fallbacks(&self, reason: &'static str, count: u64) {
        record_fallbacks(reason, count);
    }

    fn degraded_fields(&self, field: Field, count: u64) {
        record_degraded_fields(field, count);
    }
}

// =============================================================================
// Tests
// =============================================================================
