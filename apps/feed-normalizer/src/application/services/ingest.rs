//! Batch ingestion service.
//!
//! Reads every source file, normalizes its lines and routes the resulting
//! records to a sink grouped by partition key. Files are processed in
//! parallel with Rayon and lines within a file are normalized in parallel
//! as well; the only ordering guarantee is that each file's records reach
//! the sink in input order within a partition.
//!
//! Data problems never fail a run: they are absorbed by the normalizer and
//! counted in the [`IngestReport`]. Only I/O failures (unreadable source,
//! unwritable sink) abort, and an aborted run leaves the previous output in
//! place.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::application::ports::{
    IngestMetricsPort, LineSourcePort, NoopIngestMetrics, RecordSinkPort, SinkError, SourceError,
    SourceFile,
};
use crate::domain::normalization::{Normalization, normalize_with_diagnostics};
use crate::domain::partition::partition_key_of;
use crate::domain::record::{CanonicalRecord, EventKind, Field, SourceFormat};

// =============================================================================
// Errors
// =============================================================================

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A source file could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The sink rejected output.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Worker pool could not be created.
    #[error("failed to build worker pool: {message}")]
    ThreadPool {
        /// Error message.
        message: String,
    },
}

// =============================================================================
// Options
// =============================================================================

/// Parallelism options for an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Maximum worker threads (0 = Rayon's default, one per core).
    pub max_threads: usize,
    /// Minimum file count before files are processed in parallel.
    pub min_parallel_files: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_threads: 0,
            min_parallel_files: 2,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Counters describing an ingestion run (or a single file).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Source files processed.
    pub files: u64,
    /// Lines read, blank lines included.
    pub lines: u64,
    /// Blank lines skipped.
    pub blank_lines: u64,
    /// Records produced per kind.
    pub records: BTreeMap<EventKind, u64>,
    /// Record-level fallbacks per reason.
    pub fallbacks: BTreeMap<&'static str, u64>,
    /// Field-level fallbacks per column.
    pub degraded_fields: BTreeMap<Field, u64>,
}

impl IngestReport {
    /// Total records produced.
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.records.values().sum()
    }

    /// Records produced of one kind.
    #[must_use]
    pub fn records_of(&self, kind: EventKind) -> u64 {
        self.records.get(&kind).copied().unwrap_or(0)
    }

    /// Total record-level fallbacks.
    #[must_use]
    pub fn total_fallbacks(&self) -> u64 {
        self.fallbacks.values().sum()
    }

    /// Total field-level fallbacks.
    #[must_use]
    pub fn total_degraded_fields(&self) -> u64 {
        self.degraded_fields.values().sum()
    }

    fn observe(&mut self, normalization: &Normalization) {
        *self.records.entry(normalization.record.kind()).or_default() += 1;
        if let Some(fallback) = &normalization.fallback {
            *self.fallbacks.entry(fallback.reason()).or_default() += 1;
        }
        for field in &normalization.degraded {
            *self.degraded_fields.entry(*field).or_default() += 1;
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: &Self) {
        self.files += other.files;
        self.lines += other.lines;
        self.blank_lines += other.blank_lines;
        for (kind, count) in &other.records {
            *self.records.entry(*kind).or_default() += count;
        }
        for (reason, count) in &other.fallbacks {
            *self.fallbacks.entry(*reason).or_default() += count;
        }
        for (field, count) in &other.degraded_fields {
            *self.degraded_fields.entry(*field).or_default() += count;
        }
    }
}

// =============================================================================
// Normalization over lines
// =============================================================================

/// Normalize a batch of lines from one source, skipping blank lines.
///
/// Records are returned in input order alongside a single-file report.
#[must_use]
pub fn normalize_lines(
    lines: &[String],
    format: SourceFormat,
) -> (Vec<CanonicalRecord>, IngestReport) {
    let results: Vec<Option<Normalization>> = lines
        .par_iter()
        .map(|line| {
            if line.trim().is_empty() {
                None
            } else {
                Some(normalize_with_diagnostics(line, format))
            }
        })
        .collect();

    let mut report = IngestReport {
        files: 1,
        lines: lines.len() as u64,
        ..IngestReport::default()
    };
    let mut records = Vec::with_capacity(results.len());

    for result in results {
        match result {
            Some(normalization) => {
                report.observe(&normalization);
                records.push(normalization.record);
            }
            None => report.blank_lines += 1,
        }
    }

    (records, report)
}

fn group_by_partition(
    records: Vec<CanonicalRecord>,
) -> BTreeMap<&'static str, Vec<CanonicalRecord>> {
    let mut groups: BTreeMap<&'static str, Vec<CanonicalRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(partition_key_of(&record))
            .or_default()
            .push(record);
    }
    groups
}

// =============================================================================
// Service
// =============================================================================

/// Drives the normalizer over source files and into a sink.
pub struct IngestService {
    source: Arc<dyn LineSourcePort>,
    sink: Arc<dyn RecordSinkPort>,
    metrics: Arc<dyn IngestMetricsPort>,
    options: IngestOptions,
}

impl IngestService {
    /// Create a new ingestion service.
    #[must_use]
    pub fn new(
        source: Arc<dyn LineSourcePort>,
        sink: Arc<dyn RecordSinkPort>,
        options: IngestOptions,
    ) -> Self {
        Self {
            source,
            sink,
            metrics: Arc::new(NoopIngestMetrics),
            options,
        }
    }

    /// Report per-file metrics to `metrics` instead of discarding them.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn IngestMetricsPort>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Ingest all sources as one full-refresh run.
    ///
    /// An empty source list leaves existing output untouched, and so does a
    /// run that fails after the sink was opened.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read, the sink fails, or the
    /// worker pool cannot be built.
    pub fn run(&self, sources: &[SourceFile]) -> Result<IngestReport, IngestError> {
        if sources.is_empty() {
            warn!("No source files found, nothing to ingest");
            return Ok(IngestReport::default());
        }

        let start = Instant::now();
        info!(
            files = sources.len(),
            source = self.source.name(),
            sink = self.sink.name(),
            "Starting ingestion"
        );

        self.sink.begin()?;

        let reports = match self.ingest_and_finish(sources) {
            Ok(reports) => reports,
            Err(e) => {
                if let Err(abort) = self.sink.abort() {
                    warn!(error = %abort, "Failed to discard staged output");
                }
                return Err(e);
            }
        };

        let mut report = IngestReport::default();
        for file_report in &reports {
            report.merge(file_report);
        }

        info!(
            files = report.files,
            lines = report.lines,
            trades = report.records_of(EventKind::Trade),
            quotes = report.records_of(EventKind::Quote),
            bad = report.records_of(EventKind::Bad),
            fallbacks = report.total_fallbacks(),
            degraded_fields = report.total_degraded_fields(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Ingestion complete"
        );

        Ok(report)
    }

    fn ingest_and_finish(&self, sources: &[SourceFile]) -> Result<Vec<IngestReport>, IngestError> {
        let reports = if self.options.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.max_threads)
                .build()
                .map_err(|e| IngestError::ThreadPool {
                    message: e.to_string(),
                })?;
            pool.install(|| self.ingest_all(sources))?
        } else {
            self.ingest_all(sources)?
        };

        self.sink.finish()?;
        Ok(reports)
    }

    fn ingest_all(&self, sources: &[SourceFile]) -> Result<Vec<IngestReport>, IngestError> {
        if sources.len() >= self.options.min_parallel_files {
            sources
                .par_iter()
                .map(|source| self.ingest_file(source))
                .collect()
        } else {
            sources
                .iter()
                .map(|source| self.ingest_file(source))
                .collect()
        }
    }

    /// Ingest a single source file into the sink.
    ///
    /// The sink must already be open.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the sink fails.
    pub fn ingest_file(&self, source: &SourceFile) -> Result<IngestReport, IngestError> {
        let start = Instant::now();

        let lines = self.source.read_lines(source)?;
        let (records, report) = normalize_lines(&lines, source.format);

        for (key, batch) in group_by_partition(records) {
            self.sink.write_partition(key, &batch)?;
            self.metrics.records_written(key, batch.len() as u64);
        }
        for (reason, count) in &report.fallbacks {
            self.metrics.fallbacks(*reason, *count);
        }
        for (field, count) in &report.degraded_fields {
            self.metrics.degraded_fields(*field, *count);
        }
        self.metrics.file_ingested(
            source.format,
            report.lines - report.blank_lines,
            start.elapsed(),
        );

        debug!(
            path = %source.path.display(),
            format = %source.format,
            lines = report.lines,
            records = report.total_records(),
            fallbacks = report.total_fallbacks(),
            "Source file ingested"
        );

        Ok(report)
    }
}

// =============================================================================
// Tests
// =============================================================================
