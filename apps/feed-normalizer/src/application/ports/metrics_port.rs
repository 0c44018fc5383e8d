//! Ingestion metrics port.
//!
//! The service reports per-file counters through this port so it never
//! depends on a particular metrics backend.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::record::{Field, SourceFormat};

/// Port for recording ingestion metrics.
pub trait IngestMetricsPort: Send + Sync {
    /// One source file was ingested with `lines` non-blank lines.
    fn file_ingested(&self, format: SourceFormat, lines: u64, elapsed: Duration);

    /// `count` records were routed to `partition`.
    fn records_written(&self, partition: &'static str, count: u64);

    /// `count` lines fell back to bad records for `reason`.
    fn fallbacks(&self, reason: &'static str, count: u64);

    /// `count` values of `field` were nulled by coercion.
    fn degraded_fields(&self, field: Field, count: u64);
}

/// Metrics port that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIngestMetrics;

impl IngestMetricsPort for NoopIngestMetrics {
    fn file_ingested(&self, _format: SourceFormat, _lines: u64, _elapsed: Duration) {}

    fn records_written(&self, _partition: &'static str, _count: u64) {}

    fn fallbacks(&self, _reason: &'static str, _count: u64) {}

    fn degraded_fields(&self, _field: Field, _count: u64) {}
}

#[derive(Debug, Default)]
struct Counters {
    files: u64,
    lines: u64,
    records: BTreeMap<&'static str, u64>,
    fallbacks: BTreeMap<&'static str, u64>,
    degraded_fields: BTreeMap<Field, u64>,
}

/// In-memory metrics port for testing.
#[derive(Debug, Default)]
pub struct InMemoryIngestMetrics {
    counters: Mutex<Counters>,
}

impl InMemoryIngestMetrics {
    /// Create a new recorder with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files recorded.
    #[must_use]
    pub fn files(&self) -> u64 {
        self.counters.lock().files
    }

    /// Non-blank lines recorded.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.counters.lock().lines
    }

    /// Records recorded for a partition key.
    #[must_use]
    pub fn records(&self, partition: &str) -> u64 {
        self.counters
            .lock()
            .records
            .get(partition)
            .copied()
            .unwrap_or(0)
    }

    /// Fallbacks recorded for a reason.
    #[must_use]
    pub fn fallbacks_for(&self, reason: &str) -> u64 {
        self.counters
            .lock()
            .fallbacks
            .get(reason)
            .copied()
            .unwrap_or(0)
    }

    /// Degraded values recorded for a column.
    #[must_use]
    pub fn degraded(&self, field: Field) -> u64 {
        self.counters
            .lock()
            .degraded_fields
            .get(&field)
            .copied()
            .unwrap_or(0)
    }
}

impl IngestMetricsPort for InMemoryIngestMetrics {
    fn file_ingested(&self, _format: SourceFormat, lines: u64, _elapsed: Duration) {
        let mut counters = self.counters.lock();
        counters.files += 1;
        counters.lines += lines;
    }

    fn records_written(&self, partition: &'static str, count: u64) {
        *self.counters.lock().records.entry(partition).or_default() += count;
    }

    fn fallbacks(&self, reason: &'static str, count: u64) {
        *self.counters.lock().fallbacks.entry(reason).or_default() += count;
    }

    fn degraded_fields(&self, field: Field, count: u64) {
        *self
            .counters
            .lock()
            .degraded_fields
            .entry(field)
            .or_default() += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = InMemoryIngestMetrics::new();
        metrics.file_ingested(SourceFormat::PositionalCsv, 4, Duration::ZERO);
        metrics.file_ingested(SourceFormat::KeyValueJson, 2, Duration::ZERO);
        metrics.records_written("T", 3);
        metrics.records_written("T", 1);
        metrics.fallbacks("unclassified", 2);
        metrics.degraded_fields(Field::Price, 1);

        assert_eq!(metrics.files(), 2);
        assert_eq!(metrics.lines(), 6);
        assert_eq!(metrics.records("T"), 4);
        assert_eq!(metrics.records("Q"), 0);
        assert_eq!(metrics.fallbacks_for("unclassified"), 2);
        assert_eq!(metrics.degraded(Field::Price), 1);
    }
}
