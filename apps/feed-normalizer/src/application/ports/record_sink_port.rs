//! Record sink port.
//!
//! A sink receives normalized records in batches that share one partition
//! key. Batches for the same key may arrive from several workers and in any
//! order; the sink is responsible for landing them together.
//!
//! A run is `begin`, any number of `write_partition` calls, then either
//! `finish` or `abort`. Previous output stays visible until `finish`
//! replaces it; `abort` discards the run and leaves it in place.

use std::collections::BTreeMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::domain::record::CanonicalRecord;

/// Errors from persisting records.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O failure while preparing or writing output.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Write attempted before `begin` or after `finish`.
    #[error("sink is not open")]
    NotOpen,

    /// The output root cannot be staged beside.
    #[error("invalid output root: {}", .0.display())]
    InvalidRoot(PathBuf),
}

/// Port for persisting normalized records.
pub trait RecordSinkPort: Send + Sync {
    /// Open a full-refresh run. Previous output is untouched until `finish`.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be staged.
    fn begin(&self) -> Result<(), SinkError>;

    /// Append a batch of records sharing the partition key `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be written.
    fn write_partition(&self, key: &str, records: &[CanonicalRecord]) -> Result<(), SinkError>;

    /// Flush the run and make it replace any previous output.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed or published.
    fn finish(&self) -> Result<(), SinkError>;

    /// Discard the run, keeping any previous output.
    ///
    /// # Errors
    ///
    /// Returns an error if staged output cannot be removed.
    fn abort(&self) -> Result<(), SinkError>;

    /// Get the name of this sink.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct InMemoryState {
    open: bool,
    finished: bool,
    aborted: bool,
    staged: BTreeMap<String, Vec<CanonicalRecord>>,
    partitions: BTreeMap<String, Vec<CanonicalRecord>>,
}

/// In-memory record sink for testing.
#[derive(Debug, Default)]
pub struct InMemoryRecordSink {
    state: Mutex<InMemoryState>,
}

impl InMemoryRecordSink {
    /// Create a new empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records published under a partition key by the last finished run.
    #[must_use]
    pub fn records(&self, key: &str) -> Vec<CanonicalRecord> {
        self.state
            .lock()
            .partitions
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Published partition keys.
    #[must_use]
    pub fn partition_keys(&self) -> Vec<String> {
        self.state.lock().partitions.keys().cloned().collect()
    }

    /// Total published records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().partitions.values().map(Vec::len).sum()
    }

    /// Whether nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `finish` has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Whether the last run was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }
}

impl RecordSinkPort for InMemoryRecordSink {
    fn begin(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.staged.clear();
        state.open = true;
        state.finished = false;
        state.aborted = false;
        drop(state);
        Ok(())
    }

    fn write_partition(&self, key: &str, records: &[CanonicalRecord]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(SinkError::NotOpen);
        }
        state
            .staged
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(records);
        drop(state);
        Ok(())
    }

    fn finish(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(SinkError::NotOpen);
        }
        state.partitions = std::mem::take(&mut state.staged);
        state.open = false;
        state.finished = true;
        drop(state);
        Ok(())
    }

    fn abort(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.staged.clear();
        state.open = false;
        state.aborted = true;
        drop(state);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::EventKind;

    #[test]
    fn write_before_begin_is_rejected() {
        let sink = InMemoryRecordSink::new();
        let err = sink
            .write_partition("B", &[CanonicalRecord::bad()])
            .unwrap_err();
        assert!(matches!(err, SinkError::NotOpen));
    }

    #[test]
    fn batches_for_same_key_accumulate() {
        let sink = InMemoryRecordSink::new();
        sink.begin().unwrap();

        let trade = CanonicalRecord::empty(EventKind::Trade);
        sink.write_partition("T", &[trade.clone()]).unwrap();
        sink.write_partition("T", &[trade.clone(), trade]).unwrap();
        sink.write_partition("B", &[CanonicalRecord::bad()]).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.records("T").len(), 3);
        assert_eq!(sink.partition_keys(), vec!["B".to_string(), "T".to_string()]);
        assert_eq!(sink.len(), 4);
        assert!(sink.is_finished());
    }

    #[test]
    fn finish_replaces_previous_output() {
        let sink = InMemoryRecordSink::new();
        sink.begin().unwrap();
        sink.write_partition("B", &[CanonicalRecord::bad()]).unwrap();
        sink.finish().unwrap();

        sink.begin().unwrap();
        assert_eq!(sink.len(), 1);
        assert!(!sink.is_finished());

        sink.write_partition("T", &[CanonicalRecord::empty(EventKind::Trade)])
            .unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.partition_keys(), vec!["T".to_string()]);
    }

    #[test]
    fn abort_keeps_previous_output() {
        let sink = InMemoryRecordSink::new();
        sink.begin().unwrap();
        sink.write_partition("B", &[CanonicalRecord::bad()]).unwrap();
        sink.finish().unwrap();

        sink.begin().unwrap();
        sink.write_partition("T", &[CanonicalRecord::empty(EventKind::Trade)])
            .unwrap();
        sink.abort().unwrap();

        assert!(sink.is_aborted());
        assert_eq!(sink.partition_keys(), vec!["B".to_string()]);
        assert!(matches!(
            sink.write_partition("T", &[]).unwrap_err(),
            SinkError::NotOpen
        ));
    }
}
