//! Partition Assignment
//!
//! Derives the routing key of a normalized record and maps keys onto a
//! storage layout. The key depends on the record kind alone; layout policy
//! (directory naming) lives in [`PartitionLayout`] so it can change without
//! touching normalization.

use std::path::PathBuf;

use crate::domain::record::{CanonicalRecord, EventKind};

/// Default partition column name.
pub const DEFAULT_PARTITION_COLUMN: &str = "partition";

/// Partition key of a record: its event type code.
#[must_use]
pub const fn partition_key_of(record: &CanonicalRecord) -> &'static str {
    record.partition().code()
}

/// Directory naming policy for partitioned output.
///
/// Produces Hive-style `<column>=<key>` directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    column: String,
}

impl Default for PartitionLayout {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_COLUMN)
    }
}

impl PartitionLayout {
    /// Create a layout keyed by the given column name.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Partition column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Relative directory for a partition key.
    #[must_use]
    pub fn directory(&self, key: &str) -> PathBuf {
        PathBuf::from(format!("{}={key}", self.column))
    }

    /// Relative directory for a record kind.
    #[must_use]
    pub fn directory_for_kind(&self, kind: EventKind) -> PathBuf {
        self.directory(kind.code())
    }

    /// Relative directory a record belongs in.
    #[must_use]
    pub fn directory_for(&self, record: &CanonicalRecord) -> PathBuf {
        self.directory(partition_key_of(record))
    }
}
