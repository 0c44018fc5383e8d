//! Ingestion Configuration Settings
//!
//! Configuration types for a batch run, loaded from environment variables.

use std::path::PathBuf;

use crate::application::services::IngestOptions;
use crate::domain::partition::{DEFAULT_PARTITION_COLUMN, PartitionLayout};

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "ingest_stg";

/// Environment variable names.
pub mod vars {
    /// Root directory of positional CSV sources.
    pub const CSV_DIR: &str = "INGEST_CSV_DIR";
    /// Root directory of key-value JSON sources.
    pub const JSON_DIR: &str = "INGEST_JSON_DIR";
    /// Output directory.
    pub const OUTPUT_DIR: &str = "INGEST_OUTPUT_DIR";
    /// Partition column name.
    pub const PARTITION_COLUMN: &str = "INGEST_PARTITION_COLUMN";
    /// Worker thread limit.
    pub const MAX_THREADS: &str = "INGEST_MAX_THREADS";
    /// Metrics snapshot file.
    pub const METRICS_FILE: &str = "INGEST_METRICS_FILE";
}

/// Complete ingestion configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Root directory of positional CSV sources.
    pub csv_dir: PathBuf,
    /// Root directory of key-value JSON sources.
    pub json_dir: PathBuf,
    /// Output directory, replaced when a run succeeds.
    pub output_dir: PathBuf,
    /// Name of the partition column in output paths.
    pub partition_column: String,
    /// Worker thread limit (0 = one per core).
    pub max_threads: usize,
    /// Where to write the Prometheus snapshot, if anywhere.
    pub metrics_file: Option<PathBuf>,
}

impl IngestConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let csv_dir = required(&lookup, vars::CSV_DIR)?;
        let json_dir = required(&lookup, vars::JSON_DIR)?;

        let output_dir = optional(&lookup, vars::OUTPUT_DIR)
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let partition_column = optional(&lookup, vars::PARTITION_COLUMN)
            .unwrap_or_else(|| DEFAULT_PARTITION_COLUMN.to_string());

        let max_threads = parse_usize(lookup(vars::MAX_THREADS), 0);

        let metrics_file = optional(&lookup, vars::METRICS_FILE).map(PathBuf::from);

        Ok(Self {
            csv_dir: PathBuf::from(csv_dir),
            json_dir: PathBuf::from(json_dir),
            output_dir: PathBuf::from(output_dir),
            partition_column,
            max_threads,
            metrics_file,
        })
    }

    /// Output directory layout.
    #[must_use]
    pub fn partition_layout(&self) -> PartitionLayout {
        PartitionLayout::new(self.partition_column.clone())
    }

    /// Parallelism options for the ingestion service.
    #[must_use]
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_threads: self.max_threads,
            ..IngestOptions::default()
        }
    }
}

/// Configuration error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_usize(value: Option<String>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
