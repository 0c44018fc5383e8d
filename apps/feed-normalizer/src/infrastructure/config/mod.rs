//! Configuration Module
//!
//! Configuration loading for an ingestion run.

mod settings;

pub use settings::{ConfigError, DEFAULT_OUTPUT_DIR, IngestConfig, vars};
