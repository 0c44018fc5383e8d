#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Feed Normalizer - Market Data Record Normalization
//!
//! Maps heterogeneous exchange feed lines (positional CSV and key-value
//! JSON) onto one canonical trade/quote record schema. Lines that cannot be
//! interpreted become "bad" records rather than errors, so a batch never
//! aborts on dirty data.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure normalization logic and data types
//!   - `record`: Canonical schema, record kinds, source formats
//!   - `normalization`: Extraction, classification, coercion, fallback
//!   - `partition`: Partition keys and output layout
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for line sources, record sinks and metrics
//!   - `services`: Parallel batch ingestion
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `source`: Filesystem discovery and reading
//!   - `sink`: Partitioned JSON Lines writer
//!   - `config`: Environment configuration
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! CSV files  ──┐                                     ┌─► partition=T
//!              ├─► normalize ─► partition_key_of ─►──┼─► partition=Q
//! JSON files ──┘                                     └─► partition=B
//! ```
//!
//! # Example
//!
//! ```
//! use feed_normalizer::{EventKind, SourceFormat, normalize};
//!
//! let record = normalize(
//!     "2020-08-06,2020-08-06 09:30:00,T,SYMA,2020-08-06 09:40:00,1,NYSE,76.10,100",
//!     SourceFormat::PositionalCsv,
//! );
//! assert_eq!(record.event_type, EventKind::Trade);
//! assert_eq!(record.size, Some(100));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Canonical schema and pure normalization logic.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::normalization::{
    ExtractError, Fallback, Normalization, RawFields, classify, coerce, extract_fields, normalize,
    normalize_with_diagnostics, try_extract_fields,
};
pub use domain::partition::{PartitionLayout, partition_key_of};
pub use domain::record::{
    CanonicalRecord, EventKind, Field, FieldType, PartitionMismatch, SourceFormat, UnsupportedFormat,
};

// Application
pub use application::ports::{
    InMemoryIngestMetrics, InMemoryLineSource, InMemoryRecordSink, IngestMetricsPort,
    LineSourcePort, NoopIngestMetrics, RecordSinkPort, SinkError, SourceError, SourceFile,
};
pub use application::services::{
    IngestError, IngestOptions, IngestReport, IngestService, normalize_lines,
};

// Infrastructure
pub use infrastructure::config::{ConfigError, IngestConfig};
pub use infrastructure::metrics::{PrometheusIngestMetrics, init_metrics};
pub use infrastructure::sink::PartitionedJsonSink;
pub use infrastructure::source::{FileLineSource, discover_sources};
pub use infrastructure::telemetry::{TelemetryConfig, init as init_telemetry};
