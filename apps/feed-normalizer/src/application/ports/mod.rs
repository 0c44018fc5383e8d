//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `LineSourcePort`: Reads the raw lines of one source file
//! - `RecordSinkPort`: Persists normalized records grouped by partition key
//! - `IngestMetricsPort`: Records per-file ingestion counters

mod line_source_port;
mod metrics_port;
mod record_sink_port;

pub use line_source_port::{InMemoryLineSource, LineSourcePort, SourceError, SourceFile};
pub use metrics_port::{InMemoryIngestMetrics, IngestMetricsPort, NoopIngestMetrics};
pub use record_sink_port::{InMemoryRecordSink, RecordSinkPort, SinkError};
