//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `IngestService`: Normalizes source files in parallel and routes records
//!   to a sink by partition key

mod ingest;

pub use ingest::{IngestError, IngestOptions, IngestReport, IngestService, normalize_lines};
