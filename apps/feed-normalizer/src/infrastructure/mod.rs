//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus process-wide concerns.

/// Configuration loading.
pub mod config;

/// Filesystem source discovery and line reading.
pub mod source;

/// Partitioned JSON Lines output.
pub mod sink;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber setup.
pub mod telemetry;
