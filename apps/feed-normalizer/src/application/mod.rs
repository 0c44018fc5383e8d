//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the ingestion service and the port interfaces
//! that define how the normalization core reaches sources and storage.

/// Port interfaces for external systems (line sources, record sinks).
pub mod ports;

/// Application services for batch ingestion.
pub mod services;
