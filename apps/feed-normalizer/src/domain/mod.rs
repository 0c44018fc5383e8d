//! Domain Layer - Canonical record model and the normalization engine.
//!
//! This layer contains the pure, I/O-free logic that maps raw feed lines
//! onto the canonical record schema. Every operation here is a pure function
//! of its inputs and safe to call concurrently from any number of workers.

/// Canonical record schema (record kinds, columns, formats).
pub mod record;

/// Field extraction, classification, coercion and the normalizer entry point.
pub mod normalization;

/// Partition key assignment and storage layout policy.
pub mod partition;
