//! Tracing Integration
//!
//! Configures a `tracing` subscriber writing human-readable events to
//! stderr. Filtering follows `RUST_LOG`, with this crate defaulting to
//! `info`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard `EnvFilter` directives
//! - `INGEST_LOG_TARGETS`: Set to "false" to hide event targets (default: true)
//!
//! # Usage
//!
//! ```ignore
//! use feed_normalizer::infrastructure::telemetry;
//!
//! telemetry::init()?;
//! tracing::info!("Starting ingestion");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Default directive for this crate.
const DEFAULT_DIRECTIVE: &str = "feed_normalizer=info";

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Directive appended to `RUST_LOG`.
    pub default_directive: String,
    /// Whether events show their target module.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_string(),
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let with_target = std::env::var("INGEST_LOG_TARGETS")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            with_target,
            ..Self::default()
        }
    }
}

/// Errors from installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The default directive does not parse.
    #[error("invalid log directive: {0}")]
    Directive(#[from] ParseError),
    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Initialize telemetry with configuration from the environment.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> Result<(), TelemetryError> {
    init_with_config(&TelemetryConfig::from_env())
}

/// Initialize telemetry with custom configuration.
///
/// # Errors
///
/// Returns an error if the directive is invalid or a global subscriber is
/// already installed.
pub fn init_with_config(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, ParseError> {
    Ok(EnvFilter::from_default_env().add_directive(config.default_directive.parse()?))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_directive, DEFAULT_DIRECTIVE);
        assert!(config.with_target);
    }

    #[test]
    fn default_directive_parses() {
        assert!(build_filter(&TelemetryConfig::default()).is_ok());
    }
}
