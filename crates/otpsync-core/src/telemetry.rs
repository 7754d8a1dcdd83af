//! Tracing subscriber setup.
//!
//! The pipeline itself only emits `tracing` events; hosts that do not
//! install their own subscriber can use these helpers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Builds the filter from an explicit directive, `RUST_LOG`, or `info`.
fn env_filter(directive: Option<&str>) -> EnvFilter {
    let directive = directive
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".into());
    EnvFilter::new(directive)
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `Error::Telemetry` if a global subscriber is already set.
pub fn init(directive: Option<&str>) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(directive))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Telemetry(e.to_string()))
}

/// Installs a test-writer subscriber, ignoring an already installed one.
pub fn try_init_for_tests(directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(directive)
        .with_test_writer()
        .try_init();
}
