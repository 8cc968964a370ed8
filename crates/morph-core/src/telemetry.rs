//! Logging setup

use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Telemetry setup errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Filter directive did not parse
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    /// A global subscriber is already installed
    #[error("cannot install subscriber: {0}")]
    Install(String),
}

/// Build the log filter; `RUST_LOG` wins over the configured directive
///
/// # Errors
/// `TelemetryError::Filter` if the configured directive is invalid
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.filter)?),
    }
}

/// Install the global `tracing` subscriber
///
/// # Errors
/// `TelemetryError::Filter` for a bad directive, `TelemetryError::Install` if
/// a subscriber is already set
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
    Ok(())
}
