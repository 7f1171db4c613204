//! Structured telemetry initialisation for supervising processes.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, fmt};

use swarmctl_config::{LogConfig, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression failed to parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Installing the tracing subscriber failed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Repeated calls are idempotent: only the first invocation touches the
/// global state; later ones return a fresh handle without reinstalling.
pub fn initialise(log: &LogConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(log))
        .map(|()| TelemetryHandle)
}

fn install_subscriber(log: &LogConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&log.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        // Colour only on interactive terminals, never in captured sinks.
        .with_ansi(io::stderr().is_terminal());
    let subscriber: Box<dyn Subscriber + Send + Sync> = match log.format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_idempotent() {
        let log = LogConfig::default();
        initialise(&log).expect("first initialisation");
        initialise(&log).expect("second initialisation");
    }

    #[test]
    fn rejects_an_invalid_filter_expression() {
        let log = LogConfig {
            filter: "daemon=not_a_level".to_owned(),
            ..LogConfig::default()
        };
        let error = install_subscriber(&log).expect_err("malformed filter");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }
}
