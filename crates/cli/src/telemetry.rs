//! Structured logging setup.
//!
//! Logs go to stderr so `ownership run` can keep stdout for the response
//! envelope. The filter comes from `RUST_LOG`, falling back to info-level
//! logging for this service's crates and the HTTP trace layer.

use std::io::{self, IsTerminal};

use clap::ValueEnum;
use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_subscriber::{fmt, EnvFilter};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "ownership=info,ownership_core=info,ownership_backend=info,tower_http=info";

/// Env var selecting the log format when `--log-format` is not given.
const LOG_FORMAT_ENV: &str = "OWNERSHIP_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Single-line human-readable events.
    Compact,
    /// One JSON object per event, for log collectors.
    Json,
}

impl LogFormat {
    /// Read `OWNERSHIP_LOG_FORMAT`; anything other than `json` is compact.
    pub(crate) fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install log subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Install the global subscriber. Later calls are no-ops.
pub(crate) fn initialise(format: LogFormat) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(format))
        .map(|_| ())
}

fn env_filter() -> Result<EnvFilter, TelemetryError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).map_err(|e| TelemetryError::Filter(e.to_string()))
        }
        _ => EnvFilter::try_new(DEFAULT_FILTER).map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}

fn install_subscriber(format: LogFormat) -> Result<(), TelemetryError> {
    let filter = env_filter()?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn initialise_is_idempotent() {
        assert!(initialise(LogFormat::Compact).is_ok());
        assert!(initialise(LogFormat::Json).is_ok());
    }
}
