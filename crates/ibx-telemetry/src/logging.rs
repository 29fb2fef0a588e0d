//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a configured level is given.
pub const DEFAULT_DIRECTIVE: &str = "info,ibx=debug";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// `RUST_ENV=production` selects JSON, anything else pretty.
    pub fn from_env() -> Self {
        Self::from_rust_env(std::env::var("RUST_ENV").ok().as_deref())
    }

    fn from_rust_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Build the event filter: `RUST_LOG` if set and valid, else `directive`.
pub fn build_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    resolve_filter(std::env::var("RUST_LOG").ok().as_deref(), directive)
}

fn resolve_filter(env_value: Option<&str>, directive: &str) -> TelemetryResult<EnvFilter> {
    if let Some(filter) = env_value.and_then(|v| EnvFilter::try_new(v).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// `directive` is the configured level (e.g. `"info"` or
/// `"warn,ibx_tws=debug"`). Fails if a subscriber is already installed.
pub fn init_logging(directive: &str) -> TelemetryResult<()> {
    let env_filter = build_filter(directive)?;

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
