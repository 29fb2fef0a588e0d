//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Tws(#[from] ibx_tws::TwsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] ibx_telemetry::TelemetryError),

    #[error("Could not connect to terminal at {host}:{port}")]
    ConnectFailed { host: String, port: u16 },

    #[error("No time response received from terminal")]
    NoTimeResponse,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
