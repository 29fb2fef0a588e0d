//! IBX terminal session bridge, command-line caller.
//!
//! Connects to a running terminal, asks for its clock or its session
//! status, and prints the answer.

pub mod app;
pub mod config;
pub mod error;
pub mod report;

pub use app::Application;
pub use config::{AppConfig, ConfigSource, Overrides, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use report::{StatusSummary, TimeReport};
