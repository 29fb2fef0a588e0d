//! Structured logging for the IBX terminal bridge.
//!
//! JSON output in production, pretty output during development. `RUST_LOG`
//! always wins over the configured level.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{build_filter, init_logging, LogFormat, DEFAULT_DIRECTIVE};
