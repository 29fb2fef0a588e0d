//! Core value types for the IBX terminal session bridge.
//!
//! This crate provides the immutable values handed to calling layers:
//! - `ConnectionStatus`: health snapshot of one terminal session
//! - `TimeResult`: outcome of a successful current-time round trip
//! - `TimestampConvention`: how raw terminal seconds map to a point in time

pub mod error;
pub mod time;
pub mod types;

pub use error::{CoreError, Result};
pub use time::TimestampConvention;
pub use types::{ConnectionStatus, TimeResult};
