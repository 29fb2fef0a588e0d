//! Session error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TwsError {
    #[error("Transport open failed: {0}")]
    TransportOpen(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Connection not established within {0:?}")]
    ConnectionTimeout(Duration),

    #[error("Not connected to terminal")]
    NotConnected,

    #[error("No response within {0:?}")]
    RequestTimeout(Duration),

    #[error("Terminal reported: {0}")]
    Protocol(String),

    #[error("Signaled without a time value or error")]
    EmptyResponse,

    #[error("Connection to terminal lost")]
    ConnectionLost,

    #[error("Wire format error: {0}")]
    Wire(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TwsResult<T> = Result<T, TwsError>;
