//! Blocking session client for trading-terminal socket connections.
//!
//! Bridges the terminal's callback-driven protocol to synchronous calls:
//! - `SessionClient`: connect/disconnect, health, blocking requests
//! - `SessionWrapper`: sole receiver of inbound callbacks
//! - `PendingRequestSignal`: single-slot reset/wait/signal primitive
//! - `Transport` / `SessionCallbacks`: seams to the socket layer
//! - `TcpTransport`: the terminal socket protocol over TCP

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod signal;
pub mod socket;
pub mod transport;
pub mod wire;
pub mod wrapper;

pub use client::{SessionClient, SessionState};
pub use config::{ClientConfig, ErrorCodePolicy, DEFAULT_PORT};
pub use error::{TwsError, TwsResult};
pub use signal::PendingRequestSignal;
pub use socket::{TcpTransport, TcpTransportConfig};
pub use transport::{SessionCallbacks, Transport};
pub use wrapper::{PendingOutcome, SessionWrapper};
