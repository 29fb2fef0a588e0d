//! Session value types exposed to calling layers.
//!
//! Both types are immutable snapshots: they are assembled on demand from
//! live session state and carry no lifecycle of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host reported when status assembly itself failed.
pub const UNKNOWN_HOST: &str = "unknown";

/// Connection health snapshot for one terminal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the session is currently usable for requests.
    pub connected: bool,
    /// Client identifier used for this session.
    pub client_id: i32,
    /// Terminal host.
    pub host: String,
    /// Terminal API port.
    pub port: u16,
    /// When the terminal acknowledged the connection.
    #[serde(default)]
    pub connection_time: Option<DateTime<Utc>>,
    /// Last error reported by the terminal or by status assembly.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ConnectionStatus {
    /// Status used when the live session could not be inspected.
    ///
    /// Every field is the "nothing known" value and the reason is carried
    /// in `error_message`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            connected: false,
            client_id: 0,
            host: UNKNOWN_HOST.to_string(),
            port: 0,
            connection_time: None,
            error_message: Some(reason.into()),
        }
    }

    /// Terminal endpoint as `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Result of a successful current-time request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeResult {
    /// Terminal server time.
    pub current_time: DateTime<Utc>,
    /// Server protocol version negotiated at connect, when known.
    #[serde(default)]
    pub server_version: Option<i32>,
    /// When the terminal acknowledged the connection.
    #[serde(default)]
    pub connection_time: Option<DateTime<Utc>>,
}

impl TimeResult {
    /// Server time as Unix seconds.
    pub fn unix_seconds(&self) -> i64 {
        self.current_time.timestamp()
    }
}
