//! Session client configuration.

use crate::error::{TwsError, TwsResult};
use ibx_core::TimestampConvention;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default terminal API port. Deliberately distinct from the terminal's
/// standard ports (7496 live, 7497 paper, 4001/4002 gateway).
pub const DEFAULT_PORT: u16 = 7500;

/// Terminal error-code classification.
///
/// Both sets are terminal-version specific, so they are configuration
/// rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCodePolicy {
    /// Codes meaning the link to the terminal failed. A pending request is
    /// woken immediately instead of running into its timeout.
    #[serde(default = "default_connection_lost_codes")]
    pub connection_lost: Vec<i32>,
    /// Status/heartbeat notices that arrive on the error channel but are
    /// not errors. Logged only.
    #[serde(default = "default_informational_codes")]
    pub informational: Vec<i32>,
}

fn default_connection_lost_codes() -> Vec<i32> {
    vec![1100, 1101, 1102]
}

fn default_informational_codes() -> Vec<i32> {
    // 2104/2106: market/HMDS data farm connection OK; 2158: sec-def farm OK.
    vec![2104, 2106, 2158]
}

impl Default for ErrorCodePolicy {
    fn default() -> Self {
        Self {
            connection_lost: default_connection_lost_codes(),
            informational: default_informational_codes(),
        }
    }
}

impl ErrorCodePolicy {
    /// Check if `code` signals a lost connection.
    pub fn is_connection_lost(&self, code: i32) -> bool {
        self.connection_lost.contains(&code)
    }

    /// Check if `code` is informational only.
    pub fn is_informational(&self, code: i32) -> bool {
        self.informational.contains(&code)
    }
}

/// Session client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Terminal host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Terminal API port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Client identifier, unique per concurrent session on one terminal.
    #[serde(default = "default_client_id")]
    pub client_id: i32,
    /// Default timeout for request/response round trips (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Time allowed for the transport to report connected (ms).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Poll interval while waiting for the transport (ms).
    #[serde(default = "default_connect_poll_interval_ms")]
    pub connect_poll_interval_ms: u64,
    /// Bounded wait for the dispatch thread during teardown (ms).
    #[serde(default = "default_dispatch_join_timeout_ms")]
    pub dispatch_join_timeout_ms: u64,
    /// Additionally require the terminal's next-valid-id message before
    /// `connect` reports success.
    #[serde(default)]
    pub wait_for_next_valid_id: bool,
    /// How raw terminal seconds are interpreted.
    #[serde(default)]
    pub timestamp_convention: TimestampConvention,
    /// Error-code classification.
    #[serde(default)]
    pub error_codes: ErrorCodePolicy,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_client_id() -> i32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_connect_poll_interval_ms() -> u64 {
    100
}

fn default_dispatch_join_timeout_ms() -> u64 {
    2_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            connect_poll_interval_ms: default_connect_poll_interval_ms(),
            dispatch_join_timeout_ms: default_dispatch_join_timeout_ms(),
            wait_for_next_valid_id: false,
            timestamp_convention: TimestampConvention::default(),
            error_codes: ErrorCodePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Config for a given endpoint with all other values defaulted.
    pub fn for_endpoint(host: impl Into<String>, port: u16, client_id: i32) -> Self {
        Self {
            host: host.into(),
            port,
            client_id,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connect_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connect_poll_interval_ms)
    }

    pub fn dispatch_join_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_join_timeout_ms)
    }

    /// Reject values the client cannot operate with.
    pub fn validate(&self) -> TwsResult<()> {
        if self.host.trim().is_empty() {
            return Err(TwsError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(TwsError::InvalidConfig("port must be non-zero".to_string()));
        }
        if self.connect_poll_interval_ms == 0 {
            return Err(TwsError::InvalidConfig(
                "connect_poll_interval_ms must be positive".to_string(),
            ));
        }
        if let Some(code) = self
            .error_codes
            .connection_lost
            .iter()
            .find(|c| self.error_codes.is_informational(**c))
        {
            return Err(TwsError::InvalidConfig(format!(
                "error code {code} is both connection-lost and informational"
            )));
        }
        Ok(())
    }
}
