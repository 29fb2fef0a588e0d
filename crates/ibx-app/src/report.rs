//! Printable results of CLI commands.

use chrono::{DateTime, Local, Utc};
use ibx_core::{ConnectionStatus, TimeResult};
use serde::Serialize;
use std::fmt;

const RULE: &str = "============================================================";

/// Outcome of `ibx time`.
#[derive(Debug, Clone, Serialize)]
pub struct TimeReport {
    pub unix_seconds: i64,
    pub current_time: DateTime<Utc>,
    pub host: String,
    pub port: u16,
    pub client_id: i32,
    pub server_version: Option<i32>,
    pub connection_time: Option<DateTime<Utc>>,
}

impl TimeReport {
    pub fn new(result: &TimeResult, host: &str, port: u16, client_id: i32) -> Self {
        Self {
            unix_seconds: result.unix_seconds(),
            current_time: result.current_time,
            host: host.to_string(),
            port,
            client_id,
            server_version: result.server_version,
            connection_time: result.connection_time,
        }
    }

    /// Terminal time in the local zone, for display.
    pub fn readable_time(&self) -> String {
        self.current_time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }
}

impl fmt::Display for TimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "SUCCESS: Connection to terminal established!")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Terminal Time (Unix Timestamp): {}", self.unix_seconds)?;
        writeln!(f, "Terminal Time (Readable):       {}", self.readable_time())?;
        writeln!(f, "Connection Host:                {}", self.host)?;
        writeln!(f, "Connection Port:                {}", self.port)?;
        writeln!(f, "Client ID:                      {}", self.client_id)?;
        if let Some(version) = self.server_version {
            writeln!(f, "Server Version:                 {version}")?;
        }
        write!(f, "{RULE}")
    }
}

/// Text form of a connection status snapshot.
pub struct StatusSummary<'a>(pub &'a ConnectionStatus);

impl fmt::Display for StatusSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.0;
        let state = if status.connected {
            "CONNECTED"
        } else {
            "DISCONNECTED"
        };
        writeln!(f, "State:           {state}")?;
        writeln!(f, "Endpoint:        {}", status.endpoint())?;
        writeln!(f, "Client ID:       {}", status.client_id)?;
        match status.connection_time {
            Some(at) => writeln!(f, "Connected Since: {}", at.to_rfc3339())?,
            None => writeln!(f, "Connected Since: -")?,
        }
        write!(
            f,
            "Last Error:      {}",
            status.error_message.as_deref().unwrap_or("-")
        )
    }
}
