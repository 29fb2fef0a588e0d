//! Interpretation of raw terminal timestamps.
//!
//! The terminal reports time as an integer count of seconds. Whether that
//! count is measured against UTC (a plain Unix timestamp) or against the
//! terminal host's local wall clock cannot be told from the value itself,
//! so the choice is explicit configuration and every value leaving this
//! crate is a `DateTime<Utc>`.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How raw seconds received from the terminal are turned into a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampConvention {
    /// Seconds since 1970-01-01T00:00:00Z (standard Unix time).
    #[default]
    Utc,
    /// Seconds since the epoch as read off the local wall clock of the
    /// machine running this process.
    Local,
}

impl TimestampConvention {
    /// Convert raw terminal seconds into a UTC point in time.
    pub fn interpret(&self, seconds: i64) -> Result<DateTime<Utc>> {
        let as_utc =
            DateTime::from_timestamp(seconds, 0).ok_or(CoreError::InvalidTimestamp(seconds))?;

        match self {
            Self::Utc => Ok(as_utc),
            Self::Local => Local
                .from_local_datetime(&as_utc.naive_utc())
                // Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .ok_or(CoreError::NonexistentLocalTime(seconds)),
        }
    }
}

impl std::fmt::Display for TimestampConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utc => write!(f, "utc"),
            Self::Local => write!(f, "local"),
        }
    }
}
