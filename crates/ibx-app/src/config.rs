//! Application configuration.

use crate::error::{AppError, AppResult};
use ibx_telemetry::DEFAULT_DIRECTIVE;
use ibx_tws::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "IBX_CONFIG";
/// Config file used when neither `--config` nor `IBX_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_DIRECTIVE.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level configuration of the `ibx` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Terminal session settings.
    #[serde(default = "default_terminal")]
    pub terminal: ClientConfig,
    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// The CLI waits for the terminal's readiness message before requesting.
fn default_terminal() -> ClientConfig {
    ClientConfig {
        wait_for_next_valid_id: true,
        ..ClientConfig::default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// No file found at the fallback path.
    Defaults { missing: String },
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<i32>,
    pub request_timeout_ms: Option<u64>,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path (CLI or `IBX_CONFIG`) must exist. The fallback
    /// `config/default.toml` is optional; without it defaults apply.
    pub fn load(explicit: Option<String>) -> AppResult<(Self, ConfigSource)> {
        if let Some(path) = explicit.or_else(|| std::env::var(CONFIG_ENV).ok()) {
            let config = Self::from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            let config = Self::from_file(DEFAULT_CONFIG_PATH)?;
            Ok((config, ConfigSource::File(DEFAULT_CONFIG_PATH.to_string())))
        } else {
            Ok((
                Self::default(),
                ConfigSource::Defaults {
                    missing: DEFAULT_CONFIG_PATH.to_string(),
                },
            ))
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply command-line overrides, then validate the result.
    pub fn apply(&mut self, overrides: Overrides) -> AppResult<()> {
        if let Some(host) = overrides.host {
            self.terminal.host = host;
        }
        if let Some(port) = overrides.port {
            self.terminal.port = port;
        }
        if let Some(client_id) = overrides.client_id {
            self.terminal.client_id = client_id;
        }
        if let Some(timeout) = overrides.request_timeout_ms {
            self.terminal.request_timeout_ms = timeout;
        }
        self.validate()
    }

    pub fn validate(&self) -> AppResult<()> {
        self.terminal.validate()?;
        if self.telemetry.log_level.trim().is_empty() {
            return Err(AppError::Config("telemetry.log_level is empty".to_string()));
        }
        Ok(())
    }
}
