//! Application orchestration.
//!
//! The session client is blocking; every call into it runs on tokio's
//! blocking pool so Ctrl+C stays responsive.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::report::{StatusSummary, TimeReport};
use ibx_core::ConnectionStatus;
use ibx_tws::{SessionClient, TcpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How a hold period ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    Elapsed,
    Interrupted,
}

/// Main application.
pub struct Application<T: Transport = TcpTransport> {
    config: AppConfig,
    client: Arc<SessionClient<T>>,
}

impl Application {
    /// Create an application talking to the configured terminal over TCP.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let client = SessionClient::new(config.terminal.clone());
        Ok(Self::with_client(config, client))
    }
}

impl<T: Transport> Application<T> {
    pub fn with_client(config: AppConfig, client: SessionClient<T>) -> Self {
        Self {
            config,
            client: Arc::new(client),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &SessionClient<T> {
        &self.client
    }

    async fn blocking<R, F>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&SessionClient<T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| AppError::Task(e.to_string()))
    }

    /// Connect, logging a troubleshooting checklist on failure.
    pub async fn connect(&self) -> AppResult<()> {
        let terminal = &self.config.terminal;
        info!(
            host = %terminal.host,
            port = terminal.port,
            client_id = terminal.client_id,
            "Connecting to terminal"
        );

        if self.blocking(|client| client.connect()).await? {
            info!("Connection established");
            return Ok(());
        }

        error!("Failed to connect to terminal. Please ensure:");
        error!("  1. The trading terminal or gateway is running");
        error!("  2. API connections are enabled on port {}", terminal.port);
        error!("  3. The port number is correct for your terminal configuration");
        error!("  4. No firewall is blocking the connection");
        Err(AppError::ConnectFailed {
            host: terminal.host.clone(),
            port: terminal.port,
        })
    }

    /// Request the terminal clock with the configured timeout.
    pub async fn request_time(&self) -> AppResult<TimeReport> {
        info!("Requesting current time from terminal");
        let result = self
            .blocking(|client| client.current_time())
            .await?
            .ok_or(AppError::NoTimeResponse)?;

        let terminal = &self.config.terminal;
        Ok(TimeReport::new(
            &result,
            &terminal.host,
            terminal.port,
            terminal.client_id,
        ))
    }

    pub async fn status(&self) -> AppResult<ConnectionStatus> {
        self.blocking(|client| client.connection_status()).await
    }

    /// Keep the session open for `duration` or until Ctrl+C.
    pub async fn hold(&self, duration: Duration) -> HoldOutcome {
        tokio::select! {
            _ = tokio::time::sleep(duration) => HoldOutcome::Elapsed,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                HoldOutcome::Interrupted
            }
        }
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Disconnecting from terminal");
        self.blocking(|client| client.disconnect()).await
    }

    /// `ibx time`: connect, request, optionally hold, disconnect.
    ///
    /// Returns the text to print.
    pub async fn run_time(&self, json: bool, hold: Duration) -> AppResult<String> {
        self.connect().await?;

        let outcome = self.request_time().await;
        match &outcome {
            Ok(report) => {
                info!(unix_seconds = report.unix_seconds, "Received terminal time");
                if !hold.is_zero() {
                    info!(?hold, "Connection active. Press Ctrl+C to exit...");
                    self.hold(hold).await;
                }
            }
            Err(e) => warn!(%e, "No time response received from terminal"),
        }

        self.shutdown().await?;
        let report = outcome?;
        if json {
            Ok(serde_json::to_string_pretty(&report)?)
        } else {
            Ok(report.to_string())
        }
    }

    /// `ibx status`: connect, snapshot, disconnect.
    ///
    /// A failed connect still yields a status; it reports disconnected.
    pub async fn run_status(&self, json: bool) -> AppResult<String> {
        if let Err(e) = self.connect().await {
            warn!(%e, "Reporting status of a disconnected session");
        }
        let status = self.status().await?;
        self.shutdown().await?;

        if json {
            Ok(serde_json::to_string_pretty(&status)?)
        } else {
            Ok(StatusSummary(&status).to_string())
        }
    }
}
