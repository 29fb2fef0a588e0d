//! IBX terminal bridge - Entry Point
//!
//! Connects to a running trading terminal and asks for its clock or its
//! session status.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ibx_app::{AppConfig, Application, ConfigSource, Overrides};
use std::time::Duration;
use tracing::{info, warn};

/// Talk to a trading terminal over its socket API.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via IBX_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Terminal host address
    #[arg(long)]
    host: Option<String>,

    /// Terminal API port (7496/7497 TWS live/paper, 4001/4002 gateway live/paper)
    #[arg(long)]
    port: Option<u16>,

    /// Client ID for this connection
    #[arg(long)]
    client_id: Option<i32>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request the terminal's current time (default)
    Time {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
        /// Keep the connection open this many seconds afterwards
        #[arg(long, default_value_t = 0)]
        hold_secs: u64,
    },
    /// Print the connection status
    Status {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = AppConfig::load(args.config)?;
    config.apply(Overrides {
        host: args.host,
        port: args.port,
        client_id: args.client_id,
        request_timeout_ms: args.timeout_ms,
    })?;

    ibx_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting ibx v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!(config_path = %path, "Configuration loaded"),
        ConfigSource::Defaults { missing } => {
            warn!(path = %missing, "Config file not found, using defaults")
        }
    }

    let app = Application::new(config)?;

    let output = match args.command.unwrap_or(Command::Time {
        json: false,
        hold_secs: 0,
    }) {
        Command::Time { json, hold_secs } => {
            app.run_time(json, Duration::from_secs(hold_secs)).await?
        }
        Command::Status { json } => app.run_status(json).await?,
    };

    println!("{output}");
    Ok(())
}
