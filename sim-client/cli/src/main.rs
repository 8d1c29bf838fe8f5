//! Sim Client - Command-line simulator driver
//!
//! Connects to a running simulator, drives the car with a constant control
//! signal and writes the telemetry trail when it stops.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:9091)
//! sim-client
//!
//! # Different simulator and a gentler throttle
//! sim-client --host 192.168.1.20 --port 9091 --throttle 0.15
//!
//! # With config file
//! sim-client --config ~/.config/sim-client/sim-client.toml
//!
//! # Verbose logging
//! RUST_LOG=debug sim-client
//! ```
//!
//! Stops on Ctrl-C or when the simulator disconnects.

mod handler;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use sim_client_core::{
    load_config, load_config_from_path, BridgeConfig, ConfigSource, MessageBridge,
    StructuredMessage,
};
use tracing::{error, info, warn};

use handler::DriveHandler;

/// Sim Client - Drive a simulator and record its telemetry trail
#[derive(Parser, Debug)]
#[command(name = "sim-client")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Simulator host
    #[arg(long, env = "SIM_CLIENT_HOST")]
    host: Option<String>,

    /// Simulator port
    #[arg(short = 'p', long, env = "SIM_CLIENT_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "SIM_CLIENT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the telemetry trail on exit
    #[arg(short = 'o', long, env = "SIM_CLIENT_TELEMETRY_FILE", value_name = "FILE")]
    telemetry_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "SIM_CLIENT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Constant steering angle sent with every control message
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true, value_parser = finite_f64)]
    steering: f64,

    /// Constant throttle sent with every control message
    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true, value_parser = finite_f64)]
    throttle: f64,

    /// Interval between control messages in milliseconds
    #[arg(long, default_value_t = 50)]
    control_interval_ms: u64,
}

/// Parse a control value, rejecting NaN and infinities
fn finite_f64(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{raw} is not a finite number"))
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("sim_client={level},sim_client_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Resolve the bridge configuration, with flags taking precedence
fn resolve_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    let mut from_cli = false;
    if let Some(ref host) = args.host {
        config.transport.address.host.clone_from(host);
        from_cli = true;
    }
    if let Some(port) = args.port {
        config.transport.address.port = port;
        from_cli = true;
    }
    if let Some(ref file) = args.telemetry_file {
        config.telemetry_path.clone_from(file);
        from_cli = true;
    }
    if from_cli {
        config.set_source(ConfigSource::Cli);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// The control message queued every interval
///
/// The simulator expects the values as strings.
fn control_message(steering: f64, throttle: f64) -> StructuredMessage {
    let mut message = StructuredMessage::new();
    message.insert("msg_type".to_string(), Value::from("control"));
    message.insert("steering".to_string(), Value::from(steering.to_string()));
    message.insert("throttle".to_string(), Value::from(throttle.to_string()));
    message.insert("brake".to_string(), Value::from("0.0"));
    message
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level);

    info!("Sim client starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args)?;
    info!(
        address = %config.transport.address,
        telemetry_file = %config.telemetry_path.display(),
        source = %config.source(),
        "Configuration resolved"
    );

    let bridge = MessageBridge::connect_with_config(&config, DriveHandler::new())
        .await
        .with_context(|| format!("Failed to connect to {}", config.transport.address))?;

    let control = control_message(args.steering, args.throttle);
    let mut ticker = tokio::time::interval(Duration::from_millis(args.control_interval_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !bridge.is_connected() {
                    warn!("Simulator disconnected");
                    break;
                }
                bridge
                    .queue_message(&control)
                    .context("Failed to queue control message")?;
            }
        }
    }

    let samples = bridge.telemetry_samples().len();
    match bridge.close().await {
        Ok(()) => {
            info!(samples, "Sim client stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sim client stopped with error");
            Err(e).context("Failed to close the bridge")
        }
    }
}
