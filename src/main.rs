//! jetbridge - Main Entry Point
//!
//! Wires the production collaborators (serial port, host network probe, MQTT
//! session) into the bridge loop and runs it until SIGINT/SIGTERM.

use clap::{Parser, Subcommand};
use jetbridge::bridge::Bridge;
use jetbridge::config::{BridgeConfig, ConfigError};
use jetbridge::error::{BridgeError, BridgeResult};
use jetbridge::guard::{ConnectivityGuard, RetryPolicy};
use jetbridge::logging::init_default_logging;
use jetbridge::transport::mqtt::MqttSession;
use jetbridge::transport::net::HostNetwork;
use jetbridge::transport::serial::SerialPortLink;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};

/// Serial-to-MQTT uplink bridge
#[derive(Parser)]
#[command(name = "jetbridge")]
#[command(about = "Bridge newline-delimited JSON from a serial peer to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge loop
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting jetbridge v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_bridge(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(BridgeConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = vec!["jetbridge.toml", "config/jetbridge.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(BridgeConfig::load_from_file(&path)?);
                }
            }

            error!(
                "No configuration file found. Provide one with -c/--config or create jetbridge.toml"
            );
            process::exit(1);
        }
    }
}

/// Bootstrap factory: builds the bridge with its production collaborators.
fn build_bridge(
    config: &BridgeConfig,
) -> BridgeResult<Bridge<SerialPortLink, HostNetwork, MqttSession>> {
    let topics = config.topic_set().map_err(ConfigError::from)?;

    let serial = SerialPortLink::open(&config.serial.port, config.serial.baud)?;

    let network = HostNetwork::from_broker_url(&config.mqtt.broker_url)
        .ok_or_else(|| BridgeError::InvalidBrokerUrl(config.mqtt.broker_url.clone()))?;

    let session = MqttSession::new(
        &config.bridge.device_id,
        config.mqtt.clone(),
        &topics.command,
    );

    let guard = ConnectivityGuard::new(
        network,
        session,
        RetryPolicy::new(config.retry.network_attempts, config.retry.network_delay_ms),
        RetryPolicy::new(config.retry.session_attempts, config.retry.session_delay_ms),
        &topics.command,
    );

    Ok(Bridge::new(
        serial,
        guard,
        topics,
        config.serial.max_line_len,
        &config.heartbeat,
    ))
}

async fn run_bridge(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(device_id = %config.bridge.device_id, "bridge starting");

    let mut bridge = build_bridge(&config)?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = bridge.run() => {
            // run() only returns if the loop is somehow broken; treat as shutdown.
        }
    }

    Ok(())
}

fn handle_config_command(
    config: BridgeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
