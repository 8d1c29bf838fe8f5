//! TOML Configuration File Support
//!
//! Configuration for the bridge, loaded from an optional TOML file at
//! `~/.config/sim-client/sim-client.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [simulator]
//! host = "127.0.0.1"
//! port = 9091
//! connect_timeout_ms = 5000
//! max_line_size = 1048576
//!
//! [telemetry]
//! file = "coords.aprfile"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::telemetry::DEFAULT_TELEMETRY_FILE;
use crate::transport::{SimAddress, TransportConfig};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Simulator section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorToml {
    /// Simulator host
    pub host: Option<String>,

    /// Simulator port
    pub port: Option<u16>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Largest inbound line accepted, in bytes
    pub max_line_size: Option<usize>,
}

/// Telemetry section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryToml {
    /// Telemetry output file
    pub file: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimClientToml {
    /// Simulator connection section
    pub simulator: SimulatorToml,

    /// Telemetry output section
    pub telemetry: TelemetryToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved bridge configuration
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Transport settings
    pub transport: TransportConfig,

    /// Destination of the telemetry table written on close
    pub telemetry_path: PathBuf,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            telemetry_path: PathBuf::from(DEFAULT_TELEMETRY_FILE),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl BridgeConfig {
    /// Default configuration pointed at a specific simulator
    #[must_use]
    pub fn for_address(address: SimAddress) -> Self {
        Self {
            transport: TransportConfig::for_address(address),
            ..Self::default()
        }
    }

    /// Get the highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would only fail later at connect time
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty host, a zero
    /// port, or a zero line limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.address.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "simulator host must not be empty".to_string(),
            ));
        }
        if self.transport.address.port == 0 {
            return Err(ConfigError::ValidationError(
                "simulator port must not be 0".to_string(),
            ));
        }
        if self.transport.max_line_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_line_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/sim-client/sim-client.toml` or the platform
/// equivalent.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sim-client").join("sim-client.toml"))
}

/// Load configuration from the default file and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the result fails validation. A missing file is not an error.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the result fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BridgeConfig, ConfigError> {
    let mut config = BridgeConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: SimClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut BridgeConfig, toml: &SimClientToml) {
    if let Some(ref host) = toml.simulator.host {
        config.transport.address.host.clone_from(host);
    }
    if let Some(port) = toml.simulator.port {
        config.transport.address.port = port;
    }
    if let Some(timeout) = toml.simulator.connect_timeout_ms {
        config.transport.connect_timeout_ms = timeout;
    }
    if let Some(size) = toml.simulator.max_line_size {
        config.transport.max_line_size = size;
    }
    if let Some(ref file) = toml.telemetry.file {
        config.telemetry_path.clone_from(file);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut BridgeConfig) {
    if let Ok(host) = std::env::var("SIM_CLIENT_HOST") {
        config.transport.address.host = host;
        config.source = ConfigSource::Env;
    }
    if let Ok(port) = std::env::var("SIM_CLIENT_PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.transport.address.port = port;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(timeout) = std::env::var("SIM_CLIENT_CONNECT_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.transport.connect_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(size) = std::env::var("SIM_CLIENT_MAX_LINE_SIZE") {
        if let Ok(size) = size.parse::<usize>() {
            config.transport.max_line_size = size;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(file) = std::env::var("SIM_CLIENT_TELEMETRY_FILE") {
        config.telemetry_path = PathBuf::from(file);
        config.source = ConfigSource::Env;
    }
}
