//! Configuration for the station poller.

use envstation_common::{ClockConfig, LoggingConfig};
use envstation_uplink::UploadConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::convert::Conversion;
use crate::registers::{Profile, SensorConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] envstation_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Wi-Fi credentials of the deployment (the link itself is managed by the host)
    #[serde(default)]
    pub wifi: Option<WifiConfig>,

    /// RS-485 serial link settings
    pub serial: SerialConfig,

    /// Poll timing
    #[serde(default)]
    pub poll: PollConfig,

    /// Timestamp offset for the payload `date` field
    #[serde(default)]
    pub clock: ClockConfig,

    /// Built-in register map used when `sensors` is empty
    #[serde(default)]
    pub profile: Profile,

    /// Explicit register map, polled in order
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,

    /// Upload sink
    pub upload: UploadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

/// Modbus RTU serial settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
    pub port: String,
    /// Baud rate (default: 9600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits (default: 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Parity: "none", "even", or "odd" (default: "none")
    #[serde(default = "default_parity")]
    pub parity: String,
    /// Stop bits: 1 or 2 (default: 1)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Read timeout in milliseconds (default: 1000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

impl SerialConfig {
    pub fn parity(&self) -> tokio_serial::Parity {
        match self.parity.to_lowercase().as_str() {
            "even" => tokio_serial::Parity::Even,
            "odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::None,
        }
    }

    pub fn stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }

    pub fn data_bits(&self) -> tokio_serial::DataBits {
        match self.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }
}

/// Poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time between the starts of consecutive cycles (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Pause after each sensor read (default: 300)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    300
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl StationConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: StationConfig = envstation_common::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: StationConfig = envstation_common::parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The register map to poll: explicit sensors, else the profile's.
    pub fn sensors(&self) -> Vec<SensorConfig> {
        if self.sensors.is_empty() {
            self.profile.sensors()
        } else {
            self.sensors.clone()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.is_empty() {
            return Err(ConfigError::Validation(
                "Serial port cannot be empty".to_string(),
            ));
        }

        match self.serial.parity.to_lowercase().as_str() {
            "none" | "even" | "odd" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid parity '{}' (use none, even, or odd)",
                    other
                )));
            }
        }

        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Serial timeout_ms must be at least 1".to_string(),
            ));
        }

        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Poll interval_ms must be at least 1".to_string(),
            ));
        }

        self.clock
            .offset()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        for sensor in &self.sensors {
            validate_sensor(sensor)?;
        }

        self.upload
            .validate()
            .map_err(|e| ConfigError::Validation(format!("upload: {}", e)))?;

        Ok(())
    }
}

fn validate_sensor(sensor: &SensorConfig) -> Result<(), ConfigError> {
    if sensor.name.is_empty() {
        return Err(ConfigError::Validation(
            "Sensor name cannot be empty".to_string(),
        ));
    }

    if !(1..=247).contains(&sensor.slave_id) {
        return Err(ConfigError::Validation(format!(
            "Sensor '{}': slave_id must be 1-247",
            sensor.name
        )));
    }

    if sensor.register_count == 0 || sensor.register_count > 125 {
        return Err(ConfigError::Validation(format!(
            "Sensor '{}': register_count must be 1-125",
            sensor.name
        )));
    }

    if sensor.channels.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Sensor '{}': at least one channel is required",
            sensor.name
        )));
    }

    for channel in &sensor.channels {
        if channel.register >= sensor.register_count {
            return Err(ConfigError::Validation(format!(
                "Sensor '{}': channel {} reads register {} beyond register_count {}",
                sensor.name, channel.quantity, channel.register, sensor.register_count
            )));
        }

        if let Conversion::Linear { divisor } = channel.conversion {
            if divisor == 0.0 || !divisor.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "Sensor '{}': channel {} has invalid divisor {}",
                    sensor.name, channel.quantity, divisor
                )));
            }
        }
    }

    Ok(())
}
