//! Configuration management for Spotwatt
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Every section has defaults, so a partial
//! file only needs to name what differs.

use crate::error::{Result, SpotwattError};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "SPOTWATT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modbus TCP connection to the three-phase meter
    pub meter: ModbusConfig,

    /// Meter register address mappings
    pub registers: RegistersConfig,

    /// Per-phase calibration gains
    pub calibration: CalibrationConfig,

    /// Spot-price API and polling
    pub price: PriceConfig,

    /// Source of the kWh multiplier used for cost accrual
    pub energy: EnergyConfig,

    /// MQTT broker and topic layout
    pub mqtt: MqttConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Sensor sampling period in milliseconds
    pub sample_interval_ms: u64,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// IP address of the meter (or its Modbus gateway)
    pub ip: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Slave/unit ID of the meter
    pub slave_id: u8,

    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    pub operation_timeout_ms: u64,
}

/// Holding register start addresses. Each per-phase block holds three
/// consecutive big-endian 32-bit floats (L1, L2, L3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistersConfig {
    /// RMS voltages
    pub voltages: u16,

    /// RMS currents
    pub currents: u16,

    /// Apparent powers (VA)
    pub apparent_power: u16,

    /// Real powers (W)
    pub real_power: u16,

    /// Power factors (0..1)
    pub power_factor: u16,

    /// Cumulative import energy, 64-bit float in Wh. None when the meter
    /// has no counter; energy is then integrated from real power.
    pub energy: Option<u16>,
}

/// Gains applied to one phase after reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseCalibration {
    /// Multiplier applied to RMS voltage
    pub voltage_gain: f64,

    /// Multiplier applied to RMS current
    pub current_gain: f64,
}

/// Calibration for all three phases
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CalibrationConfig {
    pub phase1: PhaseCalibration,
    pub phase2: PhaseCalibration,
    pub phase3: PhaseCalibration,
}

/// Spot-price API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Price endpoint returning `{ "<AREA>": [ { "hour": .., "<price>": .. } ] }`
    pub endpoint: String,

    /// Grid area key (e.g. SE3)
    pub area: String,

    /// Field holding the hour of day
    pub hour_field: String,

    /// Field holding the price in öre/kWh
    pub price_field: String,

    /// Minutes between price polls
    pub poll_interval_minutes: u64,

    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,

    /// Poll once immediately at startup instead of waiting a full interval
    pub poll_on_startup: bool,
}

/// Where the per-hour kWh multiplier comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyMode {
    /// Meter energy counter, integrated real power as fallback
    Meter,
    /// Constant kWh per accrual event
    Fixed,
}

/// Energy multiplier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub mode: EnergyMode,

    /// kWh per accrual event when `mode` is `fixed`
    pub fixed_kwh: f64,
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or IP
    pub host: String,

    /// Broker port; 8883 selects TLS
    pub port: u16,

    /// Optional username
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,

    /// Client id prefix; a random suffix is appended
    pub client_id: String,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Fixed delay between reconnect attempts in seconds
    pub retry_delay_seconds: u64,

    /// Root of the telemetry topic hierarchy
    pub topic_prefix: String,

    /// Inbound control topic (payloads are logged only)
    pub control_topic: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (its directory receives daily rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `SPOTWATT_CONFIG` or the default locations,
    /// falling back to built-in defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Self::from_file(path.trim());
        }

        let default_paths = [
            "spotwatt_config.yaml",
            "/data/spotwatt_config.yaml",
            "/etc/spotwatt/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Calibration gains in phase order
    pub fn phase_calibrations(&self) -> [PhaseCalibration; 3] {
        [
            self.calibration.phase1,
            self.calibration.phase2,
            self.calibration.phase3,
        ]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.meter.ip.is_empty() {
            return Err(SpotwattError::validation(
                "meter.ip",
                "IP address cannot be empty",
            ));
        }

        if self.meter.port == 0 {
            return Err(SpotwattError::validation(
                "meter.port",
                "Port must be greater than 0",
            ));
        }

        if self.meter.operation_timeout_ms == 0 || self.meter.connect_timeout_ms == 0 {
            return Err(SpotwattError::validation(
                "meter.timeouts",
                "Must be greater than 0",
            ));
        }

        for (name, cal) in [
            ("calibration.phase1", &self.calibration.phase1),
            ("calibration.phase2", &self.calibration.phase2),
            ("calibration.phase3", &self.calibration.phase3),
        ] {
            if !(cal.voltage_gain.is_finite() && cal.voltage_gain > 0.0)
                || !(cal.current_gain.is_finite() && cal.current_gain > 0.0)
            {
                return Err(SpotwattError::validation(
                    name,
                    "Gains must be finite and positive",
                ));
            }
        }

        if !(self.price.endpoint.starts_with("http://")
            || self.price.endpoint.starts_with("https://"))
        {
            return Err(SpotwattError::validation(
                "price.endpoint",
                "Must be an http(s) URL",
            ));
        }

        if self.price.area.trim().is_empty() {
            return Err(SpotwattError::validation(
                "price.area",
                "Area key cannot be empty",
            ));
        }

        if self.price.hour_field.is_empty() || self.price.price_field.is_empty() {
            return Err(SpotwattError::validation(
                "price.fields",
                "Field names cannot be empty",
            ));
        }

        if self.price.poll_interval_minutes == 0 {
            return Err(SpotwattError::validation(
                "price.poll_interval_minutes",
                "Must be greater than 0",
            ));
        }

        if self.price.timeout_seconds == 0 {
            return Err(SpotwattError::validation(
                "price.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if !self.energy.fixed_kwh.is_finite() || self.energy.fixed_kwh < 0.0 {
            return Err(SpotwattError::validation(
                "energy.fixed_kwh",
                "Must be a finite, non-negative number",
            ));
        }

        if self.mqtt.host.is_empty() {
            return Err(SpotwattError::validation(
                "mqtt.host",
                "Broker host cannot be empty",
            ));
        }

        if self.mqtt.port == 0 {
            return Err(SpotwattError::validation(
                "mqtt.port",
                "Port must be greater than 0",
            ));
        }

        if self.mqtt.retry_delay_seconds == 0 {
            return Err(SpotwattError::validation(
                "mqtt.retry_delay_seconds",
                "Must be greater than 0",
            ));
        }

        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err(SpotwattError::validation(
                "mqtt.username",
                "Username and password must be set together",
            ));
        }

        if self.mqtt.topic_prefix.trim_matches('/').is_empty() {
            return Err(SpotwattError::validation(
                "mqtt.topic_prefix",
                "Topic prefix cannot be empty",
            ));
        }

        if self.sample_interval_ms == 0 {
            return Err(SpotwattError::validation(
                "sample_interval_ms",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.meter.port, 502);
        assert_eq!(config.price.area, "SE3");
        assert_eq!(config.price.poll_interval_minutes, 15);
        assert_eq!(config.mqtt.topic_prefix, "Home-Power");
        assert_eq!(config.energy.mode, EnergyMode::Meter);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.meter.ip = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.price.poll_interval_minutes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.calibration.phase2.current_gain = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "price:\n  area: SE4\nmqtt:\n  host: broker.local\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.price.area, "SE4");
        assert_eq!(config.price.price_field, "price_sek");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.sample_interval_ms, 2000);
    }

    #[test]
    fn test_energy_mode_is_lowercase_in_yaml() {
        let yaml = "energy:\n  mode: fixed\n  fixed_kwh: 1.5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.energy.mode, EnergyMode::Fixed);
        assert!((config.energy.fixed_kwh - 1.5).abs() < f64::EPSILON);
    }
}
