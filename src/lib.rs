//! # Spotwatt - three-phase power and spot-price cost monitor
//!
//! Reads a three-phase energy meter, derives totals and reactive power,
//! polls an hourly spot-price API and keeps a running cost for the day.
//! Everything is published to an MQTT broker as retained text values.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with defaults and validation
//! - `logging`: Structured logging and tracing
//! - `modbus`: Modbus TCP client and register decoding
//! - `sensor`: Per-phase readings from the meter, with calibration
//! - `power`: Three-phase aggregation and reactive power
//! - `energy`: Per-hour energy used as the cost multiplier
//! - `spot_price`: Spot-price API client and payload parsing
//! - `accrual`: Poll gate and daily cost ledger
//! - `telemetry`: Topic layout and payload formatting
//! - `mqtt`: Broker link with non-blocking reconnect
//! - `monitor`: Per-cycle pipeline tying the above together
//! - `runtime`: Main loop and signal handling

pub mod accrual;
pub mod config;
pub mod energy;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod monitor;
pub mod mqtt;
pub mod power;
pub mod runtime;
pub mod sensor;
pub mod spot_price;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SpotwattError};
pub use monitor::Monitor;
