//! Modbus TCP client for the three-phase energy meter
//!
//! Connection handling with explicit timeouts and the register decoding
//! helpers used by [`crate::sensor::ModbusMeter`].

use crate::config::ModbusConfig;
use crate::error::{Result, SpotwattError};
use crate::logging::get_logger;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Modbus TCP client bound to one meter
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    /// Configuration
    config: ModbusConfig,

    /// Connection timeout
    connection_timeout: Duration,

    /// Operation timeout
    operation_timeout: Duration,

    /// Logger
    logger: crate::logging::StructuredLogger,
}

impl ModbusClient {
    /// Create a new Modbus client
    pub fn new(config: &ModbusConfig) -> Self {
        let logger = get_logger("modbus");
        Self {
            client: None,
            config: config.clone(),
            connection_timeout: Duration::from_millis(config.connect_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            logger,
        }
    }

    /// Connect to the Modbus server
    pub async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.ip, self.config.port);

        self.logger
            .info(&format!("Connecting to Modbus meter at {}", address));

        let socket_addr: std::net::SocketAddr = address
            .parse()
            .map_err(|e| SpotwattError::modbus(format!("Invalid socket address: {}", e)))?;

        match timeout(
            self.connection_timeout,
            tcp::connect_slave(socket_addr, Slave(self.config.slave_id)),
        )
        .await
        {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Successfully connected to Modbus meter");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to Modbus meter: {}", e);
                self.logger.error(&error_msg);
                Err(SpotwattError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Connection timeout".to_string();
                self.logger.error(&error_msg);
                Err(SpotwattError::timeout(error_msg))
            }
        }
    }

    /// Drop the connection; the next read reconnects
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            self.logger.info("Disconnecting from Modbus meter");
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read holding registers from the configured slave
    pub async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        self.logger.trace(&format!(
            "Reading {} registers from address {} on slave {}",
            count, address, self.config.slave_id
        ));

        let client = self.get_client()?;
        let request = client.read_holding_registers(address, count);

        match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(exception))) => Err(SpotwattError::modbus(format!(
                "Meter rejected read at {}: {:?}",
                address, exception
            ))),
            Ok(Err(e)) => Err(SpotwattError::modbus(format!(
                "Failed to read holding registers: connection {}",
                e
            ))),
            Err(_) => Err(SpotwattError::timeout("Read operation timeout")),
        }
    }

    /// Get client reference or error if not connected
    fn get_client(&mut self) -> Result<&mut tokio_modbus::client::Context> {
        self.client
            .as_mut()
            .ok_or_else(|| SpotwattError::modbus("Not connected to Modbus meter"))
    }

    /// Whether an error means the TCP session is unusable and should be
    /// re-established before the next read
    pub fn is_connection_error(error: &SpotwattError) -> bool {
        match error {
            SpotwattError::Modbus { message: msg } => {
                msg.contains("connection")
                    || msg.contains("Connection")
                    || msg.contains("timeout")
                    || msg.contains("Not connected")
            }
            SpotwattError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Decode 32-bit float from two 16-bit registers (big-endian)
pub fn decode_32bit_float(registers: &[u16]) -> Result<f32> {
    if registers.len() < 2 {
        return Err(SpotwattError::modbus(
            "Insufficient registers for 32-bit float",
        ));
    }

    let hi = registers[0].to_be_bytes();
    let lo = registers[1].to_be_bytes();
    Ok(f32::from_be_bytes([hi[0], hi[1], lo[0], lo[1]]))
}

/// Decode 64-bit float from four 16-bit registers (big-endian)
pub fn decode_64bit_float(registers: &[u16]) -> Result<f64> {
    if registers.len() < 4 {
        return Err(SpotwattError::modbus(
            "Insufficient registers for 64-bit float",
        ));
    }

    let mut bytes = [0u8; 8];
    for (i, reg) in registers[..4].iter().enumerate() {
        let [h, l] = reg.to_be_bytes();
        bytes[i * 2] = h;
        bytes[i * 2 + 1] = l;
    }
    Ok(f64::from_be_bytes(bytes))
}

/// Decode three consecutive 32-bit floats (L1, L2, L3). Non-finite values
/// become 0.0.
pub fn decode_float_triplet(registers: &[u16]) -> Result<[f64; 3]> {
    if registers.len() < 6 {
        return Err(SpotwattError::modbus(
            "Insufficient registers for phase triplet",
        ));
    }
    let sanitize = |x: f32| if x.is_finite() { f64::from(x) } else { 0.0 };
    Ok([
        sanitize(decode_32bit_float(&registers[0..2])?),
        sanitize(decode_32bit_float(&registers[2..4])?),
        sanitize(decode_32bit_float(&registers[4..6])?),
    ])
}
