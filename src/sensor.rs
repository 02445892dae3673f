//! Sensor acquisition
//!
//! Per-phase readings come from a [`PhaseSource`]. The shipped source is a
//! three-phase meter read over Modbus TCP; tests substitute their own.

use async_trait::async_trait;

use crate::config::{PhaseCalibration, RegistersConfig};
use crate::error::Result;
use crate::logging::get_logger;
use crate::modbus::{ModbusClient, decode_64bit_float, decode_float_triplet};

/// One phase's calibrated electrical quantities for a monitoring cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseReading {
    pub voltage_rms: f64,
    pub current_rms: f64,
    /// Apparent power in VA
    pub apparent_power: f64,
    /// Real (active) power in W
    pub real_power: f64,
    /// Power factor, nominally -1..1
    pub power_factor: f64,
}

impl PhaseReading {
    /// Apply calibration gains. Powers scale with the product of both gains.
    pub fn calibrated(self, cal: &PhaseCalibration) -> Self {
        let power_gain = cal.voltage_gain * cal.current_gain;
        Self {
            voltage_rms: self.voltage_rms * cal.voltage_gain,
            current_rms: self.current_rms * cal.current_gain,
            apparent_power: self.apparent_power * power_gain,
            real_power: self.real_power * power_gain,
            power_factor: self.power_factor,
        }
    }
}

/// Everything read from the meter in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterReading {
    pub phases: [PhaseReading; 3],
    /// Cumulative import energy in kWh, when the meter exposes a counter
    pub energy_kwh: Option<f64>,
}

/// Supplier of per-phase readings, polled once per monitoring cycle
#[async_trait]
pub trait PhaseSource: Send {
    async fn read(&mut self) -> Result<MeterReading>;
}

/// Three-phase meter on Modbus TCP
pub struct ModbusMeter {
    client: ModbusClient,
    registers: RegistersConfig,
    calibration: [PhaseCalibration; 3],
    logger: crate::logging::StructuredLogger,
}

impl ModbusMeter {
    pub fn new(
        client: ModbusClient,
        registers: RegistersConfig,
        calibration: [PhaseCalibration; 3],
    ) -> Self {
        Self {
            client,
            registers,
            calibration,
            logger: get_logger("meter"),
        }
    }

    async fn read_triplet(&mut self, address: u16) -> Result<[f64; 3]> {
        let regs = self.client.read_holding_registers(address, 6).await?;
        decode_float_triplet(&regs)
    }

    async fn read_all(&mut self) -> Result<MeterReading> {
        let voltages = self.read_triplet(self.registers.voltages).await?;
        let currents = self.read_triplet(self.registers.currents).await?;
        let apparent = self.read_triplet(self.registers.apparent_power).await?;
        let real = self.read_triplet(self.registers.real_power).await?;
        let pf = self.read_triplet(self.registers.power_factor).await?;

        // The counter is optional; a failed counter read must not cost us the
        // power readings
        let energy_kwh = match self.registers.energy {
            Some(address) => match self.client.read_holding_registers(address, 4).await {
                Ok(regs) => decode_64bit_float(&regs)
                    .ok()
                    .filter(|wh| wh.is_finite() && *wh >= 0.0)
                    .map(|wh| wh / 1000.0),
                Err(e) => {
                    self.logger
                        .debug(&format!("Energy counter read failed: {}", e));
                    None
                }
            },
            None => None,
        };

        let phases = std::array::from_fn(|i| {
            PhaseReading {
                voltage_rms: voltages[i],
                current_rms: currents[i],
                apparent_power: apparent[i],
                real_power: real[i],
                power_factor: pf[i],
            }
            .calibrated(&self.calibration[i])
        });

        Ok(MeterReading { phases, energy_kwh })
    }
}

#[async_trait]
impl PhaseSource for ModbusMeter {
    async fn read(&mut self) -> Result<MeterReading> {
        if !self.client.is_connected() {
            self.client.connect().await?;
        }
        match self.read_all().await {
            Ok(reading) => Ok(reading),
            Err(e) => {
                if ModbusClient::is_connection_error(&e) {
                    self.logger
                        .warn(&format!("Meter connection lost, will reconnect: {}", e));
                    self.client.disconnect();
                }
                Err(e)
            }
        }
    }
}
