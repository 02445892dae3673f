use super::*;

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.1.100".to_string(),
            port: 502,
            slave_id: 1,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 2000,
        }
    }
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            voltages: 0,
            currents: 6,
            real_power: 12,
            apparent_power: 18,
            power_factor: 30,
            energy: None,
        }
    }
}

impl Default for PhaseCalibration {
    fn default() -> Self {
        Self {
            voltage_gain: 1.0,
            current_gain: 1.0,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://mgrey.se/espot?format=json".to_string(),
            area: "SE3".to_string(),
            hour_field: "hour".to_string(),
            price_field: "price_sek".to_string(),
            poll_interval_minutes: 15,
            timeout_seconds: 10,
            poll_on_startup: true,
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            mode: EnergyMode::Meter,
            fixed_kwh: 0.0,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "homeassistant.local".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "spotwatt".to_string(),
            keep_alive_secs: 30,
            retry_delay_seconds: 5,
            topic_prefix: "Home-Power".to_string(),
            control_topic: "InTopic".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/spotwatt.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meter: ModbusConfig::default(),
            registers: RegistersConfig::default(),
            calibration: CalibrationConfig::default(),
            price: PriceConfig::default(),
            energy: EnergyConfig::default(),
            mqtt: MqttConfig::default(),
            logging: LoggingConfig::default(),
            sample_interval_ms: 2000,
        }
    }
}
