use spotwatt::config::{Config, EnergyMode};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.meter.ip = "10.0.0.5".to_string();
    cfg.price.area = "SE4".to_string();
    cfg.energy.mode = EnergyMode::Fixed;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.meter.ip, "10.0.0.5");
    assert_eq!(loaded.price.area, "SE4");
    assert_eq!(loaded.energy.mode, EnergyMode::Fixed);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn partial_file_keeps_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"price:\n  area: NO1\nmqtt:\n  port: 8883\n").unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.price.area, "NO1");
    assert_eq!(cfg.price.price_field, "price_sek");
    assert_eq!(cfg.mqtt.port, 8883);
    assert_eq!(cfg.mqtt.topic_prefix, "Home-Power");
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    assert!(cfg.validate().is_ok());

    // Invalid IP
    cfg.meter.ip.clear();
    assert!(cfg.validate().is_err());

    // Invalid port
    cfg = Config::default();
    cfg.meter.port = 0;
    assert!(cfg.validate().is_err());

    // Empty area key
    cfg = Config::default();
    cfg.price.area = "  ".to_string();
    assert!(cfg.validate().is_err());

    // Poll interval zero
    cfg = Config::default();
    cfg.price.poll_interval_minutes = 0;
    assert!(cfg.validate().is_err());

    // Non-http endpoint
    cfg = Config::default();
    cfg.price.endpoint = "ftp://example.com/prices".to_string();
    assert!(cfg.validate().is_err());

    // Zero gain
    cfg = Config::default();
    cfg.calibration.phase2.current_gain = 0.0;
    assert!(cfg.validate().is_err());

    // Negative fixed energy
    cfg = Config::default();
    cfg.energy.fixed_kwh = -1.0;
    assert!(cfg.validate().is_err());

    // Reconnect without delay
    cfg = Config::default();
    cfg.mqtt.retry_delay_seconds = 0;
    assert!(cfg.validate().is_err());

    // Credentials must come as a pair
    cfg = Config::default();
    cfg.mqtt.username = Some("spotwatt".to_string());
    assert!(cfg.validate().is_err());
    cfg.mqtt.password = Some("secret".to_string());
    assert!(cfg.validate().is_ok());
    cfg.mqtt.username = None;
    assert!(cfg.validate().is_err());

    // Sample interval zero
    cfg = Config::default();
    cfg.sample_interval_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
