use spotwatt::config::LoggingConfig;
use spotwatt::logging::{LogContext, get_logger_with_context, init_logging, parse_log_level};
use tracing::Level;

#[test]
fn parse_log_level_accepts_aliases() {
    assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
    assert_eq!(parse_log_level("WARNING").unwrap(), Level::WARN);
    assert!(parse_log_level("loud").is_err());
}

#[test]
fn init_logging_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = LoggingConfig {
        level: "DEBUG".to_string(),
        file: dir.path().join("spotwatt.log").to_string_lossy().to_string(),
        console_output: false,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&cfg).is_ok());
    assert!(init_logging(&cfg).is_ok());

    let logger = get_logger_with_context(LogContext::new("test").with_area("SE3"));
    logger.info("logging initialized");
    assert_eq!(logger.component(), "test");
}
