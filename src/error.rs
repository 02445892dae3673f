//! Error types and handling for Spotwatt
//!
//! This module defines the crate-wide error type. The spot-price fetcher has
//! its own narrower [`crate::spot_price::FetchError`] so callers can match on
//! the exact failure kind.

use thiserror::Error;

/// Result type alias for Spotwatt operations
pub type Result<T> = std::result::Result<T, SpotwattError>;

/// Main error type for Spotwatt
#[derive(Debug, Error)]
pub enum SpotwattError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Modbus communication errors
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// MQTT client errors
    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },
}

impl SpotwattError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SpotwattError::Config {
            message: message.into(),
        }
    }

    /// Create a new Modbus error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        SpotwattError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new MQTT error
    pub fn mqtt<S: Into<String>>(message: S) -> Self {
        SpotwattError::Mqtt {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SpotwattError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SpotwattError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        SpotwattError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        SpotwattError::Timeout {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SpotwattError {
    fn from(err: std::io::Error) -> Self {
        SpotwattError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SpotwattError {
    fn from(err: serde_yaml::Error) -> Self {
        SpotwattError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SpotwattError {
    fn from(err: reqwest::Error) -> Self {
        SpotwattError::network(err.to_string())
    }
}

impl From<rumqttc::ClientError> for SpotwattError {
    fn from(err: rumqttc::ClientError) -> Self {
        SpotwattError::mqtt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SpotwattError::config("test config error");
        assert!(matches!(err, SpotwattError::Config { .. }));

        let err = SpotwattError::mqtt("test mqtt error");
        assert!(matches!(err, SpotwattError::Mqtt { .. }));

        let err = SpotwattError::validation("field", "test validation error");
        assert!(matches!(err, SpotwattError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = SpotwattError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = SpotwattError::validation("price.area", "must not be empty");
        assert_eq!(
            format!("{}", err),
            "Validation error: price.area - must not be empty"
        );
    }
}
