//! Error types and handling for axpert-gateway
//!
//! This module defines the error taxonomy used throughout the gateway. The
//! four domain kinds (`NotFound`, `Validation`, `Mapping`, `DeviceIo`) drive
//! how the command API answers and how the poller aggregates failures; the
//! remaining variants cover configuration, I/O and startup concerns.

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for axpert-gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown inverter serial number or command name
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Malformed, out-of-range or cross-field-violating input
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Unrecognized wire-level code in a device response
    #[error("Mapping error: {message}")]
    Mapping { message: String },

    /// Connector-level failure, passed through unchanged
    #[error("Device I/O error: {message}")]
    DeviceIo { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Metrics registry errors
    #[error("Metrics error: {message}")]
    Metrics { message: String },
}

impl GatewayError {
    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        GatewayError::NotFound {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        GatewayError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new mapping error
    pub fn mapping<S: Into<String>>(message: S) -> Self {
        GatewayError::Mapping {
            message: message.into(),
        }
    }

    /// Create a new device I/O error
    pub fn device_io<S: Into<String>>(message: S) -> Self {
        GatewayError::DeviceIo {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        GatewayError::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        GatewayError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        GatewayError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        GatewayError::Web {
            message: message.into(),
        }
    }

    /// Create a new metrics error
    pub fn metrics<S: Into<String>>(message: S) -> Self {
        GatewayError::Metrics {
            message: message.into(),
        }
    }

    /// Whether this error is a connector failure (as opposed to bad input)
    pub fn is_device_io(&self) -> bool {
        matches!(
            self,
            GatewayError::DeviceIo { .. } | GatewayError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        GatewayError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<prometheus::Error> for GatewayError {
    fn from(err: prometheus::Error) -> Self {
        GatewayError::metrics(err.to_string())
    }
}
