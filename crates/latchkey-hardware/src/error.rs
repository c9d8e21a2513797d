//! Error types for hardware operations.
//!
//! This module defines error types specific to device operations: attach
//! timeouts, detached devices, rejected commands and drivers that cannot be
//! constructed on this host.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device did not attach within the allowed time.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation or backend is not supported.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Device rejected or failed to execute a command.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data passed to or received from the device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device could not be constructed or opened.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Command issued before the device was opened.
    #[error("Device not open: {device}")]
    NotOpen { device: String },
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new not-open error.
    pub fn not_open(device: impl Into<String>) -> Self {
        Self::NotOpen {
            device: device.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("RFID 118467");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: RFID 118467");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(10000);
        assert!(matches!(error, HardwareError::Timeout { duration_ms: 10000 }));
        assert_eq!(error.to_string(), "Operation timeout after 10000ms");
    }

    #[test]
    fn test_unsupported_error() {
        let error = HardwareError::unsupported("phidget backend");
        assert_eq!(error.to_string(), "Unsupported operation: phidget backend");
    }

    #[test]
    fn test_not_open_error() {
        let error = HardwareError::not_open("Servo");
        assert_eq!(error.to_string(), "Device not open: Servo");
    }
}
