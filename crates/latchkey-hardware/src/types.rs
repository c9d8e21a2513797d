//! Common types shared across device implementations.
//!
//! This module defines device metadata, the event stream that replaces
//! vendor driver callbacks, and backend selection.

use latchkey_core::TagId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::{HardwareError, Result};

/// Generic device information.
///
/// Name, model and serial number of a hardware device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "PhidgetRFID", "Mock Servo").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional device serial number.
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial_number: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// Which device raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Proximity tag reader.
    Reader,

    /// Lock servo.
    Actuator,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader => write!(f, "RFID"),
            Self::Actuator => write!(f, "Servo"),
        }
    }
}

/// What happened on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceEventKind {
    /// Device became present.
    Attached { serial: u32 },

    /// Device went away. No reattachment is attempted.
    Detached { serial: u32 },

    /// Asynchronous device error.
    Error { code: i32, message: String },

    /// A tag entered the antenna field.
    TagGained(TagId),

    /// A tag left the antenna field.
    TagLost(TagId),

    /// A digital output on the reader changed state.
    OutputChanged { index: u8, state: bool },
}

/// Event raised by a device, tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub device: DeviceKind,
    pub kind: DeviceEventKind,
}

impl DeviceEvent {
    pub fn new(device: DeviceKind, kind: DeviceEventKind) -> Self {
        Self { device, kind }
    }
}

/// Sending half of the shared device event queue.
///
/// Each device receives its own sender at `open()` time; events it emits
/// are stamped with its [`DeviceKind`].
#[derive(Debug, Clone)]
pub struct DeviceEventSender {
    device: DeviceKind,
    tx: mpsc::Sender<DeviceEvent>,
}

impl DeviceEventSender {
    pub fn new(device: DeviceKind, tx: mpsc::Sender<DeviceEvent>) -> Self {
        Self { device, tx }
    }

    /// Device this sender stamps events with.
    pub fn device(&self) -> DeviceKind {
        self.device
    }

    /// Queue an event, waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` if the consumer has gone away.
    pub async fn emit(&self, kind: DeviceEventKind) -> Result<()> {
        self.tx
            .send(DeviceEvent::new(self.device, kind))
            .await
            .map_err(|_| HardwareError::disconnected(format!("{} event queue closed", self.device)))
    }
}

/// Driver backend used to construct a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBackend {
    /// Simulated device, driven through its handle.
    #[default]
    Mock,

    /// Phidgets USB driver. Not available in this build.
    Phidget,
}

impl fmt::Display for DeviceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Phidget => write!(f, "phidget"),
        }
    }
}

impl std::str::FromStr for DeviceBackend {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "phidget" => Ok(Self::Phidget),
            other => Err(HardwareError::invalid_data(format!(
                "unknown device backend: {other}"
            ))),
        }
    }
}
