//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits are not object-safe, so `Box<dyn TagReader>`
//! is not available. These enums provide concrete type dispatch instead, and
//! are what the controller is instantiated with when devices are chosen
//! from configuration.
//!
//! # Examples
//!
//! ```
//! use latchkey_hardware::devices::AnyTagReader;
//! use latchkey_hardware::mock::MockTagReader;
//!
//! let (reader, _handle) = MockTagReader::new();
//! let any_reader = AnyTagReader::Mock(reader);
//! ```

use std::time::Duration;

use latchkey_core::{ServoChannel, ServoPosition};

use crate::mock::{MockActuator, MockActuatorHandle, MockTagReader, MockTagReaderHandle};
use crate::traits::{Actuator, TagReader};
use crate::{DeviceBackend, DeviceEventSender, DeviceInfo, HardwareError, Result};

/// Enum wrapper for tag reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTagReader {
    /// Mock reader for development and testing.
    Mock(MockTagReader),
}

impl AnyTagReader {
    /// Construct a reader for a backend.
    ///
    /// Mock readers come back together with their control handle.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Unsupported` if the backend's driver is not
    /// compiled into this build.
    pub fn from_backend(backend: DeviceBackend) -> Result<(Self, Option<MockTagReaderHandle>)> {
        match backend {
            DeviceBackend::Mock => {
                let (reader, handle) = MockTagReader::new();
                Ok((Self::Mock(reader), Some(handle)))
            }
            other => Err(HardwareError::unsupported(format!(
                "{other} tag reader driver"
            ))),
        }
    }
}

impl TagReader for AnyTagReader {
    async fn open(&mut self, events: DeviceEventSender) -> Result<()> {
        match self {
            Self::Mock(device) => device.open(events).await,
        }
    }

    async fn wait_for_attach(&self, timeout: Duration) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.wait_for_attach(timeout).await,
        }
    }

    async fn set_antenna_on(&mut self, on: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_antenna_on(on).await,
        }
    }

    async fn set_indicator_on(&mut self, on: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_indicator_on(on).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
        }
    }
}

/// Enum wrapper for actuator dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyActuator {
    /// Mock servo board for development and testing.
    Mock(MockActuator),
}

impl AnyActuator {
    /// Construct an actuator for a backend.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Unsupported` if the backend's driver is not
    /// compiled into this build.
    pub fn from_backend(backend: DeviceBackend) -> Result<(Self, Option<MockActuatorHandle>)> {
        match backend {
            DeviceBackend::Mock => {
                let (servo, handle) = MockActuator::new();
                Ok((Self::Mock(servo), Some(handle)))
            }
            other => Err(HardwareError::unsupported(format!(
                "{other} servo driver"
            ))),
        }
    }
}

impl Actuator for AnyActuator {
    async fn open(&mut self, events: DeviceEventSender) -> Result<()> {
        match self {
            Self::Mock(device) => device.open(events).await,
        }
    }

    async fn wait_for_attach(&self, timeout: Duration) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.wait_for_attach(timeout).await,
        }
    }

    async fn set_engaged(&mut self, channel: ServoChannel, engaged: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_engaged(channel, engaged).await,
        }
    }

    async fn set_position(&mut self, channel: ServoChannel, position: ServoPosition) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_position(channel, position).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.info(),
        }
    }
}
