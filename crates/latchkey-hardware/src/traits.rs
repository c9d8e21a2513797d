//! Device capability trait definitions.
//!
//! These traits are the contract between the lock controller and the two
//! peripherals it drives: a proximity tag reader and a lock servo. Vendor
//! drivers deliver attach, detach, error and tag notifications through the
//! [`DeviceEventSender`] handed over at `open()` time, so the controller sees
//! a single ordered event stream instead of driver callbacks.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use latchkey_core::{ServoChannel, ServoPosition};

use crate::error::Result;
use crate::types::{DeviceEventSender, DeviceInfo};

/// Proximity tag reader abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the enum wrapper
/// [`AnyTagReader`](crate::devices::AnyTagReader) for configuration driven
/// selection.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use latchkey_hardware::traits::TagReader;
/// use latchkey_hardware::types::DeviceEventSender;
/// use latchkey_hardware::error::Result;
///
/// async fn bring_up<R: TagReader>(reader: &mut R, events: DeviceEventSender) -> Result<()> {
///     reader.open(events).await?;
///     let info = reader.wait_for_attach(Duration::from_secs(10)).await?;
///     println!("{} attached", info.name);
///     reader.set_antenna_on(true).await
/// }
/// ```
pub trait TagReader: Send + Sync {
    /// Open the device and start delivering events.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot open the device.
    async fn open(&mut self, events: DeviceEventSender) -> Result<()>;

    /// Wait until the device is attached, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if the device does not attach in time.
    async fn wait_for_attach(&self, timeout: Duration) -> Result<DeviceInfo>;

    /// Switch the RF antenna. Tags are only detected while it is on.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not attached or rejects the command.
    async fn set_antenna_on(&mut self, on: bool) -> Result<()>;

    /// Switch the onboard presence LED.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not attached or rejects the command.
    async fn set_indicator_on(&mut self, on: bool) -> Result<()>;

    /// Close the device. No further events are delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to release the device.
    async fn close(&mut self) -> Result<()>;

    /// Device metadata.
    fn info(&self) -> DeviceInfo;
}

/// Lock servo abstraction.
///
/// The servo board exposes numbered channels; the controller drives one of
/// them between an open and a locked position. Position is write-only: the
/// trait offers no read-back.
///
/// # Examples
///
/// ```no_run
/// use latchkey_core::{ServoChannel, ServoPosition};
/// use latchkey_hardware::traits::Actuator;
/// use latchkey_hardware::error::Result;
///
/// async fn throw_bolt<A: Actuator>(servo: &mut A) -> Result<()> {
///     let channel = ServoChannel::new(0);
///     servo.set_engaged(channel, true).await?;
///     servo.set_position(channel, ServoPosition::new(50.0).unwrap()).await
/// }
/// ```
pub trait Actuator: Send + Sync {
    /// Open the device and start delivering events.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot open the device.
    async fn open(&mut self, events: DeviceEventSender) -> Result<()>;

    /// Wait until the device is attached, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if the device does not attach in time.
    async fn wait_for_attach(&self, timeout: Duration) -> Result<DeviceInfo>;

    /// Power (engage) or release a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel does not exist or the device rejects
    /// the command.
    async fn set_engaged(&mut self, channel: ServoChannel, engaged: bool) -> Result<()>;

    /// Command a channel to a position.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel does not exist, the device is not
    /// attached, or the device rejects the command.
    async fn set_position(&mut self, channel: ServoChannel, position: ServoPosition) -> Result<()>;

    /// Close the device. No further events are delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to release the device.
    async fn close(&mut self) -> Result<()>;

    /// Device metadata.
    fn info(&self) -> DeviceInfo;
}
