//! Hardware device abstraction layer for the Latchkey door controller.
//!
//! This crate provides trait-based abstractions for the two peripherals of a
//! single-door lock: a proximity tag reader and a lock servo. The traits
//! enable easy substitution between mock implementations (for development
//! and testing) and real hardware drivers.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Event stream**: Attach, detach, error and tag notifications are sent
//!   as [`DeviceEvent`]s into one queue rather than through driver callbacks.
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: All operations return `Result<T>` with detailed error information.
//!
//! # Device Traits
//!
//! ## Tag Readers
//!
//! ```no_run
//! use latchkey_hardware::traits::TagReader;
//! use latchkey_hardware::error::Result;
//!
//! async fn presence_led<R: TagReader>(reader: &mut R, present: bool) -> Result<()> {
//!     reader.set_indicator_on(present).await
//! }
//! ```
//!
//! ## Actuators
//!
//! ```no_run
//! use latchkey_core::{ServoChannel, ServoPosition};
//! use latchkey_hardware::traits::Actuator;
//! use latchkey_hardware::error::Result;
//!
//! async fn open_door<A: Actuator>(servo: &mut A) -> Result<()> {
//!     servo
//!         .set_position(ServoChannel::new(0), ServoPosition::new(110.0).unwrap())
//!         .await
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides [`MockTagReader`](mock::MockTagReader) and
//! [`MockActuator`](mock::MockActuator), each paired with a handle that
//! drives the simulated hardware and inspects the commands it received.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyActuator, AnyTagReader};
pub use error::{HardwareError, Result};
pub use traits::{Actuator, TagReader};
pub use types::{
    DeviceBackend, DeviceEvent, DeviceEventKind, DeviceEventSender, DeviceInfo, DeviceKind,
};
