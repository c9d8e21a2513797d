//! Door controller core for Latchkey.
//!
//! [`AccessController`] holds the access decision logic. [`LifecycleCoordinator`]
//! owns a controller and brackets its run: device bring-up, the single
//! consumer event loop, and teardown.
//!
//! # Examples
//!
//! ```
//! use latchkey_audit::MemoryAuditSink;
//! use latchkey_controller::{Command, ControllerSettings, ExitStatus, LifecycleCoordinator};
//! use latchkey_core::Credential;
//! use latchkey_hardware::mock::{MockActuator, MockTagReader};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = ControllerSettings::new(Credential::new("4742006").unwrap());
//!     let (reader, _reader_handle) = MockTagReader::new();
//!     let (servo, _servo_handle) = MockActuator::new();
//!     let mut coordinator =
//!         LifecycleCoordinator::new(settings, reader, servo, MemoryAuditSink::new());
//!
//!     let (commands_tx, mut commands) = mpsc::channel(4);
//!     commands_tx.send(Command::Exit).await.unwrap();
//!
//!     let status = coordinator.run_to_completion(&mut commands).await;
//!     assert_eq!(status, ExitStatus::Clean);
//! }
//! ```

pub mod config;
pub mod controller;
pub mod lifecycle;

pub use config::{ControllerConfig, ControllerSettings, RepeatPolicy};
pub use controller::{AccessController, AccessDecision};
pub use lifecycle::{Command, DeviceLifecycle, ExitStatus, LifecycleCoordinator, LifecycleError};
