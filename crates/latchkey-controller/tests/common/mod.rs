//! Shared fixtures for controller integration tests.
//!
//! A [`Harness`] wires a coordinator to mock devices and an in-memory audit
//! trail, and keeps the mock handles so tests can play the part of the
//! hardware.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use latchkey_audit::MemoryAuditSink;
use latchkey_controller::{Command, ControllerSettings, LifecycleCoordinator, RepeatPolicy};
use latchkey_core::Credential;
use latchkey_hardware::mock::{
    MockActuator, MockActuatorHandle, MockTagReader, MockTagReaderHandle,
};
use tokio::sync::mpsc;

/// Credential used throughout the scenarios.
pub const CREDENTIAL: &str = "4742006";

/// A tag that is not the credential.
pub const STRANGER: &str = "9999999";

pub type MockCoordinator = LifecycleCoordinator<MockTagReader, MockActuator, MemoryAuditSink>;

pub struct Harness {
    pub coordinator: MockCoordinator,
    pub reader: MockTagReaderHandle,
    pub servo: MockActuatorHandle,
    pub trail: MemoryAuditSink,
    pub commands_tx: mpsc::Sender<Command>,
    pub commands: mpsc::Receiver<Command>,
}

pub fn settings() -> ControllerSettings {
    ControllerSettings::new(Credential::new(CREDENTIAL).unwrap())
        .with_attach_timeout(Duration::from_secs(10))
}

pub fn harness() -> Harness {
    harness_with(settings())
}

pub fn harness_with_policy(policy: RepeatPolicy) -> Harness {
    harness_with(settings().with_repeat_policy(policy))
}

pub fn harness_with(settings: ControllerSettings) -> Harness {
    let (reader, reader_handle) = MockTagReader::new();
    let (servo, servo_handle) = MockActuator::new();
    let trail = MemoryAuditSink::new();
    let (commands_tx, commands) = mpsc::channel(16);

    Harness {
        coordinator: LifecycleCoordinator::new(settings, reader, servo, trail.clone()),
        reader: reader_handle,
        servo: servo_handle,
        trail,
        commands_tx,
        commands,
    }
}

/// Initialized harness, ready for events.
pub async fn ready_harness() -> Harness {
    let mut h = harness();
    h.coordinator.initialize().await.unwrap();
    h
}

/// Run the event loop while `script` plays the hardware and the operator.
///
/// `Exit` is sent once the script finishes; device events queued by then
/// are still handled first.
pub async fn drive<F, Fut>(h: &mut Harness, script: F)
where
    F: FnOnce(MockTagReaderHandle, MockActuatorHandle, mpsc::Sender<Command>) -> Fut,
    Fut: Future<Output = ()>,
{
    let reader = h.reader.clone();
    let servo = h.servo.clone();
    let tx = h.commands_tx.clone();
    let exit_tx = h.commands_tx.clone();

    let Harness {
        coordinator,
        commands,
        ..
    } = h;

    tokio::join!(coordinator.run(commands), async move {
        script(reader, servo, tx).await;
        exit_tx.send(Command::Exit).await.unwrap();
    });
}
