//! Device bring-up, event loop and teardown.
//!
//! ```text
//! initialize():  servo open → attach wait → engage → locked position
//!                reader open → attach wait → antenna on
//! run():         device events + operator commands → AccessController
//! shutdown():    lock → final status → close reader → close servo
//! ```
//!
//! Any bring-up failure closes what was already opened and ends the process
//! with exit status 1. Devices that detach later are logged and left alone.

use std::fmt;
use std::process::ExitCode;

use latchkey_audit::AuditSink;
use latchkey_core::StatusSnapshot;
use latchkey_core::constants::{EVENT_BATCH_LIMIT, EVENT_QUEUE_CAPACITY};
use latchkey_hardware::{
    Actuator, DeviceEvent, DeviceEventKind, DeviceEventSender, DeviceKind, HardwareError,
    TagReader,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::ControllerSettings;
use crate::controller::AccessController;

/// Where a device is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceLifecycle {
    #[default]
    Uninitialized,
    OpeningAwaitingAttach,
    Attached,
    Closed,
    Failed,
}

impl fmt::Display for DeviceLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::OpeningAwaitingAttach => "opening",
            Self::Attached => "attached",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Operator request delivered to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Record the current status.
    StatusDump,

    /// Switch the reader antenna.
    ToggleAntenna(bool),

    /// Force the door locked.
    ManualLock,

    /// Force the door unlocked.
    ManualUnlock,

    /// Leave the event loop.
    Exit,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Clean,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Failure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Fatal bring-up or teardown failure.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{device} could not be constructed: {source}")]
    Construction {
        device: DeviceKind,
        #[source]
        source: HardwareError,
    },

    #[error("{device} failed to open: {source}")]
    Open {
        device: DeviceKind,
        #[source]
        source: HardwareError,
    },

    #[error("{device} did not attach within {timeout_ms}ms")]
    AttachTimeout { device: DeviceKind, timeout_ms: u64 },

    #[error("{device} rejected initial configuration: {source}")]
    Configure {
        device: DeviceKind,
        #[source]
        source: HardwareError,
    },

    #[error("{device} failed to close: {source}")]
    Close {
        device: DeviceKind,
        #[source]
        source: HardwareError,
    },
}

impl LifecycleError {
    pub fn construction(device: DeviceKind, source: HardwareError) -> Self {
        Self::Construction { device, source }
    }

    /// Device the failure belongs to.
    pub fn device(&self) -> DeviceKind {
        match self {
            Self::Construction { device, .. }
            | Self::Open { device, .. }
            | Self::AttachTimeout { device, .. }
            | Self::Configure { device, .. }
            | Self::Close { device, .. } => *device,
        }
    }

    /// Every lifecycle failure ends the process with status 1.
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Failure
    }

    fn attach(device: DeviceKind, source: HardwareError) -> Self {
        match source {
            HardwareError::Timeout { duration_ms } => Self::AttachTimeout {
                device,
                timeout_ms: duration_ms,
            },
            source => Self::Open { device, source },
        }
    }
}

/// Brackets a controller run: bring-up, event loop, teardown.
#[derive(Debug)]
pub struct LifecycleCoordinator<R, A, S> {
    controller: AccessController<R, A, S>,
    events_tx: mpsc::Sender<DeviceEvent>,
    events_rx: mpsc::Receiver<DeviceEvent>,
    reader_state: DeviceLifecycle,
    actuator_state: DeviceLifecycle,
}

impl<R, A, S> LifecycleCoordinator<R, A, S>
where
    R: TagReader,
    A: Actuator,
    S: AuditSink,
{
    pub fn new(settings: ControllerSettings, reader: R, actuator: A, sink: S) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Self {
            controller: AccessController::new(settings, reader, actuator, sink),
            events_tx,
            events_rx,
            reader_state: DeviceLifecycle::Uninitialized,
            actuator_state: DeviceLifecycle::Uninitialized,
        }
    }

    pub fn controller(&self) -> &AccessController<R, A, S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AccessController<R, A, S> {
        &mut self.controller
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.controller.subscribe()
    }

    pub fn reader_state(&self) -> DeviceLifecycle {
        self.reader_state
    }

    pub fn actuator_state(&self) -> DeviceLifecycle {
        self.actuator_state
    }

    /// Bring up the servo, then the reader.
    ///
    /// The reader is never opened if the servo fails.
    ///
    /// # Errors
    ///
    /// Returns the first open, attach or configuration failure. Devices
    /// already opened are closed on a best-effort basis and marked `Failed`.
    pub async fn initialize(&mut self) -> Result<(), LifecycleError> {
        info!("Initializing servo...");
        if let Err(e) = self.bring_up_actuator().await {
            error!("{}", e);
            self.abort_actuator().await;
            return Err(e);
        }
        info!("Servo initialized");

        info!("Initializing RFID reader...");
        if let Err(e) = self.bring_up_reader().await {
            error!("{}", e);
            self.abort_reader().await;
            self.abort_actuator().await;
            return Err(e);
        }
        self.controller.set_antenna_flag(true);
        info!("System setup complete, ready to read RFID tags");
        Ok(())
    }

    /// Consume device events and operator commands until `Exit` or until
    /// every command sender is gone.
    ///
    /// Pending device events are handled before commands, except that a
    /// pending command is taken after every `EVENT_BATCH_LIMIT` events in a
    /// row so a busy reader cannot hold off `Exit`.
    pub async fn run(&mut self, commands: &mut mpsc::Receiver<Command>) {
        let mut streak = 0;
        loop {
            let command = if streak < EVENT_BATCH_LIMIT {
                tokio::select! {
                    biased;

                    Some(event) = self.events_rx.recv() => {
                        self.handle_event(event).await;
                        streak += 1;
                        continue;
                    }
                    command = commands.recv() => command,
                }
            } else {
                streak = 0;
                match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => continue,
                    Err(TryRecvError::Disconnected) => None,
                }
            };

            streak = 0;
            match command {
                Some(Command::Exit) | None => {
                    debug!("Event loop stopping");
                    break;
                }
                Some(command) => self.handle_command(command).await,
            }
        }
    }

    /// Lock the door, record a final status and close both devices.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Close` for the first device that fails to
    /// close. The servo is not closed if the reader fails.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        self.controller.manual_lock().await;
        info!(
            "Locking device. Servo turned to {}",
            self.controller.settings().locked_position
        );
        info!("Closing devices...");
        self.controller.status_dump().await;

        if let Err(source) = self.controller.reader_mut().close().await {
            self.reader_state = DeviceLifecycle::Failed;
            let e = LifecycleError::Close {
                device: DeviceKind::Reader,
                source,
            };
            error!("{}", e);
            return Err(e);
        }
        self.reader_state = DeviceLifecycle::Closed;

        if let Err(source) = self.controller.actuator_mut().close().await {
            self.actuator_state = DeviceLifecycle::Failed;
            let e = LifecycleError::Close {
                device: DeviceKind::Actuator,
                source,
            };
            error!("{}", e);
            return Err(e);
        }
        self.actuator_state = DeviceLifecycle::Closed;

        info!("Program successfully shut down");
        Ok(())
    }

    /// Initialize, run until exit, shut down.
    pub async fn run_to_completion(&mut self, commands: &mut mpsc::Receiver<Command>) -> ExitStatus {
        if let Err(e) = self.initialize().await {
            return e.exit_status();
        }
        self.run(commands).await;
        match self.shutdown().await {
            Ok(()) => ExitStatus::Clean,
            Err(e) => e.exit_status(),
        }
    }

    async fn bring_up_actuator(&mut self) -> Result<(), LifecycleError> {
        let device = DeviceKind::Actuator;
        let timeout = self.controller.settings().attach_timeout;
        let channel = self.controller.settings().channel;
        let locked = self.controller.settings().locked_position;
        let events = DeviceEventSender::new(device, self.events_tx.clone());

        self.actuator_state = DeviceLifecycle::OpeningAwaitingAttach;
        let actuator = self.controller.actuator_mut();
        actuator
            .open(events)
            .await
            .map_err(|source| LifecycleError::Open { device, source })?;
        let info = actuator
            .wait_for_attach(timeout)
            .await
            .map_err(|source| LifecycleError::attach(device, source))?;
        debug!("{} attached: {:?}", device, info);

        actuator
            .set_engaged(channel, true)
            .await
            .map_err(|source| LifecycleError::Configure { device, source })?;
        actuator
            .set_position(channel, locked)
            .await
            .map_err(|source| LifecycleError::Configure { device, source })?;

        self.actuator_state = DeviceLifecycle::Attached;
        Ok(())
    }

    async fn bring_up_reader(&mut self) -> Result<(), LifecycleError> {
        let device = DeviceKind::Reader;
        let timeout = self.controller.settings().attach_timeout;
        let events = DeviceEventSender::new(device, self.events_tx.clone());

        self.reader_state = DeviceLifecycle::OpeningAwaitingAttach;
        let reader = self.controller.reader_mut();
        reader
            .open(events)
            .await
            .map_err(|source| LifecycleError::Open { device, source })?;
        let info = reader
            .wait_for_attach(timeout)
            .await
            .map_err(|source| LifecycleError::attach(device, source))?;
        debug!("{} attached: {:?}", device, info);

        info!("Turning on the RFID antenna...");
        reader
            .set_antenna_on(true)
            .await
            .map_err(|source| LifecycleError::Configure { device, source })?;

        self.reader_state = DeviceLifecycle::Attached;
        Ok(())
    }

    async fn abort_actuator(&mut self) {
        if self.actuator_state != DeviceLifecycle::Uninitialized {
            if let Err(e) = self.controller.actuator_mut().close().await {
                warn!("Servo close after failed bring-up: {}", e);
            }
        }
        self.actuator_state = DeviceLifecycle::Failed;
    }

    async fn abort_reader(&mut self) {
        if self.reader_state != DeviceLifecycle::Uninitialized {
            if let Err(e) = self.controller.reader_mut().close().await {
                warn!("Reader close after failed bring-up: {}", e);
            }
        }
        self.reader_state = DeviceLifecycle::Failed;
    }

    async fn handle_event(&mut self, event: DeviceEvent) {
        let device = event.device;
        match event.kind {
            DeviceEventKind::TagGained(tag) => {
                self.controller.on_tag_gained(tag).await;
            }
            DeviceEventKind::TagLost(tag) => self.controller.on_tag_lost(tag).await,
            DeviceEventKind::Attached { serial } => info!("{} {} attached", device, serial),
            DeviceEventKind::Detached { serial } => {
                warn!("{} {} detached", device, serial)
            }
            DeviceEventKind::Error { code, message } => {
                error!("{}: device error {}: {}", device, code, message)
            }
            DeviceEventKind::OutputChanged { index, state } => {
                info!("{}: output {} state: {}", device, index, state)
            }
            other => debug!("{}: unhandled event {:?}", device, other),
        }
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("Operator command: {:?}", command);
        match command {
            Command::StatusDump => self.controller.status_dump().await,
            Command::ToggleAntenna(enabled) => self.controller.toggle_antenna(enabled).await,
            Command::ManualLock => self.controller.manual_lock().await,
            Command::ManualUnlock => self.controller.manual_unlock().await,
            Command::Exit => {}
        }
    }
}
