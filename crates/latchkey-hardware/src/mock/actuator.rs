//! Mock lock servo implementation for testing and development.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use latchkey_core::{ServoChannel, ServoPosition};
use tokio::sync::watch;

use crate::{
    HardwareError, Result,
    traits::Actuator,
    types::{DeviceEventKind, DeviceEventSender, DeviceInfo},
};

const DEFAULT_ACTUATOR_SERIAL: u32 = 305_722;

/// Channels on the simulated servo board.
pub const MOCK_SERVO_CHANNELS: u8 = 8;

/// Mock servo board.
///
/// Records every position command so tests can assert on what the lock was
/// told to do. Commands on a released (not engaged) channel are accepted,
/// as the real board accepts them and applies them once engaged.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use latchkey_core::{ServoChannel, ServoPosition};
/// use latchkey_hardware::mock::MockActuator;
/// use latchkey_hardware::traits::Actuator;
/// use latchkey_hardware::types::{DeviceEventSender, DeviceKind};
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut servo, handle) = MockActuator::new();
///     let (tx, _rx) = mpsc::channel(8);
///
///     servo.open(DeviceEventSender::new(DeviceKind::Actuator, tx)).await?;
///     servo.wait_for_attach(Duration::from_secs(1)).await?;
///     servo.set_position(ServoChannel::new(0), ServoPosition::new(50.0).unwrap()).await?;
///
///     assert_eq!(handle.last_position().unwrap().degrees(), 50.0);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockActuator {
    shared: Arc<ActuatorShared>,
}

impl MockActuator {
    /// Create a new mock servo board with the default serial number.
    pub fn new() -> (Self, MockActuatorHandle) {
        Self::with_serial(DEFAULT_ACTUATOR_SERIAL)
    }

    /// Create a new mock servo board with a custom serial number.
    pub fn with_serial(serial: u32) -> (Self, MockActuatorHandle) {
        let (attached, _) = watch::channel(false);
        let shared = Arc::new(ActuatorShared {
            state: Mutex::new(ActuatorState::new(serial)),
            attached,
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockActuatorHandle { shared },
        )
    }
}

impl Actuator for MockActuator {
    async fn open(&mut self, events: DeviceEventSender) -> Result<()> {
        let auto_attach = {
            let mut state = self.shared.state();
            if state.faults.open {
                return Err(HardwareError::initialization_failed(
                    "mock servo refused to open",
                ));
            }
            state.events = Some(events);
            state.opened = true;
            state.closed = false;
            state.auto_attach
        };

        if auto_attach {
            self.shared.attach().await?;
        }
        Ok(())
    }

    async fn wait_for_attach(&self, timeout: Duration) -> Result<DeviceInfo> {
        let mut attached = self.shared.attached.subscribe();
        match tokio::time::timeout(timeout, attached.wait_for(|a| *a)).await {
            Ok(Ok(_)) => Ok(self.info()),
            Ok(Err(_)) => Err(HardwareError::disconnected("mock servo dropped")),
            Err(_) => Err(HardwareError::timeout(timeout.as_millis() as u64)),
        }
    }

    async fn set_engaged(&mut self, channel: ServoChannel, engaged: bool) -> Result<()> {
        let mut state = self.shared.ready_state(channel)?;
        if state.faults.engage {
            return Err(HardwareError::communication("engage command rejected"));
        }
        state.engaged = engaged;
        Ok(())
    }

    async fn set_position(&mut self, channel: ServoChannel, position: ServoPosition) -> Result<()> {
        let mut state = self.shared.ready_state(channel)?;
        if state.faults.position {
            return Err(HardwareError::communication("position command rejected"));
        }
        state.positions.push((channel, position));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        {
            let mut state = self.shared.state();
            if state.faults.close {
                return Err(HardwareError::communication("mock servo failed to close"));
            }
            state.closed = true;
            state.opened = false;
            state.events = None;
            state.engaged = false;
        }
        self.shared.attached.send_replace(false);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        let serial = self.shared.state().serial;
        DeviceInfo::new("Mock Servo Board", "Mock").with_serial_number(serial.to_string())
    }
}

/// Handle for controlling and inspecting a mock servo board.
#[derive(Debug, Clone)]
pub struct MockActuatorHandle {
    shared: Arc<ActuatorShared>,
}

impl MockActuatorHandle {
    /// Attach the board and emit `Attached`.
    ///
    /// # Errors
    ///
    /// Returns an error if the board has not been opened.
    pub async fn attach(&self) -> Result<()> {
        self.shared.attach().await
    }

    /// Detach the board and emit `Detached`.
    ///
    /// # Errors
    ///
    /// Returns an error if the board has not been opened.
    pub async fn detach(&self) -> Result<()> {
        let (events, serial) = {
            let state = self.shared.state();
            (state.opened_events()?, state.serial)
        };
        self.shared.attached.send_replace(false);
        events.emit(DeviceEventKind::Detached { serial }).await
    }

    /// Raise an asynchronous device error event.
    ///
    /// # Errors
    ///
    /// Returns an error if the board is not open.
    pub async fn raise_error(&self, code: i32, message: impl Into<String>) -> Result<()> {
        let events = self.shared.state().opened_events()?;
        events
            .emit(DeviceEventKind::Error {
                code,
                message: message.into(),
            })
            .await
    }

    /// Whether the board attaches by itself on `open()`. Defaults to `true`.
    pub fn set_auto_attach(&self, enabled: bool) {
        self.shared.state().auto_attach = enabled;
    }

    /// Make `open()` fail.
    pub fn fail_open(&self, fail: bool) {
        self.shared.state().faults.open = fail;
    }

    /// Make `set_engaged()` fail.
    pub fn fail_engage(&self, fail: bool) {
        self.shared.state().faults.engage = fail;
    }

    /// Make `set_position()` fail.
    pub fn fail_position(&self, fail: bool) {
        self.shared.state().faults.position = fail;
    }

    /// Make `close()` fail.
    pub fn fail_close(&self, fail: bool) {
        self.shared.state().faults.close = fail;
    }

    pub fn is_opened(&self) -> bool {
        self.shared.state().opened
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state().closed
    }

    pub fn is_attached(&self) -> bool {
        *self.shared.attached.borrow()
    }

    pub fn is_engaged(&self) -> bool {
        self.shared.state().engaged
    }

    /// Last position accepted by the board.
    pub fn last_position(&self) -> Option<ServoPosition> {
        self.shared.state().positions.last().map(|(_, p)| *p)
    }

    /// Every accepted position command, oldest first.
    pub fn positions(&self) -> Vec<(ServoChannel, ServoPosition)> {
        self.shared.state().positions.clone()
    }
}

#[derive(Debug)]
struct ActuatorShared {
    state: Mutex<ActuatorState>,
    attached: watch::Sender<bool>,
}

impl ActuatorShared {
    fn state(&self) -> MutexGuard<'_, ActuatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready_state(&self, channel: ServoChannel) -> Result<MutexGuard<'_, ActuatorState>> {
        if channel.index() >= MOCK_SERVO_CHANNELS {
            return Err(HardwareError::invalid_data(format!(
                "servo channel {} out of range 0-{}",
                channel,
                MOCK_SERVO_CHANNELS - 1
            )));
        }
        let state = self.state();
        if !state.opened {
            return Err(HardwareError::not_open("mock servo"));
        }
        if !*self.attached.borrow() {
            return Err(HardwareError::disconnected("mock servo"));
        }
        Ok(state)
    }

    async fn attach(&self) -> Result<()> {
        let (events, serial) = {
            let state = self.state();
            (state.opened_events()?, state.serial)
        };
        self.attached.send_replace(true);
        events.emit(DeviceEventKind::Attached { serial }).await
    }
}

#[derive(Debug, Default)]
struct ActuatorFaults {
    open: bool,
    engage: bool,
    position: bool,
    close: bool,
}

#[derive(Debug)]
struct ActuatorState {
    serial: u32,
    events: Option<DeviceEventSender>,
    opened: bool,
    closed: bool,
    auto_attach: bool,
    engaged: bool,
    positions: Vec<(ServoChannel, ServoPosition)>,
    faults: ActuatorFaults,
}

impl ActuatorState {
    fn new(serial: u32) -> Self {
        Self {
            serial,
            events: None,
            opened: false,
            closed: false,
            auto_attach: true,
            engaged: false,
            positions: Vec::new(),
            faults: ActuatorFaults::default(),
        }
    }

    fn opened_events(&self) -> Result<DeviceEventSender> {
        self.events
            .clone()
            .ok_or_else(|| HardwareError::not_open("mock servo"))
    }
}
