//! Mock tag reader implementation for testing and development.
//!
//! This module provides a simulated proximity reader that can be controlled
//! programmatically for testing without requiring physical hardware.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use latchkey_core::TagId;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    HardwareError, Result,
    traits::TagReader,
    types::{DeviceEventKind, DeviceEventSender, DeviceInfo},
};

const DEFAULT_READER_SERIAL: u32 = 118_467;

/// Mock proximity tag reader.
///
/// The reader attaches as soon as it is opened unless told otherwise through
/// its handle. Tags presented through the handle are only reported while the
/// antenna is on, like the real device.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use latchkey_hardware::mock::MockTagReader;
/// use latchkey_hardware::traits::TagReader;
/// use latchkey_hardware::types::{DeviceEventKind, DeviceEventSender, DeviceKind};
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut reader, handle) = MockTagReader::new();
///     let (tx, mut rx) = mpsc::channel(8);
///
///     reader.open(DeviceEventSender::new(DeviceKind::Reader, tx)).await?;
///     reader.wait_for_attach(Duration::from_secs(1)).await?;
///     reader.set_antenna_on(true).await?;
///
///     handle.present_tag("4742006").await?;
///
///     let _attached = rx.recv().await;
///     let event = rx.recv().await.unwrap();
///     assert!(matches!(event.kind, DeviceEventKind::TagGained(_)));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTagReader {
    shared: Arc<ReaderShared>,
}

impl MockTagReader {
    /// Create a new mock reader with the default serial number.
    ///
    /// Returns a tuple of (MockTagReader, MockTagReaderHandle) where the handle
    /// simulates tag presentations and inspects reader outputs.
    pub fn new() -> (Self, MockTagReaderHandle) {
        Self::with_serial(DEFAULT_READER_SERIAL)
    }

    /// Create a new mock reader with a custom serial number.
    pub fn with_serial(serial: u32) -> (Self, MockTagReaderHandle) {
        let (attached, _) = watch::channel(false);
        let shared = Arc::new(ReaderShared {
            state: Mutex::new(ReaderState::new(serial)),
            attached,
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockTagReaderHandle { shared },
        )
    }
}

impl TagReader for MockTagReader {
    async fn open(&mut self, events: DeviceEventSender) -> Result<()> {
        let auto_attach = {
            let mut state = self.shared.state();
            if state.faults.open {
                return Err(HardwareError::initialization_failed(
                    "mock reader refused to open",
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
            Ok(Err(_)) => Err(HardwareError::disconnected("mock reader dropped")),
            Err(_) => Err(HardwareError::timeout(timeout.as_millis() as u64)),
        }
    }

    async fn set_antenna_on(&mut self, on: bool) -> Result<()> {
        let mut state = self.shared.ready_state()?;
        if state.faults.antenna {
            return Err(HardwareError::communication("antenna command rejected"));
        }
        state.antenna_on = on;
        if !on {
            state.current_tag = None;
        }
        Ok(())
    }

    async fn set_indicator_on(&mut self, on: bool) -> Result<()> {
        let mut state = self.shared.ready_state()?;
        if state.faults.indicator {
            return Err(HardwareError::communication("LED command rejected"));
        }
        state.indicator_on = on;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        {
            let mut state = self.shared.state();
            if state.faults.close {
                return Err(HardwareError::communication("mock reader failed to close"));
            }
            state.closed = true;
            state.opened = false;
            state.events = None;
            state.antenna_on = false;
            state.indicator_on = false;
            state.current_tag = None;
        }
        self.shared.attached.send_replace(false);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        let serial = self.shared.state().serial;
        DeviceInfo::new("Mock RFID Reader", "Mock").with_serial_number(serial.to_string())
    }
}

/// Handle for controlling a mock tag reader.
///
/// Clones share the same reader.
#[derive(Debug, Clone)]
pub struct MockTagReaderHandle {
    shared: Arc<ReaderShared>,
}

impl MockTagReaderHandle {
    /// Attach the reader and emit `Attached`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has not been opened.
    pub async fn attach(&self) -> Result<()> {
        self.shared.attach().await
    }

    /// Detach the reader and emit `Detached`. A tag in the field is dropped
    /// silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has not been opened.
    pub async fn detach(&self) -> Result<()> {
        let (events, serial) = {
            let mut state = self.shared.state();
            let events = state.opened_events()?;
            state.current_tag = None;
            (events, state.serial)
        };
        self.shared.attached.send_replace(false);
        events.emit(DeviceEventKind::Detached { serial }).await
    }

    /// Bring a tag into the antenna field.
    ///
    /// A tag already in the field is reported lost first. With the antenna
    /// off nothing is reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag identifier is empty or the reader is not
    /// attached.
    pub async fn present_tag(&self, tag: &str) -> Result<()> {
        let tag = TagId::new(tag).map_err(|e| HardwareError::invalid_data(e.to_string()))?;

        let (events, previous) = {
            let mut state = self.shared.ready_state()?;
            if !state.antenna_on {
                debug!("Antenna off, tag {} not detected", tag);
                return Ok(());
            }
            let events = state.opened_events()?;
            let previous = state.current_tag.replace(tag.clone());
            (events, previous)
        };

        if let Some(previous) = previous {
            events.emit(DeviceEventKind::TagLost(previous)).await?;
        }
        events.emit(DeviceEventKind::TagGained(tag)).await
    }

    /// Take the current tag out of the field, emitting `TagLost`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not open.
    pub async fn remove_tag(&self) -> Result<()> {
        let (events, removed) = {
            let mut state = self.shared.state();
            let events = state.opened_events()?;
            (events, state.current_tag.take())
        };

        match removed {
            Some(tag) => events.emit(DeviceEventKind::TagLost(tag)).await,
            None => Ok(()),
        }
    }

    /// Raise an asynchronous device error event.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not open.
    pub async fn raise_error(&self, code: i32, message: impl Into<String>) -> Result<()> {
        let events = self.shared.state().opened_events()?;
        events
            .emit(DeviceEventKind::Error {
                code,
                message: message.into(),
            })
            .await
    }

    /// Toggle a digital output, emitting `OutputChanged`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not open.
    pub async fn set_output(&self, index: u8, on: bool) -> Result<()> {
        let events = self.shared.state().opened_events()?;
        events
            .emit(DeviceEventKind::OutputChanged { index, state: on })
            .await
    }

    /// Whether the reader attaches by itself on `open()`. Defaults to `true`.
    pub fn set_auto_attach(&self, enabled: bool) {
        self.shared.state().auto_attach = enabled;
    }

    /// Make `open()` fail.
    pub fn fail_open(&self, fail: bool) {
        self.shared.state().faults.open = fail;
    }

    /// Make antenna commands fail.
    pub fn fail_antenna(&self, fail: bool) {
        self.shared.state().faults.antenna = fail;
    }

    /// Make LED commands fail.
    pub fn fail_indicator(&self, fail: bool) {
        self.shared.state().faults.indicator = fail;
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

    pub fn antenna_on(&self) -> bool {
        self.shared.state().antenna_on
    }

    pub fn indicator_on(&self) -> bool {
        self.shared.state().indicator_on
    }

    /// Tag currently in the antenna field.
    pub fn current_tag(&self) -> Option<TagId> {
        self.shared.state().current_tag.clone()
    }
}

#[derive(Debug)]
struct ReaderShared {
    state: Mutex<ReaderState>,
    attached: watch::Sender<bool>,
}

impl ReaderShared {
    fn state(&self) -> MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State guard for commands that need an attached device.
    fn ready_state(&self) -> Result<MutexGuard<'_, ReaderState>> {
        let state = self.state();
        if !state.opened {
            return Err(HardwareError::not_open("mock reader"));
        }
        if !*self.attached.borrow() {
            return Err(HardwareError::disconnected("mock reader"));
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
struct ReaderFaults {
    open: bool,
    antenna: bool,
    indicator: bool,
    close: bool,
}

#[derive(Debug)]
struct ReaderState {
    serial: u32,
    events: Option<DeviceEventSender>,
    opened: bool,
    closed: bool,
    auto_attach: bool,
    antenna_on: bool,
    indicator_on: bool,
    current_tag: Option<TagId>,
    faults: ReaderFaults,
}

impl ReaderState {
    fn new(serial: u32) -> Self {
        Self {
            serial,
            events: None,
            opened: false,
            closed: false,
            auto_attach: true,
            antenna_on: false,
            indicator_on: false,
            current_tag: None,
            faults: ReaderFaults::default(),
        }
    }

    fn opened_events(&self) -> Result<DeviceEventSender> {
        self.events
            .clone()
            .ok_or_else(|| HardwareError::not_open("mock reader"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceEvent, DeviceKind};
    use tokio::sync::mpsc;

    async fn opened_reader() -> (MockTagReader, MockTagReaderHandle, mpsc::Receiver<DeviceEvent>)
    {
        let (mut reader, handle) = MockTagReader::new();
        let (tx, mut rx) = mpsc::channel(16);
        reader
            .open(DeviceEventSender::new(DeviceKind::Reader, tx))
            .await
            .unwrap();
        let attached = rx.recv().await.unwrap();
        assert_eq!(
            attached.kind,
            DeviceEventKind::Attached {
                serial: DEFAULT_READER_SERIAL
            }
        );
        (reader, handle, rx)
    }

    #[tokio::test]
    async fn test_mock_reader_attaches_on_open() {
        let (reader, handle, _rx) = opened_reader().await;

        let info = reader.wait_for_attach(Duration::from_millis(10)).await.unwrap();
        assert_eq!(info.name, "Mock RFID Reader");
        assert_eq!(info.serial_number, Some("118467".to_string()));
        assert!(handle.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_reader_attach_timeout() {
        let (mut reader, handle) = MockTagReader::new();
        handle.set_auto_attach(false);
        let (tx, _rx) = mpsc::channel(16);
        reader
            .open(DeviceEventSender::new(DeviceKind::Reader, tx))
            .await
            .unwrap();

        let result = reader.wait_for_attach(Duration::from_secs(10)).await;
        assert!(matches!(result, Err(HardwareError::Timeout { duration_ms: 10000 })));
    }

    #[tokio::test]
    async fn test_mock_reader_late_attach() {
        let (mut reader, handle) = MockTagReader::new();
        handle.set_auto_attach(false);
        let (tx, _rx) = mpsc::channel(16);
        reader
            .open(DeviceEventSender::new(DeviceKind::Reader, tx))
            .await
            .unwrap();

        let attacher = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            attacher.attach().await.unwrap();
        });

        assert!(reader.wait_for_attach(Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_reader_tag_events() {
        let (mut reader, handle, mut rx) = opened_reader().await;
        reader.set_antenna_on(true).await.unwrap();

        handle.present_tag("4742006").await.unwrap();
        handle.present_tag("9999999").await.unwrap();
        handle.remove_tag().await.unwrap();

        let tag = |id: &str| TagId::new(id).unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, DeviceEventKind::TagGained(tag("4742006")));
        assert_eq!(rx.recv().await.unwrap().kind, DeviceEventKind::TagLost(tag("4742006")));
        assert_eq!(rx.recv().await.unwrap().kind, DeviceEventKind::TagGained(tag("9999999")));
        assert_eq!(rx.recv().await.unwrap().kind, DeviceEventKind::TagLost(tag("9999999")));
        assert_eq!(handle.current_tag(), None);
    }

    #[tokio::test]
    async fn test_mock_reader_antenna_off_ignores_tags() {
        let (_reader, handle, mut rx) = opened_reader().await;

        handle.present_tag("4742006").await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.current_tag(), None);
    }

    #[tokio::test]
    async fn test_mock_reader_indicator_and_faults() {
        let (mut reader, handle, _rx) = opened_reader().await;

        reader.set_indicator_on(true).await.unwrap();
        assert!(handle.indicator_on());

        handle.fail_indicator(true);
        assert!(reader.set_indicator_on(false).await.is_err());
        assert!(handle.indicator_on());

        handle.fail_antenna(true);
        assert!(reader.set_antenna_on(true).await.is_err());
        assert!(!handle.antenna_on());
    }

    #[tokio::test]
    async fn test_mock_reader_detach_blocks_commands() {
        let (mut reader, handle, mut rx) = opened_reader().await;

        handle.detach().await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap().kind,
            DeviceEventKind::Detached {
                serial: DEFAULT_READER_SERIAL
            }
        );
        assert!(matches!(
            reader.set_antenna_on(true).await,
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_reader_close() {
        let (mut reader, handle, _rx) = opened_reader().await;

        handle.fail_close(true);
        assert!(reader.close().await.is_err());
        assert!(!handle.is_closed());

        handle.fail_close(false);
        reader.close().await.unwrap();
        assert!(handle.is_closed());
        assert!(!handle.is_attached());
        assert!(handle.raise_error(1, "late").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_reader_open_failure() {
        let (mut reader, handle) = MockTagReader::new();
        handle.fail_open(true);
        let (tx, _rx) = mpsc::channel(1);

        let result = reader
            .open(DeviceEventSender::new(DeviceKind::Reader, tx))
            .await;
        assert!(matches!(result, Err(HardwareError::InitializationFailed { .. })));
        assert!(!handle.is_opened());
    }

    #[tokio::test]
    async fn test_mock_reader_error_and_output_events() {
        let (_reader, handle, mut rx) = opened_reader().await;

        handle.raise_error(13, "Tag read collision").await.unwrap();
        handle.set_output(1, true).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap().kind,
            DeviceEventKind::Error {
                code: 13,
                message: "Tag read collision".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap().kind,
            DeviceEventKind::OutputChanged {
                index: 1,
                state: true
            }
        );
    }
}
