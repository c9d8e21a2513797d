//! Access control state machine.
//!
//! The controller owns everything the door logic touches: the credential,
//! the last seen tag, the commanded lock state, both devices and the audit
//! sink. It is driven by a single consumer, so handlers never overlap.
//!
//! # Transitions
//!
//! | Presented tag | State before | Action | State after |
//! |---------------|--------------|--------|-------------|
//! | authorized | `Locked` | open position | `Unlocked` |
//! | authorized | `Unlocked` | locked position (`Toggle`) | `Locked` |
//! | authorized | `Unlocked` | nothing (`Ignore`) | `Unlocked` |
//! | anything else | any | locked position | `Locked` |
//!
//! Lock state records intent. It changes after the actuator command is
//! issued, whether or not the command succeeded.

use latchkey_audit::AuditSink;
use latchkey_core::{AuditRecord, LockState, StatusSnapshot, TagId};
use latchkey_hardware::{Actuator, TagReader};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::{ControllerSettings, RepeatPolicy};

/// Outcome of a tag presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Authorized tag unlocked the door.
    Unlocked,

    /// Authorized tag locked an unlocked door.
    Relocked,

    /// Authorized tag presented while unlocked, door left unlocked.
    AlreadyUnlocked,

    /// Unknown tag; door locked.
    Denied,
}

impl AccessDecision {
    /// Lock state the decision leaves the door in.
    pub fn resulting_state(self) -> LockState {
        match self {
            Self::Unlocked | Self::AlreadyUnlocked => LockState::Unlocked,
            Self::Relocked | Self::Denied => LockState::Locked,
        }
    }
}

/// Single-door access controller.
pub struct AccessController<R, A, S> {
    settings: ControllerSettings,
    reader: R,
    actuator: A,
    sink: S,
    last_seen_tag: Option<TagId>,
    lock_state: LockState,
    antenna_on: bool,
    status: watch::Sender<StatusSnapshot>,
}

impl<R, A, S> AccessController<R, A, S>
where
    R: TagReader,
    A: Actuator,
    S: AuditSink,
{
    /// Create a controller in the `Locked` state with no tag seen.
    ///
    /// Devices are used as given; opening them is the lifecycle's job.
    pub fn new(settings: ControllerSettings, reader: R, actuator: A, sink: S) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            settings,
            reader,
            actuator,
            sink,
            last_seen_tag: None,
            lock_state: LockState::Locked,
            antenna_on: false,
            status,
        }
    }

    /// Handle a tag entering the antenna field.
    ///
    /// Never fails: device and audit errors are logged and the decision
    /// still takes effect. Always ends with a status check.
    pub async fn on_tag_gained(&mut self, tag: TagId) -> AccessDecision {
        info!("Tag read: {}", tag);
        self.last_seen_tag = Some(tag.clone());
        if let Err(e) = self.reader.set_indicator_on(true).await {
            warn!("Failed to turn reader LED on: {}", e);
        }

        let decision = if self.settings.credential.matches(&tag) {
            match (self.lock_state, self.settings.repeat_policy) {
                (LockState::Locked, _) => {
                    self.drive(LockState::Unlocked).await;
                    info!(
                        "ID confirmed, unlocked. Servo turned to {}",
                        self.settings.open_position
                    );
                    AccessDecision::Unlocked
                }
                (LockState::Unlocked, RepeatPolicy::Toggle) => {
                    self.drive(LockState::Locked).await;
                    info!(
                        "ID confirmed, locked. Servo turned to {}",
                        self.settings.locked_position
                    );
                    AccessDecision::Relocked
                }
                (LockState::Unlocked, RepeatPolicy::Ignore) => {
                    info!("ID confirmed, door already unlocked");
                    AccessDecision::AlreadyUnlocked
                }
            }
        } else {
            self.drive(LockState::Locked).await;
            warn!(
                "Incorrect tag detected, locking device. Servo turned to {}",
                self.settings.locked_position
            );
            AccessDecision::Denied
        };

        self.publish();
        self.status_dump().await;
        decision
    }

    /// Handle a tag leaving the antenna field. Lock state is untouched.
    pub async fn on_tag_lost(&mut self, tag: TagId) {
        info!("Tag lost: {}", tag);
        if let Err(e) = self.reader.set_indicator_on(false).await {
            warn!("Failed to turn reader LED off: {}", e);
        }
    }

    /// Record the current status to the log and the audit trail.
    ///
    /// Does not change state. A sink failure is logged and swallowed.
    pub async fn status_dump(&mut self) {
        let record = AuditRecord::now(self.last_seen_tag.clone(), self.lock_state);
        info!("{}", record);
        if let Err(e) = self.sink.append(&record).await {
            error!("Failed to write audit record: {}", e);
        }
    }

    /// Force the door locked. Writes no audit record.
    pub async fn manual_lock(&mut self) {
        self.drive(LockState::Locked).await;
        self.publish();
    }

    /// Force the door unlocked. Writes no audit record.
    pub async fn manual_unlock(&mut self) {
        self.drive(LockState::Unlocked).await;
        self.publish();
    }

    /// Switch the reader antenna.
    pub async fn toggle_antenna(&mut self, enabled: bool) {
        match self.reader.set_antenna_on(enabled).await {
            Ok(()) => {
                self.antenna_on = enabled;
                if enabled {
                    info!("Antenna turned on");
                } else {
                    info!("Antenna turned off");
                }
            }
            Err(e) => warn!("Failed to switch antenna: {}", e),
        }
        self.publish();
    }

    /// Receive a snapshot whenever the tag, lock state or antenna changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub fn last_seen_tag(&self) -> Option<&TagId> {
        self.last_seen_tag.as_ref()
    }

    pub fn antenna_on(&self) -> bool {
        self.antenna_on
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Current display snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            last_seen_tag: self.last_seen_tag.clone(),
            lock_state: self.lock_state,
            antenna_on: self.antenna_on,
        }
    }

    pub(crate) fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub(crate) fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Record an antenna state switched outside `toggle_antenna`.
    pub(crate) fn set_antenna_flag(&mut self, on: bool) {
        self.antenna_on = on;
        self.publish();
    }

    /// Command the servo for `state`, then record the state regardless.
    async fn drive(&mut self, state: LockState) {
        let position = self.settings.position_for(state);
        if let Err(e) = self
            .actuator
            .set_position(self.settings.channel, position)
            .await
        {
            error!("Failed to move servo to {}: {}", position, e);
        }
        self.lock_state = state;
    }

    fn publish(&self) {
        self.status.send_replace(self.snapshot());
    }
}

impl<R, A, S> std::fmt::Debug for AccessController<R, A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("settings", &self.settings)
            .field("last_seen_tag", &self.last_seen_tag)
            .field("lock_state", &self.lock_state)
            .field("antenna_on", &self.antenna_on)
            .finish_non_exhaustive()
    }
}
