//! Controller configuration.
//!
//! [`ControllerConfig`] is the raw, deserializable form read from a config
//! file and command line overrides. [`ControllerSettings`] is the validated
//! form the controller runs with.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use latchkey_core::constants::{
    DEFAULT_ATTACH_TIMEOUT_MS, DEFAULT_AUDIT_PATH, DEFAULT_LOCKED_POSITION,
    DEFAULT_OPEN_POSITION, DEFAULT_SERVO_CHANNEL,
};
use latchkey_core::{Credential, Error, LockState, Result, ServoChannel, ServoPosition};
use latchkey_hardware::DeviceBackend;
use serde::{Deserialize, Serialize};

/// What an authorized tag does while the door is already unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// Lock the door again.
    #[default]
    Toggle,

    /// Leave the door unlocked.
    Ignore,
}

impl fmt::Display for RepeatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle => write!(f, "toggle"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

impl std::str::FromStr for RepeatPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Ok(Self::Toggle),
            "ignore" => Ok(Self::Ignore),
            other => Err(Error::Config(format!("unknown repeat policy: {other}"))),
        }
    }
}

/// Raw controller configuration.
///
/// Every key is optional in the file; missing keys take the defaults below.
/// The credential has no default and must be supplied somewhere.
///
/// ```toml
/// credential = "4742006"
/// audit_path = "DataDump.csv"
/// attach_timeout_ms = 10000
/// channel = 0
/// open_position = 110.0
/// locked_position = 50.0
/// repeat_policy = "toggle"
/// reader_backend = "mock"
/// actuator_backend = "mock"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub credential: Option<Credential>,
    pub audit_path: PathBuf,
    pub attach_timeout_ms: u64,
    pub channel: u8,
    pub open_position: f64,
    pub locked_position: f64,
    pub repeat_policy: RepeatPolicy,
    pub reader_backend: DeviceBackend,
    pub actuator_backend: DeviceBackend,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            credential: None,
            audit_path: PathBuf::from(DEFAULT_AUDIT_PATH),
            attach_timeout_ms: DEFAULT_ATTACH_TIMEOUT_MS,
            channel: DEFAULT_SERVO_CHANNEL,
            open_position: DEFAULT_OPEN_POSITION,
            locked_position: DEFAULT_LOCKED_POSITION,
            repeat_policy: RepeatPolicy::default(),
            reader_backend: DeviceBackend::default(),
            actuator_backend: DeviceBackend::default(),
        }
    }
}

impl ControllerConfig {
    /// Validate into the settings the controller runs with.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfig` if no credential is set, and
    /// `Error::PositionOutOfRange` if either servo position is invalid.
    pub fn settings(&self) -> Result<ControllerSettings> {
        let credential = self
            .credential
            .clone()
            .ok_or_else(|| Error::MissingConfig("credential".to_string()))?;

        Ok(ControllerSettings {
            credential,
            channel: ServoChannel::new(self.channel),
            open_position: ServoPosition::new(self.open_position)?,
            locked_position: ServoPosition::new(self.locked_position)?,
            repeat_policy: self.repeat_policy,
            attach_timeout: Duration::from_millis(self.attach_timeout_ms),
        })
    }
}

/// Validated controller settings.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub credential: Credential,
    pub channel: ServoChannel,
    pub open_position: ServoPosition,
    pub locked_position: ServoPosition,
    pub repeat_policy: RepeatPolicy,
    pub attach_timeout: Duration,
}

impl ControllerSettings {
    /// Settings with default positions, channel and timeout.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            channel: ServoChannel::default(),
            open_position: ServoPosition::DEFAULT_OPEN,
            locked_position: ServoPosition::DEFAULT_LOCKED,
            repeat_policy: RepeatPolicy::default(),
            attach_timeout: Duration::from_millis(DEFAULT_ATTACH_TIMEOUT_MS),
        }
    }

    pub fn with_repeat_policy(mut self, policy: RepeatPolicy) -> Self {
        self.repeat_policy = policy;
        self
    }

    pub fn with_attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    /// Servo position commanded for a lock state.
    pub fn position_for(&self, state: LockState) -> ServoPosition {
        match state {
            LockState::Locked => self.locked_position,
            LockState::Unlocked => self.open_position,
        }
    }
}
