use crate::{
    Result,
    constants::{
        AUDIT_FLAG_LOCKED, AUDIT_FLAG_UNLOCKED, AUDIT_TIMESTAMP_FORMAT, DEFAULT_LOCKED_POSITION,
        DEFAULT_OPEN_POSITION, DEFAULT_SERVO_CHANNEL, MAX_SERVO_POSITION, MIN_SERVO_POSITION,
    },
    error::Error,
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Tag identifier reported by the proximity reader.
///
/// The value is opaque: the reader reports it as a decimal string and the
/// controller only ever compares it for exact equality. It is stored byte
/// for byte as reported; only an empty identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagId(String);

impl TagId {
    /// Create a new tag identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidTag` if the identifier is empty.
    pub fn new(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::InvalidTag("tag identifier cannot be empty".to_string()));
        }
        Ok(TagId(id.to_string()))
    }

    /// Get the tag identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagId::new(s)
    }
}

impl TryFrom<String> for TagId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TagId::new(&value)
    }
}

impl From<TagId> for String {
    fn from(tag: TagId) -> Self {
        tag.0
    }
}

/// The single authorized tag identifier.
///
/// # Security
/// Matching uses constant-time comparison so a presented tag cannot be
/// guessed byte by byte from response timing. `Debug` output is redacted.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Credential(String);

impl Credential {
    /// Create a new credential with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if the value is empty.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::InvalidCredential(
                "credential cannot be empty".to_string(),
            ));
        }
        Ok(Credential(secret.to_string()))
    }

    /// Check whether a presented tag is the authorized one.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_core::{Credential, TagId};
    ///
    /// let credential = Credential::new("4742006").unwrap();
    /// assert!(credential.matches(&TagId::new("4742006").unwrap()));
    /// assert!(!credential.matches(&TagId::new("9999999").unwrap()));
    /// ```
    #[must_use]
    pub fn matches(&self, tag: &TagId) -> bool {
        self.0.as_bytes().ct_eq(tag.as_str().as_bytes()).into()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

impl std::str::FromStr for Credential {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Credential::new(s)
    }
}

impl TryFrom<String> for Credential {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Credential::new(&value)
    }
}

/// Commanded state of the door lock.
///
/// This records the last command sent to the actuator. The actuator
/// position is never read back, so it is the intended state rather than a
/// verified one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
}

impl LockState {
    /// Flag written to the audit trail: `1` locked, `0` unlocked.
    #[inline]
    #[must_use]
    pub fn as_audit_flag(self) -> u8 {
        match self {
            LockState::Locked => AUDIT_FLAG_LOCKED,
            LockState::Unlocked => AUDIT_FLAG_UNLOCKED,
        }
    }

    /// Parse an audit trail flag.
    ///
    /// # Errors
    /// Returns `Error::InvalidLockFlag` for anything other than `0` or `1`.
    pub fn from_audit_flag(flag: u8) -> Result<Self> {
        match flag {
            AUDIT_FLAG_LOCKED => Ok(LockState::Locked),
            AUDIT_FLAG_UNLOCKED => Ok(LockState::Unlocked),
            other => Err(Error::InvalidLockFlag(other)),
        }
    }

    /// Returns `true` if the door is locked.
    #[inline]
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, LockState::Locked)
    }

    /// Label shown on the operator display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            LockState::Locked => "LOCKED",
            LockState::Unlocked => "UNLOCKED",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Locked => write!(f, "Locked"),
            LockState::Unlocked => write!(f, "Unlocked"),
        }
    }
}

/// Servo board channel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServoChannel(u8);

impl ServoChannel {
    #[must_use]
    pub fn new(index: u8) -> Self {
        ServoChannel(index)
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }
}

impl Default for ServoChannel {
    fn default() -> Self {
        ServoChannel(DEFAULT_SERVO_CHANNEL)
    }
}

impl fmt::Display for ServoChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Servo position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ServoPosition(f64);

impl ServoPosition {
    /// Factory open position.
    pub const DEFAULT_OPEN: ServoPosition = ServoPosition(DEFAULT_OPEN_POSITION);

    /// Factory locked position.
    pub const DEFAULT_LOCKED: ServoPosition = ServoPosition(DEFAULT_LOCKED_POSITION);

    /// Create a new position with range validation.
    ///
    /// # Errors
    /// Returns `Error::PositionOutOfRange` if the value is not finite or lies
    /// outside `MIN_SERVO_POSITION..=MAX_SERVO_POSITION`.
    pub fn new(degrees: f64) -> Result<Self> {
        if !degrees.is_finite() || !(MIN_SERVO_POSITION..=MAX_SERVO_POSITION).contains(&degrees) {
            return Err(Error::PositionOutOfRange {
                position: degrees,
                min: MIN_SERVO_POSITION,
                max: MAX_SERVO_POSITION,
            });
        }
        Ok(ServoPosition(degrees))
    }

    #[must_use]
    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ServoPosition {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        ServoPosition::new(value)
    }
}

impl From<ServoPosition> for f64 {
    fn from(position: ServoPosition) -> Self {
        position.0
    }
}

impl fmt::Display for ServoPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of controller status written to the audit trail.
///
/// One record is produced per status check. Records are handed to the
/// audit sink immediately; nothing is kept in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Wall-clock time of the check.
    pub timestamp: DateTime<Local>,

    /// Last tag seen by the reader, if any.
    pub last_seen_tag: Option<TagId>,

    /// Commanded lock state at the time of the check.
    pub lock_state: LockState,
}

impl AuditRecord {
    /// Create a record stamped with the current local time.
    pub fn now(last_seen_tag: Option<TagId>, lock_state: LockState) -> Self {
        Self::at(Local::now(), last_seen_tag, lock_state)
    }

    /// Create a record with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Local>,
        last_seen_tag: Option<TagId>,
        lock_state: LockState,
    ) -> Self {
        Self {
            timestamp,
            last_seen_tag,
            lock_state,
        }
    }

    /// Timestamp in the audit trail layout (`YYYY-MM-DD HH:MM:SS`).
    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(AUDIT_TIMESTAMP_FORMAT).to_string()
    }

    /// Last seen tag as written to the trail; empty when no tag was seen.
    #[must_use]
    pub fn tag_field(&self) -> &str {
        self.last_seen_tag.as_ref().map_or("", TagId::as_str)
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Current Status ({}) [tag - locked]: {} - {}",
            self.formatted_timestamp(),
            self.tag_field(),
            self.lock_state.as_audit_flag()
        )
    }
}

/// Display-facing view of the controller.
///
/// Published to subscribers whenever the tag, lock state or antenna changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub last_seen_tag: Option<TagId>,
    pub lock_state: LockState,
    pub antenna_on: bool,
}

impl StatusSnapshot {
    /// Tag label text, e.g. `RFID Tag: 4742006`.
    #[must_use]
    pub fn tag_label(&self) -> String {
        match &self.last_seen_tag {
            Some(tag) => format!("RFID Tag: {tag}"),
            None => "RFID Tag: ".to_string(),
        }
    }
}
