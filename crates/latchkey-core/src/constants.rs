//! Core constants for the single-door lock controller.
//!
//! Values here reproduce the behaviour of the servo/RFID rig the controller
//! was first built for: a hobby servo on channel 0 of an advanced servo board
//! and a 125 kHz proximity reader reporting decimal tag identifiers.
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//! use std::time::Duration;
//!
//! let timeout = Duration::from_millis(DEFAULT_ATTACH_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 10);
//! assert!(DEFAULT_OPEN_POSITION > DEFAULT_LOCKED_POSITION);
//! ```

// ============================================================================
// Actuator
// ============================================================================

/// Servo channel driving the bolt.
pub const DEFAULT_SERVO_CHANNEL: u8 = 0;

/// Servo position (degrees) that retracts the bolt.
pub const DEFAULT_OPEN_POSITION: f64 = 110.0;

/// Servo position (degrees) that throws the bolt.
pub const DEFAULT_LOCKED_POSITION: f64 = 50.0;

/// Lowest position accepted by the servo board.
pub const MIN_SERVO_POSITION: f64 = 0.0;

/// Highest position accepted by the servo board.
pub const MAX_SERVO_POSITION: f64 = 180.0;

// ============================================================================
// Lifecycle
// ============================================================================

/// How long device attachment may take before startup is aborted.
pub const DEFAULT_ATTACH_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the device event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// Capacity of the operator command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Device events handled back to back before pending commands get a turn.
pub const EVENT_BATCH_LIMIT: usize = 32;

// ============================================================================
// Audit
// ============================================================================

/// Default audit trail file, relative to the working directory.
pub const DEFAULT_AUDIT_PATH: &str = "DataDump.csv";

/// Field delimiter of the audit trail.
pub const AUDIT_DELIMITER: char = ',';

/// Timestamp layout of audit records (local time).
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Audit flag written for [`LockState::Locked`](crate::LockState::Locked).
pub const AUDIT_FLAG_LOCKED: u8 = 1;

/// Audit flag written for [`LockState::Unlocked`](crate::LockState::Unlocked).
pub const AUDIT_FLAG_UNLOCKED: u8 = 0;
