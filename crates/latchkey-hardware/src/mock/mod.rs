//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod actuator;
pub mod reader;

// Re-export commonly used types
pub use actuator::{MOCK_SERVO_CHANNELS, MockActuator, MockActuatorHandle};
pub use reader::{MockTagReader, MockTagReaderHandle};
