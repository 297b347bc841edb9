//! Mock implementations for testing and development.
//!
//! This module provides a simulated sensor driver and a simulated USB host
//! that can be scripted programmatically without physical hardware.

pub mod sensor;
pub mod usb;

// Re-export commonly used types
pub use sensor::{MockSensor, MockSensorHandle, SensorCall, SensorOp};
pub use usb::{MockUsbHandle, MockUsbHost};
