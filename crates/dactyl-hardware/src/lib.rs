//! Sensor capability layer for the dactyl fingerprint stack.
//!
//! This crate defines the narrow contract the session uses to reach the
//! vendor driver and the host USB subsystem, plus mock implementations that
//! make the whole stack testable without hardware.
//!
//! # Design Philosophy
//!
//! - **Async-first**: driver calls are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT), so a slow acquisition is a
//!   suspension point rather than a blocked runtime thread.
//! - **No policy**: the traits map vendor entry points one to one. State
//!   checks, quality gating and error translation belong to the session.
//! - **Thread-safe**: both traits require `Send + Sync`.
//!
//! # Capabilities
//!
//! - [`SensorCapability`]: open/close, acquisition, quality, templates,
//!   matching, LED and brightness.
//! - [`UsbHost`]: attached-device lookup and permission handling.
//!
//! # Example
//!
//! ```no_run
//! use dactyl_hardware::traits::SensorCapability;
//! use dactyl_hardware::Result;
//! use dactyl_core::SecurityLevel;
//!
//! async fn same_finger<S: SensorCapability>(sensor: &S, a: &[u8], b: &[u8]) -> Result<bool> {
//!     sensor.match_template(a, b, SecurityLevel::Normal).await
//! }
//! ```
//!
//! [`SensorCapability`]: traits::SensorCapability
//! [`UsbHost`]: traits::UsbHost

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

#[cfg(feature = "hardware-usb")]
pub mod usb;

// Re-export commonly used types for convenience
pub use devices::{AnySensor, AnyUsbHost};
pub use error::{Result, SensorError};
pub use traits::{SensorCapability, UsbHost};
pub use types::{DeviceClass, DeviceInfo, UsbDevice};

#[cfg(feature = "hardware-usb")]
pub use usb::RusbHost;
