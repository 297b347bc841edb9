//! Device session, capture pipeline and template engine for fingerprint
//! sensors.
//!
//! This crate enforces the protocol around a vendor sensor driver: the
//! session lifecycle, bounded acquisition with quality gating, and template
//! creation and matching. The driver itself is reached only through
//! [`dactyl_hardware::SensorCapability`].
//!
//! # Components
//!
//! - [`DeviceSession`]: lifecycle state machine (see [`SessionState`])
//! - [`CaptureRequest`] and `DeviceSession::capture`: the capture pipeline
//! - `DeviceSession::create_template`, `verify`, `score`: the template engine
//!
//! # Example
//!
//! ```
//! use dactyl_hardware::mock::{MockSensor, MockUsbHost};
//! use dactyl_session::{CaptureRequest, DeviceSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> dactyl_core::Result<()> {
//!     let (sensor, _handle) = MockSensor::new();
//!     let (usb, _usb_handle) = MockUsbHost::with_permission();
//!     let mut session = DeviceSession::new(sensor, Some(usb), SessionConfig::default());
//!
//!     session.initialize().await?;
//!     let image = session.capture(&CaptureRequest::with_quality(5_000, 50, false)).await?;
//!     let template = session.create_template(&image).await?;
//!     assert!(session.verify(template.as_bytes(), template.as_bytes()).await?);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod session;
pub mod state;
pub mod template;

pub use capture::CaptureRequest;
pub use config::SessionConfig;
pub use session::{DeviceSession, Initialization};
pub use state::{SessionState, StateTransition};
