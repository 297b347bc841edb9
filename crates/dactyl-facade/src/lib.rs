//! Application-facing command surface for the dactyl fingerprint stack.
//!
//! [`CommandFacade`] owns one [`dactyl_session::DeviceSession`], serializes
//! access to it, and maps every outcome to a [`CommandError`] carrying a
//! stable wire code. Captures return the template, a PNG preview and the
//! quality as a 4-byte big-endian integer.
//!
//! # Example
//!
//! ```
//! use dactyl_facade::{CommandFacade, FacadeConfig};
//! use dactyl_hardware::mock::{MockSensor, MockUsbHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dactyl_facade::CommandError> {
//!     let (sensor, _handle) = MockSensor::new();
//!     let (usb, _usb_handle) = MockUsbHost::with_permission();
//!     let facade = CommandFacade::new(sensor, Some(usb), FacadeConfig::default());
//!
//!     facade.initialize_device().await?;
//!     let captured = facade.capture_fingerprint_with_quality(5_000, 50, false).await?;
//!     let matched = facade
//!         .verify_fingerprint(&captured.template, &captured.template)
//!         .await?;
//!     assert!(matched);
//!
//!     facade.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod facade;
pub mod preview;

pub use command::{CapturedFingerprint, Command, CommandError, CommandResult, Response};
pub use config::{ConfigError, FacadeConfig, PreviewCompression, PreviewConfig};
pub use facade::CommandFacade;
pub use preview::{PngPreviewEncoder, PreviewEncoder, PreviewError};
