//! Capability traits for the sensor driver and the host USB subsystem.
//!
//! These traits are the narrow contract between the session and the vendor
//! collaborator. They carry no policy: ordering, state checks, quality
//! gating and error translation all live in the session.
//!
//! All driver calls use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). A blocking vendor call must be wrapped so it does not stall the
//! runtime, for example with `tokio::task::spawn_blocking`.

#![allow(async_fn_in_trait)]

use dactyl_core::{SecurityLevel, TemplateFormat, TemplateMetadata};

use crate::error::Result;
use crate::types::{DeviceClass, DeviceInfo, UsbDevice};

/// Fingerprint sensor driver abstraction.
///
/// Implementations wrap the vendor library. Every method maps one vendor
/// entry point; non-success statuses surface as [`SensorError`](crate::SensorError).
///
/// # Dynamic Dispatch
///
/// Native async methods are not object-safe. Use
/// [`AnySensor`](crate::devices::AnySensor) where a single concrete type is
/// needed across implementations.
///
/// # Examples
///
/// ```no_run
/// use dactyl_hardware::traits::SensorCapability;
/// use dactyl_hardware::Result;
///
/// async fn grab<S: SensorCapability>(sensor: &mut S) -> Result<(Vec<u8>, u32)> {
///     let info = sensor.get_device_info().await?;
///     let mut buffer = vec![0u8; info.geometry().pixel_count()];
///     sensor.get_image(&mut buffer, 10_000).await?;
///     let quality = sensor
///         .get_image_quality(info.image_width, info.image_height, &buffer)
///         .await?;
///     Ok((buffer, quality))
/// }
/// ```
pub trait SensorCapability: Send + Sync {
    /// Initialize the driver library for a device family.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` when the attached family is unsupported.
    async fn init(&mut self, class: DeviceClass) -> Result<()>;

    /// Open the physical device at `device_index`.
    async fn open(&mut self, device_index: u32) -> Result<()>;

    /// Close the physical device. Closing a closed device is not an error.
    async fn close(&mut self) -> Result<()>;

    async fn get_device_info(&self) -> Result<DeviceInfo>;

    async fn set_template_format(&mut self, format: TemplateFormat) -> Result<()>;

    /// Send a raw vendor command.
    async fn write_raw_command(&mut self, code: u8, value: u8) -> Result<()>;

    /// Acquire one frame into `buffer`, waiting at most `timeout_ms`.
    ///
    /// `buffer` is sized exactly to the device geometry.
    ///
    /// # Cancel Safety
    ///
    /// The session drops this future when the driver overruns its own
    /// timeout and then accepts the next capture. Implementations must
    /// abort or release the vendor call when dropped, so that no
    /// acquisition is still running on the handle afterwards. A blocking
    /// call moved to `spawn_blocking` keeps running after the drop and
    /// must be paired with a vendor abort before the future completes.
    async fn get_image(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<()>;

    /// Score an acquired frame on a 0-100 scale.
    async fn get_image_quality(&self, width: u32, height: u32, buffer: &[u8]) -> Result<u32>;

    async fn get_max_template_size(&self) -> Result<usize>;

    /// Extract a template from `image` into `template`.
    ///
    /// `template` is sized to [`get_max_template_size`](Self::get_max_template_size).
    async fn create_template(
        &mut self,
        metadata: &TemplateMetadata,
        image: &[u8],
        template: &mut [u8],
    ) -> Result<()>;

    /// Decide whether two templates come from the same finger.
    async fn match_template(
        &self,
        first: &[u8],
        second: &[u8],
        level: SecurityLevel,
    ) -> Result<bool>;

    /// Similarity score of `first` against `second` on the driver's scale.
    async fn get_matching_score(&self, first: &[u8], second: &[u8]) -> Result<i32>;

    async fn set_led_on(&mut self, on: bool) -> Result<()>;

    async fn set_brightness(&mut self, level: i32) -> Result<()>;
}

/// Host USB subsystem: device lookup and access permission.
///
/// Permission is granted asynchronously by the host; `request_permission`
/// only issues the request.
pub trait UsbHost: Send + Sync {
    /// The attached sensor, if any.
    fn attached_device(&self) -> Option<UsbDevice>;

    fn has_permission(&self, device: &UsbDevice) -> bool;

    fn request_permission(&self, device: &UsbDevice);
}

impl<T: UsbHost + ?Sized> UsbHost for std::sync::Arc<T> {
    fn attached_device(&self) -> Option<UsbDevice> {
        (**self).attached_device()
    }

    fn has_permission(&self, device: &UsbDevice) -> bool {
        (**self).has_permission(device)
    }

    fn request_permission(&self, device: &UsbDevice) {
        (**self).request_permission(device)
    }
}
