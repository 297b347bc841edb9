//! Enum wrappers for driver and USB host dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so
//! `Box<dyn SensorCapability>` is not available. These enums give the
//! facade and the CLI a single concrete type per collaborator while keeping
//! static dispatch underneath.
//!
//! # Examples
//!
//! ```
//! use dactyl_hardware::devices::{AnySensor, AnyUsbHost};
//! use dactyl_hardware::mock::{MockSensor, MockUsbHost};
//!
//! let (sensor, _handle) = MockSensor::new();
//! let (usb, _usb_handle) = MockUsbHost::with_permission();
//!
//! let sensor = AnySensor::Mock(sensor);
//! let usb = AnyUsbHost::Mock(usb);
//! ```

use dactyl_core::{SecurityLevel, TemplateFormat, TemplateMetadata};

use crate::mock::{MockSensor, MockUsbHost};
use crate::traits::{SensorCapability, UsbHost};
use crate::types::{DeviceClass, DeviceInfo, UsbDevice};
use crate::Result;

#[cfg(feature = "hardware-usb")]
use crate::usb::RusbHost;

/// Enum wrapper for sensor driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySensor {
    /// Mock driver for development and testing.
    Mock(MockSensor),
}

impl SensorCapability for AnySensor {
    async fn init(&mut self, class: DeviceClass) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.init(class).await,
        }
    }

    async fn open(&mut self, device_index: u32) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.open(device_index).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.close().await,
        }
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(sensor) => sensor.get_device_info().await,
        }
    }

    async fn set_template_format(&mut self, format: TemplateFormat) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.set_template_format(format).await,
        }
    }

    async fn write_raw_command(&mut self, code: u8, value: u8) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.write_raw_command(code, value).await,
        }
    }

    async fn get_image(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.get_image(buffer, timeout_ms).await,
        }
    }

    async fn get_image_quality(&self, width: u32, height: u32, buffer: &[u8]) -> Result<u32> {
        match self {
            Self::Mock(sensor) => sensor.get_image_quality(width, height, buffer).await,
        }
    }

    async fn get_max_template_size(&self) -> Result<usize> {
        match self {
            Self::Mock(sensor) => sensor.get_max_template_size().await,
        }
    }

    async fn create_template(
        &mut self,
        metadata: &TemplateMetadata,
        image: &[u8],
        template: &mut [u8],
    ) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.create_template(metadata, image, template).await,
        }
    }

    async fn match_template(
        &self,
        first: &[u8],
        second: &[u8],
        level: SecurityLevel,
    ) -> Result<bool> {
        match self {
            Self::Mock(sensor) => sensor.match_template(first, second, level).await,
        }
    }

    async fn get_matching_score(&self, first: &[u8], second: &[u8]) -> Result<i32> {
        match self {
            Self::Mock(sensor) => sensor.get_matching_score(first, second).await,
        }
    }

    async fn set_led_on(&mut self, on: bool) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.set_led_on(on).await,
        }
    }

    async fn set_brightness(&mut self, level: i32) -> Result<()> {
        match self {
            Self::Mock(sensor) => sensor.set_brightness(level).await,
        }
    }
}

/// Enum wrapper for USB host dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyUsbHost {
    /// Mock host for development and testing.
    Mock(MockUsbHost),

    /// libusb-backed host.
    #[cfg(feature = "hardware-usb")]
    Rusb(RusbHost),
}

impl UsbHost for AnyUsbHost {
    fn attached_device(&self) -> Option<UsbDevice> {
        match self {
            Self::Mock(host) => host.attached_device(),
            #[cfg(feature = "hardware-usb")]
            Self::Rusb(host) => host.attached_device(),
        }
    }

    fn has_permission(&self, device: &UsbDevice) -> bool {
        match self {
            Self::Mock(host) => host.has_permission(device),
            #[cfg(feature = "hardware-usb")]
            Self::Rusb(host) => host.has_permission(device),
        }
    }

    fn request_permission(&self, device: &UsbDevice) {
        match self {
            Self::Mock(host) => host.request_permission(device),
            #[cfg(feature = "hardware-usb")]
            Self::Rusb(host) => host.request_permission(device),
        }
    }
}
