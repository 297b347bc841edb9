//! Driver-side types exchanged through the capability traits.

use std::fmt;

use dactyl_core::ImageGeometry;
use serde::{Deserialize, Serialize};

/// Device family requested when the driver is initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Let the driver detect the attached family.
    #[default]
    Auto,
    Fdu03,
    Fdu04,
    Fdu05,
    Fdu06,
    Fdu07,
}

/// Information returned by the driver for an open device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub image_width: u32,
    pub image_height: u32,

    /// Image resolution in dots per inch, when reported.
    pub image_dpi: Option<u32>,

    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            image_dpi: None,
            serial_number: None,
            firmware_version: None,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.image_dpi = Some(dpi);
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }

    pub fn geometry(&self) -> ImageGeometry {
        ImageGeometry::new(self.image_width, self.image_height)
    }
}

/// A USB device as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
}

impl UsbDevice {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            bus_number: 0,
            address: 0,
        }
    }

    pub fn at(mut self, bus_number: u8, address: u8) -> Self {
        self.bus_number = bus_number;
        self.address = address;
        self
    }
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {:03} addr {:03})",
            self.vendor_id, self.product_id, self.bus_number, self.address
        )
    }
}
