//! libusb-backed USB host.
//!
//! Finds attached sensors by vendor id and probes access rights by opening
//! the device. On Linux, access is granted through udev rules rather than at
//! runtime, so a permission request only logs what the operator must do.

use dactyl_core::constants::SECUGEN_VENDOR_ID;
use rusb::UsbContext;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::UsbHost;
use crate::types::UsbDevice;

/// USB host backed by the global libusb context.
#[derive(Debug, Clone)]
pub struct RusbHost {
    vendor_id: u16,
}

impl Default for RusbHost {
    fn default() -> Self {
        Self::new(SECUGEN_VENDOR_ID)
    }
}

impl RusbHost {
    /// Look for devices from `vendor_id`.
    pub fn new(vendor_id: u16) -> Self {
        Self { vendor_id }
    }

    /// All attached devices from the configured vendor.
    ///
    /// # Errors
    ///
    /// Returns an error if the device list cannot be read.
    pub fn list_devices(&self) -> Result<Vec<UsbDevice>> {
        let context = rusb::GlobalContext::default();
        let mut found = Vec::new();

        for device in context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    debug!("Skipping device without descriptor: {}", e);
                    continue;
                }
            };

            if descriptor.vendor_id() == self.vendor_id {
                found.push(
                    UsbDevice::new(descriptor.vendor_id(), descriptor.product_id())
                        .at(device.bus_number(), device.address()),
                );
            }
        }

        Ok(found)
    }

    fn find(&self, target: &UsbDevice) -> Option<rusb::Device<rusb::GlobalContext>> {
        let devices = rusb::devices().ok()?;
        devices.iter().find(|device| {
            device.bus_number() == target.bus_number && device.address() == target.address
        })
    }
}

impl UsbHost for RusbHost {
    fn attached_device(&self) -> Option<UsbDevice> {
        match self.list_devices() {
            Ok(devices) => devices.into_iter().next(),
            Err(e) => {
                warn!("Failed to enumerate USB devices: {}", e);
                None
            }
        }
    }

    fn has_permission(&self, device: &UsbDevice) -> bool {
        let Some(usb) = self.find(device) else {
            return false;
        };

        match usb.open() {
            Ok(_handle) => true,
            Err(rusb::Error::Access) => false,
            Err(e) => {
                debug!(%device, "Probe open failed: {}", e);
                false
            }
        }
    }

    fn request_permission(&self, device: &UsbDevice) {
        warn!(
            %device,
            "USB access denied; add a udev rule for vendor {:04x} and replug the sensor",
            device.vendor_id
        );
    }
}
