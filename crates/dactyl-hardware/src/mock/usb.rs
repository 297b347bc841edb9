//! Mock USB host for testing permission flows.

use std::sync::Arc;

use dactyl_core::constants::SECUGEN_VENDOR_ID;
use parking_lot::Mutex;
use tracing::debug;

use crate::traits::UsbHost;
use crate::types::UsbDevice;

/// Product id reported by the default mock device (Hamster Pro 20).
pub const MOCK_PRODUCT_ID: u16 = 0x2201;

#[derive(Debug, Default)]
struct UsbState {
    device: Option<UsbDevice>,
    permission: bool,
    grant_on_request: bool,
    requests: Vec<UsbDevice>,
}

/// Mock host USB subsystem.
///
/// Starts with a SecuGen device attached and no permission granted.
///
/// # Examples
///
/// ```
/// use dactyl_hardware::mock::MockUsbHost;
/// use dactyl_hardware::traits::UsbHost;
///
/// let (usb, handle) = MockUsbHost::new();
/// let device = usb.attached_device().unwrap();
/// assert!(!usb.has_permission(&device));
///
/// usb.request_permission(&device);
/// assert_eq!(handle.permission_requests(), 1);
///
/// handle.grant_permission();
/// assert!(usb.has_permission(&device));
/// ```
#[derive(Debug)]
pub struct MockUsbHost {
    state: Arc<Mutex<UsbState>>,
}

impl MockUsbHost {
    /// Create a host with the default device attached and no permission.
    pub fn new() -> (Self, MockUsbHandle) {
        Self::with_device(Some(UsbDevice::new(SECUGEN_VENDOR_ID, MOCK_PRODUCT_ID).at(1, 2)))
    }

    /// Create a host with the default device attached and permission granted.
    pub fn with_permission() -> (Self, MockUsbHandle) {
        let (host, handle) = Self::new();
        handle.grant_permission();
        (host, handle)
    }

    /// Create a host with `device` attached, or nothing attached.
    pub fn with_device(device: Option<UsbDevice>) -> (Self, MockUsbHandle) {
        let state = Arc::new(Mutex::new(UsbState {
            device,
            ..UsbState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockUsbHandle { state },
        )
    }
}

impl UsbHost for MockUsbHost {
    fn attached_device(&self) -> Option<UsbDevice> {
        self.state.lock().device.clone()
    }

    fn has_permission(&self, device: &UsbDevice) -> bool {
        let state = self.state.lock();
        state.permission && state.device.as_ref() == Some(device)
    }

    fn request_permission(&self, device: &UsbDevice) {
        let mut state = self.state.lock();
        debug!(%device, "mock permission request");
        state.requests.push(device.clone());
        if state.grant_on_request {
            state.permission = true;
        }
    }
}

/// Handle for controlling a [`MockUsbHost`].
#[derive(Debug, Clone)]
pub struct MockUsbHandle {
    state: Arc<Mutex<UsbState>>,
}

impl MockUsbHandle {
    pub fn attach(&self, device: UsbDevice) {
        self.state.lock().device = Some(device);
    }

    /// Unplug the device; permission is dropped with it.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.device = None;
        state.permission = false;
    }

    pub fn grant_permission(&self) {
        self.state.lock().permission = true;
    }

    pub fn revoke_permission(&self) {
        self.state.lock().permission = false;
    }

    /// Grant permission as soon as it is requested, like a user tapping "allow".
    pub fn grant_on_request(&self, grant: bool) {
        self.state.lock().grant_on_request = grant;
    }

    pub fn permission_requests(&self) -> usize {
        self.state.lock().requests.len()
    }
}
