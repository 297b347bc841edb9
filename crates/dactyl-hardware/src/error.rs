//! Error types reported by the sensor driver collaborator.
//!
//! These are driver statuses, not the caller-facing taxonomy. The session
//! translates them into [`dactyl_core::Error`] at each call site.

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Non-success statuses a sensor driver can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// No supported device was found by the driver.
    #[error("Device not found")]
    DeviceNotFound,

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The driver rejected an argument.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The host denied access to the device.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Vendor status code with no dedicated variant.
    #[error("Driver error {code}: {message}")]
    Driver { code: i64, message: String },

    /// USB transport error.
    #[error("USB error: {0}")]
    Usb(String),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl SensorError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a new permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a new vendor status error.
    pub fn driver(code: i64, message: impl Into<String>) -> Self {
        Self::Driver {
            code,
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// True for the "device not found" status returned by driver init.
    pub fn is_device_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound)
    }
}

#[cfg(feature = "hardware-usb")]
impl From<rusb::Error> for SensorError {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::NoDevice | rusb::Error::NotFound => Self::DeviceNotFound,
            rusb::Error::Access => Self::permission_denied(error.to_string()),
            rusb::Error::Timeout => Self::timeout(0),
            other => Self::Usb(other.to_string()),
        }
    }
}
