//! Error taxonomy for fingerprint sensor operations.
//!
//! Every public operation in the stack resolves either to a success value or
//! to exactly one of the kinds below. Driver-level failures are translated
//! into this taxonomy at the session boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No USB subsystem is available, or the attached device is unrecognized.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Driver initialization failed for a reason other than "not found".
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No device present, USB permission not yet granted, or open failed.
    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    /// Auto capture requested while the smart capture policy is off.
    #[error("Smart capture disabled: {0}")]
    SmartCaptureDisabled(String),

    /// Capture timed out, the sensor reported failure, or quality was too low.
    #[error("No fingerprint detected: {0}")]
    NoFingerprintDetected(String),

    #[error("Template creation failed: {0}")]
    TemplateCreationFailed(String),

    #[error("Template matching failed: {0}")]
    TemplateMatchingFailed(String),

    /// Operation requires a ready session.
    #[error("Not initialized: {0}")]
    NotInitialized(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify this error into its taxonomy kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::InitializationFailed(_) => ErrorKind::InitializationFailed,
            Self::SensorNotFound(_) => ErrorKind::SensorNotFound,
            Self::SmartCaptureDisabled(_) => ErrorKind::SmartCaptureDisabled,
            Self::NoFingerprintDetected(_) => ErrorKind::NoFingerprintDetected,
            Self::TemplateCreationFailed(_) => ErrorKind::TemplateCreationFailed,
            Self::TemplateMatchingFailed(_) => ErrorKind::TemplateMatchingFailed,
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
        }
    }

    /// The human-readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotSupported(m)
            | Self::InitializationFailed(m)
            | Self::SensorNotFound(m)
            | Self::SmartCaptureDisabled(m)
            | Self::NoFingerprintDetected(m)
            | Self::TemplateCreationFailed(m)
            | Self::TemplateMatchingFailed(m)
            | Self::NotInitialized(m) => m,
        }
    }

    /// Stable wire code for this error, see [`ErrorKind::code`].
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn not_initialized() -> Self {
        Self::NotInitialized("Device not initialized".to_string())
    }
}

/// Discriminant of [`Error`] without the message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotSupported,
    InitializationFailed,
    SensorNotFound,
    SmartCaptureDisabled,
    #[serde(rename = "NO_FINGERPRINT")]
    NoFingerprintDetected,
    TemplateCreationFailed,
    TemplateMatchingFailed,
    NotInitialized,
}

impl ErrorKind {
    /// Wire code reported to the application layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use dactyl_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::NoFingerprintDetected.code(), "NO_FINGERPRINT");
    /// ```
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotSupported => "NOT_SUPPORTED",
            Self::InitializationFailed => "INITIALIZATION_FAILED",
            Self::SensorNotFound => "SENSOR_NOT_FOUND",
            Self::SmartCaptureDisabled => "SMART_CAPTURE_DISABLED",
            Self::NoFingerprintDetected => "NO_FINGERPRINT",
            Self::TemplateCreationFailed => "TEMPLATE_CREATION_FAILED",
            Self::TemplateMatchingFailed => "TEMPLATE_MATCHING_FAILED",
            Self::NotInitialized => "NOT_INITIALIZED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::NotSupported("x".into()), ErrorKind::NotSupported, "NOT_SUPPORTED")]
    #[case(
        Error::InitializationFailed("x".into()),
        ErrorKind::InitializationFailed,
        "INITIALIZATION_FAILED"
    )]
    #[case(Error::SensorNotFound("x".into()), ErrorKind::SensorNotFound, "SENSOR_NOT_FOUND")]
    #[case(
        Error::SmartCaptureDisabled("x".into()),
        ErrorKind::SmartCaptureDisabled,
        "SMART_CAPTURE_DISABLED"
    )]
    #[case(
        Error::NoFingerprintDetected("x".into()),
        ErrorKind::NoFingerprintDetected,
        "NO_FINGERPRINT"
    )]
    #[case(
        Error::TemplateCreationFailed("x".into()),
        ErrorKind::TemplateCreationFailed,
        "TEMPLATE_CREATION_FAILED"
    )]
    #[case(
        Error::TemplateMatchingFailed("x".into()),
        ErrorKind::TemplateMatchingFailed,
        "TEMPLATE_MATCHING_FAILED"
    )]
    #[case(Error::NotInitialized("x".into()), ErrorKind::NotInitialized, "NOT_INITIALIZED")]
    fn test_kind_and_code(#[case] error: Error, #[case] kind: ErrorKind, #[case] code: &str) {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.code(), code);
        assert_eq!(error.message(), "x");
    }

    #[test]
    fn test_error_display() {
        let error = Error::SensorNotFound("USB permission required".to_string());
        assert_eq!(error.to_string(), "Sensor not found: USB permission required");
    }

    #[test]
    fn test_not_initialized_helper() {
        let error = Error::not_initialized();
        assert_eq!(error.kind(), ErrorKind::NotInitialized);
        assert_eq!(error.message(), "Device not initialized");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::TemplateMatchingFailed).unwrap();
        assert_eq!(json, "\"TEMPLATE_MATCHING_FAILED\"");

        let json = serde_json::to_string(&ErrorKind::NoFingerprintDetected).unwrap();
        assert_eq!(json, "\"NO_FINGERPRINT\"");
    }
}
