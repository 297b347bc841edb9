//! Request and response types exchanged with the application layer.
//!
//! One [`Command`] variant exists per facade operation. Every command
//! resolves to a [`Response`] or a [`CommandError`] carrying one of the
//! stable wire codes from [`ErrorKind::code`].

use std::fmt;

use bytes::Bytes;
use dactyl_core::constants::QUALITY_WIRE_BYTES;
use dactyl_core::{Error, ErrorKind, MatchResult};
use serde::{Deserialize, Serialize};

/// External request, one per facade operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    InitializeDevice,
    ToggleLed {
        enabled: bool,
    },
    ToggleSmartCapture {
        enabled: bool,
    },
    SetBrightness {
        level: i32,
    },
    CaptureFingerprint {
        auto: bool,
    },
    CaptureFingerprintWithQuality {
        timeout_ms: u32,
        min_quality: u32,
        auto: bool,
    },
    VerifyFingerprint {
        first: Bytes,
        second: Bytes,
    },
    GetMatchingScore {
        first: Bytes,
        second: Bytes,
    },
}

impl Command {
    /// Snake-case operation name, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeDevice => "initialize_device",
            Self::ToggleLed { .. } => "toggle_led",
            Self::ToggleSmartCapture { .. } => "toggle_smart_capture",
            Self::SetBrightness { .. } => "set_brightness",
            Self::CaptureFingerprint { .. } => "capture_fingerprint",
            Self::CaptureFingerprintWithQuality { .. } => "capture_fingerprint_with_quality",
            Self::VerifyFingerprint { .. } => "verify_fingerprint",
            Self::GetMatchingScore { .. } => "get_matching_score",
        }
    }
}

/// Result of a successful capture: template, preview and quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFingerprint {
    /// Template bytes exactly as written by the driver.
    pub template: Bytes,

    /// Encoded preview image; empty when previews are disabled.
    pub preview: Bytes,

    /// Measured quality as a 4-byte big-endian integer.
    pub quality: [u8; QUALITY_WIRE_BYTES],
}

impl CapturedFingerprint {
    /// Quality decoded back to an integer.
    pub fn quality_value(&self) -> u32 {
        u32::from_be_bytes(self.quality)
    }
}

/// Successful outcome of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum Response {
    Initialized(bool),
    Done,
    Captured(CapturedFingerprint),
    Match(MatchResult),
}

/// Failure reported to the application layer as a `(code, message)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<Error> for CommandError {
    fn from(error: Error) -> Self {
        Self::new(error.kind(), error.message())
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_json() {
        let json = serde_json::json!({
            "command": "capture_fingerprint_with_quality",
            "timeout_ms": 5000,
            "min_quality": 60,
            "auto": false,
        });
        let command: Command = serde_json::from_value(json).unwrap();
        assert_eq!(
            command,
            Command::CaptureFingerprintWithQuality {
                timeout_ms: 5000,
                min_quality: 60,
                auto: false,
            }
        );
        assert_eq!(command.name(), "capture_fingerprint_with_quality");

        let command: Command = serde_json::from_str(r#"{"command":"initialize_device"}"#).unwrap();
        assert_eq!(command, Command::InitializeDevice);
    }

    #[test]
    fn test_command_error_from_core_error() {
        let error: CommandError = Error::SensorNotFound("USB permission required".into()).into();
        assert_eq!(error.kind(), ErrorKind::SensorNotFound);
        assert_eq!(error.message, "USB permission required");
        assert_eq!(error.to_string(), "SENSOR_NOT_FOUND: USB permission required");
    }

    #[test]
    fn test_command_error_json() {
        let error = CommandError::new(ErrorKind::NoFingerprintDetected, "Capture timed out");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "NO_FINGERPRINT");
        assert_eq!(json["message"], "Capture timed out");
    }

    #[test]
    fn test_quality_value() {
        let captured = CapturedFingerprint {
            template: Bytes::from_static(&[1, 2, 3]),
            preview: Bytes::new(),
            quality: [0, 0, 0, 80],
        };
        assert_eq!(captured.quality_value(), 80);
    }

    #[test]
    fn test_response_json() {
        let json = serde_json::to_value(Response::Match(MatchResult::Score(42))).unwrap();
        assert_eq!(json["result"], "match");
        assert_eq!(json["value"]["score"], 42);
    }
}
