//! Session configuration.

use std::time::Duration;

use dactyl_core::TemplateFormat;
use dactyl_core::constants::{
    DEFAULT_CAPTURE_TIMEOUT_MS, DEFAULT_DEVICE_INDEX, DEFAULT_TIMEOUT_GRACE_MS, MAX_HISTORY_SIZE,
};
use dactyl_hardware::DeviceClass;
use serde::{Deserialize, Serialize};

/// Configuration for a [`DeviceSession`](crate::DeviceSession).
///
/// # Example
///
/// ```
/// use dactyl_session::SessionConfig;
///
/// let config = SessionConfig::default().default_timeout_ms(5_000);
/// assert_eq!(config.default_timeout_ms, 5_000);
/// assert_eq!(config.device_index, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Device family passed to driver init
    pub device_class: DeviceClass,

    /// Unit index opened on the physical device
    pub device_index: u32,

    /// Template format fixed once the device is open
    pub template_format: TemplateFormat,

    /// Acquisition timeout for plain captures
    pub default_timeout_ms: u32,

    /// Extra wait beyond the driver timeout before an acquisition is treated as hung
    pub timeout_grace_ms: u32,

    /// Send the smart capture command right after open
    pub enable_smart_capture_on_open: bool,

    /// Number of state transitions kept in history
    pub history_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_class: DeviceClass::Auto,
            device_index: DEFAULT_DEVICE_INDEX,
            template_format: TemplateFormat::Iso19794,
            default_timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            timeout_grace_ms: DEFAULT_TIMEOUT_GRACE_MS,
            enable_smart_capture_on_open: true,
            history_capacity: MAX_HISTORY_SIZE,
        }
    }
}

impl SessionConfig {
    /// Set the device family passed to driver init
    pub fn device_class(mut self, class: DeviceClass) -> Self {
        self.device_class = class;
        self
    }

    /// Set the template format
    pub fn template_format(mut self, format: TemplateFormat) -> Self {
        self.template_format = format;
        self
    }

    /// Set the plain-capture timeout
    pub fn default_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the hang-detection grace period
    pub fn timeout_grace_ms(mut self, grace_ms: u32) -> Self {
        self.timeout_grace_ms = grace_ms;
        self
    }

    /// Set whether smart capture is enabled on open
    pub fn enable_smart_capture_on_open(mut self, enable: bool) -> Self {
        self.enable_smart_capture_on_open = enable;
        self
    }

    /// Total time the pipeline waits for an acquisition bounded by `timeout_ms`.
    pub fn acquisition_deadline(&self, timeout_ms: u32) -> Duration {
        Duration::from_millis(u64::from(timeout_ms) + u64::from(self.timeout_grace_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.device_class, DeviceClass::Auto);
        assert_eq!(config.device_index, 0);
        assert_eq!(config.template_format, TemplateFormat::Iso19794);
        assert_eq!(config.default_timeout_ms, 10_000);
        assert!(config.enable_smart_capture_on_open);
    }

    #[test]
    fn test_acquisition_deadline_adds_grace() {
        let config = SessionConfig::default().timeout_grace_ms(250);
        assert_eq!(config.acquisition_deadline(1_000), Duration::from_millis(1_250));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"default_timeout_ms": 3000}"#).unwrap();
        assert_eq!(config.default_timeout_ms, 3_000);
        assert_eq!(config.timeout_grace_ms, 500);
    }
}
