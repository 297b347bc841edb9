//! Capture pipeline: one bounded acquisition with quality gating.
//!
//! Plain capture and capture-with-quality are one algorithm. A plain capture
//! is the special case `min_quality = 0` with the configured default
//! timeout. Quality is always measured, even when not gating, because it is
//! recorded in template metadata and returned to the caller.

use dactyl_core::constants::{DEFAULT_CAPTURE_TIMEOUT_MS, NO_QUALITY_GATE};
use dactyl_core::{Error, RawFingerprintImage, Result};
use dactyl_hardware::{SensorCapability, UsbHost};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::session::DeviceSession;
use crate::state::SessionState;

/// Parameters of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Driver-side acquisition timeout
    pub timeout_ms: u32,

    /// Reject frames measured strictly below this; 0 disables gating
    pub min_quality: u32,

    /// Rely on the sensor's smart capture mode
    pub auto: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::plain(false)
    }
}

impl CaptureRequest {
    /// Plain capture with the default timeout and no quality gate.
    pub fn plain(auto: bool) -> Self {
        Self {
            timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            min_quality: NO_QUALITY_GATE,
            auto,
        }
    }

    /// Capture with an explicit timeout and minimum quality.
    pub fn with_quality(timeout_ms: u32, min_quality: u32, auto: bool) -> Self {
        Self {
            timeout_ms,
            min_quality,
            auto,
        }
    }

    pub fn is_gated(&self) -> bool {
        self.min_quality > NO_QUALITY_GATE
    }
}

impl<S, U> DeviceSession<S, U>
where
    S: SensorCapability,
    U: UsbHost,
{
    /// Plain capture using the configured default timeout.
    pub async fn capture_plain(&mut self, auto: bool) -> Result<RawFingerprintImage> {
        let request = CaptureRequest {
            timeout_ms: self.config.default_timeout_ms,
            ..CaptureRequest::plain(auto)
        };
        self.capture(&request).await
    }

    /// Acquire one frame and measure its quality.
    ///
    /// The session is `Capturing` while the driver call is in flight and
    /// returns to `Ready` on every outcome. If the returned future is
    /// dropped mid-acquisition the session stays `Capturing`, which still
    /// counts as ready for the next call.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `SmartCaptureDisabled` if `auto` is set while the policy is off;
    ///   the driver is not touched in that case
    /// - `NoFingerprintDetected` on driver failure, on timeout (including a
    ///   driver that ignores its own timeout), or when quality is below
    ///   `min_quality`
    pub async fn capture(&mut self, request: &CaptureRequest) -> Result<RawFingerprintImage> {
        self.require_ready()?;

        if request.auto && !self.smart_capture_enabled {
            return Err(Error::SmartCaptureDisabled(
                "Smart capture is not enabled".to_string(),
            ));
        }

        self.transition_to(SessionState::Capturing);
        let result = self.acquire(request).await;
        self.transition_to(SessionState::Ready);

        match &result {
            Ok(image) => info!(
                session = %self.id(),
                quality = image.quality,
                min_quality = request.min_quality,
                "Fingerprint captured"
            ),
            Err(e) => debug!(session = %self.id(), "Capture rejected: {}", e),
        }
        result
    }

    async fn acquire(&mut self, request: &CaptureRequest) -> Result<RawFingerprintImage> {
        let geometry = self.geometry;
        let mut pixels = vec![0u8; geometry.pixel_count()];
        let deadline = self.config.acquisition_deadline(request.timeout_ms);

        let acquisition = self.sensor.get_image(&mut pixels, request.timeout_ms);
        let outcome = tokio::time::timeout(deadline, acquisition).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(session = %self.id(), "Failed to capture fingerprint: {}", e);
                return Err(Error::NoFingerprintDetected(format!(
                    "Failed to capture fingerprint: {}",
                    e
                )));
            }
            Err(_) => {
                warn!(
                    session = %self.id(),
                    "Acquisition did not return within {}ms",
                    deadline.as_millis()
                );
                return Err(Error::NoFingerprintDetected(format!(
                    "Capture timed out after {}ms",
                    request.timeout_ms
                )));
            }
        }

        let quality = self
            .sensor
            .get_image_quality(geometry.width, geometry.height, &pixels)
            .await
            .map_err(|e| {
                Error::NoFingerprintDetected(format!("Failed to measure image quality: {}", e))
            })?;

        let image = RawFingerprintImage::new(pixels, geometry, quality);
        if request.is_gated() && !image.meets_quality(request.min_quality) {
            return Err(Error::NoFingerprintDetected(format!(
                "Fingerprint quality too low: {} < {}",
                quality, request.min_quality
            )));
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionConfig;
    use dactyl_core::ErrorKind;
    use dactyl_hardware::SensorError;
    use dactyl_hardware::mock::{MockSensor, MockSensorHandle, MockUsbHost, SensorOp};
    use std::time::Duration;

    async fn ready_session() -> (DeviceSession<MockSensor, MockUsbHost>, MockSensorHandle) {
        let (sensor, handle) = MockSensor::new();
        let (usb, _usb_handle) = MockUsbHost::with_permission();
        let mut session = DeviceSession::new(sensor, Some(usb), SessionConfig::default());
        session.initialize().await.unwrap();
        handle.clear_calls();
        (session, handle)
    }

    #[test]
    fn test_plain_request() {
        let request = CaptureRequest::plain(true);
        assert_eq!(request.timeout_ms, 10_000);
        assert_eq!(request.min_quality, 0);
        assert!(request.auto);
        assert!(!request.is_gated());
    }

    #[tokio::test]
    async fn test_capture_buffer_matches_geometry() {
        let (mut session, handle) = ready_session().await;

        let image = session.capture(&CaptureRequest::plain(false)).await.unwrap();
        assert_eq!(image.pixels.len(), 100);
        assert_eq!(image.geometry, session.geometry());
        assert_eq!(image.quality, 80);
        assert_eq!(
            handle.calls()[0],
            dactyl_hardware::mock::SensorCall::GetImage {
                buffer_len: 100,
                timeout_ms: 10_000
            }
        );
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_plain_capture_uses_configured_timeout() {
        let (sensor, handle) = MockSensor::new();
        let (usb, _usb_handle) = MockUsbHost::with_permission();
        let config = SessionConfig::default().default_timeout_ms(4_000);
        let mut session = DeviceSession::new(sensor, Some(usb), config);
        session.initialize().await.unwrap();

        session.capture_plain(false).await.unwrap();
        assert!(handle.calls().contains(&dactyl_hardware::mock::SensorCall::GetImage {
            buffer_len: 100,
            timeout_ms: 4_000
        }));
    }

    #[tokio::test]
    async fn test_quality_is_measured_without_gate() {
        let (mut session, handle) = ready_session().await;
        handle.set_quality(3);

        let image = session.capture(&CaptureRequest::plain(false)).await.unwrap();
        assert_eq!(image.quality, 3);
        assert_eq!(handle.call_count(SensorOp::ImageQuality), 1);
    }

    #[tokio::test]
    async fn test_quality_gate_boundary() {
        let (mut session, _handle) = ready_session().await;

        let at_threshold = CaptureRequest::with_quality(1_000, 80, false);
        assert!(session.capture(&at_threshold).await.is_ok());

        let above_measured = CaptureRequest::with_quality(1_000, 81, false);
        let err = session.capture(&above_measured).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFingerprintDetected);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_driver_failure_maps_to_no_fingerprint() {
        let (mut session, handle) = ready_session().await;
        handle.fail(SensorOp::GetImage, SensorError::disconnected("FDU05"));

        let err = session.capture(&CaptureRequest::plain(false)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFingerprintDetected);
        assert_eq!(handle.call_count(SensorOp::ImageQuality), 0);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_timeout_maps_to_no_fingerprint() {
        let (mut session, handle) = ready_session().await;
        handle.set_image_delay(Duration::from_secs(60));

        let request = CaptureRequest::with_quality(2_000, 0, false);
        let err = session.capture(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFingerprintDetected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_driver_is_cut_off() {
        let (mut session, handle) = ready_session().await;
        handle.hang_on_capture(true);

        let request = CaptureRequest::with_quality(1_000, 0, false);
        let err = session.capture(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFingerprintDetected);
        assert!(err.message().contains("timed out"));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_after_abandoned_acquisition() {
        let (mut session, handle) = ready_session().await;
        handle.hang_on_capture(true);

        let request = CaptureRequest::with_quality(1_000, 0, false);
        assert!(session.capture(&request).await.is_err());

        handle.hang_on_capture(false);
        let image = session.capture(&request).await.unwrap();
        assert!(!image.pixels.is_empty());
        assert_eq!(handle.call_count(SensorOp::GetImage), 2);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_auto_requires_smart_capture() {
        let (mut session, handle) = ready_session().await;
        session.set_smart_capture(false).unwrap();

        let err = session.capture(&CaptureRequest::plain(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SmartCaptureDisabled);
        assert_eq!(handle.call_count(SensorOp::GetImage), 0);

        session.set_smart_capture(true).unwrap();
        assert!(session.capture(&CaptureRequest::plain(true)).await.is_ok());
    }

    #[tokio::test]
    async fn test_capture_records_capturing_state() {
        let (mut session, _handle) = ready_session().await;
        session.capture(&CaptureRequest::plain(false)).await.unwrap();

        let tail: Vec<_> = session
            .last_transitions(2)
            .iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(
            tail,
            vec![
                (SessionState::Ready, SessionState::Capturing),
                (SessionState::Capturing, SessionState::Ready),
            ]
        );
    }
}
