//! Command facade over one device session.
//!
//! # Exclusive access
//!
//! The session lives behind a `tokio::sync::RwLock`. Every operation that
//! reaches the sensor handle or changes session state takes the write lock,
//! so initialize, close, LED, brightness, smart capture and capture (with
//! template creation) are serialized in arrival order. Verify and score
//! take the read lock: they may run alongside each other, never alongside a
//! capture.
//!
//! Preview encoding runs after the lock is released; it only needs the
//! captured buffer.

use bytes::Bytes;
use dactyl_core::{Error, ImageGeometry, MatchResult, RawFingerprintImage};
use dactyl_hardware::{SensorCapability, UsbHost};
use dactyl_session::{CaptureRequest, DeviceSession, Initialization, SessionState};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::command::{CapturedFingerprint, Command, CommandError, CommandResult, Response};
use crate::config::FacadeConfig;
use crate::preview::{PngPreviewEncoder, PreviewEncoder};

/// Application-facing entry point for a single fingerprint sensor.
///
/// Owns the session for the lifetime of the process. Call
/// [`shutdown`](Self::shutdown) before exit to release the device.
pub struct CommandFacade<S, U> {
    session: RwLock<DeviceSession<S, U>>,
    preview: Option<Box<dyn PreviewEncoder>>,
}

impl<S, U> CommandFacade<S, U>
where
    S: SensorCapability,
    U: UsbHost,
{
    /// Create a facade; pass `None` for `usb` when the host has no USB subsystem.
    pub fn new(sensor: S, usb: Option<U>, config: FacadeConfig) -> Self {
        let preview = config.preview.enabled.then(|| {
            Box::new(PngPreviewEncoder::new(config.preview.compression)) as Box<dyn PreviewEncoder>
        });

        Self {
            session: RwLock::new(DeviceSession::new(sensor, usb, config.session)),
            preview,
        }
    }

    /// Replace the preview encoder.
    pub fn with_preview_encoder(mut self, encoder: impl PreviewEncoder + 'static) -> Self {
        self.preview = Some(Box::new(encoder));
        self
    }

    /// Return empty previews instead of encoding.
    pub fn without_preview(mut self) -> Self {
        self.preview = None;
        self
    }

    /// Open the sensor.
    ///
    /// Succeeds with `true` once the session is ready. A pending USB
    /// permission request is reported as `SensorNotFound`; retry after the
    /// user grants access.
    pub async fn initialize_device(&self) -> CommandResult<bool> {
        let mut session = self.session.write().await;
        match session.initialize().await? {
            Initialization::Opened | Initialization::AlreadyReady => Ok(true),
            Initialization::PermissionRequested => {
                debug!(session = %session.id(), "Waiting for USB permission");
                Err(Error::SensorNotFound("USB permission required".to_string()).into())
            }
        }
    }

    pub async fn toggle_led(&self, enabled: bool) -> CommandResult<()> {
        self.session.write().await.set_led(enabled).await?;
        Ok(())
    }

    pub async fn toggle_smart_capture(&self, enabled: bool) -> CommandResult<()> {
        self.session.write().await.set_smart_capture(enabled)?;
        Ok(())
    }

    pub async fn set_brightness(&self, level: i32) -> CommandResult<()> {
        self.session.write().await.set_brightness(level).await?;
        Ok(())
    }

    /// Plain capture with the configured default timeout and no quality gate.
    pub async fn capture_fingerprint(&self, auto: bool) -> CommandResult<CapturedFingerprint> {
        let mut session = self.session.write().await;
        let image = session.capture_plain(auto).await?;
        self.finish_capture(session, image).await
    }

    /// Capture with an explicit timeout and minimum quality.
    pub async fn capture_fingerprint_with_quality(
        &self,
        timeout_ms: u32,
        min_quality: u32,
        auto: bool,
    ) -> CommandResult<CapturedFingerprint> {
        let request = CaptureRequest::with_quality(timeout_ms, min_quality, auto);
        let mut session = self.session.write().await;
        let image = session.capture(&request).await?;
        self.finish_capture(session, image).await
    }

    /// Create the template under the held lock, then encode the preview
    /// after releasing it.
    async fn finish_capture(
        &self,
        mut session: tokio::sync::RwLockWriteGuard<'_, DeviceSession<S, U>>,
        image: RawFingerprintImage,
    ) -> CommandResult<CapturedFingerprint> {
        let template = session.create_template(&image).await?;
        drop(session);

        let preview = self.encode_preview(&image.pixels, image.geometry)?;

        Ok(CapturedFingerprint {
            template: template.bytes(),
            preview,
            quality: image.quality_bytes(),
        })
    }

    fn encode_preview(&self, pixels: &[u8], geometry: ImageGeometry) -> CommandResult<Bytes> {
        let Some(encoder) = &self.preview else {
            return Ok(Bytes::new());
        };

        encoder.encode(pixels, geometry).map_err(|e| {
            warn!("Failed to encode preview: {}", e);
            CommandError::from(Error::NoFingerprintDetected(format!(
                "Failed to encode preview: {}",
                e
            )))
        })
    }

    /// Match two templates at the normal security level.
    pub async fn verify_fingerprint(&self, first: &[u8], second: &[u8]) -> CommandResult<bool> {
        Ok(self.session.read().await.verify(first, second).await?)
    }

    /// Similarity score of two templates, in caller order.
    pub async fn get_matching_score(&self, first: &[u8], second: &[u8]) -> CommandResult<i32> {
        Ok(self.session.read().await.score(first, second).await?)
    }

    /// Release the device. Safe to call more than once.
    pub async fn shutdown(&self) {
        let mut session = self.session.write().await;
        info!(session = %session.id(), "Shutting down");
        session.close().await;
    }

    pub async fn state(&self) -> SessionState {
        self.session.read().await.state()
    }

    pub async fn geometry(&self) -> ImageGeometry {
        self.session.read().await.geometry()
    }

    /// Dispatch one external request.
    pub async fn handle(&self, command: Command) -> CommandResult<Response> {
        let name = command.name();
        debug!(command = name, "Handling command");

        let result = match command {
            Command::InitializeDevice => self.initialize_device().await.map(Response::Initialized),
            Command::ToggleLed { enabled } => {
                self.toggle_led(enabled).await.map(|_| Response::Done)
            }
            Command::ToggleSmartCapture { enabled } => self
                .toggle_smart_capture(enabled)
                .await
                .map(|_| Response::Done),
            Command::SetBrightness { level } => {
                self.set_brightness(level).await.map(|_| Response::Done)
            }
            Command::CaptureFingerprint { auto } => self
                .capture_fingerprint(auto)
                .await
                .map(Response::Captured),
            Command::CaptureFingerprintWithQuality {
                timeout_ms,
                min_quality,
                auto,
            } => self
                .capture_fingerprint_with_quality(timeout_ms, min_quality, auto)
                .await
                .map(Response::Captured),
            Command::VerifyFingerprint { first, second } => self
                .verify_fingerprint(&first, &second)
                .await
                .map(|matched| Response::Match(MatchResult::Decision(matched))),
            Command::GetMatchingScore { first, second } => self
                .get_matching_score(&first, &second)
                .await
                .map(|score| Response::Match(MatchResult::Score(score))),
        };

        if let Err(e) = &result {
            debug!(command = name, code = %e.code, "Command failed: {}", e.message);
        }
        result
    }
}
