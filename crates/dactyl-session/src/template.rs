//! Template engine: template extraction and two-template comparison.
//!
//! Templates are opaque. The engine sizes the output buffer from the
//! driver, passes fixed capture metadata, and returns exactly the bytes the
//! driver wrote. Matching runs at the normal security level and passes
//! arguments in the caller's order.

use dactyl_core::{
    Error, FingerprintTemplate, RawFingerprintImage, Result, SecurityLevel, TemplateMetadata,
};
use dactyl_hardware::{SensorCapability, UsbHost};
use tracing::{debug, warn};

use crate::session::DeviceSession;

impl<S, U> DeviceSession<S, U>
where
    S: SensorCapability,
    U: UsbHost,
{
    /// Extract a template from a captured image.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `TemplateCreationFailed` if the driver reports non-success at any step
    pub async fn create_template(
        &mut self,
        image: &RawFingerprintImage,
    ) -> Result<FingerprintTemplate> {
        self.require_ready()?;

        let max_size = self.sensor.get_max_template_size().await.map_err(|e| {
            Error::TemplateCreationFailed(format!("Failed to query template size: {}", e))
        })?;
        if max_size == 0 {
            return Err(Error::TemplateCreationFailed(
                "Driver reported zero maximum template size".to_string(),
            ));
        }

        let metadata = TemplateMetadata::for_capture(image.quality);
        let mut buffer = vec![0u8; max_size];

        self.sensor
            .create_template(&metadata, &image.pixels, &mut buffer)
            .await
            .map_err(|e| {
                warn!(session = %self.id(), "Failed to create template: {}", e);
                Error::TemplateCreationFailed(format!("Failed to create template: {}", e))
            })?;

        debug!(session = %self.id(), size = max_size, quality = image.quality, "Template created");
        Ok(FingerprintTemplate::new(
            buffer,
            self.config.template_format,
            metadata,
        ))
    }

    /// Decide whether two templates match at the normal security level.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `TemplateMatchingFailed` if the driver reports non-success
    pub async fn verify(&self, first: &[u8], second: &[u8]) -> Result<bool> {
        self.require_ready()?;

        let matched = self
            .sensor
            .match_template(first, second, SecurityLevel::Normal)
            .await
            .map_err(|e| {
                warn!(session = %self.id(), "Failed to match templates: {}", e);
                Error::TemplateMatchingFailed(format!("Failed to match templates: {}", e))
            })?;

        debug!(session = %self.id(), matched, "Templates compared");
        Ok(matched)
    }

    /// Similarity score of `first` against `second`, unnormalized.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless the session is ready
    /// - `TemplateMatchingFailed` if the driver reports non-success
    pub async fn score(&self, first: &[u8], second: &[u8]) -> Result<i32> {
        self.require_ready()?;

        let score = self
            .sensor
            .get_matching_score(first, second)
            .await
            .map_err(|e| {
                warn!(session = %self.id(), "Failed to get matching score: {}", e);
                Error::TemplateMatchingFailed(format!("Failed to get matching score: {}", e))
            })?;

        debug!(session = %self.id(), score, "Templates scored");
        Ok(score)
    }
}
