//! Data model shared across the fingerprint stack.
//!
//! Raw images are ephemeral and owned by a single request. Templates are
//! immutable once created and outlive any session.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{QUALITY_WIRE_BYTES, TEMPLATE_VIEW_NUMBER};

/// Image dimensions reported by the device.
///
/// Both sides are zero while no device is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub width: u32,
    pub height: u32,
}

impl ImageGeometry {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of single-byte samples in an image of this size.
    ///
    /// # Examples
    ///
    /// ```
    /// use dactyl_core::ImageGeometry;
    ///
    /// assert_eq!(ImageGeometry::new(260, 300).pixel_count(), 78_000);
    /// ```
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True when both sides are positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for ImageGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Finger position recorded in template metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FingerPosition {
    #[default]
    Unknown,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
}

/// How the impression was acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ImpressionType {
    /// Live-scan plain; every capture through this stack uses it.
    #[default]
    LiveScanPlain,
    LiveScanRolled,
}

/// Template encoding negotiated with the driver once the device is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFormat {
    /// ISO/IEC 19794-2 minutiae record.
    #[default]
    Iso19794,
    /// ANSI INCITS 378 minutiae record.
    Ansi378,
    /// Vendor proprietary record.
    Vendor,
}

/// Strictness of a match decision.
///
/// Matching through the session is fixed at [`SecurityLevel::Normal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Lowest,
    Lower,
    Low,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    High,
    Higher,
    Highest,
}

/// Metadata supplied to the driver when a template is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub finger_position: FingerPosition,
    pub image_quality: u32,
    pub impression_type: ImpressionType,
    pub view_number: u32,
}

impl TemplateMetadata {
    /// Metadata for a single live-scan capture of an unknown finger.
    pub fn for_capture(image_quality: u32) -> Self {
        Self {
            finger_position: FingerPosition::Unknown,
            image_quality,
            impression_type: ImpressionType::LiveScanPlain,
            view_number: TEMPLATE_VIEW_NUMBER,
        }
    }
}

/// One acquired grayscale frame and its measured quality.
///
/// The buffer holds exactly `geometry.pixel_count()` samples.
#[derive(Debug, Clone)]
pub struct RawFingerprintImage {
    pub pixels: Vec<u8>,
    pub geometry: ImageGeometry,
    pub quality: u32,
    pub captured_at: DateTime<Utc>,
}

impl RawFingerprintImage {
    pub fn new(pixels: Vec<u8>, geometry: ImageGeometry, quality: u32) -> Self {
        Self {
            pixels,
            geometry,
            quality,
            captured_at: Utc::now(),
        }
    }

    /// Check if the measured quality meets `threshold`.
    pub fn meets_quality(&self, threshold: u32) -> bool {
        self.quality >= threshold
    }

    /// Quality encoded as a 4-byte big-endian integer.
    pub fn quality_bytes(&self) -> [u8; QUALITY_WIRE_BYTES] {
        self.quality.to_be_bytes()
    }
}

/// Opaque template produced by the driver.
///
/// The byte sequence is exactly what the driver wrote, including any
/// trailing padding up to the driver's maximum template size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintTemplate {
    data: Bytes,
    pub format: TemplateFormat,
    pub metadata: TemplateMetadata,
    pub created_at: DateTime<Utc>,
}

impl FingerprintTemplate {
    pub fn new(data: impl Into<Bytes>, format: TemplateFormat, metadata: TemplateMetadata) -> Self {
        Self {
            data: data.into(),
            format,
            metadata,
            created_at: Utc::now(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Cheap handle on the template bytes.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for FingerprintTemplate {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Outcome of comparing two templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    /// Match decision at the fixed normal security level.
    Decision(bool),
    /// Similarity score on the driver's own scale.
    Score(i32),
}
