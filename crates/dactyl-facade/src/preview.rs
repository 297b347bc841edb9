//! Capture preview encoding.
//!
//! The session hands over the raw grayscale buffer and its geometry; the
//! encoder expands each sample to an opaque RGBA pixel and compresses the
//! result losslessly as PNG.

use bytes::Bytes;
use dactyl_core::ImageGeometry;
use image::codecs::png::{FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use thiserror::Error;

use crate::config::PreviewCompression;

/// Errors raised while encoding a preview.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Preview buffer holds {actual} samples, geometry {geometry} needs {expected}")]
    SizeMismatch {
        geometry: ImageGeometry,
        expected: usize,
        actual: usize,
    },

    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] image::ImageError),
}

/// Turns a grayscale capture into preview image bytes.
pub trait PreviewEncoder: Send + Sync {
    fn encode(&self, pixels: &[u8], geometry: ImageGeometry) -> Result<Bytes, PreviewError>;
}

/// Expand grayscale samples to RGBA with R = G = B = sample and A = 0xFF.
pub fn grayscale_to_rgba(pixels: &[u8]) -> Vec<u8> {
    pixels
        .iter()
        .flat_map(|&sample| [sample, sample, sample, 0xFF])
        .collect()
}

/// Lossless PNG preview encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngPreviewEncoder {
    compression: PreviewCompression,
}

impl PngPreviewEncoder {
    pub fn new(compression: PreviewCompression) -> Self {
        Self { compression }
    }

    pub fn compression(&self) -> PreviewCompression {
        self.compression
    }
}

impl PreviewEncoder for PngPreviewEncoder {
    fn encode(&self, pixels: &[u8], geometry: ImageGeometry) -> Result<Bytes, PreviewError> {
        let expected = geometry.pixel_count();
        if pixels.len() != expected || expected == 0 {
            return Err(PreviewError::SizeMismatch {
                geometry,
                expected,
                actual: pixels.len(),
            });
        }

        let rgba = grayscale_to_rgba(pixels);
        let mut png = Vec::with_capacity(rgba.len() / 2);
        PngEncoder::new_with_quality(&mut png, self.compression.into(), FilterType::Adaptive)
            .write_image(&rgba, geometry.width, geometry.height, ColorType::Rgba8)?;

        Ok(Bytes::from(png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use rstest::rstest;

    fn gradient(geometry: ImageGeometry) -> Vec<u8> {
        (0..geometry.pixel_count()).map(|i| (i % 256) as u8).collect()
    }

    #[test]
    fn test_grayscale_to_rgba() {
        assert_eq!(
            grayscale_to_rgba(&[0x00, 0x7F, 0xFF]),
            vec![0x00, 0x00, 0x00, 0xFF, 0x7F, 0x7F, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert!(grayscale_to_rgba(&[]).is_empty());
    }

    #[test]
    fn test_png_preview_is_lossless() {
        let geometry = ImageGeometry::new(20, 12);
        let pixels = gradient(geometry);

        let png = PngPreviewEncoder::default().encode(&pixels, geometry).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 12));
        assert_eq!(decoded.into_raw(), grayscale_to_rgba(&pixels));
    }

    #[rstest]
    #[case(PreviewCompression::Default)]
    #[case(PreviewCompression::Fast)]
    #[case(PreviewCompression::Best)]
    fn test_every_compression_level_decodes(#[case] compression: PreviewCompression) {
        let geometry = ImageGeometry::new(8, 8);
        let pixels = gradient(geometry);

        let png = PngPreviewEncoder::new(compression)
            .encode(&pixels, geometry)
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.into_raw(), pixels);
    }

    #[test]
    fn test_size_mismatch() {
        let err = PngPreviewEncoder::default()
            .encode(&[0u8; 99], ImageGeometry::new(10, 10))
            .unwrap_err();
        assert!(matches!(
            err,
            PreviewError::SizeMismatch {
                expected: 100,
                actual: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_geometry_rejected() {
        let err = PngPreviewEncoder::default()
            .encode(&[], ImageGeometry::ZERO)
            .unwrap_err();
        assert!(matches!(err, PreviewError::SizeMismatch { .. }));
    }
}
