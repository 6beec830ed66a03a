//! Still-capture post-processing.
//!
//! Decodes the driver's JPEG, turns it upright, mirrors front-camera shots so
//! they match the viewfinder, and re-encodes. Meant to run on a worker, never
//! on the control context.

use crate::geometry::Rotation;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageError, RgbImage};
use thiserror::Error;

/// Errors that can occur while finishing a capture.
#[derive(Debug, Error)]
pub enum FinishError {
    #[error("failed to decode captured image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode finished image: {0}")]
    Encode(#[source] ImageError),
}

/// Default quality used when re-encoding stills.
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Rotates, mirrors and re-encodes captured stills.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFinisher {
    jpeg_quality: u8,
}

impl Default for CaptureFinisher {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl CaptureFinisher {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Produces the final JPEG for one capture.
    ///
    /// The decoded frame and its transformed copy are dropped on every
    /// return path; nothing of the input survives a failure.
    pub fn finish(
        &self,
        data: &[u8],
        rotation: Rotation,
        mirror: bool,
    ) -> Result<Vec<u8>, FinishError> {
        let decoded = image::load_from_memory(data).map_err(FinishError::Decode)?;
        let (width, height) = (decoded.width(), decoded.height());

        let upright = transform(decoded, rotation, mirror).into_rgb8();
        let encoded = self.encode(&upright)?;

        tracing::debug!(
            width,
            height,
            %rotation,
            mirror,
            input_bytes = data.len(),
            output_bytes = encoded.len(),
            "Finished capture"
        );
        Ok(encoded)
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, FinishError> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality)
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(FinishError::Encode)?;
        Ok(buffer)
    }
}

/// Rotates clockwise by `rotation`, then flips horizontally if `mirror`.
pub fn transform(image: DynamicImage, rotation: Rotation, mirror: bool) -> DynamicImage {
    let rotated = match rotation {
        Rotation::Deg0 => image,
        Rotation::Deg90 => image.rotate90(),
        Rotation::Deg180 => image.rotate180(),
        Rotation::Deg270 => image.rotate270(),
    };

    if mirror {
        rotated.fliph()
    } else {
        rotated
    }
}
