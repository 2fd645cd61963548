//! Two-phase decoding: verify the header, then decode the pixels.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::config::LimitsConfig;
use crate::error::ImageError;

use super::validate::Validator;

/// Decodes raw bytes into pixels, refusing anything that fails verification.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    validator: Validator,
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits.clone()),
            limits,
        }
    }

    /// The validator used for the byte-level checks.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Phase one: signature, size and header checks without decoding pixels.
    ///
    /// Returns the detected format and dimensions.
    pub fn verify(&self, bytes: &[u8], reference: &str) -> Result<(ImageFormat, u32, u32), ImageError> {
        self.validator.validate(bytes, reference)?;

        let reader = Self::reader(bytes, reference)?;
        let format = reader.format().ok_or_else(|| ImageError::UnsupportedFormat {
            reference: reference.to_string(),
        })?;
        let (width, height) = reader.into_dimensions().map_err(|e| ImageError::Corrupt {
            reference: reference.to_string(),
            message: format!("Invalid header: {e}"),
        })?;

        if width == 0 || height == 0 {
            return Err(ImageError::Corrupt {
                reference: reference.to_string(),
                message: format!("Degenerate dimensions {width}x{height}"),
            });
        }
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(ImageError::DimensionsTooLarge {
                reference: reference.to_string(),
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        Ok((format, width, height))
    }

    /// Verify, then fully decode.
    ///
    /// A decode failure after a successful verify is still reported as
    /// `Corrupt`; no partially-decoded image is ever returned.
    pub fn decode(&self, bytes: &[u8], reference: &str) -> Result<DynamicImage, ImageError> {
        let (format, width, height) = self.verify(bytes, reference)?;
        tracing::trace!("Verified {reference}: {format:?} {width}x{height}");

        Self::reader(bytes, reference)?
            .decode()
            .map_err(|e| ImageError::Corrupt {
                reference: reference.to_string(),
                message: e.to_string(),
            })
    }

    /// Dimensions after resizing `width`x`height` to `target_width`.
    ///
    /// Extreme aspect ratios can blow a small image up into a huge one, so
    /// the resized side is held to the same limit as the source.
    pub fn scaled_dimensions(
        &self,
        width: u32,
        height: u32,
        target_width: u32,
        reference: &str,
    ) -> Result<(u32, u32), ImageError> {
        let target_height = scaled_height(width, height, target_width);
        let max_dim = self.limits.max_image_dimension;
        if target_width > max_dim || target_height > max_dim {
            return Err(ImageError::DimensionsTooLarge {
                reference: reference.to_string(),
                width: target_width,
                height: target_height,
                max_dim,
            });
        }
        Ok((target_width, target_height))
    }

    /// Resize to `target_width` after checking the output against the limits.
    pub fn resize(
        &self,
        image: &DynamicImage,
        target_width: u32,
        reference: &str,
    ) -> Result<RgbImage, ImageError> {
        self.scaled_dimensions(image.width(), image.height(), target_width, reference)?;
        Ok(resize_to_width(image, target_width))
    }

    fn reader<'a>(
        bytes: &'a [u8],
        reference: &str,
    ) -> Result<ImageReader<Cursor<&'a [u8]>>, ImageError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Corrupt {
                reference: reference.to_string(),
                message: format!("Cannot detect image format: {e}"),
            })
    }
}

/// Height that keeps the aspect ratio when the width becomes `target_width`.
///
/// `round(target_width * height / width)`, never less than 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (target_width as f64 * height as f64 / width as f64).round();
    (scaled as u32).max(1)
}

/// Resize to `target_width` (aspect preserved, Lanczos3) and convert to RGB8.
///
/// Alpha is dropped and grayscale is expanded to three channels.
pub fn resize_to_width(image: &DynamicImage, target_width: u32) -> RgbImage {
    let height = scaled_height(image.width(), image.height(), target_width);
    image
        .resize_exact(target_width, height, FilterType::Lanczos3)
        .to_rgb8()
}
