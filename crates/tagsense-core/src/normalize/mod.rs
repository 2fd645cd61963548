//! Image normalization: reference → fixed-width RGB pixels.
//!
//! - **source**: resolve a reference to bytes (local file or HTTP)
//! - **validate**: signature and size checks before decoding
//! - **decode**: two-phase verify/decode and the aspect-preserving resize

pub mod decode;
pub mod source;
pub mod validate;

pub use decode::{resize_to_width, scaled_height, ImageDecoder};
pub use source::{ImageSource, SourceLoader};
pub use validate::Validator;

use image::RgbImage;

use crate::config::{InferenceConfig, LimitsConfig};
use crate::error::{ConfigError, ImageError};

/// A fixed-width, aspect-correct, 3-channel image ready for batching.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pixels: RgbImage,
}

impl NormalizedImage {
    /// Wrap already-normalized RGB pixels.
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Always 3.
    pub fn channels(&self) -> usize {
        3
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }
}

/// Loads, verifies and resizes images to the configured width.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    loader: SourceLoader,
    decoder: ImageDecoder,
    target_width: u32,
}

impl ImageNormalizer {
    /// Create a normalizer from the inference settings and limits.
    pub fn new(inference: &InferenceConfig, limits: &LimitsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            loader: SourceLoader::new(limits, inference.windows_path_rewrite)?,
            decoder: ImageDecoder::new(limits.clone()),
            target_width: inference.resize_image_width,
        })
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Load `reference` and normalize it.
    ///
    /// Decoding and resizing run on the blocking pool.
    pub async fn normalize(&self, reference: &str) -> Result<NormalizedImage, ImageError> {
        let bytes = self.loader.load(reference).await?;
        let decoder = self.decoder.clone();
        let target_width = self.target_width;
        let owned_reference = reference.to_string();

        tokio::task::spawn_blocking(move || {
            Self::normalize_with(&decoder, &bytes, &owned_reference, target_width)
        })
        .await
        .map_err(|e| ImageError::Corrupt {
            reference: reference.to_string(),
            message: format!("Task join error: {e}"),
        })?
    }

    /// Synchronous normalization of bytes already in memory.
    pub fn normalize_bytes(
        &self,
        bytes: &[u8],
        reference: &str,
    ) -> Result<NormalizedImage, ImageError> {
        Self::normalize_with(&self.decoder, bytes, reference, self.target_width)
    }

    fn normalize_with(
        decoder: &ImageDecoder,
        bytes: &[u8],
        reference: &str,
        target_width: u32,
    ) -> Result<NormalizedImage, ImageError> {
        let (_, width, height) = decoder.verify(bytes, reference)?;
        decoder.scaled_dimensions(width, height, target_width, reference)?;
        let image = decoder.decode(bytes, reference)?;
        let pixels = decoder.resize(&image, target_width, reference)?;
        tracing::trace!(
            "Normalized {reference}: {}x{} -> {}x{}",
            image.width(),
            image.height(),
            pixels.width(),
            pixels.height()
        );
        Ok(NormalizedImage::from_rgb(pixels))
    }
}
