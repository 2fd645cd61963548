//! Turning normalized images into the classifier's input tensor.
//!
//! Layout is NCHW `[batch, 3, height, width]`. Each pixel value `v` becomes
//! `(v * rescale_factor - mean[c]) / std[c]` with the configured switches.

use image::imageops;
use ndarray::Array4;

use crate::error::ModelError;
use crate::normalize::NormalizedImage;

use super::config::PreprocessorConfig;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Converts a batch of normalized images into one input tensor.
#[derive(Debug, Clone)]
pub struct PixelTransform {
    config: PreprocessorConfig,
}

impl PixelTransform {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Stack `images` into an `[N, 3, H, W]` tensor.
    ///
    /// With resizing enabled every image is brought to the model input size.
    /// Without it, all images must already share one size.
    pub fn batch(&self, images: &[NormalizedImage]) -> Result<Array4<f32>, ModelError> {
        let first = images.first().ok_or(ModelError::EmptyBatch)?;
        let (width, height) = if self.config.do_resize {
            (self.config.size.width, self.config.size.height)
        } else {
            (first.width(), first.height())
        };

        let (w, h) = (width as usize, height as usize);
        let mut tensor = Array4::<f32>::zeros((images.len(), CHANNELS, h, w));
        let plane = h * w;
        let per_image = CHANNELS * plane;

        let (scale, mean, std) = self.coefficients();
        let tensor_data = tensor
            .as_slice_mut()
            .ok_or_else(|| ModelError::Inference("input tensor is not contiguous".to_string()))?;

        for (n, image) in images.iter().enumerate() {
            let resized;
            let pixels = if self.config.do_resize
                && (image.width() != width || image.height() != height)
            {
                resized = imageops::resize(image.pixels(), width, height, self.config.filter());
                &resized
            } else if image.width() != width || image.height() != height {
                return Err(ModelError::ShapeMismatch {
                    expected: format!("{width}x{height}"),
                    actual: format!("{}x{}", image.width(), image.height()),
                });
            } else {
                image.pixels()
            };

            let out = &mut tensor_data[n * per_image..(n + 1) * per_image];
            for (i, pixel) in pixels.as_raw().chunks_exact(CHANNELS).enumerate() {
                for (c, &val) in pixel.iter().enumerate() {
                    // NCHW offset within this image: c * H * W + y * W + x
                    out[c * plane + i] = (val as f32 * scale - mean[c]) / std[c];
                }
            }
        }

        Ok(tensor)
    }

    fn coefficients(&self) -> (f32, [f32; 3], [f32; 3]) {
        let scale = if self.config.do_rescale {
            self.config.rescale_factor
        } else {
            1.0
        };
        if self.config.do_normalize {
            (scale, self.config.image_mean, self.config.image_std)
        } else {
            (scale, [0.0; 3], [1.0; 3])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::InputSize;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> NormalizedImage {
        NormalizedImage::from_rgb(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    #[test]
    fn test_batch_shape_224() {
        let transform = PixelTransform::new(PreprocessorConfig::default());
        let tensor = transform
            .batch(&[solid(512, 384, [0, 0, 0]), solid(512, 700, [0, 0, 0])])
            .unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 224, 224]);
    }

    #[test]
    fn test_normalization_range() {
        let transform = PixelTransform::new(PreprocessorConfig::default());

        // White -> (255/255 - 0.5) / 0.5 = 1.0
        let tensor = transform.batch(&[solid(10, 10, [255, 255, 255])]).unwrap();
        let max_val = tensor.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!((max_val - 1.0).abs() < 0.01);

        // Black -> -1.0
        let tensor = transform.batch(&[solid(10, 10, [0, 0, 0])]).unwrap();
        let min_val = tensor.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!((min_val + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_channel_planes() {
        let config = PreprocessorConfig {
            do_resize: false,
            do_normalize: false,
            do_rescale: false,
            ..PreprocessorConfig::default()
        };
        let tensor = PixelTransform::new(config)
            .batch(&[solid(2, 2, [10, 20, 30])])
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert_eq!(tensor[[0, 0, 1, 1]], 10.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 20.0);
        assert_eq!(tensor[[0, 2, 1, 0]], 30.0);
    }

    #[test]
    fn test_mismatched_sizes_without_resize() {
        let config = PreprocessorConfig {
            do_resize: false,
            size: InputSize {
                height: 4,
                width: 4,
            },
            ..PreprocessorConfig::default()
        };
        let err = PixelTransform::new(config)
            .batch(&[solid(4, 4, [0, 0, 0]), solid(4, 5, [0, 0, 0])])
            .unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let err = PixelTransform::new(PreprocessorConfig::default())
            .batch(&[])
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyBatch));
    }
}
