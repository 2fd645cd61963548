//! Cheap integrity checks that run before any decoding.

use crate::config::LimitsConfig;
use crate::error::ImageError;

/// Validates raw image bytes before the header is parsed.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Reject sources that cannot possibly decode.
    ///
    /// Checks:
    /// - Source is not empty
    /// - Source size is within limits
    /// - Leading bytes carry a known raster signature
    pub fn validate(&self, bytes: &[u8], reference: &str) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty {
                reference: reference.to_string(),
            });
        }

        self.check_size(bytes.len() as u64, reference)?;

        if !Self::is_valid_image_header(bytes) {
            return Err(ImageError::UnsupportedFormat {
                reference: reference.to_string(),
            });
        }

        Ok(())
    }

    /// Check a byte count against the configured size limit.
    pub fn check_size(&self, len: u64, reference: &str) -> Result<(), ImageError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if len > max_bytes {
            return Err(ImageError::FileTooLarge {
                reference: reference.to_string(),
                size_mb: len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Check if the leading bytes match a raster format the decoder supports.
    fn is_valid_image_header(header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            return header.len() >= 12 && &header[8..12] == b"WEBP";
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(LimitsConfig::default())
    }

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_riff_without_webp_rejected() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_tiff() {
        assert!(Validator::is_valid_image_header(&[b'I', b'I', 0x2A, 0x00]));
        assert!(Validator::is_valid_image_header(&[b'M', b'M', 0x00, 0x2A]));
        assert!(!Validator::is_valid_image_header(&[b'I', b'I', 0x00, 0x00]));
    }

    #[test]
    fn test_svg_rejected() {
        let err = validator()
            .validate(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>", "invalid_image.svg")
            .unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        let err = validator().validate(&[], "empty.png").unwrap_err();
        assert!(matches!(err, ImageError::Empty { .. }));
        assert_eq!(err.reference(), "empty.png");
    }

    #[test]
    fn test_size_limit() {
        let validator = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        assert!(validator.check_size(1024 * 1024, "a.png").is_ok());
        let err = validator.check_size(3 * 1024 * 1024, "a.png").unwrap_err();
        assert!(matches!(err, ImageError::FileTooLarge { size_mb: 3, .. }));
    }
}
