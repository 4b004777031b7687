//! Upload validation.
//!
//! Files are classified by content, not by name: the leading bytes are
//! sniffed with `image::guess_format`, and `%PDF-` marks a donor document.
//! Checks run in the order a user sees them: is it an image at all, is it
//! small enough, is it a format we handle.

use image::ImageFormat;
use thiserror::Error;

/// Per-image size limit: 10MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a valid image file")]
    NotAnImage,
    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { size: u64, limit_mb: u64 },
    #[error("Supported formats: JPEG, PNG, WebP, GIF, BMP")]
    UnsupportedFormat { found: String },
}

/// Accepted upload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Pdf,
}

impl MediaKind {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn is_image(self) -> bool {
        self != Self::Pdf
    }
}

/// Whether `bytes` start like a PDF document.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

fn limit_mb(max_size: u64) -> u64 {
    (max_size as f64 / 1024.0 / 1024.0).round() as u64
}

/// Validate an image upload for the compress / enhance / convert flows.
pub fn validate_image(bytes: &[u8], max_size: u64) -> Result<MediaKind, ValidationError> {
    let format = image::guess_format(bytes).map_err(|_| ValidationError::NotAnImage)?;

    let size = bytes.len() as u64;
    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            limit_mb: limit_mb(max_size),
        });
    }

    match format {
        ImageFormat::Jpeg => Ok(MediaKind::Jpeg),
        ImageFormat::Png => Ok(MediaKind::Png),
        ImageFormat::WebP => Ok(MediaKind::Webp),
        ImageFormat::Gif => Ok(MediaKind::Gif),
        ImageFormat::Bmp => Ok(MediaKind::Bmp),
        other => Err(ValidationError::UnsupportedFormat {
            found: format!("{other:?}"),
        }),
    }
}

/// Validate an upload for the PDF flow: any accepted image, or a PDF.
///
/// The size limit applies to images only.
pub fn validate_pdf_input(bytes: &[u8], max_size: u64) -> Result<MediaKind, ValidationError> {
    if looks_like_pdf(bytes) {
        return Ok(MediaKind::Pdf);
    }
    validate_image(bytes, max_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{png_bytes, tiny_pdf_bytes};

    #[test]
    fn accepts_png() {
        assert_eq!(validate_image(&png_bytes(4, 4), DEFAULT_MAX_FILE_SIZE), Ok(MediaKind::Png));
    }

    #[test]
    fn rejects_text_as_not_an_image() {
        let err = validate_image(b"hello world", DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert_eq!(err, ValidationError::NotAnImage);
        assert_eq!(err.to_string(), "Please select a valid image file");
    }

    #[test]
    fn rejects_oversized_file_naming_the_limit() {
        let bytes = png_bytes(64, 64);
        let err = validate_image(&bytes, 100).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert!(validate_image(&bytes, DEFAULT_MAX_FILE_SIZE).is_ok());

        let ten_mb = ValidationError::TooLarge {
            size: 11 * 1024 * 1024,
            limit_mb: limit_mb(DEFAULT_MAX_FILE_SIZE),
        };
        assert_eq!(ten_mb.to_string(), "File size must be less than 10MB");
    }

    #[test]
    fn rejects_known_but_unsupported_image() {
        // TIFF little-endian magic
        let err = validate_image(b"II*\x00\x08\x00\x00\x00", DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat { .. }));
        assert_eq!(err.to_string(), "Supported formats: JPEG, PNG, WebP, GIF, BMP");
    }

    #[test]
    fn pdf_is_rejected_by_image_flow_but_accepted_by_pdf_flow() {
        let pdf = tiny_pdf_bytes();
        assert_eq!(
            validate_image(&pdf, DEFAULT_MAX_FILE_SIZE),
            Err(ValidationError::NotAnImage)
        );
        assert_eq!(validate_pdf_input(&pdf, 1), Ok(MediaKind::Pdf));
    }

    #[test]
    fn pdf_flow_still_limits_images() {
        let result = validate_pdf_input(&png_bytes(32, 32), 10);
        assert!(matches!(result, Err(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn mime_strings() {
        assert_eq!(MediaKind::Jpeg.mime(), "image/jpeg");
        assert_eq!(MediaKind::Pdf.mime(), "application/pdf");
        assert!(!MediaKind::Pdf.is_image());
    }
}
