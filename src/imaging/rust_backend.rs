//! Pure Rust image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF, BMP) | `image::ImageReader` with format sniffing + `Limits` |
//! | Resample | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 1–100) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (best compression, adaptive filter) |
//! | Encode → WebP | `webp::Encoder` (libwebp lossy, quality 1–100) |
//!
//! The `image` crate only writes lossless WebP, so lossy WebP goes through
//! libwebp. JPEG has no alpha channel: alpha is dropped before encoding, the
//! way a canvas export does.

use super::backend::{BackendError, DecodeLimits, DecodedImage, ImageBackend};
use super::filters::PixelBuffer;
use super::params::{OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// Containers with decoders compiled in.
const DECODABLE: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

/// Returns the input containers this backend can decode.
pub fn supported_input_formats() -> impl Iterator<Item = ImageFormat> {
    DECODABLE.iter().copied().filter(|f| f.reading_enabled())
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_jpeg(pixels: &PixelBuffer, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.value() as u8)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilterType::Adaptive)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
    Ok(out)
}

fn encode_webp(pixels: &PixelBuffer, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let encoded = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height())
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e:?}")))?;
    Ok(encoded.to_vec())
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, BackendError> {
        let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let source_format = reader.format();

        let mut decode_limits = Limits::default();
        decode_limits.max_image_width = Some(limits.max_width);
        decode_limits.max_image_height = Some(limits.max_height);
        reader.limits(decode_limits);

        let img = reader
            .decode()
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {e}")))?;
        Ok(DecodedImage {
            pixels: img.to_rgba8(),
            source_format,
        })
    }

    fn encode(
        &self,
        pixels: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(pixels, quality),
            OutputFormat::Png => encode_png(pixels),
            OutputFormat::Webp => encode_webp(pixels, quality),
        }
    }

    fn resample(&self, pixels: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
        image::imageops::resize(pixels, width, height, FilterType::Lanczos3)
    }
}
