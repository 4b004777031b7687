//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three primitives every backend must
//! support: decode, encode, and resample. Strategy (format fallbacks, PNG
//! downscaling, capability probing) lives one level up in
//! [`ImageCodec`](super::codec::ImageCodec), so a backend only has to be
//! honest about what it produced.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of the
//! `image` crate.

use super::filters::PixelBuffer;
use super::params::{OutputFormat, Quality};
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Largest raster the decoder accepts.
///
/// Defaults mirror the per-side limit common to browser canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 32_767,
            max_height: 32_767,
        }
    }
}

/// Output of a decode: the raster plus the container it came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: PixelBuffer,
    pub source_format: Option<ImageFormat>,
}

impl DecodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

/// Trait for image backends.
///
/// `Sync` so a single backend can serve encode jobs from any rayon worker.
pub trait ImageBackend: Sync {
    /// Decode arbitrary image bytes into an RGBA8 raster.
    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, BackendError>;

    /// Encode `pixels` as `format`. Backends may return a different container
    /// than requested; the codec inspects the signature.
    fn encode(
        &self,
        pixels: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// High-quality resample to exact dimensions.
    fn resample(&self, pixels: &PixelBuffer, width: u32, height: u32) -> PixelBuffer;
}
