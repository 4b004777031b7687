//! Decode to pixels, re-encode to a target format with fallbacks.
//!
//! Encoding is a per-format strategy table:
//!
//! | Requested | Strategy |
//! |---|---|
//! | JPEG | lossy encode at `quality` |
//! | WebP | check WebP support once; lossy encode at `quality`, or JPEG at the same quality if unsupported |
//! | PNG  | downscale by the quality proxy below 95%, then lossless encode |
//!
//! Any lossy encode that throws, or that silently hands back PNG bytes, is
//! replaced by a PNG encode of the same pixels. Fallbacks are recorded on
//! [`EncodedImage::fallback`] and logged as warnings; [`ImageCodec::encode`]
//! never fails.

use super::backend::{BackendError, DecodeLimits, DecodedImage, ImageBackend};
use super::calculations::png_compression_dimensions;
use super::filters::PixelBuffer;
use super::params::{EncodeSettings, OutputFormat, Quality};
use super::rust_backend::RustBackend;
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Could not decode image: {0}")]
    Decode(#[source] BackendError),
}

/// Why the produced bytes differ from what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeFallback {
    /// The WebP capability check failed; JPEG was written instead.
    WebpUnsupported,
    /// The encoder returned PNG bytes for a lossy request.
    FormatSubstituted { requested: OutputFormat },
    /// The encoder threw; PNG was written instead.
    EncoderFailed { requested: OutputFormat, reason: String },
}

/// Result of an encode: the payload and what it actually is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// Container actually written, after fallbacks.
    pub format: OutputFormat,
    pub requested: EncodeSettings,
    pub width: u32,
    pub height: u32,
    pub fallback: Option<EncodeFallback>,
}

impl EncodedImage {
    /// Payload length; no separate I/O is involved.
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Sniff the container of encoded bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<OutputFormat> {
    image::guess_format(bytes)
        .ok()
        .and_then(OutputFormat::from_image_format)
}

/// Decoder/encoder front-end over an [`ImageBackend`].
///
/// Holds the memoized WebP capability check, so one codec should live as long
/// as the session that uses it.
pub struct ImageCodec<B: ImageBackend = RustBackend> {
    backend: B,
    limits: DecodeLimits,
    webp_supported: OnceLock<bool>,
}

impl ImageCodec<RustBackend> {
    pub fn new() -> Self {
        Self::with_backend(RustBackend::new())
    }
}

impl Default for ImageCodec<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend> ImageCodec<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            limits: DecodeLimits::default(),
            webp_supported: OnceLock::new(),
        }
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decode file bytes to an RGBA8 raster.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
        self.backend
            .decode(bytes, &self.limits)
            .map_err(CodecError::Decode)
    }

    /// Whether the backend can really produce `format`.
    ///
    /// PNG and JPEG are assumed. WebP is tested once by encoding a 1×1 image
    /// and sniffing the signature; the answer is cached for the codec's life.
    pub fn supports(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Jpeg | OutputFormat::Png => true,
            OutputFormat::Webp => *self.webp_supported.get_or_init(|| self.detect_webp()),
        }
    }

    fn detect_webp(&self) -> bool {
        let sample = PixelBuffer::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let supported = self
            .backend
            .encode(&sample, OutputFormat::Webp, Quality::default())
            .map(|bytes| sniff_format(&bytes) == Some(OutputFormat::Webp))
            .unwrap_or(false);
        log::debug!("WebP capability check: supported={supported}");
        supported
    }

    /// Re-encode `pixels` per `settings`. Never fails.
    pub fn encode(&self, pixels: &PixelBuffer, settings: EncodeSettings) -> EncodedImage {
        match settings.format {
            OutputFormat::Jpeg => self.encode_lossy(pixels, OutputFormat::Jpeg, settings, None),
            OutputFormat::Webp if self.supports(OutputFormat::Webp) => {
                self.encode_lossy(pixels, OutputFormat::Webp, settings, None)
            }
            OutputFormat::Webp => {
                log::warn!("WebP not supported, falling back to JPEG");
                self.encode_lossy(
                    pixels,
                    OutputFormat::Jpeg,
                    settings,
                    Some(EncodeFallback::WebpUnsupported),
                )
            }
            OutputFormat::Png => self.encode_png(pixels, settings),
        }
    }

    fn encode_lossy(
        &self,
        pixels: &PixelBuffer,
        format: OutputFormat,
        settings: EncodeSettings,
        fallback: Option<EncodeFallback>,
    ) -> EncodedImage {
        match self.backend.encode(pixels, format, settings.quality) {
            Ok(bytes) if sniff_format(&bytes) == Some(format) => EncodedImage {
                bytes,
                format,
                requested: settings,
                width: pixels.width(),
                height: pixels.height(),
                fallback,
            },
            Ok(_) => {
                log::warn!("Encoder does not support {format}, falling back to PNG");
                self.encode_png_fallback(
                    pixels,
                    settings,
                    EncodeFallback::FormatSubstituted { requested: format },
                )
            }
            Err(e) => {
                log::warn!("Error encoding image as {format}: {e}; falling back to PNG");
                self.encode_png_fallback(
                    pixels,
                    settings,
                    EncodeFallback::EncoderFailed {
                        requested: format,
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    fn encode_png(&self, pixels: &PixelBuffer, settings: EncodeSettings) -> EncodedImage {
        let quality = settings.quality.value();
        let target: Cow<'_, PixelBuffer> =
            match png_compression_dimensions(pixels.width(), pixels.height(), quality) {
                Some((w, h)) => {
                    log::debug!(
                        "PNG compression: quality {quality} → {}x{} to {w}x{h}",
                        pixels.width(),
                        pixels.height()
                    );
                    Cow::Owned(self.backend.resample(pixels, w, h))
                }
                None => Cow::Borrowed(pixels),
            };
        self.write_png(&target, settings, None)
    }

    fn encode_png_fallback(
        &self,
        pixels: &PixelBuffer,
        settings: EncodeSettings,
        fallback: EncodeFallback,
    ) -> EncodedImage {
        self.write_png(pixels, settings, Some(fallback))
    }

    fn write_png(
        &self,
        pixels: &PixelBuffer,
        settings: EncodeSettings,
        fallback: Option<EncodeFallback>,
    ) -> EncodedImage {
        let bytes = self
            .backend
            .encode(pixels, OutputFormat::Png, settings.quality)
            .unwrap_or_else(|e| {
                log::error!("PNG encode failed, no output produced: {e}");
                Vec::new()
            });
        EncodedImage {
            bytes,
            format: OutputFormat::Png,
            requested: settings,
            width: pixels.width(),
            height: pixels.height(),
            fallback,
        }
    }
}
