//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, WebP, GIF, BMP) |
//! | **Filter** | brightness → contrast → saturation on RGBA8, `rayon` per pixel |
//! | **Encode** | JPEG / PNG / WebP encoders from `image::codecs` |
//! | **PNG compression** | Lanczos3 downscale driven by the quality knob |
//!
//! The module is split into:
//! - **Filters**: Pure pixel math ([`apply_filters`]) and enhancement presets
//! - **Calculations**: Pure functions for sizing (unit testable)
//! - **Parameters**: Format and quality types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Codec**: [`ImageCodec`] — strategy table, WebP capability check, fallbacks

pub mod backend;
mod calculations;
pub mod codec;
pub mod filters;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodeLimits, DecodedImage, Dimensions, ImageBackend};
pub use calculations::{compression_ratio, png_compression_dimensions};
pub use codec::{CodecError, EncodeFallback, EncodedImage, ImageCodec, sniff_format};
pub use filters::{FilterPreset, FilterSettings, PRESETS, PixelBuffer, apply_filters, find_preset};
pub use params::{EncodeSettings, OutputFormat, Quality};
pub use rust_backend::RustBackend;
