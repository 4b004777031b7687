//! Parameter types for encode operations.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between the [`codec`](super::codec) (which decides the strategy and the
//! fallbacks) and the [`backend`](super::backend) (which does the byte work).
//!
//! ## Types
//!
//! - [`Quality`] — Encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`] — The three formats the tool writes: JPEG, PNG, WebP.
//! - [`EncodeSettings`] — Format + quality pair requested by the caller.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for image encoding (1-100).
///
/// Lossy encoders receive it directly. For PNG it is reinterpreted as a
/// downscale factor (see [`png_compression_dimensions`](super::calculations::png_compression_dimensions)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the 0.0–1.0 fraction lossy encoders are usually specified in.
    pub fn fraction(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Output formats the encoder can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// File extension used for downloads. JPEG is written as `.jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
        }
    }

    /// Map a sniffed container format back onto an output format.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }

    /// Quality used when converting to this format without an explicit one:
    /// 95 for JPEG, otherwise 100.
    pub fn default_conversion_quality(self) -> Quality {
        match self {
            Self::Jpeg => Quality::new(95),
            Self::Png | Self::Webp => Quality::new(100),
        }
    }

    /// Whether the encoder for this format takes a quality parameter.
    pub fn is_lossy(self) -> bool {
        !matches!(self, Self::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        };
        f.write_str(name)
    }
}

/// Requested encode: target format and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub format: OutputFormat,
    pub quality: Quality,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::new(80),
        }
    }
}
