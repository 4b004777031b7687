//! Brightness / contrast / saturation adjustment on RGBA8 buffers.
//!
//! Each pixel goes through three fixed stages on `f64` intermediates:
//!
//! ```text
//! brightness   v'   = v + b * 2.55
//! contrast     v''  = (v' - 128) * (c + 100) / 100 + 128
//! saturation   v''' = gray + (v'' - gray) * (s + 100) / 100
//!              gray = 0.299 R'' + 0.587 G'' + 0.114 B''
//! ```
//!
//! Saturation needs all three contrast-adjusted channels at once, so a pixel is
//! always processed as a unit. The result is clamped to `[0, 255]` and rounded
//! half-to-even, which makes `{0, 0, 0}` an exact passthrough. Alpha is never
//! touched.

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Row-major RGBA8 pixel grid. `len == width * height * 4` is guaranteed by
/// [`image::ImageBuffer`].
pub type PixelBuffer = RgbaImage;

/// Range every adjustment is clamped to.
pub const ADJUSTMENT_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// Brightness, contrast and saturation, each in `-100..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

impl FilterSettings {
    pub fn new(brightness: i32, contrast: i32, saturation: i32) -> Self {
        Self {
            brightness: clamp_adjustment(brightness),
            contrast: clamp_adjustment(contrast),
            saturation: clamp_adjustment(saturation),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

fn clamp_adjustment(value: i32) -> i32 {
    value.clamp(*ADJUSTMENT_RANGE.start(), *ADJUSTMENT_RANGE.end())
}

/// A named one-click enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPreset {
    pub name: &'static str,
    pub slug: &'static str,
    pub settings: FilterSettings,
}

pub const PRESETS: &[FilterPreset] = &[
    FilterPreset {
        name: "Auto Enhance",
        slug: "auto-enhance",
        settings: FilterSettings {
            brightness: 10,
            contrast: 15,
            saturation: 10,
        },
    },
    FilterPreset {
        name: "Warm Tone",
        slug: "warm-tone",
        settings: FilterSettings {
            brightness: 5,
            contrast: 10,
            saturation: 20,
        },
    },
    FilterPreset {
        name: "Cool Tone",
        slug: "cool-tone",
        settings: FilterSettings {
            brightness: 0,
            contrast: 10,
            saturation: -10,
        },
    },
    FilterPreset {
        name: "Black & White",
        slug: "black-and-white",
        settings: FilterSettings {
            brightness: 0,
            contrast: 20,
            saturation: -100,
        },
    },
];

/// Look up a preset by slug or display name (case-insensitive).
pub fn find_preset(key: &str) -> Option<&'static FilterPreset> {
    PRESETS
        .iter()
        .find(|p| p.slug.eq_ignore_ascii_case(key) || p.name.eq_ignore_ascii_case(key))
}

/// Apply `settings` to every pixel of `buffer`.
///
/// Consumes the buffer and returns it; callers must treat the returned value
/// as the only live reference.
pub fn apply_filters(mut buffer: PixelBuffer, settings: &FilterSettings) -> PixelBuffer {
    if settings.is_identity() {
        return buffer;
    }

    let brightness = settings.brightness as f64 * 2.55;
    let contrast = (settings.contrast as f64 + 100.0) / 100.0;
    let saturation = (settings.saturation as f64 + 100.0) / 100.0;

    let raw: &mut [u8] = &mut buffer;
    raw.par_chunks_exact_mut(4).for_each(|px| {
        let [r, g, b] = [px[0], px[1], px[2]]
            .map(|v| (v as f64 + brightness - 128.0) * contrast + 128.0);
        let gray = 0.299 * r + 0.587 * g + 0.114 * b;
        px[0] = to_channel(gray + (r - gray) * saturation);
        px[1] = to_channel(gray + (g - gray) * saturation);
        px[2] = to_channel(gray + (b - gray) * saturation);
    });

    buffer
}

#[inline]
fn to_channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0).round_ties_even() as u8
}
