//! Pure calculation functions for encode sizing and size reporting.
//!
//! All functions here are pure and testable without any I/O or images.

/// Quality fraction at or above which PNG output keeps its original resolution.
const PNG_FULL_SIZE_THRESHOLD: f64 = 0.95;

/// Smallest scale PNG compression is allowed to shrink an image to.
const PNG_MIN_SCALE: f64 = 0.3;

/// Calculate the resolution a PNG encode should be written at.
///
/// PNG is lossless, so the quality knob is reinterpreted as a downscale factor:
/// below 95% the image is shrunk by `max(0.3, quality * 0.8)`.
///
/// # Returns
/// * `None` - encode at the original resolution
/// * `Some((width, height))` - resample to these dimensions first
///
/// # Examples
/// ```
/// # use photopro::imaging::png_compression_dimensions;
/// // 50% → scale max(0.3, 0.4) = 0.4
/// assert_eq!(png_compression_dimensions(1000, 1000, 50), Some((400, 400)));
///
/// // 100% → untouched
/// assert_eq!(png_compression_dimensions(1000, 1000, 100), None);
/// ```
pub fn png_compression_dimensions(width: u32, height: u32, quality: u32) -> Option<(u32, u32)> {
    let factor = quality as f64 / 100.0;
    if factor >= PNG_FULL_SIZE_THRESHOLD {
        return None;
    }
    let scale = (factor * 0.8).max(PNG_MIN_SCALE);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    Some((w, h))
}

/// Percentage saved between the original upload and the processed output.
///
/// Returns 0 when either size is missing or the original is empty. Growth
/// yields a negative percentage.
pub fn compression_ratio(original_size: Option<u64>, processed_size: Option<u64>) -> i64 {
    match (original_size, processed_size) {
        (Some(original), Some(processed)) if original > 0 && processed > 0 => {
            let saved = original as f64 - processed as f64;
            (saved / original as f64 * 100.0).round() as i64
        }
        _ => 0,
    }
}
