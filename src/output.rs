//! CLI output formatting for the image and PDF flows.
//!
//! # Output Format
//!
//! ## Image flows
//!
//! ```text
//! beach.png → compressed_beach.jpg
//!     Size: 2.4 MB → 512.3 KB (79% smaller)
//!     Output: jpeg, quality 80, 1200x800
//!     Filters: brightness +10, contrast +15, saturation +10
//!     Note: WebP not supported, wrote JPEG instead
//! ```
//!
//! ## PDF
//!
//! ```text
//! 001 beach.png
//! 002 (pdf) contract.pdf
//! → photos_2024-03-09.pdf (3 inputs, 1.2 MB)
//! ```
//!
//! # Architecture
//!
//! Each flow has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::imaging::{EncodeFallback, FilterPreset, FilterSettings};
use crate::pdf::{PdfBuildPlan, PlanEntry};
use crate::session::ProcessedImage;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size: base 1024, one decimal, trailing `.0` dropped.
///
/// ```
/// use photopro::output::format_file_size;
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(1024 * 1024), "1 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    format!("{rounded} {}", SIZE_UNITS[unit])
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn signed(value: i32) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

fn ratio_note(ratio: i64) -> String {
    match ratio {
        0 => "same size".to_string(),
        r if r > 0 => format!("{r}% smaller"),
        r => format!("{}% larger", -r),
    }
}

fn fallback_note(fallback: &EncodeFallback) -> String {
    match fallback {
        EncodeFallback::WebpUnsupported => "WebP not supported, wrote JPEG instead".to_string(),
        EncodeFallback::FormatSubstituted { requested } => {
            format!("encoder cannot write {requested}, wrote PNG instead")
        }
        EncodeFallback::EncoderFailed { requested, reason } => {
            format!("{requested} encoder failed ({reason}), wrote PNG instead")
        }
    }
}

/// Filter line, or `None` when no adjustment is active.
fn filter_line(filter: &FilterSettings) -> Option<String> {
    if filter.is_identity() {
        return None;
    }
    Some(format!(
        "Filters: brightness {}, contrast {}, saturation {}",
        signed(filter.brightness),
        signed(filter.contrast),
        signed(filter.saturation)
    ))
}

/// Report for one processed image saved as `output_name`.
pub fn format_image_result(image: &ProcessedImage, output_name: &str) -> Vec<String> {
    let mut lines = vec![format!("{} → {}", image.name(), output_name)];
    let Some(encoded) = image.encoded() else {
        lines.push(format!("{}Not processed", indent(1)));
        return lines;
    };

    lines.push(format!(
        "{}Size: {} → {} ({})",
        indent(1),
        format_file_size(image.original_size()),
        format_file_size(encoded.byte_size()),
        ratio_note(image.compression_ratio())
    ));
    lines.push(format!(
        "{}Output: {}, quality {}, {}x{}",
        indent(1),
        encoded.format,
        encoded.requested.quality.value(),
        encoded.width,
        encoded.height
    ));
    if let Some(line) = filter_line(&image.settings().filter) {
        lines.push(format!("{}{line}", indent(1)));
    }
    if let Some(fallback) = &encoded.fallback {
        lines.push(format!("{}Note: {}", indent(1), fallback_note(fallback)));
    }
    lines
}

/// Report for a finished PDF build.
pub fn format_pdf_result(plan: &PdfBuildPlan, output_name: &str, size: u64) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            PlanEntry::Image(img) => format!("{} {}", format_index(i + 1), img.name),
            PlanEntry::Pdf(pdf) => format!("{} (pdf) {}", format_index(i + 1), pdf.name),
        })
        .collect();
    let inputs = match plan.len() {
        1 => "1 input".to_string(),
        n => format!("{n} inputs"),
    };
    lines.push(format!(
        "→ {output_name} ({inputs}, {})",
        format_file_size(size)
    ));
    lines
}

/// One line per preset, for `--help`-style listings.
pub fn format_presets(presets: &[FilterPreset]) -> Vec<String> {
    presets
        .iter()
        .map(|p| {
            format!(
                "{:<16} {} (brightness {}, contrast {}, saturation {})",
                p.slug,
                p.name,
                signed(p.settings.brightness),
                signed(p.settings.contrast),
                signed(p.settings.saturation)
            )
        })
        .collect()
}

pub fn print_image_result(image: &ProcessedImage, output_name: &str) {
    for line in format_image_result(image, output_name) {
        println!("{}", line);
    }
}

pub fn print_pdf_result(plan: &PdfBuildPlan, output_name: &str, size: u64) {
    for line in format_pdf_result(plan, output_name, size) {
        println!("{}", line);
    }
}

pub fn print_presets(presets: &[FilterPreset]) {
    for line in format_presets(presets) {
        println!("{}", line);
    }
}
