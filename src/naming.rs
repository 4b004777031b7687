//! Download filename conventions.
//!
//! Processed images are saved as `{prefix}_{base}.{ext}` where the prefix
//! names the flow and `ext` is `jpg` for JPEG, otherwise the format name:
//! - `compress` of `beach.png` to JPEG → `compressed_beach.jpg`
//! - `convert` of `scan.bmp` to WebP → `converted_scan.webp`
//!
//! PDFs are named after their content: a single image keeps its base name,
//! anything else is `photos`, both suffixed with the ISO date.

use crate::imaging::OutputFormat;
use chrono::NaiveDate;

/// The three image flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Compress,
    Enhance,
    Convert,
}

impl Flow {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Compress => "compressed",
            Self::Enhance => "enhanced",
            Self::Convert => "converted",
        }
    }
}

/// Strip the final extension from a file name.
///
/// Only the last `.ext` goes, and only when it is non-empty:
/// - `"beach.png"` → `"beach"`
/// - `"archive.tar.gz"` → `"archive.tar"`
/// - `"README"` → `"README"`
/// - `"dir.v2/photo"` → `"dir.v2/photo"`
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Download name for a processed image.
pub fn download_name(flow: Flow, original_name: &str, format: OutputFormat) -> String {
    format!(
        "{}_{}.{}",
        flow.prefix(),
        base_name(original_name),
        format.extension()
    )
}

/// PDF name for a build with the given image names, dated `date`.
pub fn pdf_file_name<S: AsRef<str>>(image_names: &[S], date: NaiveDate) -> String {
    let stamp = date.format("%Y-%m-%d");
    match image_names {
        [single] => format!("{}_{}.pdf", base_name(single.as_ref()), stamp),
        _ => format!("photos_{stamp}.pdf"),
    }
}

/// [`pdf_file_name`] dated today (UTC).
pub fn default_pdf_file_name<S: AsRef<str>>(image_names: &[S]) -> String {
    pdf_file_name(image_names, chrono::Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn base_name_strips_last_extension() {
        assert_eq!(base_name("beach.png"), "beach");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn base_name_without_extension_is_unchanged() {
        assert_eq!(base_name("README"), "README");
        assert_eq!(base_name("trailing."), "trailing.");
        assert_eq!(base_name("dir.v2/photo"), "dir.v2/photo");
    }

    #[test]
    fn base_name_of_dotfile_is_empty() {
        assert_eq!(base_name(".hidden"), "");
    }

    #[test]
    fn compressed_jpeg_uses_jpg() {
        assert_eq!(
            download_name(Flow::Compress, "beach.png", OutputFormat::Jpeg),
            "compressed_beach.jpg"
        );
    }

    #[test]
    fn each_flow_has_its_prefix() {
        assert_eq!(
            download_name(Flow::Enhance, "a.jpg", OutputFormat::Png),
            "enhanced_a.png"
        );
        assert_eq!(
            download_name(Flow::Convert, "scan.bmp", OutputFormat::Webp),
            "converted_scan.webp"
        );
    }

    #[test]
    fn single_image_pdf_keeps_base_name() {
        assert_eq!(pdf_file_name(&["holiday.jpeg"], date()), "holiday_2024-03-09.pdf");
    }

    #[test]
    fn multi_image_pdf_is_photos() {
        assert_eq!(pdf_file_name(&["a.jpg", "b.jpg"], date()), "photos_2024-03-09.pdf");
        let none: [&str; 0] = [];
        assert_eq!(pdf_file_name(&none, date()), "photos_2024-03-09.pdf");
    }

    #[test]
    fn default_name_is_dated() {
        let name = default_pdf_file_name(&["x.png", "y.png"]);
        assert!(name.starts_with("photos_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "photos_YYYY-MM-DD.pdf".len());
    }
}
