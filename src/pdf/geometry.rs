//! Page sizes and image placement, all in millimeters.
//!
//! Image pixel counts are taken as millimeters when sizing, so `Original`
//! places a 100×50 image as a 100×50mm rectangle. Placement origin is the
//! top-left corner of the page; [`Placement::to_points`] flips to PDF user
//! space.

use super::{FitMode, Orientation, PageSize};

/// PDF points per millimeter.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Page width and height in millimeters.
pub fn page_dimensions(size: PageSize, orientation: Orientation) -> (f64, f64) {
    let (w, h) = match size {
        PageSize::A4 => (210.0, 297.0),
        PageSize::Letter => (216.0, 279.0),
        PageSize::Legal => (216.0, 356.0),
    };
    match orientation {
        Orientation::Portrait => (w, h),
        Orientation::Landscape => (h, w),
    }
}

/// Where an image lands on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    /// From the left edge.
    pub x: f64,
    /// From the top edge.
    pub y: f64,
}

impl Placement {
    /// `(x, y, width, height)` in points, `y` measured from the bottom edge.
    pub fn to_points(&self, page_height_mm: f64) -> (f64, f64, f64, f64) {
        (
            mm_to_pt(self.x),
            mm_to_pt(page_height_mm - self.y - self.height),
            mm_to_pt(self.width),
            mm_to_pt(self.height),
        )
    }
}

/// Fit an `image_w × image_h` image into the page minus `margin` per side and
/// center it in that area.
pub fn place_image(
    image_w: f64,
    image_h: f64,
    page_w: f64,
    page_h: f64,
    margin: f64,
    fit_mode: FitMode,
) -> Placement {
    let available_w = page_w - margin * 2.0;
    let available_h = page_h - margin * 2.0;
    let fit_both = || {
        let ratio = (available_w / image_w).min(available_h / image_h);
        (image_w * ratio, image_h * ratio)
    };

    let (width, height) = match fit_mode {
        FitMode::FitWidth if image_w > available_w => {
            (available_w, image_h * available_w / image_w)
        }
        FitMode::FitHeight if image_h > available_h => {
            (image_w * available_h / image_h, available_h)
        }
        FitMode::FitPage => fit_both(),
        FitMode::Original if image_w > available_w || image_h > available_h => fit_both(),
        _ => (image_w, image_h),
    };

    Placement {
        width,
        height,
        x: margin + (available_w - width) / 2.0,
        y: margin + (available_h - height) / 2.0,
    }
}
