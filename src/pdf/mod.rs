//! Image-to-PDF assembly and merging.
//!
//! ```text
//! PdfBuildPlan ──build──▶ merger::merge ──▶ bytes
//!                              │
//!              images ─────────┼──▶ assembler::build (one page per image)
//!              donor PDFs ─────┘    pages appended verbatim, in order
//! ```
//!
//! Layout is computed in millimeters by [`geometry`] and converted to PDF
//! points only when content streams are written. Documents are written with
//! `lopdf`; no timestamps or random IDs are embedded, so identical input
//! produces identical bytes.

pub mod assembler;
pub mod geometry;
pub mod merger;
mod text;

pub use assembler::build;
pub use geometry::{Placement, page_dimensions, place_image};
pub use merger::merge;

use crate::imaging::Quality;
use crate::intake::{self, MediaKind, ValidationError};
use crate::loading::{self, LoadingSignal, LogSignal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("No images or PDFs to combine")]
    NoContent,
    #[error("None of the inputs produced a page")]
    EmptyDocument,
    #[error("Invalid page layout: {0}")]
    InvalidSettings(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// How an image is scaled into the printable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Shrink to the available width if wider; never enlarge.
    FitWidth,
    /// Shrink to the available height if taller; never enlarge.
    FitHeight,
    /// Largest size that fits both axes, enlarging if needed.
    #[default]
    FitPage,
    /// Natural size, shrunk like `FitPage` only on overflow.
    Original,
}

pub const DEFAULT_COVER_TITLE: &str = "My PDF";

/// Page layout for a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfSettings {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Millimeters on every side.
    pub margin: f64,
    pub fit_mode: FitMode,
    /// JPEG quality for embedded images.
    pub quality: Quality,
    pub add_cover_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_title: Option<String>,
    pub add_page_numbers: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: 20.0,
            fit_mode: FitMode::FitPage,
            quality: Quality::new(90),
            add_cover_page: false,
            cover_title: None,
            add_page_numbers: false,
        }
    }
}

impl PdfSettings {
    pub fn cover_title(&self) -> &str {
        self.cover_title.as_deref().unwrap_or(DEFAULT_COVER_TITLE)
    }

    /// Rejects margins that leave no printable area on the chosen page.
    pub fn validate(&self) -> Result<(), PdfError> {
        let margin = self.margin;
        if !margin.is_finite() || margin < 0.0 {
            return Err(PdfError::InvalidSettings(
                "margin must be a non-negative number".into(),
            ));
        }
        let (w, h) = page_dimensions(self.page_size, self.orientation);
        if margin * 2.0 >= w.min(h) {
            return Err(PdfError::InvalidSettings(format!(
                "margin {margin}mm leaves no printable area on a {w}x{h}mm page"
            )));
        }
        Ok(())
    }
}

/// An image queued for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageForPdf {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageForPdf {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// A donor document whose pages are appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPdf {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ExternalPdf {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// One row in the plan as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry {
    Image(ImageForPdf),
    Pdf(ExternalPdf),
}

impl PlanEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Image(img) => &img.name,
            Self::Pdf(pdf) => &pdf.name,
        }
    }
}

/// User-ordered list of inputs plus layout settings.
///
/// Images become pages in list order; donor PDFs are always appended after
/// every image page, in their own list order.
#[derive(Debug, Clone, Default)]
pub struct PdfBuildPlan {
    entries: Vec<PlanEntry>,
    pub settings: PdfSettings,
    max_file_size: Option<u64>,
}

impl PdfBuildPlan {
    pub fn new(settings: PdfSettings) -> Self {
        Self {
            entries: Vec::new(),
            settings,
            max_file_size: None,
        }
    }

    /// Per-image size limit enforced by [`add_file`](Self::add_file).
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn add_image(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.push(PlanEntry::Image(ImageForPdf::new(name, bytes)));
    }

    pub fn add_pdf(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.push(PlanEntry::Pdf(ExternalPdf::new(name, bytes)));
    }

    /// Validate and queue an upload, classifying it by content.
    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<MediaKind, ValidationError> {
        let limit = self.max_file_size.unwrap_or(intake::DEFAULT_MAX_FILE_SIZE);
        let kind = intake::validate_pdf_input(&bytes, limit)?;
        if kind.is_image() {
            self.add_image(name, bytes);
        } else {
            self.add_pdf(name, bytes);
        }
        Ok(kind)
    }

    /// Remove and return the entry at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<PlanEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Move the entry at `from` so it ends up at `to`. Out-of-range indices
    /// leave the plan unchanged and return `false`.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageForPdf> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::Image(img) => Some(img),
            PlanEntry::Pdf(_) => None,
        })
    }

    pub fn pdfs(&self) -> impl Iterator<Item = &ExternalPdf> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::Pdf(pdf) => Some(pdf),
            PlanEntry::Image(_) => None,
        })
    }

    /// Default download name, from the image names.
    pub fn default_file_name(&self) -> String {
        let names: Vec<&str> = self.images().map(|img| img.name.as_str()).collect();
        crate::naming::default_pdf_file_name(&names)
    }

    /// Assemble and merge everything into one document.
    pub fn build(&self) -> Result<Vec<u8>, PdfError> {
        self.build_with_signal(&LogSignal)
    }

    /// [`build`](Self::build), announcing progress on `signal`.
    pub fn build_with_signal(&self, signal: &dyn LoadingSignal) -> Result<Vec<u8>, PdfError> {
        let _loading = loading::scoped(signal, "Creating PDF...");
        let images: Vec<ImageForPdf> = self.images().cloned().collect();
        let pdfs: Vec<ExternalPdf> = self.pdfs().cloned().collect();
        merge(&images, &pdfs, &self.settings)
    }
}
