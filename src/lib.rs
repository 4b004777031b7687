//! # Photopro
//!
//! Local photo utility: compress, enhance and convert single images, or bind
//! a list of images and existing PDFs into one PDF. Everything happens on the
//! bytes handed in; nothing is uploaded anywhere.
//!
//! # Architecture: Two Flows
//!
//! ```text
//! Image   bytes → validate → decode → filter → encode   → {prefix}_{name}.{ext}
//! PDF     plan  → assemble image pages → append donor PDFs → {name}_{date}.pdf
//! ```
//!
//! The image flow is driven by [`session::ImageProcessingSession`], which keeps
//! the decoded original around so every settings change re-filters from the
//! source rather than from the previous result. The PDF flow is driven by
//! [`pdf::PdfBuildPlan`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Upload, settings updates, stale-result rejection, download names |
//! | [`imaging`] | Pixel filters, presets, decode/encode strategy with fallbacks |
//! | [`pdf`] | Page geometry, image-page assembly, merging donor PDFs |
//! | [`intake`] | Upload validation: size limit and content sniffing |
//! | [`naming`] | Output file names for each flow |
//! | [`loading`] | Busy indicator seam (`show` / `hide`) around long operations |
//! | [`config`] | `photopro.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting for results |
//!
//! # Design Decisions
//!
//! ## Filters Never Accumulate
//!
//! Brightness, contrast and saturation are always applied to a fresh copy of
//! the original pixels. Dragging a slider back to zero restores the original
//! exactly, and the order of intermediate updates cannot leak into the result.
//!
//! ## The Extension Follows the Bytes
//!
//! When an encoder cannot produce the requested format (WebP is the usual
//! case), the codec falls back and reports it. Download names are derived from
//! the format actually written, never from the one requested.
//!
//! ## Latest Request Wins
//!
//! Every settings update is tagged with a [`session::RequestToken`]. An outcome
//! whose token is older than the latest issued one is dropped, so a slow encode
//! finishing late can never overwrite a newer result.
//!
//! ## Deterministic PDFs
//!
//! Generated documents carry no timestamps or random IDs: the same inputs and
//! settings always give byte-identical output.

pub mod config;
pub mod imaging;
pub mod intake;
pub mod loading;
pub mod naming;
pub mod output;
pub mod pdf;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
