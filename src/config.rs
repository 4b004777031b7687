//! Tool configuration module.
//!
//! Handles loading, validating, and merging `photopro.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of them.
//!
//! ## Keys
//!
//! ```toml
//! # Every key is optional; the values below are the stock defaults
//!
//! [image]
//! format = "jpeg"            # jpeg | png | webp
//! quality = 80               # 1-100
//!
//! [limits]
//! max_file_size = 10485760   # Bytes per image upload (10MB)
//!
//! [pdf]
//! page_size = "a4"           # a4 | letter | legal
//! orientation = "portrait"   # portrait | landscape
//! margin = 20.0              # Millimeters on every side
//! fit_mode = "fit-page"      # fit-width | fit-height | fit-page | original
//! quality = 90               # JPEG quality of embedded images
//! add_cover_page = false
//! cover_title = "My PDF"
//! add_page_numbers = false
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Sparse Files
//!
//! A file only needs the keys it changes:
//!
//! ```toml
//! [pdf]
//! page_size = "letter"
//! add_page_numbers = true
//! ```
//!
//! A misspelled key is an error, not a silent no-op.

use crate::imaging::{EncodeSettings, FilterSettings, OutputFormat, Quality};
use crate::intake::DEFAULT_MAX_FILE_SIZE;
use crate::pdf::PdfSettings;
use crate::session::ImageSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "photopro.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `photopro.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Default encode settings for the image flows.
    pub image: ImageConfig,
    /// Upload limits.
    pub limits: LimitsConfig,
    /// Page layout for the PDF flow.
    pub pdf: PdfSettings,
    /// Worker pool sizing.
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Reject values the flows cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.image.quality) {
            return Err(ConfigError::Validation(
                "image.quality must be 1-100".into(),
            ));
        }
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "limits.max_file_size must be non-zero".into(),
            ));
        }
        self.pdf
            .validate()
            .map_err(|e| ConfigError::Validation(format!("[pdf] {e}")))
    }

    /// Settings a freshly uploaded image is processed with.
    pub fn session_defaults(&self) -> ImageSettings {
        ImageSettings {
            filter: FilterSettings::default(),
            encode: self.image.encode_settings(),
        }
    }
}

/// Default encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    pub format: OutputFormat,
    pub quality: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        let defaults = EncodeSettings::default();
        Self {
            format: defaults.format,
            quality: defaults.quality.value(),
        }
    }
}

impl ImageConfig {
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            format: self.format,
            quality: Quality::new(self.quality),
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum image upload size in bytes. PDFs are not limited.
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Worker pool sizing for image preparation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for the rayon pool: `max_processes` clamped to `1..=cores`,
/// or every core when unset.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// [`ToolConfig::default`] as a TOML table, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`. Tables merge per key, recursively; any other
/// overlay value replaces the base value outright. Base-only keys survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge, deserialize and validate in one step.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it is absent.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("Loaded config from {}", path.display());
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `photopro.toml` with all keys and explanations.
///
/// Printed by `photopro gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# photopro configuration
# ======================
# Every key is optional and shows its default value. Delete what you do not
# want to change. Misspelled keys are reported as errors.

# ---------------------------------------------------------------------------
# Image flows (compress / enhance / convert)
# ---------------------------------------------------------------------------
[image]
# Output format when none is given on the command line: jpeg, png or webp.
# WebP falls back to JPEG if the encoder cannot produce it.
format = "jpeg"

# Encode quality, 1-100. For PNG this drives a downscale instead:
# below 95 the image is resized to max(30%, quality * 0.8) of its size.
quality = 80

# ---------------------------------------------------------------------------
# Upload limits
# ---------------------------------------------------------------------------
[limits]
# Maximum image size in bytes (10MB). PDFs added to a build are not limited.
max_file_size = 10485760

# ---------------------------------------------------------------------------
# PDF flow
# ---------------------------------------------------------------------------
[pdf]
# a4 (210x297mm), letter (216x279mm) or legal (216x356mm).
page_size = "a4"

# portrait or landscape.
orientation = "portrait"

# Blank border on every side, in millimeters.
margin = 20.0

# fit-width:  shrink to the printable width if wider
# fit-height: shrink to the printable height if taller
# fit-page:   largest size that fits, enlarging small images
# original:   natural size unless it overflows, then like fit-page
fit_mode = "fit-page"

# JPEG quality of embedded images, 1-100.
quality = 90

# Leading page with a centered title.
add_cover_page = false
cover_title = "My PDF"

# "n / total" at the bottom of every image page. The cover is not counted.
add_page_numbers = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for PDF image preparation and filtering.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
