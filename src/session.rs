//! One image's lifecycle: upload → encode → re-encode on every settings change.
//!
//! ## States
//!
//! ```text
//! Empty ──upload──▶ Loaded ──encode──▶ Processed ◀─┐
//!   ▲                                      │       │ update_settings
//!   └──────────────reset───────────────────┘───────┘
//! ```
//!
//! A session holds at most one [`ProcessedImage`]. Every upload and every
//! settings change issues a new [`RequestToken`]; an encode result is only
//! installed if its token is still the latest one issued, so a slow encode for
//! old settings can never overwrite a newer result.
//!
//! ## Splitting the work
//!
//! [`ImageProcessingSession::update_settings`] does everything inline. Hosts
//! that encode off the main thread use the three steps separately:
//!
//! 1. [`prepare_update`](ImageProcessingSession::prepare_update) — merge the
//!    update, issue a token, return an [`EncodeJob`]
//! 2. [`EncodeJob::run`] — filter a copy of the original pixels and encode;
//!    needs only a shared codec reference
//! 3. [`apply`](ImageProcessingSession::apply) — install the outcome if it is
//!    still current
//!
//! Filters always start from the originally decoded pixels, never from a
//! previous result.

use crate::imaging::{
    CodecError, DecodeLimits, Dimensions, EncodeSettings, EncodedImage, FilterSettings,
    ImageBackend, ImageCodec, OutputFormat, PixelBuffer, Quality, RustBackend, apply_filters,
    compression_ratio,
};
use crate::intake::{self, DEFAULT_MAX_FILE_SIZE, ValidationError};
use crate::loading::{self, LoadingSignal, LogSignal};
use crate::naming::{self, Flow};
use image::ImageFormat;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("No image loaded")]
    NoImage,
}

/// Everything that drives one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSettings {
    pub filter: FilterSettings,
    pub encode: EncodeSettings,
}

impl ImageSettings {
    /// State transition: `(old, partial) -> new`. Unset fields keep their value.
    pub fn apply(self, update: &SettingsUpdate) -> Self {
        let filter = FilterSettings::new(
            update.brightness.unwrap_or(self.filter.brightness),
            update.contrast.unwrap_or(self.filter.contrast),
            update.saturation.unwrap_or(self.filter.saturation),
        );
        let encode = EncodeSettings {
            format: update.format.unwrap_or(self.encode.format),
            quality: update.quality.unwrap_or(self.encode.quality),
        };
        Self { filter, encode }
    }
}

/// Partial settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsUpdate {
    pub brightness: Option<i32>,
    pub contrast: Option<i32>,
    pub saturation: Option<i32>,
    pub format: Option<OutputFormat>,
    pub quality: Option<Quality>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brightness(mut self, value: i32) -> Self {
        self.brightness = Some(value);
        self
    }

    pub fn contrast(mut self, value: i32) -> Self {
        self.contrast = Some(value);
        self
    }

    pub fn saturation(mut self, value: i32) -> Self {
        self.saturation = Some(value);
        self
    }

    /// Set all three adjustments at once (presets, "reset filters").
    pub fn filters(self, settings: FilterSettings) -> Self {
        self.brightness(settings.brightness)
            .contrast(settings.contrast)
            .saturation(settings.saturation)
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Identifies one issued encode request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Processed,
}

/// The live image: source, decoded pixels, and the current encode.
#[derive(Debug)]
pub struct ProcessedImage {
    name: String,
    source_bytes: Vec<u8>,
    source_format: Option<ImageFormat>,
    original: Arc<PixelBuffer>,
    settings: ImageSettings,
    encoded: Option<(ImageSettings, EncodedImage)>,
}

impl ProcessedImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.original.width(),
            height: self.original.height(),
        }
    }

    pub fn original_pixels(&self) -> &PixelBuffer {
        &self.original
    }

    /// Latest requested settings (may be ahead of [`encoded`](Self::encoded)).
    pub fn settings(&self) -> ImageSettings {
        self.settings
    }

    pub fn encoded(&self) -> Option<&EncodedImage> {
        self.encoded.as_ref().map(|(_, e)| e)
    }

    /// Settings that produced [`encoded`](Self::encoded).
    pub fn encoded_settings(&self) -> Option<ImageSettings> {
        self.encoded.as_ref().map(|(s, _)| *s)
    }

    pub fn original_size(&self) -> u64 {
        self.source_bytes.len() as u64
    }

    pub fn processed_size(&self) -> Option<u64> {
        self.encoded().map(EncodedImage::byte_size)
    }

    /// `round((original - processed) / original * 100)`, or 0 before the first encode.
    pub fn compression_ratio(&self) -> i64 {
        compression_ratio(Some(self.original_size()), self.processed_size())
    }
}

/// A unit of encode work detached from the session.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    token: RequestToken,
    original: Arc<PixelBuffer>,
    settings: ImageSettings,
}

impl EncodeJob {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn settings(&self) -> ImageSettings {
        self.settings
    }

    /// Filter a fresh copy of the original pixels and encode it.
    pub fn run<B: ImageBackend>(self, codec: &ImageCodec<B>) -> EncodeOutcome {
        let filtered = apply_filters(PixelBuffer::clone(&self.original), &self.settings.filter);
        let encoded = codec.encode(&filtered, self.settings.encode);
        EncodeOutcome {
            token: self.token,
            settings: self.settings,
            encoded,
        }
    }
}

/// Finished encode waiting to be applied.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub token: RequestToken,
    pub settings: ImageSettings,
    pub encoded: EncodedImage,
}

/// Orchestrates decode, filter and encode for a single image at a time.
pub struct ImageProcessingSession<B: ImageBackend = RustBackend> {
    codec: ImageCodec<B>,
    image: Option<ProcessedImage>,
    last_issued: u64,
    defaults: ImageSettings,
    max_file_size: u64,
    signal: Arc<dyn LoadingSignal>,
}

impl ImageProcessingSession<RustBackend> {
    pub fn new() -> Self {
        Self::with_codec(ImageCodec::new())
    }
}

impl Default for ImageProcessingSession<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend> ImageProcessingSession<B> {
    pub fn with_codec(codec: ImageCodec<B>) -> Self {
        Self {
            codec,
            image: None,
            last_issued: 0,
            defaults: ImageSettings::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            signal: Arc::new(LogSignal),
        }
    }

    /// Settings every upload starts from.
    pub fn with_defaults(mut self, defaults: ImageSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_decode_limits(mut self, limits: DecodeLimits) -> Self {
        self.codec = self.codec.with_limits(limits);
        self
    }

    pub fn with_signal(mut self, signal: Arc<dyn LoadingSignal>) -> Self {
        self.signal = signal;
        self
    }

    pub fn codec(&self) -> &ImageCodec<B> {
        &self.codec
    }

    pub fn state(&self) -> SessionState {
        match &self.image {
            None => SessionState::Empty,
            Some(img) if img.encoded.is_none() => SessionState::Loaded,
            Some(_) => SessionState::Processed,
        }
    }

    pub fn current(&self) -> Option<&ProcessedImage> {
        self.image.as_ref()
    }

    pub fn compression_ratio(&self) -> i64 {
        self.image
            .as_ref()
            .map(ProcessedImage::compression_ratio)
            .unwrap_or(0)
    }

    fn issue_token(&mut self) -> RequestToken {
        self.last_issued += 1;
        RequestToken(self.last_issued)
    }

    /// Replace any current image with `bytes` and encode it with the defaults.
    ///
    /// On validation or decode failure the session is left `Empty`.
    pub fn upload(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<&ProcessedImage, SessionError> {
        let signal = Arc::clone(&self.signal);
        let _loading = loading::scoped(signal.as_ref(), "Loading image...");

        self.reset();
        intake::validate_image(&bytes, self.max_file_size)?;
        let decoded = self.codec.decode(&bytes)?;

        let name = name.into();
        log::debug!(
            "Loaded {name}: {}x{} ({} bytes)",
            decoded.pixels.width(),
            decoded.pixels.height(),
            bytes.len()
        );
        self.image = Some(ProcessedImage {
            name,
            source_bytes: bytes,
            source_format: decoded.source_format,
            original: Arc::new(decoded.pixels),
            settings: self.defaults,
            encoded: None,
        });

        let job = self.prepare_update(&SettingsUpdate::default())?;
        let outcome = job.run(&self.codec);
        self.apply(outcome);
        self.current().ok_or(SessionError::NoImage)
    }

    /// Merge `update` into the current settings and re-encode from the original.
    pub fn update_settings(
        &mut self,
        update: &SettingsUpdate,
    ) -> Result<&ProcessedImage, SessionError> {
        let signal = Arc::clone(&self.signal);
        let _loading = loading::scoped(signal.as_ref(), "Processing image...");

        let job = self.prepare_update(update)?;
        let outcome = job.run(&self.codec);
        self.apply(outcome);
        self.current().ok_or(SessionError::NoImage)
    }

    /// Issue a new request for `update` without running it.
    ///
    /// The merged settings become the session's current settings right away,
    /// so successive partial updates compose even while encodes are in flight.
    pub fn prepare_update(&mut self, update: &SettingsUpdate) -> Result<EncodeJob, SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        let token = self.issue_token();
        let image = self.image.as_mut().ok_or(SessionError::NoImage)?;
        image.settings = image.settings.apply(update);
        Ok(EncodeJob {
            token,
            original: Arc::clone(&image.original),
            settings: image.settings,
        })
    }

    /// Install `outcome` if it answers the most recent request.
    ///
    /// Returns `false` (and drops the outcome) when a newer request, upload,
    /// or reset has been issued since.
    pub fn apply(&mut self, outcome: EncodeOutcome) -> bool {
        if outcome.token != RequestToken(self.last_issued) {
            log::debug!(
                "Discarding stale encode {:?} (latest is {})",
                outcome.token,
                self.last_issued
            );
            return false;
        }
        let Some(image) = self.image.as_mut() else {
            return false;
        };
        if let Some(fallback) = &outcome.encoded.fallback {
            log::debug!("Encode used fallback: {fallback:?}");
        }
        image.encoded = Some((outcome.settings, outcome.encoded));
        true
    }

    /// Drop the current image and invalidate any in-flight work.
    pub fn reset(&mut self) {
        self.image = None;
        self.issue_token();
    }

    /// Suggested download name for the current encode.
    pub fn download_name(&self, flow: Flow) -> Option<String> {
        let image = self.image.as_ref()?;
        let encoded = image.encoded()?;
        Some(naming::download_name(flow, image.name(), encoded.format))
    }
}
