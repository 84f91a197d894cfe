//! Thumbnail parameters and cache-entry naming.

use image::ImageFormat;
use regex::Regex;

use crate::{StoreError, StorePath};

/// Directory placeholder thumbnails are cached under.
pub const PLACEHOLDER_DIR: &str = "noimage";

/// Requested derivative of a source image.
///
/// Unset optional fields fall back to the
/// [`ThumbnailConfig`](crate::ThumbnailConfig) defaults.
///
/// ```rust
/// use anystore::ThumbSpec;
///
/// let spec = ThumbSpec::new(200, 100).watermark(true).format("png");
/// assert_eq!(spec.width, 200);
/// assert!(spec.watermark);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThumbSpec {
    /// Target width; 0 scales by height alone.
    pub width: u32,
    /// Target height; 0 scales by width alone.
    pub height: u32,
    /// Apply the configured watermark.
    pub watermark: bool,
    /// Watermark opacity override (0 to 1).
    pub watermark_opacity: Option<f32>,
    /// Apply the configured disclaimer.
    pub disclaimer: bool,
    /// Encoder quality override (0 to 1).
    pub quality: Option<f32>,
    /// Output format override, as a file extension.
    pub format: Option<String>,
}

impl ThumbSpec {
    /// Plain resize to `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            watermark: false,
            watermark_opacity: None,
            disclaimer: false,
            quality: None,
            format: None,
        }
    }

    /// Request the watermark.
    pub fn watermark(mut self, enabled: bool) -> Self {
        self.watermark = enabled;
        self
    }

    /// Override the watermark opacity.
    pub fn watermark_opacity(mut self, opacity: f32) -> Self {
        self.watermark_opacity = Some(opacity);
        self
    }

    /// Request the disclaimer.
    pub fn disclaimer(mut self, enabled: bool) -> Self {
        self.disclaimer = enabled;
        self
    }

    /// Override the encoder quality.
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Override the output format.
    pub fn format(mut self, extension: impl Into<String>) -> Self {
        self.format = Some(extension.into());
        self
    }
}

/// Encodable output format for a file extension.
///
/// # Errors
///
/// - [`StoreError::ConfigError`] if the extension names no supported encoder
pub(crate) fn output_format(extension: &str) -> Result<ImageFormat, StoreError> {
    match ImageFormat::from_extension(extension) {
        Some(
            format @ (ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::Gif
            | ImageFormat::Bmp
            | ImageFormat::WebP),
        ) => Ok(format),
        _ => Err(StoreError::config(format!(
            "unsupported thumbnail format {extension:?}"
        ))),
    }
}

/// Map quality 0..=1 onto the encoder scale 1..=100.
pub(crate) fn encoder_quality(quality: f32) -> u8 {
    let q = if quality.is_nan() { 1.0 } else { quality.clamp(0.0, 1.0) };
    (q * 99.0).round() as u8 + 1
}

/// Cache file name for a source stem.
pub(crate) fn thumb_name(
    stem: &str,
    width: u32,
    height: u32,
    watermark: bool,
    disclaimer: bool,
    extension: &str,
) -> String {
    let w = if watermark { "~w" } else { "" };
    let d = if disclaimer { "~d" } else { "" };
    format!("{stem}~{width}x{height}{w}{d}.{extension}")
}

/// Cache path of a thumbnail of `source`.
pub(crate) fn thumb_path(
    source: &StorePath,
    width: u32,
    height: u32,
    watermark: bool,
    disclaimer: bool,
    extension: &str,
) -> Result<StorePath, StoreError> {
    let stem = source
        .stem()
        .ok_or(StoreError::RootPathForbidden { operation: "thumbnail" })?;
    let dir = source.parent().unwrap_or_default();
    dir.join(&thumb_name(stem, width, height, watermark, disclaimer, extension))
}

/// Cache path of a placeholder thumbnail.
pub(crate) fn placeholder_path(
    placeholder: &StorePath,
    width: u32,
    height: u32,
    extension: &str,
) -> Result<StorePath, StoreError> {
    let stem = placeholder
        .stem()
        .ok_or(StoreError::RootPathForbidden { operation: "thumbnail" })?;
    StorePath::parse(PLACEHOLDER_DIR)?.join(&thumb_name(stem, width, height, false, false, extension))
}

/// Pattern matching every cached thumbnail of a source stem.
pub(crate) fn cache_pattern(stem: &str) -> Result<Regex, StoreError> {
    let pattern = format!(
        r"^{}~\d+x\d+(?:~w)?(?:~d)?\.[A-Za-z0-9]+$",
        regex::escape(stem)
    );
    Regex::new(&pattern).map_err(|e| StoreError::config_with("invalid thumbnail pattern", e))
}
