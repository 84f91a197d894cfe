//! Thumbnail pipeline settings.

use std::fmt;
use std::sync::Arc;

use crate::{FileHandle, StoreBackend};

/// Opacity applied to the disclaimer overlay.
pub const DISCLAIMER_OPACITY: f32 = 0.5;

/// Distance of the disclaimer from the top-right corner, in pixels.
pub const DISCLAIMER_OFFSET: u32 = 10;

/// Settings shared by every thumbnail a [`Thumbnailer`](crate::Thumbnailer)
/// produces.
#[derive(Clone)]
pub struct ThumbnailConfig {
    /// Backend thumbnails are written to.
    pub cache: Arc<dyn StoreBackend>,
    /// Image used when a source cannot be decoded.
    pub placeholder: Option<FileHandle>,
    /// Overlay applied when a [`ThumbSpec`](crate::ThumbSpec) requests a watermark.
    pub watermark: Option<FileHandle>,
    /// Default watermark opacity (0 to 1).
    pub watermark_opacity: f32,
    /// Overlay applied when a [`ThumbSpec`](crate::ThumbSpec) requests a disclaimer.
    pub disclaimer: Option<FileHandle>,
    /// Default encoder quality (0 to 1).
    pub quality: f32,
    /// Default output format; `None` keeps the source's extension.
    pub format: Option<String>,
}

impl ThumbnailConfig {
    /// Defaults writing to `cache`.
    pub fn new(cache: Arc<dyn StoreBackend>) -> Self {
        Self {
            cache,
            placeholder: None,
            watermark: None,
            watermark_opacity: 1.0,
            disclaimer: None,
            quality: 0.9,
            format: None,
        }
    }

    /// Fall back to `placeholder` for unreadable sources.
    pub fn with_placeholder(mut self, placeholder: FileHandle) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Overlay `watermark` at `opacity` on request.
    pub fn with_watermark(mut self, watermark: FileHandle, opacity: f32) -> Self {
        self.watermark = Some(watermark);
        self.watermark_opacity = opacity;
        self
    }

    /// Overlay `disclaimer` on request.
    pub fn with_disclaimer(mut self, disclaimer: FileHandle) -> Self {
        self.disclaimer = Some(disclaimer);
        self
    }

    /// Default encoder quality.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Default output format.
    pub fn with_format(mut self, extension: impl Into<String>) -> Self {
        self.format = Some(extension.into());
        self
    }
}

impl fmt::Debug for ThumbnailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailConfig")
            .field("placeholder", &self.placeholder)
            .field("watermark", &self.watermark)
            .field("watermark_opacity", &self.watermark_opacity)
            .field("disclaimer", &self.disclaimer)
            .field("quality", &self.quality)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
