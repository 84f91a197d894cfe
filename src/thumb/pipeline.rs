//! Thumbnail generation and cache invalidation.

use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use super::config::ThumbnailConfig;
use super::file::{ThumbFile, ThumbOutcome};
use super::ops;
use super::spec::{
    ThumbSpec, cache_pattern, encoder_quality, output_format, placeholder_path, thumb_path,
};
use crate::{ErrorKind, FileHandle, ListFilter, StoreError, StoreExt, StorePath};

const DEFAULT_FORMAT: &str = "jpg";

/// Everything one attempt needs, resolved before any I/O.
#[derive(Debug)]
struct Plan {
    source: FileHandle,
    target: StorePath,
    width: u32,
    height: u32,
    format: ImageFormat,
    quality: u8,
    opacity: f32,
    watermark: bool,
    disclaimer: bool,
    placeholder: bool,
}

/// Derives and caches thumbnails.
///
/// A cache entry is reused while it is at least as new as its source; a
/// source that cannot be decoded is replaced by the configured placeholder.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use anystore::{FileHandle, LocalBackend, StoreBackend, ThumbSpec, ThumbnailConfig, Thumbnailer};
///
/// let files: Arc<dyn StoreBackend> = Arc::new(LocalBackend::open("/srv/files")?);
/// let cache: Arc<dyn StoreBackend> = Arc::new(LocalBackend::open("/srv/cache")?);
/// let thumbs = Thumbnailer::new(ThumbnailConfig::new(cache));
///
/// let photo = FileHandle::parse(files, "gallery/cat.jpg")?;
/// let thumb = thumbs.process(&photo, &ThumbSpec::new(200, 100))?;
/// assert_eq!(thumb.handle().path().to_string(), "gallery/cat~200x100.jpg");
/// # Ok::<(), anystore::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Thumbnailer {
    config: ThumbnailConfig,
}

impl Thumbnailer {
    /// Pipeline using `config`.
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// The pipeline settings.
    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    /// Cache path a request would use, without touching any backend.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] for an unsupported output format
    /// - [`StoreError::RootPathForbidden`] if `source` is the root
    pub fn cache_path(&self, source: &FileHandle, spec: &ThumbSpec) -> Result<StorePath, StoreError> {
        Ok(self.plan(source, spec, false)?.target)
    }

    fn plan(&self, source: &FileHandle, spec: &ThumbSpec, placeholder: bool) -> Result<Plan, StoreError> {
        let extension = spec
            .format
            .as_deref()
            .or(self.config.format.as_deref())
            .or_else(|| source.extension())
            .unwrap_or(DEFAULT_FORMAT)
            .to_ascii_lowercase();
        let format = output_format(&extension)?;
        let watermark = !placeholder && spec.watermark && self.config.watermark.is_some();
        let disclaimer = !placeholder && spec.disclaimer && self.config.disclaimer.is_some();
        let target = if placeholder {
            placeholder_path(source.path(), spec.width, spec.height, &extension)?
        } else {
            thumb_path(
                source.path(),
                spec.width,
                spec.height,
                watermark,
                disclaimer,
                &extension,
            )?
        };
        Ok(Plan {
            source: source.clone(),
            target,
            width: spec.width,
            height: spec.height,
            format,
            quality: encoder_quality(spec.quality.unwrap_or(self.config.quality)),
            opacity: spec.watermark_opacity.unwrap_or(self.config.watermark_opacity),
            watermark,
            disclaimer,
            placeholder,
        })
    }

    /// Return the thumbnail of `source`, generating it if missing or stale.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] for an unsupported output format
    /// - [`StoreError::SourceUnreadable`] if neither the source nor the
    ///   placeholder can be decoded
    /// - [`StoreError::TransformFailed`] if a step after decoding fails
    pub fn process(&self, source: &FileHandle, spec: &ThumbSpec) -> Result<ThumbFile, StoreError> {
        let plan = self.plan(source, spec, false)?;
        match self.run(&plan) {
            Err(e) if e.kind() == ErrorKind::SourceUnreadable => {
                let Some(placeholder) = &self.config.placeholder else {
                    return Err(e);
                };
                debug!(source = %source, placeholder = %placeholder, error = %e, "falling back to placeholder");
                let plan = self.plan(placeholder, spec, true)?;
                self.run(&plan)
            }
            other => other,
        }
    }

    fn run(&self, plan: &Plan) -> Result<ThumbFile, StoreError> {
        let entry = FileHandle::new(self.config.cache.clone(), plan.target.clone());
        let done = |outcome| ThumbFile {
            handle: entry.clone(),
            source: plan.source.clone(),
            placeholder: plan.placeholder,
            outcome,
            watermarked: plan.watermark,
            disclaimed: plan.disclaimer,
        };

        let source_mtime = plan.source.mtime().map_err(unreadable)?;
        if entry.exists()? && entry.mtime()? >= source_mtime {
            debug!(entry = %entry, "thumbnail fresh");
            return Ok(done(ThumbOutcome::Fresh));
        }

        debug!(source = %plan.source, "decoding");
        let bytes = plan.source.contents().map_err(unreadable)?;
        let img = image::load_from_memory(&bytes).map_err(|e| StoreError::SourceUnreadable {
            path: plan.source.path().clone(),
            source: e.into(),
        })?;

        debug!(source = %plan.source, width = plan.width, height = plan.height, "transforming");
        let img = ops::resize(img, plan.width, plan.height);
        let img = self.overlay(plan, img)?;

        debug!(entry = %entry, format = ?plan.format, "encoding");
        let encoded = ops::encode(&img, plan.format, plan.quality).map_err(|e| {
            StoreError::TransformFailed {
                path: plan.source.path().clone(),
                stage: "encode",
                source: e.into(),
            }
        })?;
        entry.put_contents(&encoded)?;
        debug!(entry = %entry, bytes = encoded.len(), "thumbnail written");
        Ok(done(ThumbOutcome::Written))
    }

    /// Apply the watermark and disclaimer steps the plan calls for.
    fn overlay(&self, plan: &Plan, img: DynamicImage) -> Result<DynamicImage, StoreError> {
        if !plan.watermark && !plan.disclaimer {
            return Ok(img);
        }
        let mut canvas = img.into_rgba8();
        if let (true, Some(mark)) = (plan.watermark, &self.config.watermark) {
            let mark = load_overlay(plan, mark, "watermark")?;
            ops::apply_watermark(&mut canvas, &mark, plan.opacity);
        }
        if let (true, Some(mark)) = (plan.disclaimer, &self.config.disclaimer) {
            let mark = load_overlay(plan, mark, "disclaimer")?;
            ops::apply_disclaimer(&mut canvas, &mark);
        }
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// Delete every cached thumbnail of `source`.
    ///
    /// Returns the number of entries removed. Entries that vanish during the
    /// scan are skipped.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] if `source` is the root
    pub fn clear(&self, source: &FileHandle) -> Result<usize, StoreError> {
        let stem = source
            .stem()
            .ok_or(StoreError::RootPathForbidden { operation: "clear" })?;
        let dir = source.path().parent().unwrap_or_default();
        let filter = ListFilter::new().files_only().name_regex(cache_pattern(stem)?);
        let entries = match self.config.cache.list(&dir, &filter) {
            Ok(entries) => entries,
            Err(StoreError::NotFound { .. }) => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            match self.config.cache.delete(&entry.path) {
                Ok(()) => removed += 1,
                Err(StoreError::NotFound { path }) => {
                    warn!(%path, "thumbnail vanished during clear");
                }
                Err(e) => return Err(e),
            }
        }
        debug!(source = %source, removed, "cleared thumbnails");
        Ok(removed)
    }
}

/// A missing source reads as undecodable so the placeholder can take over.
fn unreadable(error: StoreError) -> StoreError {
    match error {
        StoreError::NotFound { path } => StoreError::SourceUnreadable {
            source: format!("no such file: {path}").into(),
            path,
        },
        other => other,
    }
}

fn load_overlay(plan: &Plan, mark: &FileHandle, stage: &'static str) -> Result<DynamicImage, StoreError> {
    let failed = |source| StoreError::TransformFailed {
        path: plan.source.path().clone(),
        stage,
        source,
    };
    let bytes = mark.contents().map_err(|e| failed(e.into()))?;
    image::load_from_memory(&bytes).map_err(|e| failed(e.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;
    use crate::{AdapterBackend, MemoryAdapter, StoreBackend};

    struct Fixture {
        memory: Arc<MemoryAdapter>,
        files: Arc<dyn StoreBackend>,
        cache: Arc<dyn StoreBackend>,
    }

    impl Fixture {
        fn new() -> Self {
            let memory = Arc::new(MemoryAdapter::new());
            Self {
                files: Arc::new(AdapterBackend::new(memory.clone())),
                cache: Arc::new(AdapterBackend::new(Arc::new(MemoryAdapter::new()))),
                memory,
            }
        }

        fn image(&self, path: &str, w: u32, h: u32) -> FileHandle {
            let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([40, 80, 120, 255])));
            let bytes = ops::encode(&img, ImageFormat::Png, 90).unwrap();
            let handle = FileHandle::parse(self.files.clone(), path).unwrap();
            handle.put_contents(bytes).unwrap();
            handle
        }

        fn thumbnailer(&self) -> Thumbnailer {
            Thumbnailer::new(ThumbnailConfig::new(self.cache.clone()))
        }
    }

    fn decoded(file: &ThumbFile) -> DynamicImage {
        image::load_from_memory(&file.handle().contents().unwrap()).unwrap()
    }

    #[test]
    fn cache_path_mirrors_source() {
        let fx = Fixture::new();
        let source = FileHandle::parse(fx.files.clone(), "gallery/cat.png").unwrap();
        let thumbs = fx.thumbnailer();
        let path = thumbs.cache_path(&source, &ThumbSpec::new(50, 100)).unwrap();
        assert_eq!(path.to_string(), "gallery/cat~50x100.png");
        let path = thumbs
            .cache_path(&source, &ThumbSpec::new(50, 100).format("JPG"))
            .unwrap();
        assert_eq!(path.to_string(), "gallery/cat~50x100.jpg");
    }

    #[test]
    fn unflagged_overlays_are_ignored() {
        let fx = Fixture::new();
        let source = fx.image("cat.png", 10, 10);
        let spec = ThumbSpec::new(4, 4).watermark(true).disclaimer(true);
        let file = fx.thumbnailer().process(&source, &spec).unwrap();
        assert!(!file.is_watermarked());
        assert!(!file.is_disclaimed());
        assert_eq!(file.handle().path().to_string(), "cat~4x4.png");
    }

    #[test]
    fn writes_then_reuses() {
        let fx = Fixture::new();
        let source = fx.image("photos/cat.png", 400, 200);
        let thumbs = fx.thumbnailer();
        let spec = ThumbSpec::new(200, 100);

        let first = thumbs.process(&source, &spec).unwrap();
        assert_eq!(first.outcome(), ThumbOutcome::Written);
        assert_eq!(decoded(&first).dimensions(), (200, 100));

        let second = thumbs.process(&source, &spec).unwrap();
        assert_eq!(second.outcome(), ThumbOutcome::Fresh);
    }

    #[test]
    fn newer_source_regenerates() {
        let fx = Fixture::new();
        let source = fx.image("cat.png", 40, 20);
        let thumbs = fx.thumbnailer();
        let spec = ThumbSpec::new(20, 0);
        thumbs.process(&source, &spec).unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        fx.memory.set_last_modified("cat.png", later).unwrap();
        let again = thumbs.process(&source, &spec).unwrap();
        assert_eq!(again.outcome(), ThumbOutcome::Written);
        assert_eq!(decoded(&again).dimensions(), (20, 10));
    }

    #[test]
    fn corrupt_source_without_placeholder_fails() {
        let fx = Fixture::new();
        let source = FileHandle::parse(fx.files.clone(), "broken.png").unwrap();
        source.put_contents("not an image").unwrap();
        let err = fx
            .thumbnailer()
            .process(&source, &ThumbSpec::new(10, 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnreadable);
    }

    #[test]
    fn missing_source_uses_placeholder() {
        let fx = Fixture::new();
        let placeholder = fx.image("assets/blank.png", 30, 30);
        let thumbs = Thumbnailer::new(ThumbnailConfig::new(fx.cache.clone()).with_placeholder(placeholder));
        let source = FileHandle::parse(fx.files.clone(), "gone.png").unwrap();

        let file = thumbs.process(&source, &ThumbSpec::new(10, 10)).unwrap();
        assert!(file.is_placeholder());
        assert_eq!(file.handle().path().to_string(), "noimage/blank~10x10.png");
        assert_eq!(file.source().path().to_string(), "assets/blank.png");
    }

    #[test]
    fn missing_overlay_is_a_transform_failure() {
        let fx = Fixture::new();
        let source = fx.image("cat.png", 10, 10);
        let mark = FileHandle::parse(fx.files.clone(), "marks/none.png").unwrap();
        let thumbs = Thumbnailer::new(ThumbnailConfig::new(fx.cache.clone()).with_watermark(mark, 0.5));
        let err = thumbs
            .process(&source, &ThumbSpec::new(5, 5).watermark(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::TransformFailed { stage: "watermark", .. }));
    }

    #[test]
    fn clear_removes_only_own_thumbnails() {
        let fx = Fixture::new();
        let cat = fx.image("photos/cat.png", 40, 40);
        let dog = fx.image("photos/dog.png", 40, 40);
        let thumbs = fx.thumbnailer();
        for (w, h) in [(10, 10), (20, 0), (0, 5)] {
            thumbs.process(&cat, &ThumbSpec::new(w, h)).unwrap();
        }
        thumbs.process(&dog, &ThumbSpec::new(10, 10)).unwrap();

        assert_eq!(thumbs.clear(&cat).unwrap(), 3);
        assert_eq!(thumbs.clear(&cat).unwrap(), 0);
        let dog_thumb = thumbs.cache_path(&dog, &ThumbSpec::new(10, 10)).unwrap();
        assert!(fx.cache.exists(&dog_thumb).unwrap());
    }

    #[test]
    fn clear_of_uncached_directory_is_zero() {
        let fx = Fixture::new();
        let source = FileHandle::parse(fx.files.clone(), "nowhere/cat.png").unwrap();
        assert_eq!(fx.thumbnailer().clear(&source).unwrap(), 0);
    }
}
