//! Single-image background-to-alpha processor
//!
//! [`AlphaProcessor`] runs the stages in a fixed order:
//! detect (only without a target color) → classify → denoise (when `smooth`)
//! → feather (when `feather_radius > 0`) → composite.
//! Classification always sees the original colors; denoising only changes the
//! RGB that ends up in the output.

use crate::{
    config::{ProcessingConfig, SMOOTH_INTENSITY_SIGMA, SMOOTH_SPATIAL_SIGMA},
    error::{BgAlphaError, Result},
    processing::{bilateral_denoise, classify_with_stats, composite, detect_background_color, feather},
    services::{ImageIOService, ImageLoader, ProcessingStage, ProgressTracker},
    types::{BackgroundSource, ProcessingMetadata, ProcessingTimings, RemovalResult},
};
use image::{DynamicImage, RgbaImage};
use instant::Instant;
use std::time::Duration;
use tracing::{debug, info, instrument, span, Level};

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Acquire `input_id` through `loader`, bounded by `timeout`
///
/// # Errors
/// - `LoadTimeout` when the deadline expires first
/// - `LoadFailure` when the loader reports any error
pub async fn load_with_timeout(
    loader: &dyn ImageLoader,
    input_id: &str,
    timeout: Duration,
) -> Result<RgbaImage> {
    match tokio::time::timeout(timeout, loader.load(input_id)).await {
        Err(_) => Err(BgAlphaError::load_timeout_for(input_id, timeout)),
        Ok(Err(BgAlphaError::LoadFailure(msg))) => Err(BgAlphaError::LoadFailure(msg)),
        Ok(Err(e)) => Err(BgAlphaError::load_failure_for(input_id, &e)),
        Ok(Ok(image)) => Ok(image),
    }
}

/// Background-to-alpha processor for one configuration
#[derive(Debug)]
pub struct AlphaProcessor {
    config: ProcessingConfig,
    progress_tracker: Option<ProgressTracker>,
}

impl AlphaProcessor {
    /// Create a processor after validating `config`
    ///
    /// # Errors
    /// - `InvalidConfig` for negative or non-finite parameters
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_tracker: None,
        })
    }

    /// Attach a progress tracker that receives a stage update per step
    #[must_use]
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    pub fn set_progress_tracker(&mut self, tracker: Option<ProgressTracker>) {
        self.progress_tracker = tracker;
    }

    #[must_use]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn report_error(&self, error: &BgAlphaError) {
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_error(&error.to_string());
        }
    }

    /// Run the pipeline over a decoded raster
    ///
    /// # Errors
    /// - `InvalidImage` for a zero-width or zero-height raster
    /// - `Processing` if the alpha map and raster disagree in size
    #[instrument(
        skip(self, image),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            threshold = self.config.threshold,
            smooth = self.config.smooth,
            feather_radius = self.config.feather_radius
        )
    )]
    pub fn process_image(&mut self, image: RgbaImage) -> Result<RemovalResult> {
        let result = self.run_pipeline(image, ProcessingTimings::default());
        if let Err(ref e) = result {
            self.report_error(e);
        }
        result
    }

    fn run_pipeline(&mut self, mut image: RgbaImage, mut timings: ProcessingTimings) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BgAlphaError::invalid_image(format!(
                "Image has zero area ({}x{})",
                width, height
            )));
        }

        let (background, background_source) = {
            let _span = span!(Level::DEBUG, "background_detection").entered();
            self.report_stage(ProcessingStage::BackgroundDetection);
            let start = Instant::now();
            let resolved = match self.config.target_color {
                Some(color) => (color, BackgroundSource::Target),
                None => (detect_background_color(&image), BackgroundSource::Detected),
            };
            timings.detection_ms = elapsed_ms(start);
            debug!(background = %resolved.0, source = ?resolved.1, "Resolved background color");
            resolved
        };

        let (mut alpha_map, stats) = {
            let _span = span!(Level::DEBUG, "classification", threshold = self.config.threshold).entered();
            self.report_stage(ProcessingStage::Classification);
            let start = Instant::now();
            let classified = classify_with_stats(&image, background, self.config.threshold);
            timings.classification_ms = elapsed_ms(start);
            classified
        };
        info!(
            transparent = stats.transparent,
            opaque = stats.opaque,
            "Transparency rate {:.1}%",
            stats.transparency_ratio() * 100.0
        );

        if self.config.smooth {
            let _span = span!(Level::DEBUG, "denoise").entered();
            self.report_stage(ProcessingStage::Denoising);
            let start = Instant::now();
            bilateral_denoise(&mut image, SMOOTH_SPATIAL_SIGMA, SMOOTH_INTENSITY_SIGMA);
            timings.denoise_ms = elapsed_ms(start);
        }

        if self.config.feather_radius > 0.0 {
            let _span = span!(Level::DEBUG, "feather", radius = self.config.feather_radius).entered();
            self.report_stage(ProcessingStage::Feathering);
            let start = Instant::now();
            alpha_map = feather(&alpha_map, self.config.feather_radius);
            timings.feather_ms = elapsed_ms(start);
        }

        {
            let _span = span!(Level::DEBUG, "composite").entered();
            self.report_stage(ProcessingStage::Compositing);
            let start = Instant::now();
            composite(&mut image, &alpha_map)?;
            timings.composite_ms = elapsed_ms(start);
        }

        timings.total_ms = timings.load_ms + elapsed_ms(total_start);
        self.report_stage(ProcessingStage::Completed);
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_completion(timings.clone());
        }

        let mut metadata = ProcessingMetadata::new(self.config.clone());
        metadata.timings = timings;
        metadata.stats = stats;

        Ok(RemovalResult {
            image,
            alpha_map,
            background,
            background_source,
            metadata,
        })
    }

    /// Run the pipeline over any decoded image, converting it to RGBA8 first
    ///
    /// # Errors
    /// - Same as [`AlphaProcessor::process_image`]
    pub fn process_dynamic_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        self.process_image(image.to_rgba8())
    }

    /// Decode encoded image bytes and run the pipeline
    ///
    /// # Errors
    /// - `LoadFailure` when the bytes cannot be decoded
    /// - Same as [`AlphaProcessor::process_image`]
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Result<RemovalResult> {
        self.report_stage(ProcessingStage::ImageLoading);
        let start = Instant::now();
        let image = ImageIOService::load_from_bytes(bytes)?;
        let timings = ProcessingTimings {
            load_ms: elapsed_ms(start),
            ..ProcessingTimings::default()
        };
        let result = self.run_pipeline(image, timings);
        if let Err(ref e) = result {
            self.report_error(e);
        }
        result
    }

    /// Acquire `input_id` through `loader` under the configured timeout, then
    /// run the pipeline
    ///
    /// # Errors
    /// - `LoadTimeout` / `LoadFailure` from acquisition
    /// - Same as [`AlphaProcessor::process_image`]
    #[instrument(skip(self, loader), fields(timeout_ms = self.config.timeout.as_millis() as u64))]
    pub async fn process_source(
        &mut self,
        loader: &dyn ImageLoader,
        input_id: &str,
    ) -> Result<RemovalResult> {
        self.report_stage(ProcessingStage::ImageLoading);
        let start = Instant::now();
        let image = match load_with_timeout(loader, input_id, self.config.timeout).await {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            },
        };
        let timings = ProcessingTimings {
            load_ms: elapsed_ms(start),
            ..ProcessingTimings::default()
        };
        debug!(load_ms = timings.load_ms, "Image acquired");

        let result = self.run_pipeline(image, timings);
        if let Err(ref e) = result {
            self.report_error(e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::services::{MemoryImageLoader, NoOpProgressReporter};
    use async_trait::async_trait;
    use image::Rgba;
    use std::sync::Arc;

    fn framed(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let inside = x >= width / 4 && x < width * 3 / 4 && y >= height / 4 && y < height * 3 / 4;
            if inside {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    fn hard_config() -> ProcessingConfig {
        ProcessingConfig::builder()
            .smooth(false)
            .feather_radius(0.0)
            .build()
            .unwrap()
    }

    struct SlowLoader;

    #[async_trait]
    impl ImageLoader for SlowLoader {
        async fn load(&self, _input_id: &str) -> Result<RgbaImage> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(RgbaImage::new(1, 1))
        }
    }

    struct BrokenLoader;

    #[async_trait]
    impl ImageLoader for BrokenLoader {
        async fn load(&self, _input_id: &str) -> Result<RgbaImage> {
            Err(BgAlphaError::processing("decoder exploded"))
        }
    }

    #[test]
    fn test_zero_area_rejected() {
        let mut processor = AlphaProcessor::new(ProcessingConfig::default()).unwrap();
        let err = processor.process_image(RgbaImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, BgAlphaError::InvalidImage(_)));
        let err = processor.process_image(RgbaImage::new(5, 0)).unwrap_err();
        assert!(matches!(err, BgAlphaError::InvalidImage(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProcessingConfig {
            threshold: -2.0,
            ..ProcessingConfig::default()
        };
        assert!(matches!(
            AlphaProcessor::new(config),
            Err(BgAlphaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_hard_pipeline_makes_background_transparent() {
        let mut processor = AlphaProcessor::new(hard_config()).unwrap();
        let result = processor.process_image(framed(40, 40)).unwrap();

        assert_eq!(result.background_source, BackgroundSource::Detected);
        assert_eq!(result.background, Color::WHITE);
        assert_eq!(result.image.get_pixel(0, 0)[3], 0);
        assert_eq!(result.image.get_pixel(20, 20), &Rgba([200, 30, 30, 255]));
        assert!(result.alpha_map.is_binary());
        assert_eq!(result.metadata.stats.opaque, 20 * 20);
        assert_eq!(result.dimensions(), (40, 40));
    }

    #[test]
    fn test_target_color_skips_detection() {
        let config = ProcessingConfig::builder()
            .target_color(Color::new(200, 30, 30))
            .smooth(false)
            .feather_radius(0.0)
            .build()
            .unwrap();
        let mut processor = AlphaProcessor::new(config).unwrap();
        let result = processor.process_image(framed(16, 16)).unwrap();

        assert_eq!(result.background_source, BackgroundSource::Target);
        assert_eq!(result.image.get_pixel(8, 8)[3], 0);
        assert_eq!(result.image.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_feathering_softens_the_boundary() {
        let config = ProcessingConfig::builder()
            .smooth(false)
            .feather_radius(1.5)
            .build()
            .unwrap();
        let mut processor = AlphaProcessor::new(config).unwrap();
        let result = processor.process_image(framed(40, 40)).unwrap();

        let edge = result.image.get_pixel(10, 20)[3];
        assert!(edge > 0 && edge < 255, "edge alpha {}", edge);
        assert_eq!(result.image.get_pixel(0, 0)[3], 0);
        assert_eq!(result.image.get_pixel(20, 20)[3], 255);
    }

    #[test]
    fn test_process_bytes_decodes_png() {
        let bytes = ImageIOService::encode_png(&framed(12, 12)).unwrap();
        let mut processor = AlphaProcessor::new(hard_config())
            .unwrap()
            .with_progress_tracker(ProgressTracker::new(Arc::new(NoOpProgressReporter)));
        let result = processor.process_bytes(&bytes).unwrap();
        assert_eq!(result.image.get_pixel(0, 0)[3], 0);

        let err = processor.process_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, BgAlphaError::LoadFailure(_)));
    }

    #[tokio::test]
    async fn test_process_source_uses_loader() {
        let loader = MemoryImageLoader::new().with_image("a.jpg", framed(20, 20));
        let mut processor = AlphaProcessor::new(hard_config()).unwrap();
        let result = processor.process_source(&loader, "a.jpg").await.unwrap();
        assert_eq!(result.image.get_pixel(10, 10)[3], 255);

        let err = processor.process_source(&loader, "missing.jpg").await.unwrap_err();
        assert!(matches!(err, BgAlphaError::LoadFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout() {
        let err = load_with_timeout(&SlowLoader, "slow.png", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, BgAlphaError::LoadTimeout(_)));
        assert!(err.to_string().contains("slow.png"));
    }

    #[tokio::test]
    async fn test_loader_errors_become_load_failures() {
        let err = load_with_timeout(&BrokenLoader, "b.jpg", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BgAlphaError::LoadFailure(_)));
        assert!(err.to_string().contains("decoder exploded"));
    }
}
