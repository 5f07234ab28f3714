//! Core types for background-to-alpha operations

use crate::color::Color;
use crate::config::ProcessingConfig;
use crate::error::{BgAlphaError, Result};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decoded RGBA8 raster, row-major with the origin at the top-left
pub type RasterBuffer = RgbaImage;

/// Dense per-pixel alpha weights in [0, 1], row-major like the raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl AlphaMap {
    /// Map of the given size with every pixel fully opaque
    #[must_use]
    pub fn opaque(width: u32, height: u32) -> Self {
        Self::filled(width, height, 1.0)
    }

    /// Map of the given size with every pixel set to `value` (clamped)
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            values: vec![value.clamp(0.0, 1.0); len],
        }
    }

    /// Wrap existing values, clamping them into [0, 1]
    ///
    /// # Errors
    /// - `values.len()` differs from `width * height`
    pub fn from_values(width: u32, height: u32, mut values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(BgAlphaError::processing(format!(
                "Alpha map for {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        for value in &mut values {
            *value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Alpha at `(x, y)`, `None` outside the map
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// True when every value is exactly 0 or exactly 1
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0 || v == 1.0)
    }

    /// Count of fully transparent pixels
    #[must_use]
    pub fn transparent_count(&self) -> usize {
        self.values.iter().filter(|&&v| v == 0.0).count()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Quantize an alpha weight to a byte: `round(clamp(alpha, 0, 1) * 255)`
#[must_use]
pub fn alpha_to_byte(alpha: f32) -> u8 {
    if alpha.is_nan() {
        return 0;
    }
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Pixel counts produced by the classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Pixels classified as background
    pub transparent: usize,
    /// Pixels classified as foreground
    pub opaque: usize,
}

impl ClassificationStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.transparent + self.opaque
    }

    /// Share of background pixels in [0, 1]
    #[must_use]
    pub fn transparency_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.transparent as f64 / total as f64,
        }
    }
}

/// Where the background color came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundSource {
    /// Supplied through `ProcessingConfig::target_color`
    Target,
    /// Estimated by corner sampling
    Detected,
}

/// Per-stage timings of one pipeline run, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image acquisition (0 when the caller passed a decoded raster)
    pub load_ms: u64,
    pub detection_ms: u64,
    pub classification_ms: u64,
    pub denoise_ms: u64,
    pub feather_ms: u64,
    pub composite_ms: u64,
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Sum of the measured stages
    #[must_use]
    pub fn stages_ms(&self) -> u64 {
        self.load_ms
            + self.detection_ms
            + self.classification_ms
            + self.denoise_ms
            + self.feather_ms
            + self.composite_ms
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Load: {}ms | Detect: {}ms | Classify: {}ms | Denoise: {}ms | Feather: {}ms | Composite: {}ms",
            self.total_ms,
            self.load_ms,
            self.detection_ms,
            self.classification_ms,
            self.denoise_ms,
            self.feather_ms,
            self.composite_ms
        )
    }
}

/// Metadata describing how a result was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub timings: ProcessingTimings,
    pub stats: ClassificationStats,
    pub config: ProcessingConfig,
    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            timings: ProcessingTimings::default(),
            stats: ClassificationStats::default(),
            config,
            processed_at: Utc::now(),
        }
    }
}

/// Result of one background-to-alpha run
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// Output raster with the alpha channel populated
    pub image: RasterBuffer,

    /// Final alpha weights that were written into `image`
    pub alpha_map: AlphaMap,

    /// Background color the classifier compared against
    pub background: Color,

    pub background_source: BackgroundSource,

    pub metadata: ProcessingMetadata,
}

impl RemovalResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Consume the result, keeping only the output raster
    #[must_use]
    pub fn into_image(self) -> RasterBuffer {
        self.image
    }

    /// Encode the output raster as PNG
    ///
    /// # Errors
    /// - PNG encoder failure
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image.write_to(&mut cursor, image::ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Save the output raster as PNG with alpha channel
    ///
    /// # Errors
    /// - File creation or PNG encoding failure
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
