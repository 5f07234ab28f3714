#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgalpha
//!
//! Turns images shot against a flat background into RGBA images with that
//! background made transparent.
//!
//! The background color is either supplied or estimated from the image
//! corners. Pixels are compared to it in CIE Lab space, the resulting binary
//! alpha map is feathered around its edges, and an optional bilateral filter
//! cleans up color noise in the output.
//!
//! ## Features
//!
//! - **Perceptual matching**: ΔE76 distance in Lab space with a per-preset threshold
//! - **Corner sampling**: automatic background detection when no color is given
//! - **Soft edges**: edge-gated Gaussian feathering of the alpha map
//! - **Presets**: ten background presets plus auto-detect quality profiles
//! - **Batch orchestration**: sequential batches with per-item error isolation,
//!   watch-based state snapshots and cancellation
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use bgalpha::{process_image, ProcessingConfig};
//! use image::{Rgba, RgbaImage};
//!
//! let input = RgbaImage::from_fn(32, 32, |x, y| {
//!     if (8..24).contains(&x) && (8..24).contains(&y) {
//!         Rgba([200, 40, 40, 255])
//!     } else {
//!         Rgba([255, 255, 255, 255])
//!     }
//! });
//!
//! let output = process_image(input, &ProcessingConfig::default()).unwrap();
//! assert_eq!(output.get_pixel(0, 0)[3], 0);
//! assert_eq!(output.get_pixel(16, 16)[3], 255);
//! ```
//!
//! ## Batches
//!
//! ```rust,no_run
//! use bgalpha::{BatchOptions, BatchOrchestrator, FileImageLoader, PngDirectorySink, Preset};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let mut orchestrator = BatchOrchestrator::new()
//!     .with_loader(Arc::new(FileImageLoader::new("img/pictures")))
//!     .with_sink(Arc::new(PngDirectorySink::new("img/pictures/transparent")));
//!
//! let result = orchestrator
//!     .convert_all(&["hero.jpg", "villain.jpg"], &BatchOptions::with_preset(Preset::Green))
//!     .await;
//! println!("{}", result.message);
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bar and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: rolling log files for the CLI
//! - `webp-support`: WebP decoding

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod processing;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

// Public API exports
pub use batch::{output_id_for, BatchOrchestrator, BatchResult, BatchState, ProcessingResult};
pub use color::{delta_e, perceptual_distance, rgb_to_hsv, rgb_to_lab, Color, ColorFamily, Hsv, LabColor};
pub use config::{BatchOptions, ConfigOverrides, Preset, ProcessingConfig, QualityProfile};
pub use error::{BgAlphaError, Result};
pub use processing::{
    bilateral_denoise, classify, composite, detect_background_color, feather, feather_in_place,
};
pub use processor::{load_with_timeout, AlphaProcessor};
pub use services::{
    ConsoleProgressReporter, FileImageLoader, ImageIOService, ImageLoader, MemoryImageLoader,
    MemorySink, NoOpProgressReporter, NullSink, OutputSink, PngDirectorySink, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    alpha_to_byte, AlphaMap, BackgroundSource, ClassificationStats, ProcessingMetadata,
    ProcessingTimings, RasterBuffer, RemovalResult,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingOutput};

/// Convert a decoded raster into one whose background is transparent
///
/// # Errors
/// - `InvalidConfig` when `config` fails validation
/// - `InvalidImage` for a zero-width or zero-height raster
pub fn process_image(image: RasterBuffer, config: &ProcessingConfig) -> Result<RasterBuffer> {
    remove_background(image, config).map(RemovalResult::into_image)
}

/// Like [`process_image`], keeping the alpha map, detected color and timings
pub fn remove_background(image: RasterBuffer, config: &ProcessingConfig) -> Result<RemovalResult> {
    AlphaProcessor::new(config.clone())?.process_image(image)
}

/// Remove the background from encoded image bytes (PNG, JPEG, TIFF, BMP)
///
/// ```rust,no_run
/// use bgalpha::{remove_background_from_bytes, Preset};
///
/// # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let result = remove_background_from_bytes(&upload, &Preset::White.config())?;
/// let png = result.to_png_bytes()?;
/// # Ok(())
/// # }
/// ```
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &ProcessingConfig,
) -> Result<RemovalResult> {
    AlphaProcessor::new(config.clone())?.process_bytes(image_bytes)
}

/// Remove the background from an image file
pub async fn remove_background_from_file<P: AsRef<std::path::Path>>(
    path: P,
    config: &ProcessingConfig,
) -> Result<RemovalResult> {
    let loader = FileImageLoader::unrooted();
    let input_id = path.as_ref().to_string_lossy().into_owned();
    AlphaProcessor::new(config.clone())?
        .process_source(&loader, &input_id)
        .await
}

/// Remove the background from an async byte stream
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &ProcessingConfig,
) -> Result<RemovalResult> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| BgAlphaError::load_failure(format!("Failed to read from stream: {}", e)))?;

    remove_background_from_bytes(&buffer, config)
}
