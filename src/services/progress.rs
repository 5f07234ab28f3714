//! Progress reporting service
//!
//! This module separates progress reporting concerns from the pipeline,
//! allowing different frontends to implement their own progress handling.

use crate::types::ProcessingTimings;
use instant::Instant;
use std::sync::Arc;

/// Progress stages of a background-to-alpha run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Acquiring and decoding the input image
    ImageLoading,
    /// Estimating the background color from the corners
    BackgroundDetection,
    /// Building the binary alpha map
    Classification,
    /// Running the bilateral filter
    Denoising,
    /// Softening alpha boundaries
    Feathering,
    /// Writing alpha into the raster
    Compositing,
    /// Processing completed
    Completed,

    // Batch processing stages
    /// Initializing batch processing
    BatchInitialization,
    /// Processing individual item in batch
    BatchItemProcessing,
    /// Finalizing batch processing
    BatchFinalization,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading input image",
            ProcessingStage::BackgroundDetection => "Detecting background color",
            ProcessingStage::Classification => "Classifying pixels",
            ProcessingStage::Denoising => "Smoothing color noise",
            ProcessingStage::Feathering => "Feathering edges",
            ProcessingStage::Compositing => "Applying alpha channel",
            ProcessingStage::Completed => "Processing completed",

            ProcessingStage::BatchInitialization => "Initializing batch processing",
            ProcessingStage::BatchItemProcessing => "Processing batch item",
            ProcessingStage::BatchFinalization => "Finalizing batch processing",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoading => 10,
            ProcessingStage::BackgroundDetection => 20,
            ProcessingStage::Classification => 45,
            ProcessingStage::Denoising => 65,
            ProcessingStage::Feathering => 85,
            ProcessingStage::Compositing => 95,
            ProcessingStage::Completed => 100,

            ProcessingStage::BatchInitialization => 5,
            ProcessingStage::BatchItemProcessing => 50, // Variable based on items
            ProcessingStage::BatchFinalization => 98,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
    /// Estimated time remaining (milliseconds, if available)
    pub eta_ms: Option<u64>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
        }
    }

    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
            description,
        }
    }

    /// Override the stage percentage, e.g. with the batch completion ratio
    #[must_use]
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    #[must_use]
    pub fn with_eta(mut self, eta_ms: u64) -> Self {
        self.eta_ms = Some(eta_ms);
        self
    }
}

/// Statistics for batch processing operations
#[derive(Debug, Clone)]
pub struct BatchProcessingStats {
    /// Number of items completed (successful or not)
    pub items_completed: usize,
    /// Total number of items to process
    pub items_total: usize,
    /// Number of items that failed processing
    pub items_failed: usize,
    /// Identifier of the item just processed
    pub current_item_name: String,
    /// Processing rate in items per second
    pub processing_rate: f64,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<u64>,
}

impl BatchProcessingStats {
    /// Completion ratio as a percentage
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.items_total == 0 {
            return 100;
        }
        ((self.items_completed * 100) / self.items_total).min(100) as u8
    }
}

/// Nested progress update for batch operations
#[derive(Debug, Clone)]
pub struct BatchProgressUpdate {
    /// Overall batch progress
    pub total_progress: ProgressUpdate,
    /// Progress of the item that just finished, if any
    pub current_item_progress: Option<ProgressUpdate>,
    /// Processing statistics
    pub stats: BatchProcessingStats,
}

/// Trait for reporting progress during background-to-alpha operations
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);

    /// Report batch progress update with nested item progress
    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        // Only the enhanced reporter renders batch progress
        drop(update);
    }
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn log_progress(update: &ProgressUpdate, verbose: bool) {
    if !verbose {
        log::info!("[{}%] {}", update.progress, update.description);
        return;
    }
    match update.eta_ms {
        Some(eta) => log::info!(
            "[{}%] {} ({}ms elapsed, ~{}ms remaining)",
            update.progress,
            update.description,
            update.elapsed_ms,
            eta
        ),
        None => log::info!(
            "[{}%] {} ({}ms elapsed)",
            update.progress,
            update.description,
            update.elapsed_ms
        ),
    }
}

fn log_completion(timings: &ProcessingTimings, verbose: bool) {
    log::info!("✅ Alpha extraction completed in {}ms", timings.total_ms);

    if verbose {
        log::info!("  📊 Detailed timings:");
        log::info!("    • Load: {}ms", timings.load_ms);
        log::info!("    • Detection: {}ms", timings.detection_ms);
        log::info!("    • Classification: {}ms", timings.classification_ms);
        log::info!("    • Denoise: {}ms", timings.denoise_ms);
        log::info!("    • Feather: {}ms", timings.feather_ms);
        log::info!("    • Composite: {}ms", timings.composite_ms);
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        log_progress(&update, self.verbose);
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log_completion(&timings, self.verbose);
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// Progress reporter with nested progress support for batch operations
pub struct EnhancedProgressReporter {
    enable_nested_progress: bool,
    verbose: bool,
}

impl EnhancedProgressReporter {
    #[must_use]
    pub fn new(enable_nested_progress: bool, verbose: bool) -> Self {
        Self {
            enable_nested_progress,
            verbose,
        }
    }

    fn progress_bar(percentage: u8) -> String {
        let filled = (usize::from(percentage.min(100)) * 20) / 100;
        let empty = 20 - filled;
        format!("{}{}", "█".repeat(filled), "░".repeat(empty))
    }

    fn format_duration(ms: u64) -> String {
        let seconds = ms / 1000;
        if seconds < 60 {
            format!("{}s", seconds)
        } else {
            format!("{}m {}s", seconds / 60, seconds % 60)
        }
    }

    fn format_eta(eta_seconds: Option<u64>) -> String {
        match eta_seconds {
            Some(seconds) if seconds < 60 => format!("{}s", seconds),
            Some(seconds) => format!("{}m {}s", seconds / 60, seconds % 60),
            None => "calculating...".to_string(),
        }
    }
}

impl ProgressReporter for EnhancedProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        log_progress(&update, self.verbose);
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log_completion(&timings, self.verbose);
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }

    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        if !self.enable_nested_progress {
            return;
        }

        log::info!(
            "📁 Batch: {}/{} items, {} failed ({:.1} items/sec) - ETA: {}",
            update.stats.items_completed,
            update.stats.items_total,
            update.stats.items_failed,
            update.stats.processing_rate,
            Self::format_eta(update.stats.eta_seconds)
        );
        log::info!(
            "[{}] {}% Overall Progress",
            Self::progress_bar(update.total_progress.progress),
            update.total_progress.progress
        );

        if let Some(ref item_progress) = update.current_item_progress {
            log::info!("📄 Last: {}", update.stats.current_item_name);
            log::info!(
                "[{}] {}% {}",
                Self::progress_bar(item_progress.progress),
                item_progress.progress,
                item_progress.description
            );
            if self.verbose {
                log::info!("└─ Elapsed: {}ms", item_progress.elapsed_ms);
            }
        }

        log::info!(
            "⏱️  Timing: {} elapsed, {} remaining",
            Self::format_duration(update.total_progress.elapsed_ms),
            Self::format_eta(update.stats.eta_seconds)
        );
    }
}

/// Progress tracker that manages timing and progress reporting
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current_stage", &self.current_stage)
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Tracker that discards every update
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    /// Restart the elapsed clock, e.g. before the next batch item
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage.clone());
        let update = ProgressUpdate::new(stage, self.start_time);
        self.reporter.report_progress(update);
    }

    pub fn report_stage_with_description(&mut self, stage: ProcessingStage, description: String) {
        self.current_stage = Some(stage.clone());
        let update = ProgressUpdate::with_description(stage, description, self.start_time);
        self.reporter.report_progress(update);
    }

    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the most recent stage
    pub fn report_error(&self, error: &str) {
        let stage = self
            .current_stage
            .clone()
            .unwrap_or(ProcessingStage::ImageLoading);
        self.reporter.report_error(stage, error);
    }

    pub fn report_batch_progress(&self, update: BatchProgressUpdate) {
        self.reporter.report_batch_progress(update);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<&ProcessingStage> {
        self.current_stage.as_ref()
    }
}

/// Pick a reporter for the CLI flags
///
/// Without `--progress` the plain console reporter is used; with it, batches
/// of more than one item get nested batch output.
#[must_use]
pub fn create_cli_progress_reporter(
    enable_progress: bool,
    verbose: bool,
    batch_size: usize,
) -> Arc<dyn ProgressReporter> {
    match (enable_progress, batch_size) {
        (false, _) => Arc::new(ConsoleProgressReporter::new(verbose)),
        (true, 1) => Arc::new(EnhancedProgressReporter::new(false, verbose)),
        (true, _) => Arc::new(EnhancedProgressReporter::new(true, verbose)),
    }
}
