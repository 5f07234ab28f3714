//! Sequential batch orchestration
//!
//! A [`BatchOrchestrator`] pulls each input through its [`ImageLoader`], runs
//! the single-image pipeline with the batch's resolved configuration and hands
//! successful outputs to an optional [`OutputSink`]. Items run strictly one
//! after another; a failing item is recorded and the batch moves on.
//!
//! Live state is published through a `tokio::sync::watch` channel so readers
//! always get an owned snapshot.

use crate::{
    config::{BatchOptions, Preset, ProcessingConfig},
    error::{BgAlphaError, Result},
    processor::AlphaProcessor,
    services::{
        BatchProcessingStats, BatchProgressUpdate, ImageLoader, NoOpProgressReporter,
        OutputSink, ProcessingStage, ProgressReporter, ProgressUpdate,
    },
};
use chrono::{DateTime, Utc};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Map an input identifier to the identifier its PNG output is stored under
///
/// The final extension, whatever it is, becomes `.png`; identifiers without
/// one get `.png` appended. Directory components are kept.
#[must_use]
pub fn output_id_for(input_id: &str) -> String {
    std::path::Path::new(input_id)
        .with_extension("png")
        .to_string_lossy()
        .into_owned()
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub input_id: String,
    /// Set when the item succeeded
    pub output_id: Option<String>,
    pub success: bool,
    /// Set when the item failed
    pub error: Option<String>,
    pub config_used: ProcessingConfig,
}

impl ProcessingResult {
    #[must_use]
    pub fn succeeded(input_id: &str, output_id: String, config: &ProcessingConfig) -> Self {
        Self {
            input_id: input_id.to_string(),
            output_id: Some(output_id),
            success: true,
            error: None,
            config_used: config.clone(),
        }
    }

    #[must_use]
    pub fn failed(input_id: &str, error: &BgAlphaError, config: &ProcessingConfig) -> Self {
        Self {
            input_id: input_id.to_string(),
            output_id: None,
            success: false,
            error: Some(error.to_string()),
            config_used: config.clone(),
        }
    }
}

/// Snapshot of the orchestrator's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub is_processing: bool,
    pub current_item: Option<String>,
    pub processed_count: usize,
    pub total_count: usize,
    pub results: Vec<ProcessingResult>,
    pub errors: Vec<ProcessingResult>,
}

/// Aggregated outcome of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// True when at least one item ran and none failed
    pub overall_success: bool,
    pub message: String,
    pub processed_files: Vec<ProcessingResult>,
    pub errors: Vec<ProcessingResult>,
    pub preset: Preset,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The batch stopped early because its cancellation token fired
    pub cancelled: bool,
}

impl BatchResult {
    fn unsuccessful(preset: Preset, message: String, started_at: DateTime<Utc>) -> Self {
        Self {
            overall_success: false,
            message,
            processed_files: Vec::new(),
            errors: Vec::new(),
            preset,
            started_at,
            finished_at: Utc::now(),
            cancelled: false,
        }
    }

    /// Number of items attempted
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.processed_files.len() + self.errors.len()
    }

    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Drives the pipeline over a list of inputs, one at a time
pub struct BatchOrchestrator {
    loader: Option<Arc<dyn ImageLoader>>,
    sink: Option<Arc<dyn OutputSink>>,
    reporter: Arc<dyn ProgressReporter>,
    state: watch::Sender<BatchState>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("has_loader", &self.loader.is_some())
            .field("has_sink", &self.sink.is_some())
            .field("state", &*self.state.borrow())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchOrchestrator {
    /// Orchestrator with no loader wired; batches fail with `DependencyMissing`
    /// until [`BatchOrchestrator::with_loader`] is used
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(BatchState::default());
        Self {
            loader: None,
            sink: None,
            reporter: Arc::new(NoOpProgressReporter),
            state,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Use an externally owned token; once it fires, batches stop before
    /// their next item
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Clone of the token checked between items
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Owned snapshot of the current state
    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.state.subscribe()
    }

    /// Convert every input with the preset's defaults
    pub async fn convert_with_preset<S: AsRef<str>>(
        &mut self,
        preset: Preset,
        inputs: &[S],
    ) -> BatchResult {
        self.convert_all(inputs, &BatchOptions::with_preset(preset))
            .await
    }

    /// Process `inputs` sequentially with `options`
    ///
    /// Setup problems (no loader, invalid options, no inputs) produce an
    /// unsuccessful result with empty lists. Per-item failures are collected
    /// in `errors` and never abort the batch.
    #[instrument(skip(self, inputs, options), fields(preset = %options.preset, inputs = inputs.len()))]
    pub async fn convert_all<S: AsRef<str>>(
        &mut self,
        inputs: &[S],
        options: &BatchOptions,
    ) -> BatchResult {
        self.state.send_replace(BatchState::default());
        let started_at = Utc::now();
        let preset = options.preset;

        let loader = match self.loader.clone() {
            Some(loader) => loader,
            None => {
                let err = BgAlphaError::dependency_missing("No image loader is configured");
                error!("Batch setup failed: {}", err);
                return BatchResult::unsuccessful(preset, err.to_string(), started_at);
            },
        };

        let config = match options.resolve_config() {
            Ok(config) => config,
            Err(err) => {
                error!("Batch setup failed: {}", err);
                return BatchResult::unsuccessful(preset, err.to_string(), started_at);
            },
        };

        if inputs.is_empty() {
            warn!("Batch started without inputs");
            return BatchResult::unsuccessful(
                preset,
                "No input images to process".to_string(),
                started_at,
            );
        }

        let items = if inputs.len() > options.max_items {
            warn!(
                requested = inputs.len(),
                max_items = options.max_items,
                "Too many inputs, processing only the first {}",
                options.max_items
            );
            &inputs[..options.max_items]
        } else {
            inputs
        };

        match self.run_items(items, loader, config, options).await {
            Ok((processed_files, errors, cancelled)) => {
                let finished_at = Utc::now();
                let message = if cancelled {
                    format!(
                        "Cancelled after {} of {} items: {} succeeded, {} failed",
                        processed_files.len() + errors.len(),
                        items.len(),
                        processed_files.len(),
                        errors.len()
                    )
                } else {
                    format!(
                        "Processing complete: {} succeeded, {} failed",
                        processed_files.len(),
                        errors.len()
                    )
                };
                info!(
                    succeeded = processed_files.len(),
                    failed = errors.len(),
                    cancelled,
                    "{}",
                    message
                );

                BatchResult {
                    overall_success: errors.is_empty() && !processed_files.is_empty() && !cancelled,
                    message,
                    processed_files,
                    errors,
                    preset,
                    started_at,
                    finished_at,
                    cancelled,
                }
            },
            Err(err) => {
                self.state.send_modify(|state| state.is_processing = false);
                error!("Batch setup failed: {}", err);
                BatchResult::unsuccessful(preset, err.to_string(), started_at)
            },
        }
    }

    async fn run_items<S: AsRef<str>>(
        &self,
        items: &[S],
        loader: Arc<dyn ImageLoader>,
        config: ProcessingConfig,
        options: &BatchOptions,
    ) -> Result<(Vec<ProcessingResult>, Vec<ProcessingResult>, bool)> {
        let total = items.len();
        let mut processor = AlphaProcessor::new(config.clone())?;
        let batch_start = Instant::now();

        self.state.send_modify(|state| {
            state.is_processing = true;
            state.total_count = total;
        });
        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::BatchInitialization,
            batch_start,
        ));

        let mut processed_files = Vec::new();
        let mut errors = Vec::new();
        let mut cancelled = false;

        for (index, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(processed = index, total, "Batch cancelled");
                cancelled = true;
                break;
            }

            let input_id = item.as_ref();
            self.state.send_modify(|state| {
                state.current_item = Some(input_id.to_string());
                state.processed_count = index;
            });

            let item_start = Instant::now();
            let outcome = self
                .process_item(&mut processor, loader.as_ref(), input_id)
                .await;

            match outcome {
                Ok(output_id) => {
                    info!(input = input_id, output = %output_id, "Item converted");
                    let result = ProcessingResult::succeeded(input_id, output_id, &config);
                    self.state
                        .send_modify(|state| state.results.push(result.clone()));
                    processed_files.push(result);
                },
                Err(err) => {
                    error!(input = input_id, kind = err.kind(), "Item failed: {}", err);
                    let result = ProcessingResult::failed(input_id, &err, &config);
                    self.state
                        .send_modify(|state| state.errors.push(result.clone()));
                    errors.push(result);
                },
            }

            let completed = index + 1;
            self.report_item_progress(
                batch_start,
                item_start,
                input_id,
                completed,
                total,
                errors.len(),
            );

            if completed < total {
                if options.inter_item_delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(options.inter_item_delay).await;
                }
            }
        }

        let attempted = processed_files.len() + errors.len();
        self.state.send_modify(|state| {
            state.is_processing = false;
            state.current_item = None;
            state.processed_count = if cancelled { attempted } else { total };
        });
        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::BatchFinalization,
            batch_start,
        ));

        Ok((processed_files, errors, cancelled))
    }

    async fn process_item(
        &self,
        processor: &mut AlphaProcessor,
        loader: &dyn ImageLoader,
        input_id: &str,
    ) -> Result<String> {
        let result = processor.process_source(loader, input_id).await?;
        let output_id = output_id_for(input_id);
        if let Some(ref sink) = self.sink {
            sink.store(&output_id, &result.image).await?;
        }
        Ok(output_id)
    }

    fn report_item_progress(
        &self,
        batch_start: Instant,
        item_start: Instant,
        input_id: &str,
        completed: usize,
        total: usize,
        failed: usize,
    ) {
        let elapsed_secs = batch_start.elapsed().as_secs_f64();
        let processing_rate = if elapsed_secs > 0.0 {
            completed as f64 / elapsed_secs
        } else {
            0.0
        };
        let eta_seconds = (processing_rate > 0.0)
            .then(|| ((total - completed) as f64 / processing_rate).round() as u64);

        let stats = BatchProcessingStats {
            items_completed: completed,
            items_total: total,
            items_failed: failed,
            current_item_name: input_id.to_string(),
            processing_rate,
            eta_seconds,
        };
        let total_progress = ProgressUpdate::with_description(
            ProcessingStage::BatchItemProcessing,
            format!("Processed {}/{} items", completed, total),
            batch_start,
        )
        .with_progress(stats.percentage());

        self.reporter.report_batch_progress(BatchProgressUpdate {
            total_progress,
            current_item_progress: Some(ProgressUpdate::new(ProcessingStage::Completed, item_start)),
            stats,
        });
    }
}
