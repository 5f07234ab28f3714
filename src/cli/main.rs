//! Background-to-alpha CLI tool
//!
//! Expands files and directories into batches, runs them through the batch
//! orchestrator and writes transparent PNGs.

use super::config::CliConfigBuilder;
use crate::{
    batch::{BatchOrchestrator, BatchResult, BatchState},
    config::{BatchOptions, Preset},
    processing::detect_background_color,
    services::{create_cli_progress_reporter, FileImageLoader, ImageIOService, PngDirectorySink},
    tracing_config::{events, init_cli_tracing, spans, TracingOutput},
    ColorFamily,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

/// Make flat image backgrounds transparent
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgalpha")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output directory [default: next to each input]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Background preset (auto, white, red, green, blue, black, gray, cyan, magenta, yellow)
    #[arg(short, long, default_value = "auto")]
    pub preset: String,

    /// Quality profile for auto-detection (ai_optimized, simple, super_smooth, photo_grade)
    #[arg(long)]
    pub profile: Option<String>,

    /// Lab ΔE threshold below which a pixel is treated as background
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Feather radius in pixels (0 disables feathering)
    #[arg(long)]
    pub feather_radius: Option<f32>,

    /// Skip the bilateral color denoising pass
    #[arg(long)]
    pub no_smooth: bool,

    /// Background color to remove, as hex (#00ff00) or r,g,b
    #[arg(long, value_name = "COLOR")]
    pub target_color: Option<String>,

    /// Per-image load timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum number of images per batch
    #[arg(long, default_value_t = crate::config::DEFAULT_MAX_ITEMS)]
    pub max_files: usize,

    /// Pause between images in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Filename pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Print the detected background and a matching preset, then exit
    #[arg(long)]
    pub detect_only: bool,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Show nested batch progress instead of the progress bar
    #[arg(long)]
    pub progress: bool,

    /// Also write logs to a daily rolling file next to PATH
    #[cfg(feature = "tracing-files")]
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// One directory worth of inputs, identified relative to `root`
#[derive(Debug, Clone, PartialEq, Eq)]
struct InputGroup {
    root: PathBuf,
    ids: Vec<String>,
}

#[derive(Serialize)]
struct CliReport<'a> {
    session_id: &'a str,
    batches: &'a [BatchResult],
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (_guard, session_id) = init_cli_tracing(cli.verbose, cli.json, tracing_output(&cli))
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let options = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let session = spans::session(&session_id, options.preset.name());
    run(&cli, &options, &session_id).instrument(session).await
}

#[cfg(feature = "tracing-files")]
fn tracing_output(cli: &Cli) -> TracingOutput {
    match &cli.log_file {
        Some(path) => TracingOutput::Both(path.clone()),
        None => TracingOutput::Console,
    }
}

#[cfg(not(feature = "tracing-files"))]
fn tracing_output(_cli: &Cli) -> TracingOutput {
    TracingOutput::Console
}

async fn run(cli: &Cli, options: &BatchOptions, session_id: &str) -> Result<()> {
    let groups = collect_inputs(cli)?;
    let total_files: usize = groups.iter().map(|group| group.ids.len()).sum();

    if total_files == 0 {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image file(s) to process", total_files);

    if cli.detect_only {
        return detect_backgrounds(&groups).await;
    }

    if let Some(output) = &cli.output {
        if output.is_file() {
            anyhow::bail!(
                "Output path exists and is a file, not a directory: {}",
                output.display()
            );
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current image before stopping");
            ctrl_c_token.cancel();
        }
    });

    let reporter = create_cli_progress_reporter(cli.progress, cli.verbose > 0, total_files);
    let start_time = Instant::now();
    let mut results = Vec::with_capacity(groups.len());

    for group in &groups {
        if cancel.is_cancelled() {
            break;
        }

        if group.ids.len() > options.max_items {
            events::warning_with_recommendation(
                &format!(
                    "{} images found in {}, only the first {} will be processed",
                    group.ids.len(),
                    group.root.display(),
                    options.max_items
                ),
                "raise --max-files or narrow the inputs with --pattern",
            );
        }

        let sink_dir = cli.output.clone().unwrap_or_else(|| group.root.clone());
        let mut orchestrator = BatchOrchestrator::new()
            .with_loader(Arc::new(FileImageLoader::new(&group.root)))
            .with_sink(Arc::new(PngDirectorySink::new(sink_dir)))
            .with_reporter(Arc::clone(&reporter))
            .with_cancellation_token(cancel.clone());

        let bar = if !cli.progress && !cli.json && group.ids.len() > 1 {
            Some(progress_bar(group.ids.len().min(options.max_items))?)
        } else {
            None
        };
        let watcher = bar
            .clone()
            .map(|bar| tokio::spawn(drive_progress_bar(orchestrator.subscribe(), bar)));

        let result = orchestrator
            .convert_all(&group.ids, options)
            .instrument(spans::batch_processing(group.ids.len()))
            .await;

        // Dropping the orchestrator closes the state channel and ends the watcher
        drop(orchestrator);
        if let Some(watcher) = watcher {
            let _ = watcher.await;
        }
        if let Some(bar) = bar {
            bar.finish_with_message(result.message.clone());
        }

        for failure in &result.errors {
            events::error_with_context(
                &failure.error.as_deref().unwrap_or("unknown error"),
                &failure.input_id,
            );
        }
        results.push(result);
    }

    let elapsed = start_time.elapsed();
    let succeeded: usize = results.iter().map(|r| r.processed_files.len()).sum();
    let failed: usize = results.iter().map(|r| r.errors.len()).sum();
    events::performance_metric("batch", elapsed.as_millis() as u64, succeeded + failed);

    if cli.json {
        let report = CliReport {
            session_id,
            batches: &results,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_summary(&results, elapsed.as_secs_f64());
    }

    if failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", failed, succeeded + failed);
    }
    if cancel.is_cancelled() {
        anyhow::bail!("Processing was cancelled");
    }
    Ok(())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

async fn drive_progress_bar(mut state: watch::Receiver<BatchState>, bar: ProgressBar) {
    while state.changed().await.is_ok() {
        let snapshot = state.borrow_and_update().clone();
        bar.set_position((snapshot.results.len() + snapshot.errors.len()) as u64);
        if let Some(current) = snapshot.current_item {
            bar.set_message(format!("Processing {}", current));
        }
    }
}

fn print_summary(results: &[BatchResult], seconds: f64) {
    for result in results {
        for item in &result.processed_files {
            if let Some(output_id) = &item.output_id {
                println!("✓ {} -> {}", item.input_id, output_id);
            }
        }
        for item in &result.errors {
            println!(
                "✗ {}: {}",
                item.input_id,
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!("{}", result.message);
    }
    println!("Finished in {:.2}s", seconds);
}

/// Report the corner-detected background of every input
async fn detect_backgrounds(groups: &[InputGroup]) -> Result<()> {
    for group in groups {
        for id in &group.ids {
            let path = group.root.join(id);
            match ImageIOService::load_image(&path).await {
                Ok(image) => {
                    let color = detect_background_color(&image);
                    let family = ColorFamily::of(color);
                    println!(
                        "{}: background {} ({}), suggested preset: {}",
                        path.display(),
                        color,
                        family,
                        Preset::from(family)
                    );
                },
                Err(err) => events::error_with_context(&err, &path.display().to_string()),
            }
        }
    }
    Ok(())
}

/// Turn the positional inputs into per-directory groups
fn collect_inputs(cli: &Cli) -> Result<Vec<InputGroup>> {
    let mut groups: Vec<InputGroup> = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if !ImageIOService::is_supported_format(&path) {
                warn!("Skipping unsupported file: {}", path.display());
                continue;
            }
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping file with a non UTF-8 name: {}", path.display());
                continue;
            };
            match groups.iter_mut().find(|group| group.root == root) {
                Some(group) => group.ids.push(name.to_string()),
                None => groups.push(InputGroup {
                    root,
                    ids: vec![name.to_string()],
                }),
            }
        } else if path.is_dir() {
            let _span = spans::discovery(&path, cli.recursive).entered();
            let files = find_image_files(&path, cli.recursive, cli.pattern.as_deref())?;
            debug!(count = files.len(), "Discovered images");
            let ids = relative_ids(&path, &files);
            groups.push(InputGroup { root: path, ids });
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    for group in &mut groups {
        group.ids.sort();
        group.ids.dedup();
    }
    groups.retain(|group| !group.ids.is_empty());
    Ok(groups)
}

fn relative_ids(root: &Path, files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .filter_map(|file| file.strip_prefix(root).ok())
        .filter_map(|relative| relative.to_str().map(str::to_string))
        .collect()
}

/// Find all supported image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_image_file(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_image_file(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    ImageIOService::is_supported_format(path)
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}
