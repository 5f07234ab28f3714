//! Tracing configuration module for structured logging
//!
//! The library only emits `tracing` events and spans; binaries install a
//! subscriber through [`TracingConfig`]. `log` records (used by the console
//! progress reporters) are bridged into the same subscriber.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output without colors, for CI logs
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Configuration for tracing output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Output to both stderr and a daily rolling file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only at shutdown
#[must_use = "dropping the guard stops buffered file logging"]
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl std::fmt::Debug for TracingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingGuard").finish_non_exhaustive()
    }
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID logged once after initialization
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: progress and summaries
            1 => "debug", // -v: per-stage details
            _ => "trace", // -vv and above
        }
    }

    fn console_layer(format: TracingFormat) -> BoxedLayer {
        match format {
            TracingFormat::Console => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .with_level(true)
                .compact()
                .boxed(),
            TracingFormat::Compact => fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .compact()
                .boxed(),
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        }
    }

    #[cfg(feature = "tracing-files")]
    fn file_layer(
        format: TracingFormat,
        appender: tracing_appender::rolling::RollingFileAppender,
    ) -> (BoxedLayer, tracing_appender::non_blocking::WorkerGuard) {
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = match format {
            TracingFormat::Console | TracingFormat::Compact => fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .compact()
                .boxed(),
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        };
        (layer, guard)
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match &self.output {
            TracingOutput::Console => layers.push(Self::console_layer(self.format)),

            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_name()
                        .unwrap_or_else(|| std::ffi::OsStr::new("bgalpha.log")),
                );
                let (layer, file_guard) = Self::file_layer(self.format, appender);
                layers.push(layer);
                guard._file_guard = Some(file_guard);
            },

            #[cfg(feature = "tracing-files")]
            TracingOutput::Both(path) => {
                layers.push(Self::console_layer(self.format));
                let appender = tracing_appender::rolling::daily(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_stem()
                        .unwrap_or_else(|| std::ffi::OsStr::new("bgalpha")),
                );
                let (layer, file_guard) = Self::file_layer(self.format, appender);
                layers.push(layer);
                guard._file_guard = Some(file_guard);
            },
        }

        Registry::default().with(layers).with(filter).try_init()?;

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Session started");
        }

        Ok(guard)
    }
}

/// Initialize tracing with CLI defaults and a fresh session id
///
/// # Errors
/// - A global subscriber is already installed
pub fn init_cli_tracing(
    verbosity: u8,
    json: bool,
    output: TracingOutput,
) -> anyhow::Result<(TracingGuard, String)> {
    let session_id = uuid::Uuid::new_v4().to_string();

    #[cfg(feature = "tracing-json")]
    let format = if json {
        TracingFormat::Json
    } else {
        TracingFormat::Console
    };
    #[cfg(not(feature = "tracing-json"))]
    let format = {
        let _ = json;
        TracingFormat::Console
    };

    let guard = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_output(output)
        .with_session_id(session_id.clone())
        .init()?;
    Ok((guard, session_id))
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one CLI invocation
    pub fn session(session_id: &str, preset: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            preset = %preset
        )
    }

    /// Span covering input discovery
    pub fn discovery(root: &std::path::Path, recursive: bool) -> Span {
        tracing::span!(
            Level::DEBUG,
            "discovery",
            root = %root.display(),
            recursive = recursive
        )
    }

    /// Span covering a batch run
    pub fn batch_processing(item_count: usize) -> Span {
        tracing::span!(Level::INFO, "batch_processing", item_count = item_count)
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, warn};

    pub fn error_with_context(error: &dyn std::fmt::Display, context: &str) {
        error!(
            error = %error,
            context = %context,
            "Operation failed"
        );
    }

    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(
            recommendation = %recommendation,
            "{}",
            message
        );
    }

    pub fn performance_metric(operation: &str, duration_ms: u64, items: usize) {
        debug!(
            operation = %operation,
            duration_ms = duration_ms,
            items = items,
            "Performance metric"
        );
    }
}
