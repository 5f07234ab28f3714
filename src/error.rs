//! Error types for background-to-alpha operations

use thiserror::Error;

/// Result type alias for background-to-alpha operations
pub type Result<T> = std::result::Result<T, BgAlphaError>;

/// Error kinds raised by the pipeline, the loaders and the batch orchestrator
#[derive(Error, Debug)]
pub enum BgAlphaError {
    /// Input raster has zero width or zero height
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Image acquisition exceeded its deadline
    #[error("Load timeout: {0}")]
    LoadTimeout(String),

    /// Underlying decode or fetch failed
    #[error("Load failure: {0}")]
    LoadFailure(String),

    /// A required capability was not wired up
    #[error("Dependency missing: {0}")]
    DependencyMissing(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure inside a pipeline stage
    #[error("Processing error: {0}")]
    Processing(String),

    /// The output sink rejected a processed image
    #[error("Output error: {0}")]
    Output(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec errors
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}

impl BgAlphaError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new load timeout error
    pub fn load_timeout<S: Into<String>>(msg: S) -> Self {
        Self::LoadTimeout(msg.into())
    }

    /// Create a new load failure error
    pub fn load_failure<S: Into<String>>(msg: S) -> Self {
        Self::LoadFailure(msg.into())
    }

    /// Create a new dependency missing error
    pub fn dependency_missing<S: Into<String>>(msg: S) -> Self {
        Self::DependencyMissing(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new output error
    pub fn output<S: Into<String>>(msg: S) -> Self {
        Self::Output(msg.into())
    }

    // Contextual error creators

    /// Create a load failure naming the input that could not be acquired
    pub fn load_failure_for(input_id: &str, error: &dyn std::fmt::Display) -> Self {
        Self::LoadFailure(format!("Failed to load '{}': {}", input_id, error))
    }

    /// Create a load timeout naming the input and the deadline that expired
    #[must_use]
    pub fn load_timeout_for(input_id: &str, timeout: std::time::Duration) -> Self {
        Self::LoadTimeout(format!(
            "Loading '{}' exceeded {}ms",
            input_id,
            timeout.as_millis()
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    #[must_use]
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Short machine-friendly name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidImage(_) => "invalid_image",
            Self::LoadTimeout(_) => "load_timeout",
            Self::LoadFailure(_) => "load_failure",
            Self::DependencyMissing(_) => "dependency_missing",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Processing(_) => "processing",
            Self::Output(_) => "output",
            Self::Io(_) => "io",
            Self::Image(_) => "image",
        }
    }
}
