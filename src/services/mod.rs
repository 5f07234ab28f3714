//! Services that sit around the pixel pipeline: image I/O and progress reporting

pub mod io;
pub mod progress;

pub use io::{
    FileImageLoader, ImageIOService, ImageLoader, MemoryImageLoader, MemorySink, NullSink,
    OutputSink, PngDirectorySink,
};
pub use progress::{
    create_cli_progress_reporter, BatchProcessingStats, BatchProgressUpdate,
    ConsoleProgressReporter, EnhancedProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
