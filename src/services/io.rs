//! Image acquisition and output services
//!
//! The pipeline never touches the filesystem directly: batches pull images
//! through an [`ImageLoader`] and hand results to an [`OutputSink`].

use crate::error::{BgAlphaError, Result};
use async_trait::async_trait;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Extensions the decoder understands
#[cfg(not(feature = "webp-support"))]
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];
#[cfg(feature = "webp-support")]
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// Resolves an input identifier to a decoded raster
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Load and decode `input_id`
    ///
    /// # Errors
    /// - The input cannot be fetched or decoded
    async fn load(&self, input_id: &str) -> Result<RgbaImage>;
}

/// Receives processed rasters under their output identifier
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Persist `image` as `output_id`
    ///
    /// # Errors
    /// - The sink cannot store the image
    async fn store(&self, output_id: &str, image: &RgbaImage) -> Result<()>;
}

/// Stateless helpers for decoding and encoding images
pub struct ImageIOService;

impl ImageIOService {
    /// Whether the file extension names a decodable format (case-insensitive)
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Decode in-memory bytes, guessing the format from the content
    ///
    /// # Errors
    /// - Empty input or unrecognized/corrupt data
    pub fn load_from_bytes(bytes: &[u8]) -> Result<RgbaImage> {
        if bytes.is_empty() {
            return Err(BgAlphaError::load_failure("Input contains no bytes"));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| BgAlphaError::load_failure(format!("Failed to decode image: {}", e)))?;
        Ok(image.to_rgba8())
    }

    /// Read and decode an image file
    ///
    /// # Errors
    /// - Missing or unreadable file, undecodable contents
    pub async fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BgAlphaError::load_failure_for(&path.display().to_string(), &e))?;

        let display = path.display().to_string();
        match tokio::task::spawn_blocking(move || Self::load_from_bytes(&bytes)).await {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(BgAlphaError::LoadFailure(msg))) => Err(BgAlphaError::LoadFailure(format!(
                "Failed to load '{}': {}",
                display, msg
            ))),
            Ok(Err(e)) => Err(BgAlphaError::load_failure_for(&display, &e)),
            Err(e) => Err(BgAlphaError::load_failure_for(&display, &e)),
        }
    }

    /// Encode `image` as PNG at `path`, creating parent directories
    ///
    /// # Errors
    /// - Directory creation, encoding or write failure
    pub async fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BgAlphaError::output(format!(
                        "Failed to create output directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let bytes = Self::encode_png(image)?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            BgAlphaError::output(format!("Failed to write '{}': {}", path.display(), e))
        })
    }

    /// Encode `image` as PNG bytes
    ///
    /// # Errors
    /// - PNG encoder failure
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .map_err(|e| BgAlphaError::output(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer)
    }
}

/// Loads identifiers as paths relative to a root directory
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    root: PathBuf,
}

impl FileImageLoader {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Identifiers are used as given (absolute or relative to the working directory)
    #[must_use]
    pub fn unrooted() -> Self {
        Self::new(PathBuf::new())
    }

    #[must_use]
    pub fn resolve(&self, input_id: &str) -> PathBuf {
        self.root.join(input_id)
    }
}

#[async_trait]
impl ImageLoader for FileImageLoader {
    async fn load(&self, input_id: &str) -> Result<RgbaImage> {
        let path = self.resolve(input_id);
        log::debug!("Loading '{}' from {}", input_id, path.display());
        ImageIOService::load_image(&path).await
    }
}

/// Serves rasters from memory, keyed by identifier
#[derive(Debug, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, RgbaImage>,
}

impl MemoryImageLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image<S: Into<String>>(mut self, input_id: S, image: RgbaImage) -> Self {
        self.insert(input_id, image);
        self
    }

    pub fn insert<S: Into<String>>(&mut self, input_id: S, image: RgbaImage) {
        self.images.insert(input_id.into(), image);
    }
}

#[async_trait]
impl ImageLoader for MemoryImageLoader {
    async fn load(&self, input_id: &str) -> Result<RgbaImage> {
        self.images
            .get(input_id)
            .cloned()
            .ok_or_else(|| BgAlphaError::load_failure_for(input_id, &"no such image"))
    }
}

/// Writes every result as a PNG under a directory
#[derive(Debug, Clone)]
pub struct PngDirectorySink {
    directory: PathBuf,
}

impl PngDirectorySink {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl OutputSink for PngDirectorySink {
    async fn store(&self, output_id: &str, image: &RgbaImage) -> Result<()> {
        ImageIOService::save_png(image, self.directory.join(output_id)).await
    }
}

/// Keeps results in memory; handy for tests and previews
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Mutex<Vec<(String, RgbaImage)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Output identifiers in the order they were stored
    #[must_use]
    pub fn output_ids(&self) -> Vec<String> {
        self.stored
            .lock()
            .map(|stored| stored.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, output_id: &str) -> Option<RgbaImage> {
        self.stored.lock().ok().and_then(|stored| {
            stored
                .iter()
                .find(|(id, _)| id == output_id)
                .map(|(_, image)| image.clone())
        })
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn store(&self, output_id: &str, image: &RgbaImage) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| BgAlphaError::output("Memory sink lock poisoned"))?;
        stored.push((output_id.to_string(), image.clone()));
        Ok(())
    }
}

/// Discards every result
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl OutputSink for NullSink {
    async fn store(&self, _output_id: &str, _image: &RgbaImage) -> Result<()> {
        Ok(())
    }
}
