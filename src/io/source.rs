//! # Image Loading
//!
//! Turns a file path into a [`SourceImage`]. Decoding uses the `image` crate, which picks
//! the format from the file contents. Any colour mode it can decode (grey, grey+alpha,
//! RGBA, 16-bit, float) is converted to RGB; alpha is dropped.
//!
//! Decoding is CPU-bound and runs on the blocking pool so the async runtime is not stalled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::core::image::SourceImage;
use crate::error::{CompressError, CompressResult};

/// Abstract interface for image sources.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Load and decode the image at `path`.
    ///
    /// # Errors
    ///
    /// [`CompressError::Load`] if the file is missing, unreadable or cannot be decoded.
    async fn load(&self, path: &Path) -> CompressResult<SourceImage>;
}

/// Loads images from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    /// Decode through the floating-point path instead of quantising to 8 bits first.
    pub reload_as_float: bool,
}

impl FileImageSource {
    pub fn new(reload_as_float: bool) -> Self {
        Self { reload_as_float }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn load(&self, path: &Path) -> CompressResult<SourceImage> {
        let path: PathBuf = path.to_path_buf();
        let as_float = self.reload_as_float;
        let display = path.display().to_string();
        tokio::task::spawn_blocking(move || decode_file(&path, as_float))
            .await
            .map_err(|e| CompressError::external("tokio", e).with_context(display))?
    }
}

/// Decode `path` synchronously.
pub fn decode_file(path: &Path, reload_as_float: bool) -> CompressResult<SourceImage> {
    let display = path.display().to_string();
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| CompressError::load(&display, "path has no usable file name"))?
        .to_string();

    let decoded = ImageReader::open(path)
        .map_err(|e| CompressError::load(&display, e.to_string()))?
        .with_guessed_format()
        .map_err(|e| CompressError::load(&display, e.to_string()))?
        .decode()
        .map_err(|e| CompressError::load(&display, e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(CompressError::load(&display, "image has no pixels"));
    }

    Ok(from_dynamic(name, decoded, reload_as_float))
}

/// Convert a decoded image of any colour mode into a [`SourceImage`].
pub fn from_dynamic(name: String, decoded: DynamicImage, reload_as_float: bool) -> SourceImage {
    let color = decoded.color();
    if !matches!(color, image::ColorType::Rgb8 | image::ColorType::Rgb32F) {
        debug!(image = %name, from = ?color, "converting to RGB");
    }
    if reload_as_float {
        SourceImage::from_rgb32f(name, decoded.to_rgb32f())
    } else {
        SourceImage::from_rgb8(name, decoded.to_rgb8())
    }
}
