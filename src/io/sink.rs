//! # Image Persistence
//!
//! Writes each [`ReconstructedImage`] as a lossy-compressed JPEG named
//! `{base_name}_{variant}_{rank}.jpg`. Every rank is written independently; one failed
//! write never prevents the next.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::core::image::ReconstructedImage;
use crate::error::{CompressError, CompressResult};

/// Default JPEG quality for reconstructions.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Destination identifier for one reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputName {
    pub base_name: String,
    pub variant: String,
    pub rank: usize,
}

impl OutputName {
    pub fn new(base_name: impl Into<String>, variant: impl Into<String>, rank: usize) -> Self {
        Self {
            base_name: base_name.into(),
            variant: variant.into(),
            rank,
        }
    }

    /// `{base_name}_{variant}_{rank}.jpg`
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.jpg", self.base_name, self.variant, self.rank)
    }
}

/// Abstract interface for persisting reconstructions.
#[async_trait]
pub trait ImageSink: Send + Sync {
    /// Persist `image` under `name`, returning where it went.
    ///
    /// # Errors
    ///
    /// [`CompressError::Write`] if the destination cannot be written.
    async fn write(&self, image: &ReconstructedImage, name: &OutputName) -> CompressResult<PathBuf>;
}

#[async_trait]
impl<T: ImageSink + ?Sized> ImageSink for Arc<T> {
    async fn write(&self, image: &ReconstructedImage, name: &OutputName) -> CompressResult<PathBuf> {
        (**self).write(image, name).await
    }
}

/// Writes JPEG files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct JpegFileSink {
    pub output_dir: PathBuf,
    pub quality: u8,
}

impl JpegFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            quality,
        }
    }
}

#[async_trait]
impl ImageSink for JpegFileSink {
    async fn write(&self, image: &ReconstructedImage, name: &OutputName) -> CompressResult<PathBuf> {
        let path = self.output_dir.join(name.file_name());
        let pixels = image.pixels().clone();
        let quality = self.quality;
        let dir = self.output_dir.clone();
        let rank = name.rank;
        let target = path.clone();

        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&dir).map_err(|e| {
                CompressError::write(dir.display().to_string(), rank, e.to_string())
                    .with_operation("create_output_dir")
            })?;
            encode_jpeg(&pixels, &target, quality)
                .map_err(|reason| CompressError::write(target.display().to_string(), rank, reason))
        })
        .await
        .map_err(|e| CompressError::external("tokio", e))??;

        Ok(path)
    }
}

/// Encode `pixels` as JPEG at `path`.
///
/// The buffered writer is flushed explicitly so a failure on the final block is reported.
pub fn encode_jpeg(pixels: &RgbImage, path: &Path, quality: u8) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())
}

/// Keeps reconstructions in memory, keyed by output name.
#[derive(Debug, Default)]
pub struct MemoryImageSink {
    images: Mutex<Vec<(OutputName, RgbImage)>>,
}

impl MemoryImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far, in write order.
    pub fn images(&self) -> Vec<(OutputName, RgbImage)> {
        self.images
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageSink for MemoryImageSink {
    async fn write(&self, image: &ReconstructedImage, name: &OutputName) -> CompressResult<PathBuf> {
        let mut images = self.images.lock().map_err(|_| {
            CompressError::write(name.file_name(), name.rank, "memory sink lock poisoned")
        })?;
        images.push((name.clone(), image.pixels().clone()));
        Ok(PathBuf::from(name.file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_format() {
        let name = OutputName::new("silksong", "human", 20);
        assert_eq!(name.file_name(), "silksong_human_20.jpg");
    }

    #[tokio::test]
    async fn jpeg_sink_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("result");
        let sink = JpegFileSink::new(&out, DEFAULT_JPEG_QUALITY);
        let image = ReconstructedImage::new(5, 5, RgbImage::from_pixel(8, 6, image::Rgb([90, 120, 200])));

        let path = sink
            .write(&image, &OutputName::new("cat", "svd", 5))
            .await
            .unwrap();

        assert_eq!(path, out.join("cat_svd_5.jpg"));
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 6));
    }

    #[tokio::test]
    async fn unwritable_destination_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the output directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let sink = JpegFileSink::new(blocker.join("out"), DEFAULT_JPEG_QUALITY);
        let image = ReconstructedImage::new(20, 20, RgbImage::new(2, 2));

        let err = sink
            .write(&image, &OutputName::new("cat", "svd", 20))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "write");
        assert!(err.to_string().contains("rank 20"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn full_device_is_reported() {
        let pixels = RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let result = encode_jpeg(&pixels, Path::new("/dev/full"), DEFAULT_JPEG_QUALITY);
        assert!(result.is_err(), "write to a full device reported success");
    }

    #[tokio::test]
    async fn memory_sink_records_writes() {
        let sink = MemoryImageSink::new();
        let image = ReconstructedImage::new(1, 1, RgbImage::new(1, 1));
        sink.write(&image, &OutputName::new("a", "svd", 1)).await.unwrap();
        sink.write(&image, &OutputName::new("a", "svd", 2)).await.unwrap();
        let names: Vec<usize> = sink.images().iter().map(|(n, _)| n.rank).collect();
        assert_eq!(names, vec![1, 2]);
    }
}
