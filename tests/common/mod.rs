//! Common test utilities for the compression tests
//!
//! Synthetic images with known structure, plus sources and sinks that fail on demand.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use image::{Rgb, Rgb32FImage, RgbImage};
use svd_image_compress::core::{ReconstructedImage, SourceImage};
use svd_image_compress::error::{CompressError, CompressResult};
use svd_image_compress::io::{ImageSink, ImageSource, OutputName, ReportEvent, ReportSink};

/// Every channel is an outer product `a * (row + 1) * (col + 1)`, so each has rank one.
pub fn rank_one_rgb(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let p = (x + 1) * (y + 1);
        Rgb([(3 * p) as u8, (2 * p) as u8, p as u8])
    })
}

/// Smooth gradient with some texture, full rank in general.
pub fn textured_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            ((x * 7 + y * 13) % 256) as u8,
        ])
    })
}

/// Save `img` as PNG under `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(format!("{}.png", name));
    img.save(&path).expect("write test png");
    path
}

/// Serves images from memory. Paths named `missing*` fail to load, `defect*` fail with
/// a channel shape mismatch, and `nan*` decode into a channel containing NaN.
#[derive(Default)]
pub struct SyntheticSource;

#[async_trait]
impl ImageSource for SyntheticSource {
    async fn load(&self, path: &Path) -> CompressResult<SourceImage> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CompressError::load(path.display().to_string(), "no name"))?
            .to_string();
        if name.starts_with("missing") {
            return Err(CompressError::load(path.display().to_string(), "not found"));
        }
        if name.starts_with("defect") {
            return Err(CompressError::shape_mismatch("green", (6, 6), (6, 5)));
        }
        if name.starts_with("nan") {
            let mut rgb = Rgb32FImage::from_pixel(6, 6, Rgb([0.5, 0.5, 0.5]));
            rgb.put_pixel(2, 3, Rgb([0.5, f32::NAN, 0.5]));
            return Ok(SourceImage::from_rgb32f(name, rgb));
        }
        Ok(SourceImage::from_rgb8(name, textured_rgb(10, 8)))
    }
}

/// Records writes in memory but refuses the listed ranks.
pub struct FlakySink {
    fail_ranks: HashSet<usize>,
    written: Mutex<Vec<OutputName>>,
}

impl FlakySink {
    pub fn failing_on(ranks: &[usize]) -> Self {
        Self {
            fail_ranks: ranks.iter().copied().collect(),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn written(&self) -> Vec<OutputName> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSink for FlakySink {
    async fn write(&self, _image: &ReconstructedImage, name: &OutputName) -> CompressResult<PathBuf> {
        if self.fail_ranks.contains(&name.rank) {
            return Err(CompressError::write(name.file_name(), name.rank, "device full"));
        }
        self.written.lock().unwrap().push(name.clone());
        Ok(PathBuf::from(name.file_name()))
    }
}

/// Report sink that always fails.
pub struct BrokenReportSink;

#[async_trait]
impl ReportSink for BrokenReportSink {
    async fn record(&self, _event: &ReportEvent) -> anyhow::Result<()> {
        Err(anyhow!("report backend unavailable"))
    }

    fn name(&self) -> &str {
        "broken"
    }
}
