//! # Image Data Model
//!
//! A [`SourceImage`] is an immutable `height × width × 3` RGB image, promoted to three
//! `f64` channel matrices for computation. A [`ReconstructedImage`] is the clipped 8-bit
//! result for one rank, created fresh per `(image, rank)` pair and never mutated.
//!
//! ## Precision Paths
//!
//! - **8-bit**: decode to `RgbImage` first, then promote each byte to `f64`. Channel
//!   values are exact integers in `0..=255`.
//! - **float reload**: decode to `Rgb32FImage` and scale by 255. Sources with more than
//!   8 bits per sample (16-bit PNG/TIFF) keep their fractional precision through the SVD.
//!
//! The original 8-bit buffer is kept in both cases so reconstructions can be compared
//! against it.

use image::{Rgb32FImage, RgbImage};
use svd_rank::ChannelMatrix;

use crate::error::{CompressError, CompressResult};

/// Channel names in storage order.
pub const CHANNEL_NAMES: [&str; 3] = ["red", "green", "blue"];

/// An RGB image split into three `f64` planes.
#[derive(Debug, Clone)]
pub struct SourceImage {
    name: String,
    height: usize,
    width: usize,
    planes: [ChannelMatrix; 3],
    original: RgbImage,
}

impl SourceImage {
    /// Build from an 8-bit RGB buffer.
    pub fn from_rgb8(name: impl Into<String>, rgb: RgbImage) -> Self {
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let planes = std::array::from_fn(|c| {
            ChannelMatrix::from_fn(height, width, |y, x| {
                rgb.get_pixel(x as u32, y as u32)[c] as f64
            })
        });
        Self {
            name: name.into(),
            height,
            width,
            planes,
            original: rgb,
        }
    }

    /// Build from a floating-point RGB buffer (samples nominally in `[0, 1]`).
    pub fn from_rgb32f(name: impl Into<String>, rgb: Rgb32FImage) -> Self {
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let planes = std::array::from_fn(|c| {
            ChannelMatrix::from_fn(height, width, |y, x| {
                rgb.get_pixel(x as u32, y as u32)[c] as f64 * 255.0
            })
        });
        let original = RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y);
            image::Rgb(p.0.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8))
        });
        Self {
            name: name.into(),
            height,
            width,
            planes,
            original,
        }
    }

    /// Build from a raw interleaved byte buffer.
    ///
    /// Only 3-channel (RGB) data is accepted; any other channel count is a load error.
    pub fn from_raw(
        name: impl Into<String>,
        height: usize,
        width: usize,
        channels: usize,
        bytes: Vec<u8>,
    ) -> CompressResult<Self> {
        let name = name.into();
        if channels != 3 {
            return Err(CompressError::load(
                name,
                format!("expected 3 colour channels (RGB), found {}", channels),
            ));
        }
        let expected = height * width * 3;
        if bytes.len() != expected {
            return Err(CompressError::load(
                name,
                format!(
                    "buffer holds {} bytes, {}x{}x3 needs {}",
                    bytes.len(),
                    height,
                    width,
                    expected
                ),
            ));
        }
        let rgb = RgbImage::from_raw(width as u32, height as u32, bytes)
            .ok_or_else(|| CompressError::load(name.clone(), "buffer does not fit dimensions"))?;
        Ok(Self::from_rgb8(name, rgb))
    }

    /// Base name used for output files (the source file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `min(height, width)`, the largest meaningful truncation rank.
    pub fn full_rank(&self) -> usize {
        self.height.min(self.width)
    }

    /// The three channel matrices in R, G, B order.
    pub fn channels(&self) -> [&ChannelMatrix; 3] {
        [&self.planes[0], &self.planes[1], &self.planes[2]]
    }

    /// Take ownership of the channel matrices.
    pub fn into_channels(self) -> [ChannelMatrix; 3] {
        self.planes
    }

    /// The 8-bit source pixels.
    pub fn original(&self) -> &RgbImage {
        &self.original
    }
}

/// Clipped 8-bit reconstruction of one image at one rank.
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    /// Rank requested by configuration.
    pub rank: usize,
    /// Rank actually used after clamping to `min(height, width)`.
    pub effective_rank: usize,
    pixels: RgbImage,
}

impl ReconstructedImage {
    pub fn new(rank: usize, effective_rank: usize, pixels: RgbImage) -> Self {
        Self {
            rank,
            effective_rank,
            pixels,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    pub fn width(&self) -> usize {
        self.pixels.width() as usize
    }
}
