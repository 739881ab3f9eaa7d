//! # Image Assembler
//!
//! Merges three real-valued channel reconstructions (R, G, B) into one 8-bit RGB image.
//! This is the only place where approximation error becomes a stored pixel value:
//!
//! 1. All three channels must share one `height × width` shape, otherwise
//!    [`CompressError::ShapeMismatch`] is returned.
//! 2. Every sample is rounded to the nearest integer and saturated into `[0, 255]`.
//!    Values never wrap; NaN becomes 0.
//!
//! Clipping happens once, after merging. Truncation leaves channels unclamped.

use image::{Rgb, RgbImage};
use svd_rank::ChannelMatrix;

use crate::core::image::CHANNEL_NAMES;
use crate::error::{CompressError, CompressResult};

/// Round and saturate one sample into a byte.
#[inline]
pub fn quantize(value: f64) -> u8 {
    // `as` saturates float-to-int casts and maps NaN to 0.
    value.round().clamp(0.0, 255.0) as u8
}

/// Stack three channels into an RGB image, clipping to `[0, 255]`.
pub fn assemble(channels: [&ChannelMatrix; 3]) -> CompressResult<RgbImage> {
    let expected = channels[0].shape();
    for (name, channel) in CHANNEL_NAMES.iter().zip(channels.iter()).skip(1) {
        if channel.shape() != expected {
            return Err(CompressError::shape_mismatch(
                *name,
                expected,
                channel.shape(),
            ));
        }
    }

    let (height, width) = expected;
    let [r, g, b] = channels;
    Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (row, col) = (y as usize, x as usize);
        Rgb([
            quantize(r[(row, col)]),
            quantize(g[(row, col)]),
            quantize(b[(row, col)]),
        ])
    }))
}
