// SPDX-License-Identifier: MIT
//! # Channel Matrices
//!
//! A channel is stored as a column-major `DMatrix<f64>` with one row per image row and
//! one column per image column, so `m[(y, x)]` is the sample at pixel `(x, y)`.

use nalgebra::DMatrix;

/// One colour plane promoted to `f64`, `height × width`.
pub type ChannelMatrix = DMatrix<f64>;

/// Build a channel by evaluating `f(row, col)` for every element.
pub fn channel_from_fn<F>(height: usize, width: usize, f: F) -> ChannelMatrix
where
    F: FnMut(usize, usize) -> f64,
{
    DMatrix::from_fn(height, width, f)
}

/// Largest rank a channel of this shape can have: `min(height, width)`.
pub fn full_rank(channel: &ChannelMatrix) -> usize {
    channel.nrows().min(channel.ncols())
}
