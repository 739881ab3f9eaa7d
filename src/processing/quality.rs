//! Quantitative comparison of a reconstruction against its source.

use image::RgbImage;
use serde::Serialize;

/// Distortion of one reconstruction relative to the original pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Mean squared error over all samples of all channels.
    pub mse: f64,
    /// Peak signal-to-noise ratio in dB; `None` when the images are identical.
    pub psnr_db: Option<f64>,
    /// Largest absolute per-sample difference.
    pub max_abs_error: u8,
}

/// Compare two RGB images of identical dimensions. Returns `None` on a size mismatch.
pub fn compare(original: &RgbImage, reconstructed: &RgbImage) -> Option<QualityMetrics> {
    if original.dimensions() != reconstructed.dimensions() {
        return None;
    }
    let samples = original.as_raw().len();
    if samples == 0 {
        return Some(QualityMetrics {
            mse: 0.0,
            psnr_db: None,
            max_abs_error: 0,
        });
    }

    let mut sum_sq = 0.0;
    let mut max_abs_error = 0u8;
    for (&a, &b) in original.as_raw().iter().zip(reconstructed.as_raw()) {
        let diff = a.abs_diff(b);
        max_abs_error = max_abs_error.max(diff);
        sum_sq += (diff as f64) * (diff as f64);
    }
    let mse = sum_sq / samples as f64;
    Some(QualityMetrics {
        mse,
        psnr_db: peak_signal_to_noise(mse),
        max_abs_error,
    })
}

/// PSNR for 8-bit data: `10 · log10(255² / mse)`. `None` for a perfect match.
pub fn peak_signal_to_noise(mse: f64) -> Option<f64> {
    if mse <= 0.0 {
        return None;
    }
    Some(10.0 * (255.0f64 * 255.0 / mse).log10())
}
