// SPDX-License-Identifier: MIT
//! # Energy Analysis
//!
//! The "energy" of a channel is the sum of its squared singular values. Keeping the top
//! `k` values retains
//!
//! ```text
//! ratio(k) = (s_1² + … + s_k²) / (s_1² + … + s_r²)
//! ```
//!
//! which is non-decreasing in `k`, lies in `[0, 1]` and reaches `1.0` at `k = r`.
//! An all-zero channel has no energy to lose, so its ratio is defined as `1.0`.
//!
//! This module also carries the storage formula used when reporting compression: a
//! rank-`k` factorization of an `h × w` channel stores `k · (h + w + 1)` numbers.

/// Retained-energy ratio for the leading `k` values of `singular_values`.
///
/// `k` is clamped to `singular_values.len()`. Returns `1.0` when the total energy is
/// zero (including the empty slice).
pub fn energy_ratio(singular_values: &[f64], k: usize) -> f64 {
    let total: f64 = singular_values.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return 1.0;
    }
    let k = k.min(singular_values.len());
    let kept: f64 = singular_values[..k].iter().map(|s| s * s).sum();
    (kept / total).clamp(0.0, 1.0)
}

/// Retained-energy ratio for every `k` in `1..=r`; entry `i` is `ratio(i + 1)`.
pub fn cumulative_energy(singular_values: &[f64]) -> Vec<f64> {
    let total: f64 = singular_values.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return vec![1.0; singular_values.len()];
    }
    let mut running = 0.0;
    singular_values
        .iter()
        .map(|s| {
            running += s * s;
            (running / total).clamp(0.0, 1.0)
        })
        .collect()
}

/// Smallest `k >= 1` whose retained energy reaches `target` (in `[0, 1]`).
///
/// Returns `None` for an empty slice. Targets at or above `1.0` resolve to the first `k`
/// where the cumulative ratio hits `1.0` after clamping.
pub fn rank_for_energy(singular_values: &[f64], target: f64) -> Option<usize> {
    let curve = cumulative_energy(singular_values);
    if curve.is_empty() {
        return None;
    }
    let target = target.clamp(0.0, 1.0);
    curve
        .iter()
        .position(|&ratio| ratio >= target)
        .map(|i| i + 1)
        .or(Some(curve.len()))
}

/// Storage of a rank-`k` RGB factorization relative to the raw image, in percent.
///
/// `k · (h + w + 1) · 3 / (h · w · 3) · 100`. Exceeds 100 once `k` is large enough that
/// the factors outweigh the pixels. Returns `0.0` for an empty image.
pub fn storage_ratio_percent(height: usize, width: usize, k: usize) -> f64 {
    let original = (height * width * 3) as f64;
    if original == 0.0 {
        return 0.0;
    }
    let compressed = (k * (height + width + 1) * 3) as f64;
    compressed / original * 100.0
}

/// Energy retained by one channel at one requested rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReport {
    pub rank: usize,
    pub effective_rank: usize,
    pub energy_ratio: f64,
}

/// Evaluate [`energy_ratio`] at each requested rank (zero ranks are reported as `0.0`
/// retained, they never reach truncation).
pub fn analyze(singular_values: &[f64], ranks: &[usize]) -> Vec<EnergyReport> {
    ranks
        .iter()
        .map(|&rank| {
            let effective_rank = rank.min(singular_values.len());
            let energy_ratio = if rank == 0 {
                0.0
            } else {
                energy_ratio(singular_values, effective_rank)
            };
            EnergyReport {
                rank,
                effective_rank,
                energy_ratio,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_known_values() {
        let s = [3.0, 2.0, 1.0];
        assert!((energy_ratio(&s, 1) - 9.0 / 14.0).abs() < 1e-15);
        assert!((energy_ratio(&s, 2) - 13.0 / 14.0).abs() < 1e-15);
        assert_eq!(energy_ratio(&s, 3), 1.0);
    }

    #[test]
    fn zero_energy_is_fully_retained() {
        let s = [0.0; 8];
        for k in 1..=10 {
            assert_eq!(energy_ratio(&s, k), 1.0);
        }
        assert_eq!(energy_ratio(&[], 3), 1.0);
    }

    #[test]
    fn tiny_tail_values_are_stable() {
        let s = [1e3, 1e-150, 1e-300, 0.0];
        assert_eq!(energy_ratio(&s, 1), 1.0);
        assert!(energy_ratio(&s, 4).is_finite());
    }

    #[test]
    fn clamps_rank_to_length() {
        let s = [2.0, 1.0];
        assert_eq!(energy_ratio(&s, 50), 1.0);
    }

    #[test]
    fn cumulative_curve_is_monotone_and_ends_at_one() {
        let s = [10.0, 7.0, 3.0, 0.5, 0.1];
        let curve = cumulative_energy(&s);
        assert_eq!(curve.len(), 5);
        assert!(curve.windows(2).all(|w| w[0] <= w[1]));
        assert!((curve[4] - 1.0).abs() < 1e-12);
        for (i, &ratio) in curve.iter().enumerate() {
            assert!((ratio - energy_ratio(&s, i + 1)).abs() < 1e-12);
        }
    }

    #[test]
    fn rank_for_energy_finds_threshold() {
        let s = [3.0, 2.0, 1.0];
        assert_eq!(rank_for_energy(&s, 0.5), Some(1));
        assert_eq!(rank_for_energy(&s, 0.9), Some(2));
        assert_eq!(rank_for_energy(&s, 1.0), Some(3));
        assert_eq!(rank_for_energy(&[], 0.5), None);
    }

    #[test]
    fn storage_ratio_formula() {
        assert!((storage_ratio_percent(100, 100, 5) - 10.05).abs() < 1e-9);
        assert!((storage_ratio_percent(100, 100, 20) - 40.2).abs() < 1e-9);
        assert!((storage_ratio_percent(100, 100, 50) - 100.5).abs() < 1e-9);
        assert_eq!(storage_ratio_percent(0, 10, 5), 0.0);
    }

    #[test]
    fn analyze_reports_every_rank() {
        let s = [4.0, 3.0];
        let reports = analyze(&s, &[1, 5]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].effective_rank, 1);
        assert!((reports[0].energy_ratio - 16.0 / 25.0).abs() < 1e-15);
        assert_eq!(reports[1].effective_rank, 2);
        assert_eq!(reports[1].energy_ratio, 1.0);
    }
}
