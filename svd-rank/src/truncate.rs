// SPDX-License-Identifier: MIT
//! # Rank Truncation
//!
//! Rebuilds a rank-`k` approximation from a [`Factorization`] by keeping the first `k`
//! columns of `U`, the first `k` singular values and the first `k` rows of `Vᵀ`.
//!
//! ## Rank Policy
//!
//! - `k == 0` is rejected with [`SvdError::InvalidRank`].
//! - `k > r` is clamped to `r`; the result is identical to requesting `k == r`.
//!
//! Output values are not clipped. Clipping and quantisation happen once, after the three
//! channels of an image have been merged.

use crate::energy::energy_ratio;
use crate::error::SvdError;
use crate::factorize::Factorization;
use crate::matrix::ChannelMatrix;

/// A rank-`k` reconstruction of one channel.
#[derive(Debug, Clone)]
pub struct TruncationResult {
    /// Reconstructed channel, same shape as the source, values unclamped.
    pub matrix: ChannelMatrix,
    /// The rank that was asked for.
    pub requested_rank: usize,
    /// The rank actually used after clamping to `min(height, width)`.
    pub effective_rank: usize,
    /// Fraction of squared singular-value mass kept, in `[0, 1]`.
    pub energy_ratio: f64,
}

impl TruncationResult {
    /// True when the requested rank exceeded the channel's full rank.
    pub fn was_clamped(&self) -> bool {
        self.effective_rank < self.requested_rank
    }
}

/// Apply the rank policy: reject zero, clamp anything above `full_rank`.
pub fn effective_rank(requested: usize, full_rank: usize) -> Result<usize, SvdError> {
    if requested == 0 {
        return Err(SvdError::InvalidRank { rank: requested });
    }
    Ok(requested.min(full_rank))
}

impl Factorization {
    /// Reconstruct the channel from the leading `k` singular triplets.
    pub fn truncate(&self, k: usize) -> Result<TruncationResult, SvdError> {
        let rank = effective_rank(k, self.rank())?;
        Ok(TruncationResult {
            matrix: self.compose(rank),
            requested_rank: k,
            effective_rank: rank,
            energy_ratio: energy_ratio(self.singular_values().as_slice(), rank),
        })
    }

    /// Truncate at several ranks, reusing this factorization for each.
    pub fn truncate_many(&self, ranks: &[usize]) -> Result<Vec<TruncationResult>, SvdError> {
        ranks.iter().map(|&k| self.truncate(k)).collect()
    }
}
