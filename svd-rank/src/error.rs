// SPDX-License-Identifier: MIT
//! Error type for factorization and truncation.

use std::{error::Error as StdError, fmt};

/// Failures raised by the numeric core.
#[derive(Debug, Clone, PartialEq)]
pub enum SvdError {
    /// The channel has zero rows or zero columns.
    EmptyMatrix,
    /// The input contains NaN or an infinity at the given position.
    NonFinite { row: usize, col: usize },
    /// The iterative solver did not converge within the iteration budget.
    NoConvergence { iterations: usize },
    /// The solver finished but produced missing or non-finite factors.
    NonFiniteFactors,
    /// A truncation rank of zero was requested.
    InvalidRank { rank: usize },
}

impl SvdError {
    /// True for failures of the decomposition itself (as opposed to bad arguments).
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NonFinite { .. } | Self::NoConvergence { .. } | Self::NonFiniteFactors
        )
    }
}

impl fmt::Display for SvdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvdError::EmptyMatrix => write!(f, "cannot factorize an empty matrix"),
            SvdError::NonFinite { row, col } => {
                write!(f, "non-finite value at ({}, {})", row, col)
            }
            SvdError::NoConvergence { iterations } => {
                write!(f, "SVD did not converge after {} iterations", iterations)
            }
            SvdError::NonFiniteFactors => {
                write!(f, "SVD produced missing or non-finite factors")
            }
            SvdError::InvalidRank { rank } => {
                write!(f, "truncation rank must be at least 1 (got {})", rank)
            }
        }
    }
}

impl StdError for SvdError {}
