// SPDX-License-Identifier: MIT
//! # SVD Factorization
//!
//! Computes the thin decomposition `A = U · diag(s) · Vᵀ` of a channel matrix, where
//! `r = min(height, width)`, `U` is `height × r`, `s` has length `r` and `Vᵀ` is `r × width`.
//!
//! ## Guarantees
//!
//! - `s` is sorted in non-increasing order. Truncation relies on this and never re-checks it.
//! - `U` and `Vᵀ` are orthonormal up to floating-point tolerance.
//! - Column signs of `U`/`V` are whatever the backend produced; only the product is stable.
//!
//! ## Failure Modes
//!
//! The input is scanned for NaN/inf before the solver runs, so the bidiagonal QR
//! iteration only ever sees finite data. The iteration count is bounded; running out of
//! budget surfaces as [`SvdError::NoConvergence`] instead of spinning forever.

use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector};

use crate::error::SvdError;
use crate::matrix::ChannelMatrix;

/// Iteration budget per singular value handed to the bidiagonal QR solver.
const ITERATIONS_PER_VALUE: usize = 100;
/// Floor for the iteration budget on very small matrices.
const MIN_ITERATIONS: usize = 1_000;

/// The thin SVD of one channel. Immutable once built.
#[derive(Debug, Clone)]
pub struct Factorization {
    u: DMatrix<f64>,
    singular_values: DVector<f64>,
    v_t: DMatrix<f64>,
}

impl Factorization {
    /// Left singular vectors, `height × r`.
    pub fn u(&self) -> &DMatrix<f64> {
        &self.u
    }

    /// Singular values in non-increasing order.
    pub fn singular_values(&self) -> &DVector<f64> {
        &self.singular_values
    }

    /// Right singular vectors, transposed: `r × width`.
    pub fn v_t(&self) -> &DMatrix<f64> {
        &self.v_t
    }

    /// Number of singular triplets, `min(height, width)` of the source channel.
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// `(height, width)` of the source channel.
    pub fn shape(&self) -> (usize, usize) {
        (self.u.nrows(), self.v_t.ncols())
    }

    /// Sum of squared singular values (equals the squared Frobenius norm of the input).
    pub fn total_energy(&self) -> f64 {
        self.singular_values.iter().map(|s| s * s).sum()
    }

    /// Rebuild the full-rank product. Matches the input up to rounding.
    pub fn reconstruct(&self) -> ChannelMatrix {
        self.compose(self.rank())
    }

    /// `U[:, :k] · diag(s[:k]) · Vᵀ[:k, :]` for `k <= rank()`.
    ///
    /// The diagonal is applied by scaling the columns of `U` instead of materialising an
    /// `r × r` matrix.
    pub(crate) fn compose(&self, k: usize) -> ChannelMatrix {
        let (height, width) = self.shape();
        if k == 0 {
            return DMatrix::zeros(height, width);
        }
        let mut scaled = self.u.columns(0, k).into_owned();
        for (j, mut column) in scaled.column_iter_mut().enumerate() {
            column *= self.singular_values[j];
        }
        scaled * self.v_t.rows(0, k)
    }
}

/// Compute the thin SVD of `channel`.
///
/// # Errors
///
/// - [`SvdError::EmptyMatrix`] for a `0 × n` or `n × 0` input
/// - [`SvdError::NonFinite`] if any element is NaN or infinite
/// - [`SvdError::NoConvergence`] if the solver exhausts its iteration budget
/// - [`SvdError::NonFiniteFactors`] if the solver returns missing or non-finite factors
pub fn factorize(channel: &ChannelMatrix) -> Result<Factorization, SvdError> {
    let (height, width) = channel.shape();
    if height == 0 || width == 0 {
        return Err(SvdError::EmptyMatrix);
    }
    check_finite(channel)?;

    let r = height.min(width);
    let iterations = (ITERATIONS_PER_VALUE * r).max(MIN_ITERATIONS);
    let svd = SVD::try_new(channel.clone(), true, true, f64::EPSILON, iterations)
        .ok_or(SvdError::NoConvergence { iterations })?;

    let u = svd.u.ok_or(SvdError::NonFiniteFactors)?;
    let v_t = svd.v_t.ok_or(SvdError::NonFiniteFactors)?;
    let singular_values = svd.singular_values;

    let all_finite = u.iter().all(|x| x.is_finite())
        && v_t.iter().all(|x| x.is_finite())
        && singular_values.iter().all(|x| x.is_finite());
    if !all_finite {
        return Err(SvdError::NonFiniteFactors);
    }

    Ok(sort_descending(u, singular_values, v_t))
}

fn check_finite(channel: &ChannelMatrix) -> Result<(), SvdError> {
    // Column-major storage: linear index i maps to (i % nrows, i / nrows).
    let rows = channel.nrows();
    match channel.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(SvdError::NonFinite {
            row: i % rows,
            col: i / rows,
        }),
        None => Ok(()),
    }
}

/// Reorder singular triplets so that `s` is non-increasing.
fn sort_descending(u: DMatrix<f64>, s: DVector<f64>, v_t: DMatrix<f64>) -> Factorization {
    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));
    if order.iter().enumerate().all(|(idx, &orig)| idx == orig) {
        return Factorization {
            u,
            singular_values: s,
            v_t,
        };
    }

    Factorization {
        u: u.select_columns(order.iter()),
        singular_values: DVector::from_iterator(order.len(), order.iter().map(|&i| s[i])),
        v_t: v_t.select_rows(order.iter()),
    }
}
