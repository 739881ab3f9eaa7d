// SPDX-License-Identifier: MIT
//! # svd-rank: Rank-Limited Reconstruction of Channel Matrices
//!
//! This crate holds the numeric core of the image compressor. It decomposes a single
//! colour channel (a dense `height × width` matrix of `f64`) with the Singular Value
//! Decomposition, keeps only the leading `k` singular triplets and rebuilds an
//! approximation of the channel.
//!
//! ## Architecture Overview
//!
//! The crate is split along the three steps of the algorithm:
//! 1. **Factorize once**: [`factorize::factorize`] computes the thin SVD `U · diag(s) · Vᵀ`
//! 2. **Truncate many times**: [`Factorization::truncate`] rebuilds the rank-`k` matrix
//!    from a shared, read-only factorization
//! 3. **Measure**: [`energy`] reports how much of the squared singular-value mass survives
//!
//! Nothing here clips, rounds or performs I/O. Reconstructions are returned unclamped so
//! that the caller can merge channels before quantising to 8-bit pixels.
//!
//! ## Key Components
//!
//! - [`matrix`]: the `ChannelMatrix` alias and small constructors
//! - [`factorize`]: SVD with convergence and finiteness checks
//! - [`truncate`]: rank clamping policy and rank-`k` reconstruction
//! - [`energy`]: retained-energy ratios and the storage-ratio formula
//! - [`error`]: the `SvdError` type shared by all of the above
//!
//! ## Usage Example
//!
//! ```rust
//! use svd_rank::{factorize, matrix::channel_from_fn};
//!
//! // A rank-1 channel: every row is identical
//! let channel = channel_from_fn(8, 8, |_, c| (c * 10) as f64);
//! let svd = factorize(&channel)?;
//!
//! let approx = svd.truncate(1)?;
//! assert!((approx.energy_ratio - 1.0).abs() < 1e-12);
//! assert!((&approx.matrix - &channel).amax() < 1e-9);
//! # Ok::<(), svd_rank::SvdError>(())
//! ```
//!
//! ## Thread Safety
//!
//! [`Factorization`] is immutable once built and is `Send + Sync`, so it can be wrapped
//! in an `Arc` and truncated at several ranks from different threads without locking.

pub mod energy;
pub mod error;
pub mod factorize;
pub mod matrix;
pub mod truncate;

pub use energy::{energy_ratio, storage_ratio_percent, EnergyReport};
pub use error::SvdError;
pub use factorize::{factorize, Factorization};
pub use matrix::ChannelMatrix;
pub use truncate::{effective_rank, TruncationResult};
