//! Weighted linear algebra kernel
//!
//! Weighted centering, covariance, least squares and principal components. Every routine takes
//! raw non-negative observation weights and normalizes them to sum to one before use, so a
//! weighted statistic with uniform weights equals its unweighted counterpart.
//!
//! The decompositions rely on the pure Rust `linfa-linalg` routines.

mod pca;
mod solve;
mod weighted;

pub use pca::{weighted_pca, PcaDecomposition};
pub use solve::{cholesky_solve, pinv, svd_desc, svd_flip, weighted_regress, LsSolver};
pub use weighted::{
    normalize_weights, weighted_center, weighted_covariance, weighted_mean, weighted_scale,
    weighted_std,
};
