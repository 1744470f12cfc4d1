//! # Weighted linear regression
//!
//! `chemolv-linear` provides the two linear estimators the latent-variable models build on:
//!
//! * [`Mlr`], weighted multiple linear regression solved by QR, Cholesky or pseudo-inverse,
//! * [`Ridge`], weighted ridge regression whose fitted model evaluates any penalty of a path
//!   from a single SVD.
//!
//! Both honour the observation weights attached to the dataset.
mod error;
mod hyperparams;
mod mlr;
mod ridge;

pub use error::*;
pub use hyperparams::*;
pub use mlr::*;
pub use ridge::*;
