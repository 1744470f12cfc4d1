//! # Partial Least Squares
//!
//! `chemolv-pls` provides weighted latent-variable models for spectroscopic data, where the
//! predictors are many, highly collinear and measured on few samples. The latent variables are
//! linear combinations of the predictors chosen to maximize the covariance with the responses.
//!
//! * [`Pls`], weighted PLS regression (NIPALS with regression deflation), whose predictions can
//!   be truncated to any number of its latent variables,
//! * [`KernelPls`], PLS in the feature space of a linear, gaussian or polynomial kernel,
//! * [`Pca`], weighted principal component analysis,
//! * [`PlsAvg`], averaging of PLS models over a range of latent-variable counts,
//! * [`PlsDa`] and [`PlsLda`], discriminant analysis on PLS latent variables.
//!
//! ## References
//!
//! * Wold, Sjöström, Eriksson (2001). PLS-regression: a basic tool of chemometrics.
//! * Rosipal, Trejo (2001). Kernel partial least squares regression in reproducing kernel
//!   Hilbert space.
//! * Lesnoff, Metz, Roger (2020). Comparison of locally weighted PLS strategies for regression
//!   and discrimination on agronomic NIR data.
//!
//! ## Example
//!
//! ```rust
//! use chemolv::prelude::*;
//! use chemolv_pls::Pls;
//!
//! let dataset = chemolv_datasets::spectra(40, 50, 1);
//!
//! // a single fit at 8 latent variables
//! let pls = Pls::params(8).scale(true).fit(&dataset)?;
//!
//! // predictions and scores at any smaller count
//! let pred = pls.predict_lv(dataset.records(), 5)?;
//! let scores = pls.transform_lv(dataset.records(), 5)?;
//! assert_eq!(scores.ncols(), 5);
//! # Ok::<(), chemolv_pls::PlsError>(())
//! ```
mod avg;
mod da;
mod errors;
mod hyperparams;
mod kernel_pls;
mod pca;
mod pls;
mod utils;

pub use avg::*;
pub use da::*;
pub use errors::*;
pub use hyperparams::*;
pub use kernel_pls::*;
pub use pca::*;
pub use pls::*;
