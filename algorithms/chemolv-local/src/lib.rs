//! # Locally weighted models
//!
//! Spectra collected over many sites, varieties or instruments rarely follow a single linear
//! model. `chemolv-local` fits one model per query instead, on the training observations that
//! resemble it:
//!
//! 1. the distance space is the raw predictors or the scores of a global PLS with `nlvdis`
//!    latent variables,
//! 2. the `k` nearest training observations of the query are found in that space,
//! 3. their distances are turned into weights by a [`WeightKernel`](chemolv_nn::WeightKernel),
//! 4. a weighted model is fitted on the neighborhood and predicts the query.
//!
//! The models provided are
//!
//! * [`LwPlsr`], local PLS regression (LWPLSR), optionally averaged over a range of
//!   latent-variable counts,
//! * [`LwPlsDa`], local PLS-DA or PLS-LDA,
//! * [`KnnR`], the weighted mean response of the neighbors.
//!
//! [`locw`] is the engine behind them and accepts any local fitting function. Queries are
//! processed in parallel. A local fit that fails only affects its own query, see
//! [`LocalOutput`].
//!
//! ## Example
//!
//! ```rust
//! use chemolv::prelude::*;
//! use chemolv_local::LwPlsr;
//!
//! let dataset = chemolv_datasets::spectra(80, 60, 7);
//! let (test, train) = dataset.split_indices(&[0, 1, 2, 3, 4]);
//!
//! let model = LwPlsr::params(30, 4).nlvdis(6).bandwidth(1.).fit(&train)?;
//! let pred = model.predict_lv(test.records(), 4)?;
//! assert_eq!(pred.dim(), (5, 1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod error;
mod hyperparams;
mod knnr;
mod locw;
mod lwplsda;
mod lwplsr;
mod neighborhood;

pub use error::{LocalError, Result};
pub use hyperparams::*;
pub use knnr::KnnR;
pub use locw::{locw, LocalOutput};
pub use lwplsda::LwPlsDa;
pub use lwplsr::LwPlsr;
