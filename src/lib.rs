//! `chemolv` provides latent-variable and locally weighted models for chemometrics.
//!
//! This crate holds the shared building blocks of the workspace:
//!
//! * [`DatasetBase`](dataset::DatasetBase) with optional observation weights,
//! * the [`Fit`](traits::Fit), [`Predict`](traits::Predict) and truncation traits
//!   ([`PredictLv`](traits::PredictLv), [`PredictLambda`](traits::PredictLambda)) every model
//!   implements,
//! * a weighted linear algebra kernel in [`linalg`],
//! * cross-validation segments in [`segments`] and the grid engines in [`grid`],
//! * regression and classification [`metrics`].
//!
//! The algorithms live in sibling crates: `chemolv-linear` (weighted MLR and ridge),
//! `chemolv-pls` (PLS, kernel PLS, PCA, PLS ensembles and discriminants), `chemolv-nn`
//! (neighbor search and distance weighting) and `chemolv-local` (kNN locally weighted models).

pub mod benchmarks;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod linalg;
mod lv_range;
mod metrics_classification;
mod metrics_regression;
pub mod param_guard;
pub mod prelude;
pub mod segments;
pub mod traits;

pub use dataset::{Dataset, DatasetBase, Float, Label, LabeledDataset};
pub use error::{Error, Result};
pub use lv_range::LvRange;
pub use param_guard::ParamGuard;

/// Common metrics functions for classification and regression
pub mod metrics {
    pub use crate::metrics_classification::err;
    pub use crate::metrics_regression::{bias, msep, r2, rmsep, sep, Regression};
}
