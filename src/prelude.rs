//! Chemolv prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::dataset::{Dataset, DatasetBase, Float, Label, LabeledDataset, Targets};

#[doc(no_inline)]
pub use crate::grid::{ParamGrid, ParamSet, ParamValue};

#[doc(no_inline)]
pub use crate::metrics_regression::Regression;

#[doc(no_inline)]
pub use crate::param_guard::ParamGuard;

#[doc(no_inline)]
pub use crate::lv_range::LvRange;
