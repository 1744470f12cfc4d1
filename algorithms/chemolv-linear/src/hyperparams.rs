#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use chemolv::{Float, ParamGuard};

use crate::error::LinearError;

/// A verified hyper-parameter set ready for the estimation of a ridge regression
///
/// See [`RidgeParams`] for more information.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RidgeValidParams<F> {
    lambda: F,
    scale: bool,
}

impl<F: Float> RidgeValidParams<F> {
    pub fn lambda(&self) -> F {
        self.lambda
    }

    pub fn scale(&self) -> bool {
        self.scale
    }
}

/// A hyper-parameter set for weighted ridge regression
///
/// Minimizes `sum_i w_i ||y_i - x_i B - b||^2 + lambda ||B||^2` with weights normalized to sum
/// to one.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | [lambda](Self::lambda) | `1.0` | Penalty used by `predict` | `[0, inf)` |
/// | [scale](Self::scale) | `false` | Scale the predictors by their weighted standard deviation | `false`, `true` |
///
/// # Errors
///
/// Returns [`InvalidPenalty`](LinearError::InvalidPenalty) if the penalty is negative or not
/// finite.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RidgeParams<F>(RidgeValidParams<F>);

impl<F: Float> Default for RidgeParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> RidgeParams<F> {
    pub fn new() -> Self {
        Self(RidgeValidParams {
            lambda: F::one(),
            scale: false,
        })
    }

    /// Penalty of the fitted model, other penalties stay available through `predict_lambda`
    pub fn lambda(mut self, lambda: F) -> Self {
        self.0.lambda = lambda;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0.scale = scale;
        self
    }
}

impl<F: Float> ParamGuard for RidgeParams<F> {
    type Checked = RidgeValidParams<F>;
    type Error = LinearError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.lambda.is_negative() || !self.0.lambda.is_finite() {
            Err(LinearError::InvalidPenalty(
                self.0.lambda.to_f32().unwrap_or(f32::NAN),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
