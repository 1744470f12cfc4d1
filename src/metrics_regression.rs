//! Common metrics for regression
//!
//! Prediction errors are computed per response column, so a model with `q` responses yields
//! `q` scores. The functions take the prediction first and the reference values second.

use ndarray::{Array1, ArrayBase, Axis, Data, Ix2};

use crate::error::{Error, Result};
use crate::Float;

/// Regression metrics trait
///
/// Implemented for prediction matrices, compares against reference values of identical shape.
pub trait Regression<F: Float, D: Data<Elem = F>> {
    /// Mean squared error of prediction
    fn msep(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>>;
    /// Root mean squared error of prediction
    fn rmsep(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        Ok(self.msep(truth)?.mapv(F::sqrt))
    }
    /// Mean of the prediction errors
    fn bias(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>>;
    /// Standard error of prediction corrected for bias, `sqrt(msep - bias^2)`
    fn sep(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        let bias = self.bias(truth)?;
        Ok((self.msep(truth)? - bias.mapv(|b| b * b)).mapv(|v| v.max(F::zero()).sqrt()))
    }
    /// Coefficient of determination `1 - msep / var(truth)`
    fn r2(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>>;
}

fn check_shape<F, D1: Data<Elem = F>, D2: Data<Elem = F>>(
    pred: &ArrayBase<D1, Ix2>,
    truth: &ArrayBase<D2, Ix2>,
) -> Result<()> {
    Error::check_rows("reference rows", pred.nrows(), truth.nrows())?;
    Error::check_rows("reference columns", pred.ncols(), truth.ncols())?;
    if pred.nrows() == 0 {
        return Err(Error::NotEnoughSamples);
    }
    Ok(())
}

impl<F: Float, D: Data<Elem = F>, E: Data<Elem = F>> Regression<F, D> for ArrayBase<E, Ix2> {
    fn msep(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        check_shape(self, truth)?;
        Ok((self - truth)
            .mapv(|e| e * e)
            .mean_axis(Axis(0))
            .ok_or(Error::NotEnoughSamples)?)
    }

    fn bias(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        check_shape(self, truth)?;
        (self - truth)
            .mean_axis(Axis(0))
            .ok_or(Error::NotEnoughSamples)
    }

    fn r2(&self, truth: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        let msep = self.msep(truth)?;
        let var = truth.var_axis(Axis(0), F::zero());
        Ok((msep / &var).mapv(|v| F::one() - v))
    }
}

/// Root mean squared error of prediction per column
pub fn rmsep<F: Float>(
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
    truth: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array1<F>> {
    pred.rmsep(&truth.view())
}

/// Mean squared error of prediction per column
pub fn msep<F: Float>(
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
    truth: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array1<F>> {
    pred.msep(&truth.view())
}

/// Mean prediction error per column
pub fn bias<F: Float>(
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
    truth: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array1<F>> {
    pred.bias(&truth.view())
}

/// Bias-corrected standard error of prediction per column
pub fn sep<F: Float>(
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
    truth: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array1<F>> {
    pred.sep(&truth.view())
}

/// Coefficient of determination per column
pub fn r2<F: Float>(
    pred: &ArrayBase<impl Data<Elem = F>, Ix2>,
    truth: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array1<F>> {
    pred.r2(&truth.view())
}
