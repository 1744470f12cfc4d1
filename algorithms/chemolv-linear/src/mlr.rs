//! Weighted multiple linear regression
use chemolv::linalg::{weighted_regress, LsSolver};
use chemolv::traits::{Fit, PredictInplace};
use chemolv::{Dataset, Float};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{LinearError, Result};

/// Weighted multiple linear regression
///
/// Minimizes `sum_i w_i ||y_i - x_i B - b||^2` over the coefficient matrix `B` and the
/// intercept `b`. The observation weights of the dataset are used if present.
///
/// ## Examples
///
/// ```rust
/// use chemolv::traits::{Fit, Predict};
/// use chemolv::Dataset;
/// use chemolv_linear::Mlr;
/// use ndarray::array;
///
/// let dataset = Dataset::new(array![[0f64], [1.], [2.]], array![[1.], [3.], [5.]]);
/// let model = Mlr::new().fit(&dataset).unwrap();
/// let pred = model.predict(dataset.records());
/// assert!((pred[[2, 0]] - 5.).abs() < 1e-10);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mlr {
    with_intercept: bool,
    solver: LsSolver,
}

impl Default for Mlr {
    fn default() -> Self {
        Mlr::new()
    }
}

impl Mlr {
    /// By default an intercept is fitted and the QR solver is used
    pub fn new() -> Mlr {
        Mlr {
            with_intercept: true,
            solver: LsSolver::Qr,
        }
    }

    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.with_intercept = with_intercept;
        self
    }

    /// Least squares solver, rank deficient problems always end up on the pseudo-inverse
    pub fn solver(mut self, solver: LsSolver) -> Self {
        self.solver = solver;
        self
    }
}

/// A fitted weighted linear regression
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct FittedMlr<F> {
    coefficients: Array2<F>,
    intercept: Array1<F>,
}

impl<F: Float> Fit<F, Array2<F>, LinearError> for Mlr {
    type Object = FittedMlr<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(LinearError::NotEnoughSamples);
        }
        let weights = dataset.sample_weights()?;
        let (coefficients, intercept) = weighted_regress(
            dataset.records(),
            dataset.targets(),
            &weights,
            self.with_intercept,
            self.solver,
        )?;

        Ok(FittedMlr {
            coefficients,
            intercept,
        })
    }
}

impl<F: Float> FittedMlr<F> {
    /// Coefficient matrix, one column per response
    pub fn coefficients(&self) -> &Array2<F> {
        &self.coefficients
    }

    /// Intercept per response, zero if no intercept was fitted
    pub fn intercept(&self) -> &Array1<F> {
        &self.intercept
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for FittedMlr<F> {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "The number of data points must match the number of output targets."
        );

        *y = x.dot(&self.coefficients) + &self.intercept;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.coefficients.ncols()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chemolv::traits::Predict;
    use ndarray::array;

    #[test]
    fn fits_a_line_through_two_dots() {
        let dataset = Dataset::new(array![[0f64], [1.]], array![[1.], [2.]]);
        let model = Mlr::new().fit(&dataset).unwrap();
        let result = model.predict(dataset.records());

        assert_abs_diff_eq!(result, array![[1.], [2.]], epsilon = 1e-12);
    }

    /// Without intercept the fitted line runs through the origin, a single point suffices
    #[test]
    fn without_intercept_fits_line_through_origin() {
        let dataset = Dataset::new(array![[1.]], array![[1.]]);
        let model = Mlr::new().with_intercept(false).fit(&dataset).unwrap();
        let result = model.predict(&array![[0.], [1.]]);

        assert_abs_diff_eq!(result, array![[0.], [1.]], epsilon = 1e-12);
        assert_abs_diff_eq!(model.intercept(), &array![0.]);
    }

    #[test]
    fn weights_select_the_observations_that_count() {
        let dataset = Dataset::new(
            array![[0.], [1.], [2.], [3.]],
            array![[0., 1.], [1., 1.], [2., 1.], [30., 1.]],
        )
        .with_weights(array![1., 1., 1., 0.]);

        for solver in [LsSolver::Qr, LsSolver::Cholesky, LsSolver::Pinv] {
            let model = Mlr::new().solver(solver).fit(&dataset).unwrap();
            assert_abs_diff_eq!(model.coefficients(), &array![[1., 0.]], epsilon = 1e-10);
            assert_abs_diff_eq!(model.intercept(), &array![0., 1.], epsilon = 1e-10);
        }
    }

    #[test]
    fn empty_dataset_fails() {
        let dataset = Dataset::new(Array2::<f64>::zeros((0, 2)), Array2::zeros((0, 1)));
        assert!(matches!(
            Mlr::new().fit(&dataset),
            Err(LinearError::NotEnoughSamples)
        ));
    }
}
