//! Weighted ridge regression on a penalty path
use chemolv::linalg::{svd_desc, weighted_mean, weighted_std};
use chemolv::traits::{Fit, PredictInplace, PredictLambda};
use chemolv::{Dataset, Error, Float};
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{LinearError, Result};
use crate::hyperparams::{RidgeParams, RidgeValidParams};

/// Ridge regression
///
/// The weighted, centered design `D^{1/2} Xc = U S V'` is decomposed once. The coefficients of
/// any penalty are then `V diag(s / (s^2 + lambda)) U' D^{1/2} Yc`, which is what the lambda grid
/// search relies on.
pub struct Ridge;

impl Ridge {
    pub fn params<F: Float>() -> RidgeParams<F> {
        RidgeParams::new()
    }
}

/// A fitted ridge regression holding the decomposition of the design
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct FittedRidge<F> {
    lambda: F,
    xmeans: Array1<F>,
    xscales: Array1<F>,
    ymeans: Array1<F>,
    /// right singular vectors, p × r
    v: Array2<F>,
    singular_values: Array1<F>,
    /// `U' D^{1/2} Yc`, r × q
    uty: Array2<F>,
}

impl<F: Float> Fit<F, Array2<F>, LinearError> for RidgeValidParams<F> {
    type Object = FittedRidge<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(LinearError::NotEnoughSamples);
        }
        let w = dataset.sample_weights()?;
        let (x, y) = (dataset.records(), dataset.targets());

        let xmeans = weighted_mean(x, &w)?;
        let ymeans = weighted_mean(y, &w)?;
        let xscales = if self.scale() {
            weighted_std(x, &w)?.mapv(|v| if v > F::epsilon() { v } else { F::one() })
        } else {
            Array1::ones(x.ncols())
        };

        let sqrt_w = w.mapv(F::sqrt).insert_axis(Axis(1));
        let xw = (x - &xmeans) / &xscales * &sqrt_w;
        let yw = (y - &ymeans) * &sqrt_w;

        let (u, singular_values, vt) = svd_desc(&xw)?;
        let uty = u.t().dot(&yw);
        let cutoff = singular_values.get(0).map_or(F::zero(), |&s| s * F::epsilon());
        debug!(
            "ridge design of rank {} over {} columns",
            singular_values.iter().filter(|&&s| s > cutoff).count(),
            x.ncols()
        );

        Ok(FittedRidge {
            lambda: self.lambda(),
            xmeans,
            xscales,
            ymeans,
            v: vt.reversed_axes(),
            singular_values,
            uty,
        })
    }
}

impl<F: Float> FittedRidge<F> {
    /// Penalty used by `predict`
    pub fn lambda(&self) -> F {
        self.lambda
    }

    /// Coefficients and intercept on the original scale for the penalty `lambda`
    pub fn coefficients(&self, lambda: F) -> Result<(Array2<F>, Array1<F>)> {
        if lambda.is_negative() || !lambda.is_finite() {
            return Err(LinearError::InvalidPenalty(
                lambda.to_f32().unwrap_or(f32::NAN),
            ));
        }
        let shrink = self.singular_values.mapv(|s| {
            let denom = s * s + lambda;
            if denom > F::zero() {
                s / denom
            } else {
                F::zero()
            }
        });
        let scaled = self.v.dot(&(&self.uty * &shrink.insert_axis(Axis(1))));
        let coef = scaled / &self.xscales.view().insert_axis(Axis(1));
        let intercept = &self.ymeans - &self.xmeans.dot(&coef);
        Ok((coef, intercept))
    }
}

impl<F: Float, D: Data<Elem = F>> PredictLambda<F, ArrayBase<D, Ix2>, Array2<F>>
    for FittedRidge<F>
{
    fn predict_lambda(&self, x: &ArrayBase<D, Ix2>, lambda: F) -> chemolv::Result<Array2<F>> {
        Error::check_rows("predictor columns", self.xmeans.len(), x.ncols())?;
        let (coef, intercept) = self.coefficients(lambda).map_err(|err| match err {
            LinearError::BaseCrate(err) => err,
            other => Error::Parameters(other.to_string()),
        })?;
        Ok(x.dot(&coef) + &intercept)
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array2<F>>
    for FittedRidge<F>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "The number of data points must match the number of output targets."
        );
        // the penalty was validated when fitting
        if let Ok(pred) = self.predict_lambda(x, self.lambda) {
            *y = pred;
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.ymeans.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mlr;
    use approx::assert_abs_diff_eq;
    use chemolv::traits::Predict;
    use chemolv::ParamGuard;
    use ndarray::{array, Array};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand_xoshiro::Xoshiro256Plus;

    fn dataset() -> Dataset<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x: Array2<f64> = Array::random_using((25, 3), Uniform::new(-1., 1.), &mut rng);
        let y = x.dot(&array![[1.], [-2.], [0.5]]) + 4.;
        Dataset::new(x, y).with_weights(Array::random_using(25, Uniform::new(0.2, 1.), &mut rng))
    }

    #[test]
    fn zero_penalty_matches_least_squares() {
        let dataset = dataset();
        let ridge = Ridge::params().lambda(0.).fit(&dataset).unwrap();
        let mlr = Mlr::new().fit(&dataset).unwrap();

        let (coef, intercept) = ridge.coefficients(0.).unwrap();
        assert_abs_diff_eq!(&coef, mlr.coefficients(), epsilon = 1e-8);
        assert_abs_diff_eq!(&intercept, mlr.intercept(), epsilon = 1e-8);
    }

    #[test]
    fn penalty_path_from_a_single_fit() {
        let dataset = dataset();
        let scaled = Ridge::params().scale(true).fit(&dataset).unwrap();
        let ridge = Ridge::params().fit(&dataset).unwrap();

        let mut previous = f64::INFINITY;
        for &lambda in &[1e-4, 1e-2, 1., 100.] {
            let refit = Ridge::params()
                .scale(true)
                .lambda(lambda)
                .fit(&dataset)
                .unwrap();
            let path = scaled.predict_lambda(dataset.records(), lambda).unwrap();
            assert_abs_diff_eq!(path, refit.predict(dataset.records()), epsilon = 1e-10);

            // coefficients shrink as the penalty grows
            let (coef, _) = ridge.coefficients(lambda).unwrap();
            let norm = coef.mapv(|c| c * c).sum();
            assert!(norm < previous);
            previous = norm;
        }
    }

    #[test]
    fn negative_penalty_is_rejected() {
        assert!(matches!(
            Ridge::params::<f64>().lambda(-1.).check(),
            Err(LinearError::InvalidPenalty(_))
        ));
        let ridge = Ridge::params().fit(&dataset()).unwrap();
        assert!(ridge.predict_lambda(&array![[0., 0., 0.]], -1.).is_err());
        assert!(matches!(
            ridge.predict_lambda(&array![[0., 0.]], 1.),
            Err(Error::Dimension { .. })
        ));
    }
}
