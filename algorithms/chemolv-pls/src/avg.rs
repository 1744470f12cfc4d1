//! Averaging of PLS models over a range of latent-variable counts
use chemolv::linalg::{normalize_weights, weighted_regress, LsSolver};
use chemolv::segments::{k_fold, Segments};
use chemolv::traits::{Fit, PredictInplace, PredictLv, Transformer};
use chemolv::{Dataset, Float, LvRange};
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::errors::{PlsError, Result};
use crate::hyperparams::{AvgPolicy, PlsAvgParams, PlsAvgValidParams, PlsValidParams};
use crate::pls::Pls;
use crate::utils::outer;

/// A weighted combination of the PLS models truncated to every count of a range
///
/// A single decomposition is fitted at the upper bound of the range. The prediction of count
/// `k` on response `j` enters with weight `count_weights()[[k - low, j]]`, plus an intercept which
/// is zero except for the stacking policy.
///
/// ## Examples
///
/// ```rust
/// use chemolv::traits::{Fit, Predict};
/// use chemolv::LvRange;
/// use chemolv_pls::{AvgPolicy, PlsAvg};
///
/// let dataset = chemolv_datasets::latent_dataset(40, 15, 3, 0.05, 7);
/// let range: LvRange = "1:6".parse().unwrap();
/// let model = PlsAvg::params(range).policy(AvgPolicy::Aic).fit(&dataset).unwrap();
/// assert_eq!(model.count_weights().nrows(), 6);
/// let pred = model.predict(dataset.records());
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct PlsAvg<F: Float> {
    range: LvRange,
    policy: AvgPolicy,
    pls: Pls<F>,
    count_weights: Array2<F>,
    intercept: Array1<F>,
}

impl<F: Float> PlsAvg<F> {
    pub fn params(range: LvRange) -> PlsAvgParams<F> {
        PlsAvgParams::new(range)
    }

    pub fn range(&self) -> LvRange {
        self.range
    }

    pub fn policy(&self) -> AvgPolicy {
        self.policy
    }

    /// The decomposition fitted at the upper bound of the range
    pub fn pls(&self) -> &Pls<F> {
        &self.pls
    }

    /// Weight of every count (rows) for every response (columns)
    pub fn count_weights(&self) -> &Array2<F> {
        &self.count_weights
    }

    /// Intercept added to the combination, non-zero only for stacking
    pub fn intercept(&self) -> &Array1<F> {
        &self.intercept
    }

    /// Predictions of the individual counts of the range
    pub fn predict_counts(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> chemolv::Result<Vec<Array2<F>>> {
        self.pls.predict_range(x, self.range)
    }

    fn combine(&self, scores: &Array2<F>) -> Array2<F> {
        let (low, high) = (self.range.low(), self.range.high());
        let q = self.pls.ntargets();
        let ymeans = self.pls.ymeans();
        let mut partial = Array2::from_shape_fn((scores.nrows(), q), |(_, j)| ymeans[j]);
        let mut out = Array2::from_shape_fn((scores.nrows(), q), |(_, j)| self.intercept[j]);
        for k in 0..=high {
            if k >= low {
                out += &(&partial * &self.count_weights.row(k - low));
            }
            if k < high && k < scores.ncols() {
                partial += &outer(&scores.column(k), &self.pls.y_loadings().column(k));
            }
        }
        out
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for PlsAvg<F> {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            y.shape(),
            &[x.nrows(), self.pls.ntargets()],
            "The number of data points must match the number of output targets."
        );
        let scores = self.pls.transform(x);
        *y = self.combine(&scores);
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.pls.ntargets()))
    }
}

impl<F: Float> Fit<F, Array2<F>, PlsError> for PlsAvgValidParams<F> {
    type Object = PlsAvg<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        let d = dataset.sample_weights()?;
        self.fit_weighted(dataset.records().view(), dataset.targets().view(), &d)
    }
}

impl<F: Float> PlsAvgValidParams<F> {
    /// Fit with normalized weights `d`
    pub(crate) fn fit_weighted(
        &self,
        x: ArrayView2<F>,
        y: ArrayView2<F>,
        d: &Array1<F>,
    ) -> Result<PlsAvg<F>> {
        let (n, p) = x.dim();
        if n == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        let range = self.range();
        range.check_max((n - 1).min(p))?;

        let params = self.pls().with_nlv(range.high());
        let pls = params.fit_weighted(x, y, d)?;

        let q = y.ncols();
        let ncount = range.len();
        let (count_weights, intercept) = match self.policy() {
            AvgPolicy::Uniform => (
                Array2::from_elem((ncount, q), F::one() / F::cast(ncount)),
                Array1::zeros(q),
            ),
            AvgPolicy::Aic => {
                let preds = pls.predict_range(&x, range)?;
                let criteria = Array2::from_shape_fn((ncount, q), |(i, j)| {
                    let k = range.low() + i;
                    let res = &preds[i].column(j) - &y.column(j);
                    let ssr = (&res * &res * d).sum();
                    F::cast(n) * ssr.max(F::min_positive_value()).ln() + F::cast(2 * (k + 2))
                });
                (akaike_weights(&criteria), Array1::zeros(q))
            }
            AvgPolicy::Cv { n_folds, rep, seed } => {
                let mut rng = SmallRng::seed_from_u64(seed);
                let segments = k_fold(n, n_folds, rep, &mut rng)?;
                let msecv = cv_errors(&params, x, y, d, &segments, range)?;
                let inverse = msecv.mapv(|v| F::one() / v.max(F::min_positive_value()));
                let totals = inverse.sum_axis(Axis(0));
                debug!("cross-validated errors per count: {}", msecv);
                (inverse / &totals, Array1::zeros(q))
            }
            AvgPolicy::Stacking { n_folds, seed } => {
                let mut rng = SmallRng::seed_from_u64(seed);
                let segments = k_fold(n, n_folds, 1, &mut rng)?;
                let oof = out_of_fold(&params, x, y, d, &segments, range)?;
                let mut weights = Array2::zeros((ncount, q));
                let mut intercept = Array1::zeros(q);
                for j in 0..q {
                    let (b, b0) = weighted_regress(
                        &oof[j],
                        &y.column(j).insert_axis(Axis(1)),
                        d,
                        true,
                        LsSolver::Qr,
                    )?;
                    weights.column_mut(j).assign(&b.column(0));
                    intercept[j] = b0[0];
                }
                (weights, intercept)
            }
        };

        Ok(PlsAvg {
            range,
            policy: self.policy(),
            pls,
            count_weights,
            intercept,
        })
    }
}

/// Normalized `exp(-(aic - min aic) / 2)` per column
fn akaike_weights<F: Float>(criteria: &Array2<F>) -> Array2<F> {
    let mut weights = criteria.clone();
    for mut col in weights.columns_mut() {
        let min = col.iter().cloned().fold(F::infinity(), F::min);
        col.mapv_inplace(|v| (-(v - min) / F::cast(2.)).exp());
        let total = col.sum();
        col /= total;
    }
    weights
}

/// Fit on the complement of every segment and call `visit` with the held-out indices and the
/// per-count predictions for them
fn for_each_fold<F: Float>(
    params: &PlsValidParams<F>,
    x: ArrayView2<F>,
    y: ArrayView2<F>,
    d: &Array1<F>,
    segments: &Segments,
    range: LvRange,
    mut visit: impl FnMut(&[usize], Vec<Array2<F>>),
) -> Result<()> {
    let n = x.nrows();
    for (_, _, test) in segments.iter() {
        let mut mask = vec![true; n];
        for &i in test {
            mask[i] = false;
        }
        let train: Vec<usize> = (0..n).filter(|&i| mask[i]).collect();
        let dtrain = normalize_weights(d.select(Axis(0), &train).view())?;
        let model = params.fit_weighted(
            x.select(Axis(0), &train).view(),
            y.select(Axis(0), &train).view(),
            &dtrain,
        )?;
        let xtest = x.select(Axis(0), test);
        let preds = range
            .iter()
            .map(|k| model.predict_lv(&xtest, k))
            .collect::<chemolv::Result<Vec<_>>>()?;
        visit(test, preds);
    }
    Ok(())
}

/// Weighted mean squared error of prediction per count (rows) and response (columns), averaged
/// over replications
fn cv_errors<F: Float>(
    params: &PlsValidParams<F>,
    x: ArrayView2<F>,
    y: ArrayView2<F>,
    d: &Array1<F>,
    segments: &Segments,
    range: LvRange,
) -> Result<Array2<F>> {
    let mut errors = Array2::zeros((range.len(), y.ncols()));
    for_each_fold(params, x, y, d, segments, range, |test, preds| {
        let ytest = y.select(Axis(0), test);
        let dtest = d.select(Axis(0), test);
        for (i, pred) in preds.iter().enumerate() {
            let res = pred - &ytest;
            let sq = (&res * &res * &dtest.view().insert_axis(Axis(1))).sum_axis(Axis(0));
            let mut row = errors.row_mut(i);
            row += &sq;
        }
    })?;
    Ok(errors / F::cast(segments.nrep()))
}

/// Out-of-fold predictions, one `n x ncount` matrix per response
fn out_of_fold<F: Float>(
    params: &PlsValidParams<F>,
    x: ArrayView2<F>,
    y: ArrayView2<F>,
    d: &Array1<F>,
    segments: &Segments,
    range: LvRange,
) -> Result<Vec<Array2<F>>> {
    let n = x.nrows();
    let mut oof = vec![Array2::zeros((n, range.len())); y.ncols()];
    for_each_fold(params, x, y, d, segments, range, |test, preds| {
        for (i, pred) in preds.iter().enumerate() {
            for (row, &obs) in test.iter().enumerate() {
                for (j, z) in oof.iter_mut().enumerate() {
                    z[[obs, i]] = pred[[row, j]];
                }
            }
        }
    })?;
    Ok(oof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chemolv::traits::Predict;
    use chemolv_datasets::latent_dataset;

    fn range(low: usize, high: usize) -> LvRange {
        LvRange::new(low, high).unwrap()
    }

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<PlsAvgParams<f64>>();
        has_autotraits::<PlsAvg<f64>>();
    }

    #[test]
    fn uniform_average_is_the_mean_of_the_counts() {
        let dataset = latent_dataset(30, 12, 3, 0.1, 1);
        let model = PlsAvg::params(range(2, 5)).fit(&dataset).unwrap();
        let counts = model.predict_counts(dataset.records()).unwrap();
        let mean = counts.iter().fold(Array2::zeros((30, 1)), |acc, p| acc + p) / 4.;
        assert_abs_diff_eq!(model.predict(dataset.records()), mean, epsilon = 1e-10);
        assert_abs_diff_eq!(model.count_weights(), &Array2::from_elem((4, 1), 0.25));
    }

    #[test]
    fn range_is_checked_before_fitting() {
        let dataset = latent_dataset(5, 10, 2, 0.1, 2);
        assert!(matches!(
            PlsAvg::params(range(1, 5)).fit(&dataset),
            Err(PlsError::BaseCrate(chemolv::Error::Range { max: 4, .. }))
        ));
        assert!(PlsAvg::params(range(1, 4)).fit(&dataset).is_ok());
    }

    #[test]
    fn range_beyond_the_rank_of_the_predictors() {
        let dataset = latent_dataset(30, 12, 2, 0.0, 3);
        let model = PlsAvg::params(range(1, 5)).fit(&dataset).unwrap();
        assert_eq!(model.pls().nlv(), 2);

        let counts = model.predict_counts(dataset.records()).unwrap();
        assert_eq!(counts.len(), 5);
        for pred in &counts[2..] {
            assert_eq!(pred, &counts[1]);
        }
        let mean = counts.iter().fold(Array2::zeros((30, 1)), |acc, p| acc + p) / 5.;
        assert_abs_diff_eq!(model.predict(dataset.records()), mean, epsilon = 1e-10);
    }

    #[test]
    fn aic_and_cv_weights_favor_the_true_rank() {
        let dataset = latent_dataset(60, 20, 3, 0.05, 3);
        for policy in [
            AvgPolicy::Aic,
            AvgPolicy::Cv {
                n_folds: 5,
                rep: 2,
                seed: 42,
            },
        ] {
            let model = PlsAvg::params(range(1, 8))
                .policy(policy)
                .fit(&dataset)
                .unwrap();
            let weights = model.count_weights().column(0).to_owned();
            assert_abs_diff_eq!(weights.sum(), 1., epsilon = 1e-10);
            assert!(weights.iter().all(|&w| w >= 0.));
            // one and two latent variables miss part of the signal
            assert!(weights[0] + weights[1] < weights.slice(ndarray::s![2..]).sum());
        }
    }

    #[test]
    fn cv_weights_are_reproducible() {
        let dataset = latent_dataset(40, 10, 2, 0.2, 4);
        let params = PlsAvg::params(range(1, 5)).policy(AvgPolicy::Cv {
            n_folds: 4,
            rep: 1,
            seed: 7,
        });
        let a = params.fit(&dataset).unwrap();
        let b = params.fit(&dataset).unwrap();
        assert_eq!(a.count_weights(), b.count_weights());
    }

    #[test]
    fn stacking_fits_an_intercept_and_weights_per_count() {
        let dataset = latent_dataset(50, 12, 2, 0.1, 5);
        let model = PlsAvg::params(range(1, 4))
            .policy(AvgPolicy::Stacking {
                n_folds: 5,
                seed: 3,
            })
            .fit(&dataset)
            .unwrap();
        assert_eq!(model.count_weights().dim(), (4, 1));
        assert_eq!(model.intercept().len(), 1);

        let pred = model.predict(dataset.records());
        let res = &pred - dataset.targets();
        let mse = res.mapv(|v| v * v).mean().unwrap();
        let var = dataset.targets().var_axis(Axis(0), 0.)[0];
        assert!(mse < 0.2 * var);
    }

    #[test]
    fn folds_are_validated() {
        let dataset = latent_dataset(10, 5, 2, 0.1, 6);
        assert!(matches!(
            PlsAvg::params(range(1, 3))
                .policy(AvgPolicy::Cv {
                    n_folds: 20,
                    rep: 1,
                    seed: 0
                })
                .fit(&dataset),
            Err(PlsError::BaseCrate(chemolv::Error::Parameters(_)))
        ));
    }
}
