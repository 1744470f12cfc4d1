//! kNN locally weighted PLS regression
use chemolv::traits::{Fit, Predict, PredictLv};
use chemolv::{Dataset, Float, LvRange, ParamGuard};
use chemolv_nn::Neighbors;
use chemolv_pls::{Pls, PlsAvg, PlsAvgValidParams, PlsValidParams};
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};

use crate::error::{LocalError, Result};
use crate::hyperparams::{LocalRegressor, LwPlsrParams, LwPlsrValidParams};
use crate::locw::{locw, stack_rows, LocalOutput};
use crate::neighborhood::Neighborhood;

/// Checked parameters of the model fitted on every neighborhood
enum LocalFit<F: Float> {
    Pls(PlsValidParams<F>),
    Avg(PlsAvgValidParams<F>),
}

impl<F: Float> LocalFit<F> {
    fn fit_predict(&self, local: &Dataset<F>, query: ArrayView2<F>) -> Result<Array2<F>> {
        match self {
            LocalFit::Pls(params) => {
                let model: Pls<F> = params.fit(local)?;
                Ok(model.predict_lv(&query, params.nlv())?)
            }
            LocalFit::Avg(params) => {
                let model: PlsAvg<F> = params.fit(local)?;
                Ok(model.predict(&query))
            }
        }
    }
}

/// A fitted kNN locally weighted PLS regression (LWPLSR)
///
/// Fitting indexes the training set, the work happens at prediction: every query gets its own
/// PLS model, fitted on its `k` nearest training observations weighted by their distance to the
/// query. The distances are computed on the raw predictors or on the scores of a global PLS.
///
/// With `k = n` and an infinite bandwidth all local models are the global PLS.
///
/// ```rust
/// use chemolv::prelude::*;
/// use chemolv_local::LwPlsr;
///
/// let dataset = chemolv_datasets::spectra(60, 40, 2);
/// let (train, test) = (dataset.select(&(0..50).collect::<Vec<_>>()), dataset.select(&[55]));
///
/// let model = LwPlsr::params(20, 3).nlvdis(5).fit(&train)?;
/// let out = model.predict_local(test.records())?;
/// assert!(out.failed.is_empty());
/// assert_eq!(out.neighbors[0].len(), 20);
/// # Ok::<(), chemolv_local::LocalError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LwPlsr<F: Float> {
    params: LwPlsrValidParams<F>,
    train: Dataset<F>,
    neighborhood: Neighborhood<F>,
}

impl<F: Float> LwPlsr<F> {
    pub fn params(k: usize, nlv: usize) -> LwPlsrParams<F> {
        LwPlsrParams::new(k, nlv)
    }

    pub fn hyperparams(&self) -> &LwPlsrValidParams<F> {
        &self.params
    }

    /// Global PLS spanning the distance space, if any
    pub fn distance_model(&self) -> Option<&Pls<F>> {
        self.neighborhood.dis()
    }

    /// Local model parameters, `nlv` overrides the configured number of latent variables
    fn local_fit(&self, nlv: Option<usize>) -> Result<LocalFit<F>> {
        let scale = self.params.scale();
        match self.params.local() {
            LocalRegressor::Pls { nlv: default } => Ok(LocalFit::Pls(
                Pls::params(nlv.unwrap_or(default)).scale(scale).check()?,
            )),
            LocalRegressor::Avg { range, policy } => {
                let range = match nlv {
                    Some(high) => LvRange::new(range.low(), high.min(range.high()))?,
                    None => range,
                };
                Ok(LocalFit::Avg(
                    PlsAvg::params(range).policy(policy).scale(scale).check()?,
                ))
            }
        }
    }

    fn run(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        local: LocalFit<F>,
    ) -> Result<LocalOutput<F, Array2<F>>> {
        let (neighbors, weights) = self.neighborhood.query(x)?;
        let rows = locw(
            &self.train,
            x.view(),
            &neighbors,
            &weights,
            |dataset, query| local.fit_predict(dataset, query),
        )?;
        let (predictions, failed) = stack_rows(rows, self.train.ntargets());
        Ok(LocalOutput {
            predictions,
            failed,
            neighbors,
            weights,
        })
    }

    /// Local predictions of every row of `x`
    ///
    /// Fails if `x` does not have the training number of columns. A local fit that fails gives
    /// a NaN row and its index in `failed`.
    pub fn predict_local(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<LocalOutput<F, Array2<F>>> {
        self.run(x, self.local_fit(None)?)
    }

    /// Local predictions with `nlv` local latent variables
    ///
    /// For averaged local models the range is truncated to `low..=nlv`.
    pub fn predict_local_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> Result<LocalOutput<F, Array2<F>>> {
        self.run(x, self.local_fit(Some(nlv))?)
    }

    /// Neighbors of every row of `x` in the distance space
    pub fn neighbors(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Neighbors<F>>> {
        Ok(self.neighborhood.query(x)?.0)
    }
}

impl<F: Float> Fit<F, Array2<F>, LocalError> for LwPlsrValidParams<F> {
    type Object = LwPlsr<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        dataset.validate()?;
        if dataset.nsamples() == 0 {
            return Err(chemolv::Error::NotEnoughSamples.into());
        }
        let k = self.neighborhood().k();
        if let LocalRegressor::Avg { range, .. } = self.local() {
            range.check_max((k - 1).min(dataset.nfeatures()))?;
        }

        let dis = match self.neighborhood().nlvdis() {
            0 => None,
            nlvdis => {
                let global: Pls<F> = Pls::params(nlvdis).check()?.fit(dataset)?;
                Some(global)
            }
        };
        let sample_weights = dataset.sample_weights()?;
        let neighborhood =
            Neighborhood::build(*self.neighborhood(), dataset.records(), &sample_weights, dis)?;

        Ok(LwPlsr {
            params: *self,
            train: dataset.clone().without_weights(),
            neighborhood,
        })
    }
}

impl<F: Float, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array2<F>> for LwPlsr<F> {
    fn max_lv(&self) -> usize {
        match self.params.local() {
            LocalRegressor::Pls { nlv } => nlv,
            LocalRegressor::Avg { range, .. } => range.high(),
        }
    }

    /// Rows whose local fit failed are NaN
    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array2<F>> {
        Ok(self.predict_local_lv(x, nlv)?.predictions)
    }
}
