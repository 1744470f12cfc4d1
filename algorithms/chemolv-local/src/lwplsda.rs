//! kNN locally weighted PLS discrimination
use chemolv::traits::{Fit, PredictLv};
use chemolv::{Float, Label, LabeledDataset, ParamGuard};
use chemolv_nn::Neighbors;
use chemolv_pls::{
    Pls, PlsDa, PlsDaParams, PlsDaValidParams, PlsLda, PlsLdaParams, PlsLdaValidParams, Prior,
};
use ndarray::{Array1, ArrayBase, ArrayView2, Data, Ix2};

use crate::error::{LocalError, Result};
use crate::hyperparams::{Discriminant, LwPlsDaParams, LwPlsDaValidParams};
use crate::locw::{collect_labels, locw, LocalOutput};
use crate::neighborhood::Neighborhood;

enum LocalFit<F: Float> {
    PlsDa(PlsDaValidParams<F>),
    PlsLda(PlsLdaValidParams<F>),
}

impl<F: Float> LocalFit<F> {
    fn fit_predict<L: Label>(
        &self,
        nlv: usize,
        local: &LabeledDataset<F, L>,
        query: ArrayView2<F>,
    ) -> Result<L> {
        // a pure neighborhood needs no model
        let first = &local.targets()[0];
        if local.targets().iter().all(|label| label == first) {
            return Ok(first.clone());
        }

        let predicted = match self {
            LocalFit::PlsDa(params) => {
                let model: PlsDa<F, L> = params.fit(local)?;
                model.predict_lv(&query, nlv)?
            }
            LocalFit::PlsLda(params) => {
                let model: PlsLda<F, L> = params.fit(local)?;
                model.predict_lv(&query, nlv)?
            }
        };
        Ok(predicted[0].clone())
    }
}

/// A fitted kNN locally weighted PLS discriminant (LWPLS-DA)
///
/// The neighborhood of every query is found as in [`LwPlsr`](crate::LwPlsr). A PLS-DA or a
/// PLS-LDA is then fitted on the weighted neighbors, unless they all share the same class which
/// is predicted directly. The distance space, when `nlvdis > 0`, is spanned by a global PLS-DA
/// with proportional priors.
#[derive(Debug, Clone)]
pub struct LwPlsDa<F: Float, L> {
    params: LwPlsDaValidParams<F>,
    train: LabeledDataset<F, L>,
    neighborhood: Neighborhood<F>,
}

impl<F: Float> LwPlsDa<F, usize> {
    /// The label type is taken from the dataset at fit
    pub fn params(k: usize, nlv: usize) -> LwPlsDaParams<F> {
        LwPlsDaParams::new(k, nlv)
    }
}

impl<F: Float, L: Label> LwPlsDa<F, L> {
    pub fn hyperparams(&self) -> &LwPlsDaValidParams<F> {
        &self.params
    }

    /// PLS of the global discriminant spanning the distance space, if any
    pub fn distance_model(&self) -> Option<&Pls<F>> {
        self.neighborhood.dis()
    }

    fn local_fit(&self) -> Result<LocalFit<F>> {
        let (nlv, prior, scale) = (self.params.nlv(), self.params.prior(), self.params.scale());
        Ok(match self.params.discriminant() {
            Discriminant::PlsDa => LocalFit::PlsDa(
                PlsDaParams::new(nlv).prior(prior).scale(scale).check()?,
            ),
            Discriminant::PlsLda => LocalFit::PlsLda(
                PlsLdaParams::new(nlv).prior(prior).scale(scale).check()?,
            ),
        })
    }

    /// Local class of every row of `x` with `nlv` local latent variables
    ///
    /// A failed local fit gives `None` and its row index in `failed`.
    pub fn predict_local_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> Result<LocalOutput<F, Array1<Option<L>>>> {
        let local = self.local_fit()?;
        let (neighbors, weights) = self.neighborhood.query(x)?;
        let rows = locw(
            &self.train,
            x.view(),
            &neighbors,
            &weights,
            |dataset, query| local.fit_predict(nlv, dataset, query),
        )?;
        let (predictions, failed) = collect_labels(rows);
        Ok(LocalOutput {
            predictions,
            failed,
            neighbors,
            weights,
        })
    }

    /// Local class of every row of `x`
    pub fn predict_local(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<LocalOutput<F, Array1<Option<L>>>> {
        self.predict_local_lv(x, self.params.nlv())
    }

    pub fn neighbors(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Neighbors<F>>> {
        Ok(self.neighborhood.query(x)?.0)
    }
}

impl<F: Float, L: Label> Fit<F, Array1<L>, LocalError> for LwPlsDaValidParams<F> {
    type Object = LwPlsDa<F, L>;

    fn fit(&self, dataset: &LabeledDataset<F, L>) -> Result<Self::Object> {
        dataset.validate()?;
        if dataset.nsamples() == 0 {
            return Err(chemolv::Error::NotEnoughSamples.into());
        }

        let dis = match self.neighborhood().nlvdis() {
            0 => None,
            nlvdis => {
                let global: PlsDa<F, L> = PlsDaParams::new(nlvdis)
                    .prior(Prior::Proportional)
                    .check()?
                    .fit(dataset)?;
                Some(global.pls().clone())
            }
        };
        let sample_weights = dataset.sample_weights()?;
        let neighborhood =
            Neighborhood::build(*self.neighborhood(), dataset.records(), &sample_weights, dis)?;

        Ok(LwPlsDa {
            params: *self,
            train: dataset.clone().without_weights(),
            neighborhood,
        })
    }
}

impl<F: Float, L: Label, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array1<Option<L>>>
    for LwPlsDa<F, L>
{
    fn max_lv(&self) -> usize {
        self.params.nlv()
    }

    /// Rows whose local fit failed are `None`
    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array1<Option<L>>> {
        Ok(self.predict_local_lv(x, nlv)?.predictions)
    }
}
