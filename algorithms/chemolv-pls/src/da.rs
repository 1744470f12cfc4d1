//! Discriminant analysis on PLS latent variables
use chemolv::linalg::{normalize_weights, pinv};
use chemolv::traits::{Fit, PredictInplace, PredictLv};
use chemolv::{Float, Label, LabeledDataset};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::errors::{PlsError, Result};
use crate::hyperparams::{
    PlsDaParams, PlsDaValidParams, PlsLdaParams, PlsLdaValidParams, Prior, PlsValidParams,
};
use crate::pls::Pls;
use crate::utils::{argmax, class_weights, dummy, encode_labels};

/// Dummy-coded PLS shared by both discriminant models
struct DummyFit<F: Float, L> {
    classes: Vec<L>,
    index: Vec<usize>,
    weights: Array1<F>,
    class_totals: Array1<F>,
    pls: Pls<F>,
}

fn fit_dummy<F: Float, L: Label>(
    params: &PlsValidParams<F>,
    dataset: &LabeledDataset<F, L>,
    reweight: bool,
) -> Result<DummyFit<F, L>> {
    if dataset.nsamples() == 0 {
        return Err(PlsError::NotEnoughSamples(0));
    }
    let d = dataset.sample_weights()?;
    let (classes, index) = encode_labels(dataset.targets());
    let nclass = classes.len();
    let class_totals = class_weights(&index, &d, nclass);

    let weights = if reweight {
        let balanced = Array1::from_shape_fn(d.len(), |i| {
            let total = class_totals[index[i]];
            if total > F::zero() {
                d[i] / total
            } else {
                F::zero()
            }
        });
        normalize_weights(balanced.view())?
    } else {
        d
    };
    let y = dummy::<F>(&index, nclass);
    let pls = params.fit_weighted(dataset.records().view(), y.view(), &weights)?;

    Ok(DummyFit {
        classes,
        index,
        weights,
        class_totals,
        pls,
    })
}

fn priors<F: Float>(prior: Prior, class_totals: &Array1<F>) -> Array1<F> {
    match prior {
        Prior::Uniform => Array1::from_elem(class_totals.len(), F::one() / F::cast(class_totals.len())),
        Prior::Proportional => class_totals.clone(),
    }
}

/// A fitted PLS discriminant analysis
///
/// A PLS regression of the dummy-coded classes, the predicted class is the column with the
/// largest predicted dummy value.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct PlsDa<F: Float, L> {
    classes: Vec<L>,
    priors: Array1<F>,
    pls: Pls<F>,
}

impl<F: Float> PlsDa<F, usize> {
    /// The parameters do not depend on the label type, which is taken from the dataset at fit
    pub fn params(nlv: usize) -> PlsDaParams<F> {
        PlsDaParams::new(nlv)
    }
}

impl<F: Float, L: Label> PlsDa<F, L> {
    /// Sorted class labels, in the order of the dummy columns
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn priors(&self) -> &Array1<F> {
        &self.priors
    }

    pub fn pls(&self) -> &Pls<F> {
        &self.pls
    }

    /// Predicted dummy values with `nlv` latent variables
    pub fn decision_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> chemolv::Result<Array2<F>> {
        self.pls.predict_lv(x, nlv)
    }

    fn pick(&self, decision: &Array2<F>) -> Array1<L> {
        decision
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(&row)].clone())
            .collect()
    }
}

impl<F: Float, L: Label> Fit<F, Array1<L>, PlsError> for PlsDaValidParams<F> {
    type Object = PlsDa<F, L>;

    fn fit(&self, dataset: &LabeledDataset<F, L>) -> Result<Self::Object> {
        let reweight = self.prior() == Prior::Uniform;
        let fitted = fit_dummy(self.pls(), dataset, reweight)?;
        Ok(PlsDa {
            priors: priors(self.prior(), &fitted.class_totals),
            classes: fitted.classes,
            pls: fitted.pls,
        })
    }
}

impl<F: Float, L: Label, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array1<L>>
    for PlsDa<F, L>
{
    fn max_lv(&self) -> usize {
        self.pls.max_nlv()
    }

    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array1<L>> {
        Ok(self.pick(&self.decision_lv(x, nlv)?))
    }
}

impl<F: Float, L: Label, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<L>>
    for PlsDa<F, L>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<L>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        let mut decision = self.pls.default_target(x);
        self.pls.predict_inplace(x, &mut decision);
        *y = self.pick(&decision);
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<L> {
        Array1::from_elem(x.nrows(), self.classes[0].clone())
    }
}

/// A fitted PLS followed by a weighted linear discriminant analysis of the scores
///
/// The discriminant step is computed at prediction time on the first `nlv` training scores, with
/// the pooled within-class covariance of the scores and the class priors.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct PlsLda<F: Float, L> {
    classes: Vec<L>,
    priors: Array1<F>,
    index: Vec<usize>,
    weights: Array1<F>,
    class_totals: Array1<F>,
    pls: Pls<F>,
}

impl<F: Float> PlsLda<F, usize> {
    pub fn params(nlv: usize) -> PlsLdaParams<F> {
        PlsLdaParams::new(nlv)
    }
}

impl<F: Float, L: Label> PlsLda<F, L> {
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn priors(&self) -> &Array1<F> {
        &self.priors
    }

    pub fn pls(&self) -> &Pls<F> {
        &self.pls
    }

    /// Discriminant scores `-1/2 (z - m_c)' W^-1 (z - m_c) + ln(prior_c)` for every class
    pub fn decision_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> chemolv::Result<Array2<F>> {
        let z = self.pls.transform_lv(x, nlv)?;
        let k = z.ncols();
        let nclass = self.classes.len();
        let log_priors = self.priors.mapv(|p| {
            if p > F::zero() {
                p.ln()
            } else {
                F::neg_infinity()
            }
        });

        let t = self.pls.scores().slice(s![.., ..k]);
        let mut means = Array2::zeros((nclass, k));
        for (i, row) in t.rows().into_iter().enumerate() {
            let c = self.index[i];
            if self.class_totals[c] > F::zero() {
                let mut mean = means.row_mut(c);
                mean.scaled_add(self.weights[i] / self.class_totals[c], &row);
            }
        }

        let mut within = Array2::zeros((k, k));
        for (i, row) in t.rows().into_iter().enumerate() {
            let dev = &row - &means.row(self.index[i]);
            let dev = dev.insert_axis(Axis(1));
            within.scaled_add(self.weights[i], &dev.dot(&dev.t()));
        }
        let precision = pinv(&within, None)?;

        let mut decision = Array2::zeros((z.nrows(), nclass));
        for (mut out, zi) in decision.rows_mut().into_iter().zip(z.rows()) {
            for c in 0..nclass {
                out[c] = if self.class_totals[c] > F::zero() {
                    let dev = &zi - &means.row(c);
                    -dev.dot(&precision.dot(&dev)) / F::cast(2.) + log_priors[c]
                } else {
                    F::neg_infinity()
                };
            }
        }
        Ok(decision)
    }
}

impl<F: Float, L: Label> Fit<F, Array1<L>, PlsError> for PlsLdaValidParams<F> {
    type Object = PlsLda<F, L>;

    fn fit(&self, dataset: &LabeledDataset<F, L>) -> Result<Self::Object> {
        let fitted = fit_dummy(self.0.pls(), dataset, false)?;
        Ok(PlsLda {
            priors: priors(self.0.prior(), &fitted.class_totals),
            classes: fitted.classes,
            index: fitted.index,
            weights: fitted.weights,
            class_totals: fitted.class_totals,
            pls: fitted.pls,
        })
    }
}

impl<F: Float, L: Label, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array1<L>>
    for PlsLda<F, L>
{
    fn max_lv(&self) -> usize {
        self.pls.max_nlv()
    }

    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array1<L>> {
        let decision = self.decision_lv(x, nlv)?;
        Ok(decision
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(&row)].clone())
            .collect())
    }
}
