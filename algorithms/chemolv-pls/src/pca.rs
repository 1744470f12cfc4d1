use chemolv::dataset::Targets;
use chemolv::linalg::weighted_pca;
use chemolv::traits::{Fit, Transformer};
use chemolv::{DatasetBase, Float};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::errors::{PlsError, Result};

/// Weighted principal component analysis
///
/// The targets of the dataset are ignored, observation weights are honored.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcaParams {
    ncomp: usize,
}

/// A fitted weighted PCA
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Pca<F: Float> {
    means: Array1<F>,
    loadings: Array2<F>,
    scores: Array2<F>,
    singular_values: Array1<F>,
    total_variance: F,
}

impl Pca<f64> {
    /// Number of components, capped at `min(n, p)` during fit
    ///
    /// The parameters are independent of the float type, a fitted `Pca<f32>` is obtained from
    /// the same call.
    pub fn params(ncomp: usize) -> PcaParams {
        PcaParams { ncomp }
    }
}

impl<F: Float> Pca<F> {
    pub fn ncomp(&self) -> usize {
        self.loadings.ncols()
    }

    pub fn means(&self) -> &Array1<F> {
        &self.means
    }

    /// Orthonormal loadings, one column per component
    pub fn loadings(&self) -> &Array2<F> {
        &self.loadings
    }

    pub fn scores(&self) -> &Array2<F> {
        &self.scores
    }

    pub fn singular_values(&self) -> &Array1<F> {
        &self.singular_values
    }

    /// Weighted variance captured by every component
    pub fn explained_variance(&self) -> Array1<F> {
        self.singular_values.mapv(|s| s * s)
    }

    pub fn explained_variance_ratio(&self) -> Array1<F> {
        if self.total_variance <= F::zero() {
            return Array1::zeros(self.ncomp());
        }
        self.explained_variance() / self.total_variance
    }

    /// Scores on the first `ncomp` components
    pub fn transform(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        ncomp: usize,
    ) -> chemolv::Result<Array2<F>> {
        chemolv::Error::check_rows("number of features", self.means.len(), x.ncols())?;
        let k = ncomp.min(self.ncomp());
        Ok((x - &self.means).dot(&self.loadings.slice(s![.., ..k])))
    }

    /// Map scores on the leading components back to the original space
    pub fn inverse_transform(
        &self,
        scores: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> chemolv::Result<Array2<F>> {
        let k = scores.ncols();
        if k > self.ncomp() {
            return Err(chemolv::Error::Dimension {
                what: "number of components",
                expected: self.ncomp(),
                actual: k,
            });
        }
        Ok(scores.dot(&self.loadings.slice(s![.., ..k]).t()) + &self.means)
    }
}

impl<F: Float, T: Targets> Fit<F, T, PlsError> for PcaParams {
    type Object = Pca<F>;

    fn fit(&self, dataset: &DatasetBase<F, T>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        let d = dataset.sample_weights()?;
        let dec = weighted_pca(dataset.records(), &d, self.ncomp)?;

        let xc = dataset.records() - &dec.means;
        let total_variance = (&xc * &xc * &d.insert_axis(Axis(1))).sum();

        Ok(Pca {
            means: dec.means,
            loadings: dec.loadings,
            scores: dec.scores,
            singular_values: dec.singular_values,
            total_variance,
        })
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Array2<F>> for Pca<F> {
    fn transform(&self, x: &'a ArrayBase<D, Ix2>) -> Array2<F> {
        assert_eq!(
            x.ncols(),
            self.means.len(),
            "The number of features must match the fitted model."
        );
        (x - &self.means).dot(&self.loadings)
    }
}
