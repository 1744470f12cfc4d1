//! kNN regression
use chemolv::linalg::weighted_mean;
use chemolv::traits::Fit;
use chemolv::{Dataset, Float, ParamGuard};
use chemolv_nn::Neighbors;
use chemolv_pls::Pls;
use ndarray::{Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};

use crate::error::{LocalError, Result};
use crate::hyperparams::{KnnRParams, KnnRValidParams};
use crate::locw::{locw, stack_rows, LocalOutput};
use crate::neighborhood::Neighborhood;

/// Kernel-weighted mean response of the neighbors
fn weighted_response<F: Float>(local: &Dataset<F>, _: ArrayView2<F>) -> Result<Array2<F>> {
    let weights = local.sample_weights()?;
    let mean = weighted_mean(local.targets(), &weights)?;
    Ok(mean.insert_axis(Axis(0)))
}

/// A fitted kNN regression
///
/// The prediction of a query is the mean response of its `k` nearest training observations,
/// weighted by the distance kernel. Neighbors are searched as in [`LwPlsr`](crate::LwPlsr).
///
/// ```rust
/// use chemolv::prelude::*;
/// use chemolv_local::KnnR;
/// use ndarray::array;
///
/// let dataset = Dataset::new(array![[0.], [1.], [2.], [10.]], array![[0.], [2.], [4.], [20.]]);
/// let model = KnnR::params(2).bandwidth(f64::INFINITY).fit(&dataset)?;
/// let out = model.predict_local(&array![[0.4]])?;
/// assert_eq!(out.predictions, array![[1.]]);
/// # Ok::<(), chemolv_local::LocalError>(())
/// ```
#[derive(Debug, Clone)]
pub struct KnnR<F: Float> {
    params: KnnRValidParams<F>,
    train: Dataset<F>,
    neighborhood: Neighborhood<F>,
}

impl<F: Float> KnnR<F> {
    pub fn params(k: usize) -> KnnRParams<F> {
        KnnRParams::new(k)
    }

    pub fn hyperparams(&self) -> &KnnRValidParams<F> {
        &self.params
    }

    pub fn distance_model(&self) -> Option<&Pls<F>> {
        self.neighborhood.dis()
    }

    /// Weighted mean response of the neighbors of every row of `x`
    pub fn predict_local(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<LocalOutput<F, Array2<F>>> {
        let (neighbors, weights) = self.neighborhood.query(x)?;
        let rows = locw(
            &self.train,
            x.view(),
            &neighbors,
            &weights,
            weighted_response,
        )?;
        let (predictions, failed) = stack_rows(rows, self.train.ntargets());
        Ok(LocalOutput {
            predictions,
            failed,
            neighbors,
            weights,
        })
    }

    pub fn neighbors(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Neighbors<F>>> {
        Ok(self.neighborhood.query(x)?.0)
    }
}

impl<F: Float> Fit<F, Array2<F>, LocalError> for KnnRValidParams<F> {
    type Object = KnnR<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        dataset.validate()?;
        if dataset.nsamples() == 0 {
            return Err(chemolv::Error::NotEnoughSamples.into());
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

        Ok(KnnR {
            params: *self,
            train: dataset.clone().without_weights(),
            neighborhood,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chemolv_nn::WeightKernel;
    use ndarray::array;

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<KnnR<f64>>();
        has_autotraits::<KnnRParams<f64>>();
    }

    #[test]
    fn closer_neighbors_weigh_more() {
        let dataset = Dataset::new(
            array![[0.], [1.], [3.], [7.]],
            array![[0., 1.], [10., 1.], [30., 1.], [70., 1.]],
        );
        let model = KnnR::params(3)
            .kernel(WeightKernel::Inverse)
            .bandwidth(1.)
            .tol(0.)
            .fit(&dataset)
            .unwrap();
        let out = model.predict_local(&array![[0.]]).unwrap();

        // distances 0, 1, 3 give raw weights 1, 1/2, 1/4
        assert_eq!(out.neighbors[0].indices, vec![0, 1, 2]);
        assert_abs_diff_eq!(out.weights[0], array![1., 0.5, 0.25], epsilon = 1e-12);
        assert_abs_diff_eq!(
            out.predictions,
            array![[(5. + 7.5) / 1.75, 1.]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn score_space_neighbors() {
        let dataset = chemolv_datasets::spectra(40, 25, 3);
        let model = KnnR::params(5).nlvdis(3).fit(&dataset).unwrap();
        assert_eq!(model.distance_model().map(|pls| pls.nlv()), Some(3));

        let out = model.predict_local(dataset.records()).unwrap();
        assert!(out.failed.is_empty());
        for (i, nb) in out.neighbors.iter().enumerate() {
            assert_eq!(nb.indices[0], i);
        }
    }
}
