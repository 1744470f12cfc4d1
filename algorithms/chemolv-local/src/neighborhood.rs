use chemolv::{Error, Float};
use chemolv_nn::{weights_from_distances, NeighborIndex, Neighbors};
use chemolv_pls::Pls;
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};

use crate::error::Result;
use crate::hyperparams::NeighborhoodParams;

/// Distance space, neighbor index and weighting shared by the local models
#[derive(Debug, Clone)]
pub(crate) struct Neighborhood<F: Float> {
    params: NeighborhoodParams<F>,
    nfeatures: usize,
    /// Global PLS whose scores span the distance space
    dis: Option<Pls<F>>,
    index: NeighborIndex<F>,
}

impl<F: Float> Neighborhood<F> {
    /// Index the training records, in the score space of `dis` if given
    pub(crate) fn build(
        params: NeighborhoodParams<F>,
        records: &ArrayBase<impl Data<Elem = F>, Ix2>,
        sample_weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
        dis: Option<Pls<F>>,
    ) -> Result<Self> {
        let n = records.nrows();
        if params.k() > n {
            return Err(Error::InsufficientNeighbors {
                requested: params.k(),
                available: n,
            }
            .into());
        }

        let space = match &dis {
            Some(pls) => {
                debug!(
                    "distances computed on {} global latent variables",
                    pls.nlv()
                );
                pls.transform_lv(records, pls.nlv())?
            }
            None => records.to_owned(),
        };
        let index = NeighborIndex::from_batch_weighted(&space, sample_weights, params.metric())?;

        Ok(Neighborhood {
            params,
            nfeatures: records.ncols(),
            dis,
            index,
        })
    }

    pub(crate) fn params(&self) -> &NeighborhoodParams<F> {
        &self.params
    }

    pub(crate) fn dis(&self) -> Option<&Pls<F>> {
        self.dis.as_ref()
    }

    fn project(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Error::check_rows("query columns", self.nfeatures, x.ncols())?;
        Ok(match &self.dis {
            Some(pls) => pls.transform_lv(x, pls.nlv())?,
            None => x.to_owned(),
        })
    }

    /// Neighbors of every query row and their kernel weights
    pub(crate) fn query(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Vec<Neighbors<F>>, Vec<Array1<F>>)> {
        let space = self.project(x)?;
        let neighbors = self.index.k_nearest_batch(&space, self.params.k())?;
        let weights = neighbors
            .iter()
            .map(|nb| {
                weights_from_distances(
                    &nb.distances,
                    self.params.bandwidth(),
                    self.params.kernel(),
                    self.params.tol(),
                )
            })
            .collect::<chemolv_nn::Result<Vec<_>>>()?;
        Ok((neighbors, weights))
    }
}
