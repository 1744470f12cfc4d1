use std::collections::BinaryHeap;

use chemolv::Float;
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};
use rayon::prelude::*;

use crate::distance::{Distance, L2Dist, Mahalanobis, Metric};
use crate::heap_elem::DistElem;
use crate::{NnError, Point, Result};

/// Neighbors of a query point, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors<F> {
    /// Row indices in the reference set
    pub indices: Vec<usize>,
    /// Distances to the query, non-decreasing
    pub distances: Array1<F>,
}

impl<F> Neighbors<F> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl<F> AsRef<[usize]> for Neighbors<F> {
    fn as_ref(&self) -> &[usize] {
        &self.indices
    }
}

/// Exhaustive nearest neighbor index
///
/// Neighbors are ordered by increasing distance, equal distances by ascending row index, so a
/// query always returns the same list whatever the layout of the reference set in memory. The
/// search is linear in the number of reference points, which is what the local models need:
/// calibration sets hold a few thousand spectra projected on a handful of latent variables.
///
/// With [`Metric::Mahalanobis`] the reference set is whitened once by the Cholesky factor of its
/// covariance and queries are whitened on arrival.
#[derive(Debug, Clone)]
pub struct NeighborIndex<F: Float> {
    points: Array2<F>,
    whitening: Option<Mahalanobis<F>>,
    metric: Metric,
}

impl<F: Float> NeighborIndex<F> {
    /// Index the rows of `reference`
    pub fn from_batch(reference: &ArrayBase<impl Data<Elem = F>, Ix2>, metric: Metric) -> Result<Self> {
        let weights = Array1::<F>::ones(reference.nrows());
        Self::from_batch_weighted(reference, &weights, metric)
    }

    /// Index the rows of `reference`, the Mahalanobis covariance is computed under `weights`
    pub fn from_batch_weighted(
        reference: &ArrayBase<impl Data<Elem = F>, Ix2>,
        weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
        metric: Metric,
    ) -> Result<Self> {
        if reference.ncols() == 0 {
            return Err(NnError::ZeroDimension);
        }
        if reference.nrows() == 0 {
            return Err(chemolv::Error::NotEnoughSamples.into());
        }
        if reference.iter().any(|v| !v.is_finite()) {
            return Err(NnError::NonFinite);
        }

        let (points, whitening) = match metric {
            Metric::Euclidean => (reference.to_owned(), None),
            Metric::Mahalanobis => {
                let maha = Mahalanobis::fit(reference, weights)?;
                debug!(
                    "whitening {} reference points of dimension {}",
                    reference.nrows(),
                    reference.ncols()
                );
                (maha.whiten(reference)?, Some(maha))
            }
        };

        Ok(NeighborIndex {
            points,
            whitening,
            metric,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn nsamples(&self) -> usize {
        self.points.nrows()
    }

    pub fn nfeatures(&self) -> usize {
        self.points.ncols()
    }

    /// The Mahalanobis whitening, if the index uses it
    pub fn whitening(&self) -> Option<&Mahalanobis<F>> {
        self.whitening.as_ref()
    }

    /// Checks the query and maps it into the search space
    fn prepare(&self, point: Point<F>) -> Result<Array1<F>> {
        if point.len() != self.nfeatures() {
            return Err(NnError::WrongDimension(self.nfeatures(), point.len()));
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(NnError::NonFinite);
        }
        match &self.whitening {
            Some(maha) => maha.whiten_point(point),
            None => Ok(point.to_owned()),
        }
    }

    fn into_neighbors(elems: Vec<DistElem<F>>) -> Neighbors<F> {
        let distances = elems
            .iter()
            .map(|e| L2Dist.rdist_to_dist(e.raw()))
            .collect::<Array1<F>>();
        let indices = elems.into_iter().map(|e| e.index).collect();
        Neighbors { indices, distances }
    }

    /// The `k` nearest reference points of `point`
    ///
    /// Fails with [`chemolv::Error::InsufficientNeighbors`] if `k` exceeds the size of the
    /// reference set.
    pub fn k_nearest(&self, point: ArrayView1<F>, k: usize) -> Result<Neighbors<F>> {
        if k > self.nsamples() {
            return Err(chemolv::Error::InsufficientNeighbors {
                requested: k,
                available: self.nsamples(),
            }
            .into());
        }
        let point = self.prepare(point)?;

        // max-heap holding the k best candidates seen so far
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (index, row) in self.points.rows().into_iter().enumerate() {
            let rdist = L2Dist.rdistance(point.view(), row)?;
            heap.push(DistElem::new(rdist, index)?);
            if heap.len() > k {
                heap.pop();
            }
        }

        Ok(Self::into_neighbors(heap.into_sorted_vec()))
    }

    /// The `k` nearest reference points of every row of `points`, computed in parallel
    pub fn k_nearest_batch(
        &self,
        points: &ArrayBase<impl Data<Elem = F>, Ix2>,
        k: usize,
    ) -> Result<Vec<Neighbors<F>>> {
        let points = points.view();
        (0..points.nrows())
            .into_par_iter()
            .map(|i| self.k_nearest(points.row(i), k))
            .collect()
    }

    /// All reference points within distance `range` of `point`, closest first
    pub fn within_range(&self, point: ArrayView1<F>, range: F) -> Result<Neighbors<F>> {
        if range.is_nan() || range < F::zero() {
            return Err(chemolv::Error::Parameters(format!(
                "search radius should be non-negative, got {}",
                range
            ))
            .into());
        }
        let point = self.prepare(point)?;
        let rrange = L2Dist.dist_to_rdist(range);

        let mut found = Vec::new();
        for (index, row) in self.points.rows().into_iter().enumerate() {
            let rdist = L2Dist.rdistance(point.view(), row)?;
            if rdist <= rrange {
                found.push(DistElem::new(rdist, index)?);
            }
        }
        found.sort();

        Ok(Self::into_neighbors(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array1};

    #[test]
    fn nearest_in_order() {
        let points = arr2(&[[0.0, 2.0], [10.0, 4.0], [4.0, 5.0], [1.0, 2.0]]);
        let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();

        let out = nn.k_nearest(points.row(0), 3).unwrap();
        assert_eq!(out.indices, vec![0, 3, 2]);
        assert_abs_diff_eq!(out.distances, arr1(&[0., 1., 5.]));

        let all = nn.k_nearest(points.row(0), 4).unwrap();
        assert_eq!(all.indices, vec![0, 3, 2, 1]);
        assert!(nn.k_nearest(points.row(0), 0).unwrap().is_empty());
    }

    #[test]
    fn ties_by_ascending_index() {
        let points = arr2(&[[2.0], [-1.0], [1.0], [-2.0], [1.0]]);
        let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();
        let out = nn.k_nearest(arr1(&[0.0]).view(), 5).unwrap();
        assert_eq!(out.indices, vec![1, 2, 4, 0, 3]);

        let out = nn.k_nearest(arr1(&[0.0]).view(), 2).unwrap();
        assert_eq!(out.indices, vec![1, 2]);
    }

    #[test]
    fn within_range() {
        let points = arr2(&[[0.0, 0.0], [3.0, 4.0], [1.0, 0.0], [0.0, 6.0]]);
        let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();
        let out = nn.within_range(arr1(&[0.0, 0.0]).view(), 5.0).unwrap();
        assert_eq!(out.indices, vec![0, 2, 1]);
        assert_abs_diff_eq!(out.distances, arr1(&[0., 1., 5.]));
        assert!(nn.within_range(points.row(0), -1.0).is_err());
    }

    #[test]
    fn batch_matches_single_queries() {
        let points = arr2(&[[0.0, 2.0], [10.0, 4.0], [4.0, 5.0], [1.0, 2.0], [3.0, 3.0]]);
        let nn = NeighborIndex::from_batch(&points, Metric::Mahalanobis).unwrap();
        let batch = nn.k_nearest_batch(&points, 3).unwrap();
        for (i, neighbors) in batch.iter().enumerate() {
            assert_eq!(neighbors, &nn.k_nearest(points.row(i), 3).unwrap());
            assert_eq!(neighbors.indices[0], i);
        }
    }

    #[test]
    fn invalid_queries() {
        let points = arr2(&[[0.0, 2.0], [10.0, 4.0]]);
        let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();
        assert!(matches!(
            nn.k_nearest(points.row(0), 3),
            Err(NnError::BaseCrate(chemolv::Error::InsufficientNeighbors {
                requested: 3,
                available: 2
            }))
        ));
        assert!(matches!(
            nn.k_nearest(arr1(&[1.0]).view(), 1),
            Err(NnError::WrongDimension(2, 1))
        ));
        assert!(matches!(
            nn.k_nearest(arr1(&[1.0, f64::NAN]).view(), 1),
            Err(NnError::NonFinite)
        ));

        let empty: Array2<f64> = Array2::zeros((3, 0));
        assert!(matches!(
            NeighborIndex::from_batch(&empty, Metric::Euclidean),
            Err(NnError::ZeroDimension)
        ));
        let bad = arr2(&[[0.0, f64::INFINITY]]);
        assert!(matches!(
            NeighborIndex::from_batch(&bad, Metric::Euclidean),
            Err(NnError::NonFinite)
        ));
    }

    #[test]
    fn weighted_mahalanobis() {
        let points = arr2(&[[0.0, 2.0], [10.0, 4.0], [4.0, 5.0], [1.0, 2.0], [3.0, 7.0]]);
        let uniform =
            NeighborIndex::from_batch_weighted(&points, &Array1::from_elem(5, 2.0), Metric::Mahalanobis)
                .unwrap();
        let plain = NeighborIndex::from_batch(&points, Metric::Mahalanobis).unwrap();
        assert_abs_diff_eq!(
            uniform.k_nearest(points.row(1), 5).unwrap().distances,
            plain.k_nearest(points.row(1), 5).unwrap().distances,
            epsilon = 1e-12
        );
    }
}
