use chemolv::linalg::weighted_covariance;
use chemolv::Float;
use linfa_linalg::{
    cholesky::Cholesky,
    triangular::{SolveTriangularInplace, UPLO},
};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_stats::DeviationExt;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::{NnError, Point, Result};

/// Distance between two points of equal dimension
// Should satisfy triangle inequality (no squared Euclidean)
pub trait Distance<F: Float> {
    /// Fails if `a` and `b` are not of equal dimension
    fn distance(&self, a: Point<F>, b: Point<F>) -> Result<F>;

    // Fast distance metric that keeps the order of the distance function
    fn rdistance(&self, a: Point<F>, b: Point<F>) -> Result<F> {
        self.distance(a, b)
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        dist
    }
}

/// Euclidean distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L2Dist;

impl<F: Float> Distance<F> for L2Dist {
    fn distance(&self, a: Point<F>, b: Point<F>) -> Result<F> {
        Ok(self.rdistance(a, b)?.sqrt())
    }

    fn rdistance(&self, a: Point<F>, b: Point<F>) -> Result<F> {
        a.sq_l2_dist(&b)
            .map_err(|_| NnError::WrongDimension(a.len(), b.len()))
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        dist.powi(2)
    }
}

/// Metric of a neighbor index
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    /// Euclidean distance after whitening by the reference covariance
    Mahalanobis,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Euclidean
    }
}

/// Mahalanobis distance of a reference set
///
/// Stores the lower Cholesky factor `L` of the weighted reference covariance `S = L L'`. The
/// distance `sqrt((a - b)' S^-1 (a - b))` equals the Euclidean distance between `L^-1 a` and
/// `L^-1 b`, which is how the neighbor index searches: the reference set is whitened once and
/// every query is whitened on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct Mahalanobis<F> {
    factor: Array2<F>,
}

impl<F: Float> Mahalanobis<F> {
    /// Factorize the covariance of `reference` under the observation weights
    ///
    /// Fails with [`NnError::SingularCovariance`] when a pivot of the factorization is negligible
    /// against the diagonal of the covariance, as happens with fewer points than variables. Raw
    /// spectra are usually projected on a few latent variables first.
    pub fn fit(
        reference: &ArrayBase<impl Data<Elem = F>, Ix2>,
        weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Self> {
        let cov = weighted_covariance(reference, weights)?;
        let factor = cov.cholesky().map_err(|_| NnError::SingularCovariance)?;

        let max_diag = cov.diag().iter().cloned().fold(F::zero(), F::max);
        let threshold = max_diag * F::epsilon().sqrt();
        if max_diag <= F::zero() || factor.diag().iter().any(|v| !(*v * *v > threshold)) {
            return Err(NnError::SingularCovariance);
        }
        Ok(Mahalanobis { factor })
    }

    /// Lower Cholesky factor of the reference covariance
    pub fn factor(&self) -> &Array2<F> {
        &self.factor
    }

    /// Whiten the rows of `x`, `z_i = L^-1 x_i`
    pub fn whiten(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        if x.ncols() != self.factor.nrows() {
            return Err(NnError::WrongDimension(self.factor.nrows(), x.ncols()));
        }
        let mut zt = x.t().to_owned();
        self.factor
            .solve_triangular_inplace(&mut zt, UPLO::Lower)
            .map_err(chemolv::Error::from)?;
        Ok(zt.reversed_axes())
    }

    pub fn whiten_point(&self, x: Point<F>) -> Result<Array1<F>> {
        let z = self.whiten(&x.insert_axis(Axis(0)))?;
        Ok(z.index_axis_move(Axis(0), 0))
    }
}

impl<F: Float> Distance<F> for Mahalanobis<F> {
    fn distance(&self, a: Point<F>, b: Point<F>) -> Result<F> {
        Ok(self.rdistance(a, b)?.sqrt())
    }

    fn rdistance(&self, a: Point<F>, b: Point<F>) -> Result<F> {
        if a.len() != b.len() {
            return Err(NnError::WrongDimension(a.len(), b.len()));
        }
        let diff = &a - &b;
        let z = self.whiten_point(diff.view())?;
        Ok(z.dot(&z))
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        dist.powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, array};

    #[test]
    fn l2_dist() {
        let a = arr1(&[0.5, 6.6]);
        let b = arr1(&[4.4, 3.0]);
        let ab = L2Dist.distance(a.view(), b.view()).unwrap();
        assert_abs_diff_eq!(ab, 5.3075, epsilon = 1e-3);
        assert_abs_diff_eq!(
            L2Dist.rdistance(a.view(), b.view()).unwrap(),
            28.17,
            epsilon = 1e-3
        );
        let dist: &dyn Distance<f64> = &L2Dist;
        assert_abs_diff_eq!(dist.rdist_to_dist(dist.dist_to_rdist(ab)), ab);

        let c = arr1(&[1.0]);
        assert!(matches!(
            L2Dist.distance(a.view(), c.view()),
            Err(NnError::WrongDimension(2, 1))
        ));
    }

    #[test]
    fn mahalanobis_matches_inverse_covariance() {
        let x: Array2<f64> = array![[1., 2.], [2., 1.], [4., 5.], [3., 7.], [0., 1.]];
        let w = Array1::ones(5);
        let maha = Mahalanobis::fit(&x, &w).unwrap();

        let cov = weighted_covariance(&x, &w).unwrap();
        assert_abs_diff_eq!(maha.factor().dot(&maha.factor().t()), cov, epsilon = 1e-10);

        let diff = &x.row(0) - &x.row(3);
        let inv = chemolv::linalg::pinv(&cov, None).unwrap();
        let expected = diff.dot(&inv.dot(&diff)).sqrt();
        assert_abs_diff_eq!(
            maha.distance(x.row(0), x.row(3)).unwrap(),
            expected,
            epsilon = 1e-10
        );
    }

    #[test]
    fn mahalanobis_ignores_column_scales() {
        let x = array![[1., 2.], [2., 1.], [4., 5.], [3., 7.]];
        let scaled = &x * &array![10., 0.1];
        let w = Array1::ones(4);

        let a = Mahalanobis::fit(&x, &w).unwrap();
        let b = Mahalanobis::fit(&scaled, &w).unwrap();
        assert_abs_diff_eq!(
            a.distance(x.row(0), x.row(2)).unwrap(),
            b.distance(scaled.row(0), scaled.row(2)).unwrap(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn singular_covariance() {
        // three points on a line in the plane
        let x = array![[0., 0.], [1., 1.], [2., 2.]];
        assert!(matches!(
            Mahalanobis::fit(&x, &Array1::ones(3)),
            Err(NnError::SingularCovariance)
        ));
    }
}
