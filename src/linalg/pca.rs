use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

use super::solve::{svd_desc, svd_flip};
use super::weighted::normalize_weights;
use crate::error::{Error, Result};
use crate::Float;

/// Result of a weighted principal component decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct PcaDecomposition<F> {
    /// Projections `Xc P` of the (unweighted) centered observations, n × a
    pub scores: Array2<F>,
    /// Orthonormal loadings, p × a
    pub loadings: Array2<F>,
    /// Singular values of `D^{1/2} Xc`, descending and non-negative
    pub singular_values: Array1<F>,
    /// Weighted column means
    pub means: Array1<F>,
}

/// Weighted principal component analysis
///
/// Computes the SVD of `D^{1/2} Xc`, where `Xc` is centered with the weighted means and `D` holds
/// the normalized weights. At most `min(n, p)` components are returned. Signs are fixed so the
/// largest entry of every left singular vector is positive.
pub fn weighted_pca<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
    n_components: usize,
) -> Result<PcaDecomposition<F>> {
    Error::check_rows("weights length", x.nrows(), weights.len())?;
    let w = normalize_weights(weights.view())?;
    let means = x.t().dot(&w);
    let xc = x - &means;

    let ncomp = n_components.min(x.nrows()).min(x.ncols());
    if ncomp == 0 {
        return Ok(PcaDecomposition {
            scores: Array2::zeros((x.nrows(), 0)),
            loadings: Array2::zeros((x.ncols(), 0)),
            singular_values: Array1::zeros(0),
            means,
        });
    }

    let xw = &xc * &w.mapv(F::sqrt).insert_axis(Axis(1));
    let (u, sigma, vt) = svd_desc(&xw)?;
    let ncomp = ncomp.min(sigma.len());
    let (_, vt) = svd_flip(u.slice(s![.., ..ncomp]), vt.slice(s![..ncomp, ..]));

    let loadings = vt.reversed_axes();
    let scores = xc.dot(&loadings);
    let singular_values = sigma.slice(s![..ncomp]).mapv(|v| v.max(F::zero()));

    Ok(PcaDecomposition {
        scores,
        loadings,
        singular_values,
        means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn full_rank_decomposition_reconstructs_centered_data() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let x: Array2<f64> = Array::random_using((12, 4), Uniform::new(-1., 1.), &mut rng);
        let w: Array1<f64> = Array::random_using(12, Uniform::new(0.5, 2.), &mut rng);

        let pca = weighted_pca(&x, &w, 4).unwrap();
        let xc = &x - &pca.means;
        assert_abs_diff_eq!(pca.scores.dot(&pca.loadings.t()), xc, epsilon = 1e-10);
        assert_abs_diff_eq!(pca.loadings.t().dot(&pca.loadings), Array2::eye(4), epsilon = 1e-10);
    }

    #[test]
    fn singular_values_are_sorted_and_match_weighted_variance() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let x: Array2<f64> = Array::random_using((20, 3), Uniform::new(-1., 1.), &mut rng);
        let w = Array1::ones(20);

        let pca = weighted_pca(&x, &w, 3).unwrap();
        let sv = &pca.singular_values;
        assert!(sv[0] >= sv[1] && sv[1] >= sv[2] && sv[2] >= 0.);

        // squared singular values are the variances of the scores
        let var = pca.scores.mapv(|v| v * v).mean_axis(Axis(0)).unwrap();
        assert_abs_diff_eq!(var, sv.mapv(|v| v * v), epsilon = 1e-10);
    }

    #[test]
    fn number_of_components_is_capped() {
        let x = array![[1., 2., 3.], [2., 0., 1.]];
        let pca = weighted_pca(&x, &Array1::ones(2), 10).unwrap();
        assert_eq!(pca.loadings.dim(), (3, 2));
        assert_eq!(pca.scores.dim(), (2, 2));
        assert!(pca.singular_values[1] >= 0.);
    }
}
