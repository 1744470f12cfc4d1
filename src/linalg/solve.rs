use linfa_linalg::{
    cholesky::Cholesky,
    qr::LeastSquaresQrInto,
    svd::{SvdSort, SVD},
    triangular::{SolveTriangularInplace, UPLO},
};
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::weighted::normalize_weights;
use crate::error::{Error, Result};
use crate::Float;

/// Least squares solver used by [`weighted_regress`]
///
/// All three agree on well-conditioned problems. QR and Cholesky work on the design reweighted by
/// the square root of the observation weights and fall back to the pseudo-inverse when the
/// problem turns out to be rank deficient or underdetermined.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsSolver {
    /// Householder QR of the reweighted design
    Qr,
    /// Cholesky factorization of the normal equations
    Cholesky,
    /// SVD pseudo-inverse of the reweighted design
    Pinv,
}

impl Default for LsSolver {
    fn default() -> Self {
        LsSolver::Qr
    }
}

/// Thin SVD with singular values sorted in descending order
#[allow(clippy::type_complexity)]
pub fn svd_desc<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<(Array2<F>, Array1<F>, Array2<F>)> {
    let (u, s, vt) = x.svd(true, true)?.sort_svd_desc();
    match (u, vt) {
        (Some(u), Some(vt)) => Ok((u, s, vt)),
        _ => Err(Error::Linalg("singular vectors were not computed".into())),
    }
}

fn argmax_abs<F: Float>(v: &ArrayBase<impl Data<Elem = F>, Ix1>) -> usize {
    v.iter()
        .enumerate()
        .fold((0, F::neg_infinity()), |(best, max), (i, x)| {
            if x.abs() > max {
                (i, x.abs())
            } else {
                (best, max)
            }
        })
        .0
}

/// Flip signs so that the largest absolute entry of every column of `u` is positive
///
/// The rows of `vt` are flipped alongside, which leaves `u s vt` unchanged.
pub fn svd_flip<F: Float>(
    u: ArrayBase<impl Data<Elem = F>, Ix2>,
    vt: ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array2<F>) {
    let signs = u.map_axis(Axis(0), |col| {
        let sign = col[argmax_abs(&col)].signum();
        if sign == F::zero() {
            F::one()
        } else {
            sign
        }
    });
    (&u * &signs, &vt * &signs.insert_axis(Axis(1)))
}

/// Moore-Penrose pseudo-inverse
///
/// Singular values below `cond` are treated as zero. The default cutoff is
/// `max(s) * max(n, p) * eps`.
pub fn pinv<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>, cond: Option<F>) -> Result<Array2<F>> {
    if x.is_empty() {
        return Ok(Array2::zeros((x.ncols(), x.nrows())));
    }
    let (u, s, vt) = svd_desc(x)?;
    let smax = s.iter().cloned().fold(F::zero(), F::max);
    let cond =
        cond.unwrap_or_else(|| smax * F::cast(x.nrows().max(x.ncols())) * F::epsilon());

    let rank = s.iter().filter(|v| **v > cond).count();
    let mut ucut = u.slice_move(s![.., ..rank]);
    ucut /= &s.slice(s![..rank]);

    Ok(vt.slice(s![..rank, ..]).t().dot(&ucut.t()))
}

/// Solve `A X = B` for a symmetric positive definite `A`
///
/// Fails with [`Error::Singular`] if the factorization breaks down or a pivot is negligible
/// relative to the diagonal of `A`.
pub fn cholesky_solve<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    Error::check_rows("right-hand side rows", a.nrows(), b.nrows())?;
    let l = a
        .cholesky()
        .map_err(|err| Error::Singular(format!("cholesky factorization failed: {}", err)))?;

    let max_diag = a.diag().iter().cloned().fold(F::zero(), F::max);
    let threshold = max_diag * F::epsilon().sqrt();
    if l.diag().iter().any(|v| *v * *v <= threshold) {
        return Err(Error::Singular(
            "normal matrix is numerically rank deficient".into(),
        ));
    }

    let mut x = b.to_owned();
    l.solve_triangular_inplace(&mut x, UPLO::Lower)?;
    l.t().solve_triangular_inplace(&mut x, UPLO::Upper)?;
    Ok(x)
}

fn qr_solve<F: Float>(xs: Array2<F>, ys: Array2<F>) -> Result<Array2<F>> {
    if xs.nrows() < xs.ncols() {
        return Err(Error::Singular(format!(
            "underdetermined system with {} rows and {} columns",
            xs.nrows(),
            xs.ncols()
        )));
    }
    let coef: Array2<F> = xs.least_squares_into(ys)?;
    if coef.iter().any(|v| !v.is_finite()) {
        return Err(Error::Singular("triangular factor is singular".into()));
    }
    Ok(coef)
}

fn solve_least_squares<F: Float>(xs: Array2<F>, ys: Array2<F>, solver: LsSolver) -> Result<Array2<F>> {
    let fast = match solver {
        LsSolver::Pinv => return Ok(pinv(&xs, None)?.dot(&ys)),
        LsSolver::Qr => qr_solve(xs.clone(), ys.clone()),
        LsSolver::Cholesky => cholesky_solve(&xs.t().dot(&xs), &xs.t().dot(&ys)),
    };

    match fast {
        Ok(coef) => Ok(coef),
        Err(Error::Singular(reason)) => {
            warn!(
                "{:?} least squares fell back to the pseudo-inverse: {}",
                solver, reason
            );
            Ok(pinv(&xs, None)?.dot(&ys))
        }
        Err(err) => Err(err),
    }
}

/// Weighted multiple linear regression
///
/// Minimizes `sum_i w_i ||y_i - x_i B - b||^2` and returns the coefficients `B` (p × q) and the
/// intercept `b` (q). Without intercept `b` is zero. The weights are normalized internally.
pub fn weighted_regress<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
    with_intercept: bool,
    solver: LsSolver,
) -> Result<(Array2<F>, Array1<F>)> {
    Error::check_rows("response rows", x.nrows(), y.nrows())?;
    Error::check_rows("weights length", x.nrows(), weights.len())?;
    let w = normalize_weights(weights.view())?;

    let (xc, yc, xmeans, ymeans) = if with_intercept {
        let xmeans = x.t().dot(&w);
        let ymeans = y.t().dot(&w);
        (x - &xmeans, y - &ymeans, xmeans, ymeans)
    } else {
        (
            x.to_owned(),
            y.to_owned(),
            Array1::zeros(x.ncols()),
            Array1::zeros(y.ncols()),
        )
    };

    if x.ncols() == 0 {
        debug!("regression without predictors, returning the weighted mean");
        return Ok((Array2::zeros((0, y.ncols())), ymeans));
    }

    let sqrt_w = w.mapv(F::sqrt).insert_axis(Axis(1));
    let coef = solve_least_squares(&xc * &sqrt_w, &yc * &sqrt_w, solver)?;
    let intercept = &ymeans - &xmeans.dot(&coef);

    Ok((coef, intercept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn pinv_inverts_a_regular_matrix() {
        let a = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 10.]];
        let a_pinv = pinv(&a, None).unwrap();
        assert_abs_diff_eq!(a.dot(&a_pinv), Array2::eye(3), epsilon = 1e-6)
    }

    #[test]
    fn pinv_of_a_rank_one_matrix() {
        let a = array![[1., 2.], [2., 4.]];
        let a_pinv = pinv(&a, None).unwrap();
        assert_abs_diff_eq!(a.dot(&a_pinv).dot(&a), a, epsilon = 1e-10);
    }

    #[test]
    fn solvers_agree_on_well_conditioned_input() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x: Array2<f64> = Array::random_using((30, 4), Uniform::new(-1., 1.), &mut rng);
        let beta = array![[1.5, -1.], [0.5, 2.], [-2., 0.], [0.25, 1.]];
        let y = x.dot(&beta) + 3.;
        let w: Array1<f64> = Array::random_using(30, Uniform::new(0.1, 1.), &mut rng);

        for solver in [LsSolver::Qr, LsSolver::Cholesky, LsSolver::Pinv] {
            let (coef, intercept) = weighted_regress(&x, &y, &w, true, solver).unwrap();
            assert_abs_diff_eq!(coef, beta, epsilon = 1e-8);
            assert_abs_diff_eq!(intercept, array![3., 3.], epsilon = 1e-8);
        }
    }

    #[test]
    fn cholesky_rejects_rank_deficient_normal_matrix() {
        let x = array![[1., 2.], [2., 4.], [3., 6.]];
        let a = x.t().dot(&x);
        let b = x.t().dot(&array![[1.], [2.], [3.]]);
        assert!(matches!(cholesky_solve(&a, &b), Err(Error::Singular(_))));
    }

    #[test]
    fn collinear_design_falls_back_to_pinv() {
        let x = array![[1., 2.], [2., 4.], [3., 6.], [4., 8.]];
        let y = array![[1.], [2.], [3.], [4.]];
        let w = Array1::ones(4);

        let (reference, _) = weighted_regress(&x, &y, &w, false, LsSolver::Pinv).unwrap();
        let (coef, _) = weighted_regress(&x, &y, &w, false, LsSolver::Cholesky).unwrap();
        assert_abs_diff_eq!(coef, reference, epsilon = 1e-8);
        assert_abs_diff_eq!(x.dot(&coef), y, epsilon = 1e-8);
    }

    #[test]
    fn underdetermined_qr_falls_back_to_pinv() {
        let x = array![[1., 0., 1.], [0., 1., 1.]];
        let y = array![[1.], [2.]];
        let (coef, _) = weighted_regress(&x, &y, &Array1::ones(2), false, LsSolver::Qr).unwrap();
        assert_abs_diff_eq!(x.dot(&coef), y, epsilon = 1e-10);
    }

    #[test]
    fn zero_weights_drop_observations() {
        let x = array![[0.], [1.], [2.], [3.]];
        let y = array![[1.], [3.], [5.], [100.]];
        let (coef, intercept) =
            weighted_regress(&x, &y, &array![1., 1., 1., 0.], true, LsSolver::Qr).unwrap();
        assert_abs_diff_eq!(coef, array![[2.]], epsilon = 1e-10);
        assert_abs_diff_eq!(intercept, array![1.], epsilon = 1e-10);
    }

    #[test]
    fn mismatched_rows_fail() {
        let res = weighted_regress(
            &Array2::<f64>::zeros((3, 2)),
            &Array2::zeros((4, 1)),
            &Array1::ones(3),
            true,
            LsSolver::Qr,
        );
        assert!(matches!(res, Err(Error::Dimension { .. })));
    }
}
