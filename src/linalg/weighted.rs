use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};

use crate::error::{Error, Result};
use crate::Float;

/// Normalize non-negative weights to sum to one
///
/// Fails if a weight is negative or not finite, or if all weights are zero.
pub fn normalize_weights<F: Float>(weights: ArrayView1<F>) -> Result<Array1<F>> {
    if weights.is_empty() {
        return Err(Error::NotEnoughSamples);
    }
    if weights.iter().any(|w| !w.is_finite() || *w < F::zero()) {
        return Err(Error::Parameters(
            "weights must be finite and non-negative".into(),
        ));
    }
    let total = weights.sum();
    if total <= F::zero() {
        return Err(Error::Parameters("weights sum to zero".into()));
    }
    Ok(weights.mapv(|w| w / total))
}

fn checked_weights<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Array1<F>> {
    Error::check_rows("weights length", x.nrows(), weights.len())?;
    normalize_weights(weights.view())
}

/// Weighted column means
pub fn weighted_mean<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Array1<F>> {
    let w = checked_weights(x, weights)?;
    Ok(x.t().dot(&w))
}

/// Subtract the weighted column means, returns the centered matrix and the means
pub fn weighted_center<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<(Array2<F>, Array1<F>)> {
    let means = weighted_mean(x, weights)?;
    Ok((x - &means, means))
}

/// Weighted (biased) column standard deviations
pub fn weighted_std<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Array1<F>> {
    let w = checked_weights(x, weights)?;
    let means = x.t().dot(&w);
    let sq = (x - &means).mapv(|v| v * v);
    Ok(sq.t().dot(&w).mapv(F::sqrt))
}

/// Center and scale columns by their weighted standard deviation
///
/// Constant columns keep a scale of one. Returns the transformed matrix, the means and the
/// scales.
pub fn weighted_scale<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<(Array2<F>, Array1<F>, Array1<F>)> {
    let (xc, means) = weighted_center(x, weights)?;
    let mut scales = weighted_std(x, weights)?;
    scales.mapv_inplace(|v| if v > F::epsilon() { v } else { F::one() });
    Ok((xc / &scales, means, scales))
}

/// Weighted covariance `Xc' D Xc` with normalized weights on the diagonal of `D`
pub fn weighted_covariance<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Array2<F>> {
    let w = checked_weights(x, weights)?;
    let means = x.t().dot(&w);
    let xc = x - &means;
    let xd = &xc * &w.insert_axis(Axis(1));
    Ok(xc.t().dot(&xd))
}
