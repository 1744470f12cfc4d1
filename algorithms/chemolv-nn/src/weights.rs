//! Distance-based weights of the neighbors
//!
//! A kernel maps the distances from a query to its neighbors into weights in `[tol, 1]`. The raw
//! kernel values are divided by their maximum, so the closest neighbor always gets weight one,
//! and then floored at `tol`: a neighbor is never discarded completely, which keeps the weighted
//! local fits away from singular designs.
use chemolv::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::{NnError, Result};

/// Scale of the median absolute deviation that makes it consistent with the standard deviation
/// of a normal distribution
const MAD_NORMAL: f64 = 1.4826;

/// Kernel turning distances into weights
///
/// With bandwidth `h` and distance `d`:
///
/// | Kernel | Weight |
/// | --- | --- |
/// | `Bisquare` | `(1 - (d / (h dmax))^2)^2`, zero beyond `h dmax` |
/// | `Gaussian` | `exp(-d^2 / h)` |
/// | `Inverse` | `1 / (1 + d / h)` |
/// | `Exponential { cri }` | `exp(-d / (h median(d)))`, zero beyond `median(d) + cri mad(d)` |
///
/// `dmax` is the largest distance of the neighborhood and `mad` the median absolute deviation
/// scaled by `1.4826`. An infinite bandwidth gives uniform weights whatever the kernel.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightKernel<F> {
    Bisquare,
    Gaussian,
    Inverse,
    /// Exponential decay with a robust cutoff of the outlying neighbors
    Exponential { cri: F },
}

impl<F: Float> Default for WeightKernel<F> {
    fn default() -> Self {
        WeightKernel::Bisquare
    }
}

fn median<F: Float>(values: &[F]) -> F {
    let mut values = values.to_vec();
    let n = values.len();
    let cmp = |a: &F, b: &F| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal);
    let upper = *order_stat::kth_by(&mut values, n / 2, cmp);
    if n % 2 == 1 {
        upper
    } else {
        let lower = *order_stat::kth_by(&mut values, n / 2 - 1, cmp);
        (lower + upper) / F::cast(2)
    }
}

fn check_inputs<F: Float>(d: &ArrayBase<impl Data<Elem = F>, Ix1>, h: F, tol: F) -> Result<()> {
    if h.is_nan() || h <= F::zero() {
        return Err(NnError::InvalidBandwidth(h.to_f32().unwrap_or(f32::NAN)));
    }
    if !(tol >= F::zero() && tol <= F::one()) {
        return Err(NnError::InvalidTolerance(tol.to_f32().unwrap_or(f32::NAN)));
    }
    if d.iter().any(|v| !v.is_finite()) {
        return Err(NnError::NonFinite);
    }
    if d.iter().any(|v| *v < F::zero()) {
        return Err(NnError::NegativeDistance);
    }
    Ok(())
}

impl<F: Float> WeightKernel<F> {
    /// Raw kernel values, before scaling and flooring
    fn raw(&self, d: &ArrayBase<impl Data<Elem = F>, Ix1>, h: F) -> Result<Array1<F>> {
        let w = match *self {
            WeightKernel::Bisquare => {
                let dmax = d.iter().cloned().fold(F::zero(), F::max);
                if dmax == F::zero() {
                    return Ok(Array1::ones(d.len()));
                }
                d.mapv(|v| {
                    let u = v / (h * dmax);
                    if u < F::one() {
                        (F::one() - u * u).powi(2)
                    } else {
                        F::zero()
                    }
                })
            }
            WeightKernel::Gaussian => d.mapv(|v| (-(v * v) / h).exp()),
            WeightKernel::Inverse => d.mapv(|v| F::one() / (F::one() + v / h)),
            WeightKernel::Exponential { cri } => {
                if cri.is_nan() || cri <= F::zero() {
                    return Err(NnError::InvalidCutoff(cri.to_f32().unwrap_or(f32::NAN)));
                }
                let values = d.to_vec();
                let med = median(&values);
                let deviations: Vec<F> = values.iter().map(|v| (*v - med).abs()).collect();
                let cutoff = med + cri * F::cast(MAD_NORMAL) * median(&deviations);

                // more than half of the neighbors coincide with the query
                let scale = if med > F::zero() {
                    h * med
                } else {
                    h * d.iter().cloned().fold(F::zero(), F::max)
                };
                if scale == F::zero() {
                    return Ok(Array1::ones(d.len()));
                }
                d.mapv(|v| {
                    if v > cutoff {
                        F::zero()
                    } else {
                        (-v / scale).exp()
                    }
                })
            }
        };
        Ok(w)
    }

    /// Weights of the neighbors at distances `d`, see [`weights_from_distances`]
    pub fn weights(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix1>,
        h: F,
        tol: F,
    ) -> Result<Array1<F>> {
        weights_from_distances(d, h, *self, tol)
    }
}

/// Turn neighbor distances into weights
///
/// The kernel values are divided by their maximum and floored at `tol`, every returned weight
/// lies in `[tol, 1]`. `h = f64::INFINITY` gives uniform weights.
///
/// Fails for a bandwidth that is not positive, a floor outside `[0, 1]` and for negative or
/// non-finite distances.
///
/// ```rust
/// use chemolv_nn::{weights_from_distances, WeightKernel};
/// use ndarray::array;
///
/// let d = array![0., 1., 2.];
/// let w = weights_from_distances(&d, 1., WeightKernel::Bisquare, 1e-4)?;
/// assert_eq!(w, array![1., 0.5625, 1e-4]);
/// # Ok::<(), chemolv_nn::NnError>(())
/// ```
pub fn weights_from_distances<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix1>,
    h: F,
    kernel: WeightKernel<F>,
    tol: F,
) -> Result<Array1<F>> {
    check_inputs(d, h, tol)?;
    if d.is_empty() || h.is_infinite() {
        return Ok(Array1::ones(d.len()));
    }

    let mut w = kernel.raw(d, h)?;
    let wmax = w.iter().cloned().fold(F::zero(), F::max);
    if wmax > F::zero() {
        w /= wmax;
    }
    w.mapv_inplace(|v| v.max(tol));
    Ok(w)
}
