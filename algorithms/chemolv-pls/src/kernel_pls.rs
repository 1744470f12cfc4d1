//! Kernel PLS
//!
//! Nonlinear PLS in the feature space of a kernel, following the NIPALS formulation of Rosipal
//! & Trejo (2001) on the weighted, centered Gram matrix `D^1/2 Kc D^1/2`.
use chemolv::linalg::{svd_desc, weighted_center};
use chemolv::traits::{Fit, PredictInplace, PredictLv};
use chemolv::{Dataset, Float};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::errors::{PlsError, Result};
use crate::hyperparams::{Kernel, KernelPlsParams, KernelPlsValidParams};
use crate::utils::{outer, svd_flip_1d};

impl<F: Float> Kernel<F> {
    /// Kernel matrix between the rows of `a` and the rows of `b`
    pub fn gram(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let inner = a.dot(&b.t());
        match *self {
            Kernel::Linear => inner,
            Kernel::Gaussian { gamma } => {
                let na = a.rows().into_iter().map(|r| r.dot(&r)).collect::<Array1<F>>();
                let nb = b.rows().into_iter().map(|r| r.dot(&r)).collect::<Array1<F>>();
                let mut k = inner;
                for ((i, j), v) in k.indexed_iter_mut() {
                    let sq = (na[i] + nb[j] - F::cast(2.) * *v).max(F::zero());
                    *v = (-gamma * sq).exp();
                }
                k
            }
            Kernel::Polynomial {
                degree,
                gamma,
                coef0,
            } => inner.mapv(|v| (gamma * v + coef0).powi(degree as i32)),
        }
    }
}

/// A fitted kernel PLS regression
///
/// Scores of new observations are computed through the kernel expansion on the training
/// observations, `Kc(new) R` with dual rotations `R = D^1/2 U (T' K U)^-1`. Since `T' K U` is upper
/// triangular the first `k` dual rotations are those of the model truncated to `k` components.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct KernelPls<F: Float> {
    kernel: Kernel<F>,
    xtrain: Array2<F>,
    weights: Array1<F>,
    kd: Array1<F>,
    dkd: F,
    ymeans: Array1<F>,
    scores: Array2<F>,
    rotations: Array2<F>,
    y_loadings: Array2<F>,
    max_lv: usize,
}

impl<F: Float> KernelPls<F> {
    pub fn params(nlv: usize) -> KernelPlsParams<F> {
        KernelPlsParams::new(nlv)
    }

    pub fn nlv(&self) -> usize {
        self.rotations.ncols()
    }

    pub fn kernel(&self) -> Kernel<F> {
        self.kernel
    }

    /// Training scores, orthonormal in the weighted feature space
    pub fn scores(&self) -> &Array2<F> {
        &self.scores
    }

    pub fn y_loadings(&self) -> &Array2<F> {
        &self.y_loadings
    }

    /// Weighted-centered kernel between new observations and the training set
    fn centered_kernel(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let k = self.kernel.gram(x, &self.xtrain);
        let row_means = k.dot(&self.weights).insert_axis(Axis(1));
        (k - &row_means) - &self.kd + self.dkd
    }

    /// Scores of new observations on the first `nlv` components
    pub fn transform_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> chemolv::Result<Array2<F>> {
        chemolv::Error::check_rows("number of features", self.xtrain.ncols(), x.ncols())?;
        let k = nlv.min(self.nlv());
        Ok(self
            .centered_kernel(x)
            .dot(&self.rotations.slice(s![.., ..k])))
    }
}

impl<F: Float> Fit<F, Array2<F>, PlsError> for KernelPlsValidParams<F> {
    type Object = KernelPls<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        let (n, p) = dataset.records().dim();
        if n == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        let d = dataset.sample_weights()?;
        let x = dataset.records();

        let mut a = self.nlv().min(n - 1);
        if let Kernel::Linear = self.kernel() {
            a = a.min(p);
        }
        if a < self.nlv() {
            debug!(
                "number of latent variables capped from {} to {} (n = {})",
                self.nlv(),
                a,
                n
            );
        }

        let k = self.kernel().gram(x, x);
        let kd = k.dot(&d);
        let dkd = d.dot(&kd);
        let kc = (&k - &kd.view().insert_axis(Axis(1))) - &kd + dkd;

        let sqrt_d = d.mapv(F::sqrt);
        let sd_col = sqrt_d.view().insert_axis(Axis(1));
        let k0 = &kc * &sd_col * &sqrt_d;
        let (yc, ymeans) = weighted_center(dataset.targets(), &d)?;
        let mut yk = &yc * &sd_col;
        let q = yk.ncols();

        let trace0 = k0.diag().sum();
        let mut kk = k0.clone();
        let mut scores = Array2::zeros((n, a));
        let mut u_scores = Array2::zeros((n, a));
        let mut y_loadings = Array2::zeros((q, a));

        let mut extracted = a;
        let mut first_norm = None;
        for comp in 0..a {
            let ky = kk.dot(&yk);
            let ky_norm = ky.iter().map(|v| *v * *v).sum::<F>().sqrt();
            let norm0 = *first_norm.get_or_insert(ky_norm);

            let (mut t, u) = if ky_norm <= norm0 * F::epsilon().sqrt() {
                debug!(
                    "response residual exhausted at latent variable {}, following the kernel residual",
                    comp
                );
                let (vecs, sigma, _) = svd_desc(&kk)?;
                if !(sigma[0] > trace0 * F::epsilon()) {
                    if comp == 0 {
                        return Err(PlsError::DegenerateComponent(comp));
                    }
                    debug!("kernel residual exhausted after {} of {} latent variables", comp, a);
                    extracted = comp;
                    break;
                }
                let t = vecs.column(0).to_owned();
                (t.clone(), t)
            } else if q == 1 {
                let y = yk.column(0);
                let u = y.mapv(|v| v / y.dot(&y).sqrt());
                (kk.dot(&u), u)
            } else {
                self.power_method(&kk, &yk, comp)?
            };

            let norm = t.dot(&t).sqrt();
            if !(norm > trace0 * F::epsilon()) {
                if comp == 0 {
                    return Err(PlsError::DegenerateComponent(comp));
                }
                debug!("kernel residual exhausted after {} of {} latent variables", comp, a);
                extracted = comp;
                break;
            }
            t /= norm;
            svd_flip_1d(&mut t);

            let c = yk.t().dot(&t);
            let kt = kk.dot(&t);
            let tkt = t.dot(&kt);
            kk = kk - outer(&t, &kt) - outer(&kt, &t) + outer(&t, &t) * tkt;
            yk -= &outer(&t, &c);

            scores.column_mut(comp).assign(&t);
            u_scores.column_mut(comp).assign(&u);
            y_loadings.column_mut(comp).assign(&c);
        }

        let scores = scores.slice_move(s![.., ..extracted]);
        let u_scores = u_scores.slice_move(s![.., ..extracted]);
        let y_loadings = y_loadings.slice_move(s![.., ..extracted]);
        let g = scores.t().dot(&k0.dot(&u_scores));
        let ginv = upper_triangular_inverse(&g)?;
        let rotations = (&u_scores * &sd_col).dot(&ginv);

        Ok(KernelPls {
            kernel: self.kernel(),
            xtrain: x.to_owned(),
            weights: d,
            kd,
            dkd,
            ymeans,
            scores,
            rotations,
            y_loadings,
            max_lv: a,
        })
    }
}

impl<F: Float> KernelPlsValidParams<F> {
    /// Dominant score pair by alternating `t = K u`, `u = Y Y' t`
    fn power_method(
        &self,
        k: &Array2<F>,
        y: &Array2<F>,
        comp: usize,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let eps = F::epsilon();
        let mut u = y
            .columns()
            .into_iter()
            .find(|col| col.iter().any(|v| v.abs() > eps))
            .map(|col| col.to_owned())
            .ok_or(PlsError::DegenerateComponent(comp))?;

        let mut t_old = Array1::from_elem(k.nrows(), F::cast(100.));
        for _ in 0..self.max_iter() {
            let mut t = k.dot(&u);
            let norm = t.dot(&t).sqrt();
            if norm <= F::zero() {
                return Err(PlsError::DegenerateComponent(comp));
            }
            t /= norm;
            let c = y.t().dot(&t);
            u = y.dot(&c);
            let unorm = u.dot(&u).sqrt();
            if unorm <= F::zero() {
                return Err(PlsError::DegenerateComponent(comp));
            }
            u /= unorm;

            let diff = &t - &t_old;
            if diff.dot(&diff) < self.tolerance() {
                return Ok((t, u));
            }
            t_old = t;
        }
        Err(PlsError::PowerMethodNotConverged(self.max_iter()))
    }
}

/// Inverse of an upper triangular matrix by back substitution, the lower triangle is ignored
fn upper_triangular_inverse<F: Float>(g: &Array2<F>) -> Result<Array2<F>> {
    let a = g.nrows();
    let scale = g.diag().iter().fold(F::zero(), |acc, v| acc.max(v.abs()));
    let mut inv = Array2::zeros((a, a));
    for j in 0..a {
        for i in (0..=j).rev() {
            if g[[i, i]].abs() <= scale * F::epsilon() {
                return Err(PlsError::DegenerateComponent(i));
            }
            let mut acc = if i == j { F::one() } else { F::zero() };
            for l in i + 1..=j {
                acc -= g[[i, l]] * inv[[l, j]];
            }
            inv[[i, j]] = acc / g[[i, i]];
        }
    }
    Ok(inv)
}

impl<F: Float, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array2<F>> for KernelPls<F> {
    fn max_lv(&self) -> usize {
        self.max_lv
    }

    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array2<F>> {
        let scores = self.transform_lv(x, nlv)?;
        let k = scores.ncols();
        Ok(scores.dot(&self.y_loadings.slice(s![.., ..k]).t()) + &self.ymeans)
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for KernelPls<F> {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            y.shape(),
            &[x.nrows(), self.ymeans.len()],
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.xtrain.ncols(),
            "The number of features must match the fitted model."
        );
        let scores = self.centered_kernel(x).dot(&self.rotations);
        *y = scores.dot(&self.y_loadings.t()) + &self.ymeans;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.ymeans.len()))
    }
}
