use chemolv::linalg::{svd_desc, weighted_center, weighted_scale};
use chemolv::traits::{Fit, PredictInplace, PredictLv, Transformer};
use chemolv::{Dataset, Float, LvRange};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::errors::{PlsError, Result};
use crate::hyperparams::{Algorithm, PlsParams, PlsValidParams};
use crate::utils::{outer, svd_flip_1d};

/// A fitted weighted PLS regression
///
/// The decomposition is computed once at the requested number of latent variables `a`. Every
/// prediction can be truncated to the first `k <= a` components without refitting, the
/// coefficients of the truncated model are `R[:, :k] C[:, :k]'` where `R = W (P'W)^-1` are the
/// rotations.
///
/// Extraction stops early when the predictor residual is exhausted (rank-deficient `X`), the
/// model then holds fewer components than requested and larger counts behave as the full model.
///
/// ## Examples
///
/// ```rust
/// use chemolv::traits::{Fit, PredictLv};
/// use chemolv_pls::Pls;
///
/// let dataset = chemolv_datasets::latent_dataset(50, 20, 2, 0.0, 42);
/// let model = Pls::params(3).fit(&dataset).unwrap();
/// let pred = model.predict_lv(dataset.records(), 2).unwrap();
/// assert_eq!(pred.dim(), (50, 1));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Pls<F: Float> {
    xmeans: Array1<F>,
    xscales: Array1<F>,
    ymeans: Array1<F>,
    x_weights: Array2<F>,
    x_loadings: Array2<F>,
    x_rotations: Array2<F>,
    y_loadings: Array2<F>,
    scores: Array2<F>,
    score_norms: Array1<F>,
    total_ss: F,
    n_iters: Array1<usize>,
    max_lv: usize,
}

impl<F: Float> Pls<F> {
    pub fn params(nlv: usize) -> PlsParams<F> {
        PlsParams::new(nlv)
    }

    /// Number of latent variables of the fitted decomposition
    pub fn nlv(&self) -> usize {
        self.x_weights.ncols()
    }

    /// Largest count accepted by the predictions, `min(nlv, n - 1, p)` of the fit
    ///
    /// Above [`nlv`](Pls::nlv) when the predictors were exhausted before.
    pub fn max_nlv(&self) -> usize {
        self.max_lv
    }

    pub fn nfeatures(&self) -> usize {
        self.xmeans.len()
    }

    pub fn ntargets(&self) -> usize {
        self.ymeans.len()
    }

    /// Training scores `T` (n x a)
    pub fn scores(&self) -> &Array2<F> {
        &self.scores
    }

    pub fn x_weights(&self) -> &Array2<F> {
        &self.x_weights
    }

    pub fn x_loadings(&self) -> &Array2<F> {
        &self.x_loadings
    }

    pub fn x_rotations(&self) -> &Array2<F> {
        &self.x_rotations
    }

    pub fn y_loadings(&self) -> &Array2<F> {
        &self.y_loadings
    }

    pub fn xmeans(&self) -> &Array1<F> {
        &self.xmeans
    }

    /// Column scales, all ones unless the model was fitted with `scale(true)`
    pub fn xscales(&self) -> &Array1<F> {
        &self.xscales
    }

    pub fn ymeans(&self) -> &Array1<F> {
        &self.ymeans
    }

    /// Weighted squared norms `t' D t` of the training scores
    pub fn score_norms(&self) -> &Array1<F> {
        &self.score_norms
    }

    /// Iterations of the power method per component, zero where no iteration was needed
    pub fn n_iters(&self) -> &Array1<usize> {
        &self.n_iters
    }

    /// Share of the weighted predictor variance captured by every component
    pub fn x_explained_variance(&self) -> Array1<F> {
        if self.total_ss <= F::zero() {
            return Array1::zeros(self.nlv());
        }
        Array1::from_shape_fn(self.nlv(), |k| {
            let p = self.x_loadings.column(k);
            self.score_norms[k] * p.dot(&p) / self.total_ss
        })
    }

    /// Coefficients and intercept of the model truncated to `nlv` components
    ///
    /// Counts above the fitted number of components are capped.
    pub fn coefficients(&self, nlv: usize) -> (Array2<F>, Array1<F>) {
        let k = nlv.min(self.nlv());
        let b = self
            .x_rotations
            .slice(s![.., ..k])
            .dot(&self.y_loadings.slice(s![.., ..k]).t())
            / &self.xscales.view().insert_axis(Axis(1));
        let intercept = &self.ymeans - &self.xmeans.dot(&b);
        (b, intercept)
    }

    fn normalize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.xmeans) / &self.xscales
    }

    /// Scores of new observations on the first `nlv` components
    pub fn transform_lv(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        nlv: usize,
    ) -> chemolv::Result<Array2<F>> {
        chemolv::Error::check_rows("number of features", self.nfeatures(), x.ncols())?;
        let k = nlv.min(self.nlv());
        Ok(self.normalize(x).dot(&self.x_rotations.slice(s![.., ..k])))
    }

    /// Predictions for every count of the range, computed from a single projection
    pub fn predict_range(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        range: LvRange,
    ) -> chemolv::Result<Vec<Array2<F>>> {
        range.check_max(self.max_lv)?;
        let scores = self.transform_lv(x, range.high())?;
        let mut yhat = Array2::from_shape_fn((x.nrows(), self.ntargets()), |(_, j)| self.ymeans[j]);
        let mut predictions = Vec::with_capacity(range.len());
        for k in 0..=range.high() {
            if k >= range.low() {
                predictions.push(yhat.clone());
            }
            if k < scores.ncols() {
                yhat += &outer(&scores.column(k), &self.y_loadings.column(k));
            }
        }
        Ok(predictions)
    }
}

impl<F: Float> PlsValidParams<F> {
    /// Fit on centered data with normalized weights `d`
    pub(crate) fn fit_weighted(
        &self,
        x: ArrayView2<F>,
        y: ArrayView2<F>,
        d: &Array1<F>,
    ) -> Result<Pls<F>> {
        let (n, p) = x.dim();
        let q = y.ncols();
        if n == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        chemolv::Error::check_rows("targets rows", n, y.nrows())?;

        let (mut xk, xmeans, xscales) = if self.scale() {
            weighted_scale(&x, d)?
        } else {
            let (xc, means) = weighted_center(&x, d)?;
            (xc, means, Array1::ones(p))
        };
        let (mut yk, ymeans) = weighted_center(&y, d)?;

        let a = self.nlv().min(n - 1).min(p);
        if a < self.nlv() {
            debug!(
                "number of latent variables capped from {} to {} (n = {}, p = {})",
                self.nlv(),
                a,
                n,
                p
            );
        }

        let dcol = d.view().insert_axis(Axis(1));
        let total_ss = (&xk * &xk * &dcol).sum();

        let mut x_weights = Array2::zeros((p, a));
        let mut x_loadings = Array2::zeros((p, a));
        let mut y_loadings = Array2::zeros((q, a));
        let mut scores = Array2::zeros((n, a));
        let mut score_norms = Array1::zeros(a);
        let mut n_iters = Array1::zeros(a);

        let mut extracted = a;
        let mut first_norm = None;
        for k in 0..a {
            let cross = (&xk * &dcol).t().dot(&yk);
            let cross_norm = cross.iter().map(|v| *v * *v).sum::<F>().sqrt();
            let norm0 = *first_norm.get_or_insert(cross_norm);

            let (mut w, n_iter) = if cross_norm <= norm0 * F::epsilon().sqrt() {
                debug!(
                    "response residual exhausted at latent variable {}, following the predictor residual",
                    k
                );
                (dominant_direction(&xk, d)?, 0)
            } else if q == 1 {
                (cross.column(0).mapv(|v| v / cross_norm), 0)
            } else {
                match self.algorithm() {
                    Algorithm::Svd => {
                        let (u, _, _) = svd_desc(&cross)?;
                        (u.column(0).to_owned(), 0)
                    }
                    Algorithm::Nipals => self.power_method(&xk, &yk, d, k)?,
                }
            };
            svd_flip_1d(&mut w);

            let t = xk.dot(&w);
            let dt = &t * d;
            let tt = t.dot(&dt);
            if !(tt > total_ss * F::epsilon()) {
                if k == 0 {
                    return Err(PlsError::DegenerateComponent(k));
                }
                debug!(
                    "predictor residual exhausted after {} of {} latent variables",
                    k, a
                );
                extracted = k;
                break;
            }
            let pk = xk.t().dot(&dt) / tt;
            let ck = yk.t().dot(&dt) / tt;
            xk -= &outer(&t, &pk);
            yk -= &outer(&t, &ck);

            x_weights.column_mut(k).assign(&w);
            x_loadings.column_mut(k).assign(&pk);
            y_loadings.column_mut(k).assign(&ck);
            scores.column_mut(k).assign(&t);
            score_norms[k] = tt;
            n_iters[k] = n_iter;
        }

        let x_weights = x_weights.slice_move(s![.., ..extracted]);
        let x_loadings = x_loadings.slice_move(s![.., ..extracted]);
        let y_loadings = y_loadings.slice_move(s![.., ..extracted]);
        let scores = scores.slice_move(s![.., ..extracted]);
        let score_norms = score_norms.slice_move(s![..extracted]);
        let n_iters = n_iters.slice_move(s![..extracted]);
        let x_rotations = rotations(&x_weights, &x_loadings);

        Ok(Pls {
            xmeans,
            xscales,
            ymeans,
            x_weights,
            x_loadings,
            x_rotations,
            y_loadings,
            scores,
            score_norms,
            total_ss,
            n_iters,
            max_lv: a,
        })
    }

    /// Dominant left singular vector of `X' D Y` by alternating regressions
    fn power_method(
        &self,
        x: &Array2<F>,
        y: &Array2<F>,
        d: &Array1<F>,
        k: usize,
    ) -> Result<(Array1<F>, usize)> {
        let eps = F::epsilon();
        let dcol = d.view().insert_axis(Axis(1));
        let xd = x * &dcol;
        let yd = y * &dcol;

        let mut y_score = y
            .columns()
            .into_iter()
            .find(|col| col.iter().any(|v| v.abs() > eps))
            .map(|col| col.to_owned())
            .ok_or(PlsError::DegenerateComponent(k))?;

        // init to big value for first convergence check
        let mut w_old = Array1::from_elem(x.ncols(), F::cast(100.));
        for n_iter in 1..=self.max_iter() {
            let mut w = xd.t().dot(&y_score);
            let norm = w.dot(&w).sqrt();
            if norm <= F::zero() {
                return Err(PlsError::DegenerateComponent(k));
            }
            w /= norm;
            let t = x.dot(&w);
            let c = yd.t().dot(&t);
            let cc = c.dot(&c);
            if cc <= F::zero() {
                return Err(PlsError::DegenerateComponent(k));
            }
            y_score = y.dot(&c) / cc;

            let diff = &w - &w_old;
            if diff.dot(&diff) < self.tolerance() {
                return Ok((w, n_iter));
            }
            w_old = w;
        }
        Err(PlsError::PowerMethodNotConverged(self.max_iter()))
    }
}

/// Leading right singular vector of `D^1/2 X`
fn dominant_direction<F: Float>(x: &Array2<F>, d: &Array1<F>) -> Result<Array1<F>> {
    let sqrt_d = d.mapv(F::sqrt).insert_axis(Axis(1));
    let (_, _, vt) = svd_desc(&(x * &sqrt_d))?;
    Ok(vt.row(0).to_owned())
}

/// `R = W (P'W)^-1` by the recurrence `r_k = w_k - sum_{j<k} r_j (p_j' w_k)`
pub(crate) fn rotations<F: Float>(weights: &Array2<F>, loadings: &Array2<F>) -> Array2<F> {
    let mut rot = Array2::zeros(weights.raw_dim());
    for k in 0..weights.ncols() {
        let wk = weights.column(k);
        let mut r = wk.to_owned();
        for j in 0..k {
            let pw = loadings.column(j).dot(&wk);
            r.scaled_add(-pw, &rot.column(j));
        }
        rot.column_mut(k).assign(&r);
    }
    rot
}

impl<F: Float> Fit<F, Array2<F>, PlsError> for PlsValidParams<F> {
    type Object = Pls<F>;

    fn fit(&self, dataset: &Dataset<F>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(PlsError::NotEnoughSamples(0));
        }
        let d = dataset.sample_weights()?;
        self.fit_weighted(dataset.records().view(), dataset.targets().view(), &d)
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Array2<F>> for Pls<F> {
    /// Scores on all fitted components
    fn transform(&self, x: &'a ArrayBase<D, Ix2>) -> Array2<F> {
        assert_eq!(
            x.ncols(),
            self.nfeatures(),
            "The number of features must match the fitted model."
        );
        self.normalize(x).dot(&self.x_rotations)
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for Pls<F> {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            y.shape(),
            &[x.nrows(), self.ntargets()],
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.nfeatures(),
            "The number of features must match the fitted model."
        );
        let scores = self.normalize(x).dot(&self.x_rotations);
        *y = scores.dot(&self.y_loadings.t()) + &self.ymeans;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.ntargets()))
    }
}

impl<F: Float, D: Data<Elem = F>> PredictLv<ArrayBase<D, Ix2>, Array2<F>> for Pls<F> {
    fn max_lv(&self) -> usize {
        self.max_lv
    }

    fn predict_lv(&self, x: &ArrayBase<D, Ix2>, nlv: usize) -> chemolv::Result<Array2<F>> {
        let scores = self.transform_lv(x, nlv)?;
        let k = scores.ncols();
        Ok(scores.dot(&self.y_loadings.slice(s![.., ..k]).t()) + &self.ymeans)
    }
}
