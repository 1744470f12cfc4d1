use chemolv::{Float, LvRange, ParamGuard};
use chemolv_nn::{Metric, NnError, WeightKernel};
use chemolv_pls::{AvgPolicy, Prior};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{LocalError, Result};

/// How the neighborhood of a query is found and weighted
///
/// Distances are computed on the raw predictors (`nlvdis = 0`) or on the scores of a global
/// PLS with `nlvdis` latent variables fitted on the whole training set.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborhoodParams<F> {
    pub(crate) k: usize,
    pub(crate) nlvdis: usize,
    pub(crate) metric: Metric,
    pub(crate) kernel: WeightKernel<F>,
    pub(crate) h: F,
    pub(crate) tol: F,
}

impl<F: Float> NeighborhoodParams<F> {
    pub(crate) fn new(k: usize) -> Self {
        NeighborhoodParams {
            k,
            nlvdis: 0,
            metric: Metric::Euclidean,
            kernel: WeightKernel::Exponential { cri: F::cast(4) },
            h: F::cast(2),
            tol: F::cast(1e-4),
        }
    }

    /// Number of neighbors of a query
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn nlvdis(&self) -> usize {
        self.nlvdis
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn kernel(&self) -> WeightKernel<F> {
        self.kernel
    }

    /// Bandwidth of the weight kernel
    pub fn bandwidth(&self) -> F {
        self.h
    }

    /// Floor of the neighbor weights
    pub fn tol(&self) -> F {
        self.tol
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.k == 0 {
            return Err(LocalError::ZeroNeighbors);
        }
        if self.h.is_nan() || self.h <= F::zero() {
            return Err(NnError::InvalidBandwidth(self.h.to_f32().unwrap_or(f32::NAN)).into());
        }
        if !(self.tol >= F::zero() && self.tol <= F::one()) {
            return Err(NnError::InvalidTolerance(self.tol.to_f32().unwrap_or(f32::NAN)).into());
        }
        if let WeightKernel::Exponential { cri } = self.kernel {
            if cri.is_nan() || cri <= F::zero() {
                return Err(NnError::InvalidCutoff(cri.to_f32().unwrap_or(f32::NAN)).into());
            }
        }
        Ok(())
    }
}

/// Model fitted on every neighborhood by [`LwPlsr`](crate::LwPlsr)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalRegressor {
    /// PLS regression with `nlv` latent variables
    Pls { nlv: usize },
    /// PLS averaged over a range of latent-variable counts
    Avg { range: LvRange, policy: AvgPolicy },
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwPlsrValidParams<F> {
    pub(crate) neighborhood: NeighborhoodParams<F>,
    pub(crate) local: LocalRegressor,
    pub(crate) scale: bool,
}

impl<F: Float> LwPlsrValidParams<F> {
    pub fn neighborhood(&self) -> &NeighborhoodParams<F> {
        &self.neighborhood
    }

    pub fn local(&self) -> LocalRegressor {
        self.local
    }

    pub fn scale(&self) -> bool {
        self.scale
    }
}

/// A hyper-parameter set for kNN locally weighted PLS regression
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | k | | Number of neighbors of a query | `[1, n]` |
/// | nlv | | Latent variables of the local PLS | `[0, inf)` |
/// | [nlvdis](Self::nlvdis) | `0` | Latent variables of the distance space, `0` for raw predictors | `[0, inf)` |
/// | [metric](Self::metric) | `Euclidean` | Distance | `Euclidean`, `Mahalanobis` |
/// | [kernel](Self::kernel) | `Exponential { cri: 4 }` | Distance weighting | see [`WeightKernel`] |
/// | [bandwidth](Self::bandwidth) | `2` | Kernel bandwidth | `(0, inf]` |
/// | [tol](Self::tol) | `1e-4` | Weight floor | `[0, 1]` |
/// | [scale](Self::scale) | `false` | Scale the local predictors | `false`, `true` |
/// | [average](Self::average) | | Replace the local PLS by an average over a range of counts | |
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwPlsrParams<F>(pub(crate) LwPlsrValidParams<F>);

impl<F: Float> LwPlsrParams<F> {
    pub fn new(k: usize, nlv: usize) -> Self {
        Self(LwPlsrValidParams {
            neighborhood: NeighborhoodParams::new(k),
            local: LocalRegressor::Pls { nlv },
            scale: false,
        })
    }

    pub fn nlvdis(mut self, nlvdis: usize) -> Self {
        self.0.neighborhood.nlvdis = nlvdis;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.neighborhood.metric = metric;
        self
    }

    pub fn kernel(mut self, kernel: WeightKernel<F>) -> Self {
        self.0.neighborhood.kernel = kernel;
        self
    }

    pub fn bandwidth(mut self, h: F) -> Self {
        self.0.neighborhood.h = h;
        self
    }

    pub fn tol(mut self, tol: F) -> Self {
        self.0.neighborhood.tol = tol;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0.scale = scale;
        self
    }

    /// Average local PLS models over the counts of `range`
    pub fn average(mut self, range: LvRange, policy: AvgPolicy) -> Self {
        self.0.local = LocalRegressor::Avg { range, policy };
        self
    }
}

impl<F: Float> ParamGuard for LwPlsrParams<F> {
    type Checked = LwPlsrValidParams<F>;
    type Error = LocalError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let neighborhood = &self.0.neighborhood;
        neighborhood.check()?;
        if let LocalRegressor::Avg { range, policy } = self.0.local {
            // a neighborhood of k observations supports at most k - 1 latent variables
            range.check_max(neighborhood.k - 1)?;
            chemolv_pls::PlsAvgParams::<F>::new(range)
                .policy(policy)
                .check_ref()?;
            match policy {
                AvgPolicy::Cv { n_folds, .. } | AvgPolicy::Stacking { n_folds, .. }
                    if n_folds > neighborhood.k =>
                {
                    return Err(chemolv::Error::Parameters(format!(
                        "{} folds requested in neighborhoods of {} observations",
                        n_folds, neighborhood.k
                    ))
                    .into());
                }
                _ => {}
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Discriminant fitted on every neighborhood by [`LwPlsDa`](crate::LwPlsDa)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminant {
    /// PLS-DA, the class with the largest predicted dummy value
    PlsDa,
    /// LDA on the PLS scores
    PlsLda,
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwPlsDaValidParams<F> {
    pub(crate) neighborhood: NeighborhoodParams<F>,
    pub(crate) nlv: usize,
    pub(crate) discriminant: Discriminant,
    pub(crate) prior: Prior,
    pub(crate) scale: bool,
}

impl<F: Float> LwPlsDaValidParams<F> {
    pub fn neighborhood(&self) -> &NeighborhoodParams<F> {
        &self.neighborhood
    }

    pub fn nlv(&self) -> usize {
        self.nlv
    }

    pub fn discriminant(&self) -> Discriminant {
        self.discriminant
    }

    pub fn prior(&self) -> Prior {
        self.prior
    }

    pub fn scale(&self) -> bool {
        self.scale
    }
}

/// A hyper-parameter set for kNN locally weighted PLS discrimination
///
/// Shares the neighborhood parameters of [`LwPlsrParams`], the local model is a PLS-DA or a
/// PLS-LDA with `nlv` latent variables and class priors `prior` (default `Uniform`).
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LwPlsDaParams<F>(pub(crate) LwPlsDaValidParams<F>);

impl<F: Float> LwPlsDaParams<F> {
    pub fn new(k: usize, nlv: usize) -> Self {
        Self(LwPlsDaValidParams {
            neighborhood: NeighborhoodParams::new(k),
            nlv,
            discriminant: Discriminant::PlsDa,
            prior: Prior::Uniform,
            scale: false,
        })
    }

    pub fn nlvdis(mut self, nlvdis: usize) -> Self {
        self.0.neighborhood.nlvdis = nlvdis;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.neighborhood.metric = metric;
        self
    }

    pub fn kernel(mut self, kernel: WeightKernel<F>) -> Self {
        self.0.neighborhood.kernel = kernel;
        self
    }

    pub fn bandwidth(mut self, h: F) -> Self {
        self.0.neighborhood.h = h;
        self
    }

    pub fn tol(mut self, tol: F) -> Self {
        self.0.neighborhood.tol = tol;
        self
    }

    pub fn discriminant(mut self, discriminant: Discriminant) -> Self {
        self.0.discriminant = discriminant;
        self
    }

    pub fn prior(mut self, prior: Prior) -> Self {
        self.0.prior = prior;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0.scale = scale;
        self
    }
}

impl<F: Float> ParamGuard for LwPlsDaParams<F> {
    type Checked = LwPlsDaValidParams<F>;
    type Error = LocalError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.neighborhood.check()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnRValidParams<F> {
    pub(crate) neighborhood: NeighborhoodParams<F>,
}

impl<F: Float> KnnRValidParams<F> {
    pub fn neighborhood(&self) -> &NeighborhoodParams<F> {
        &self.neighborhood
    }
}

/// A hyper-parameter set for kNN regression, the prediction is the weighted mean response of
/// the neighbors
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnRParams<F>(pub(crate) KnnRValidParams<F>);

impl<F: Float> KnnRParams<F> {
    pub fn new(k: usize) -> Self {
        Self(KnnRValidParams {
            neighborhood: NeighborhoodParams::new(k),
        })
    }

    pub fn nlvdis(mut self, nlvdis: usize) -> Self {
        self.0.neighborhood.nlvdis = nlvdis;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.neighborhood.metric = metric;
        self
    }

    pub fn kernel(mut self, kernel: WeightKernel<F>) -> Self {
        self.0.neighborhood.kernel = kernel;
        self
    }

    pub fn bandwidth(mut self, h: F) -> Self {
        self.0.neighborhood.h = h;
        self
    }

    pub fn tol(mut self, tol: F) -> Self {
        self.0.neighborhood.tol = tol;
        self
    }
}

impl<F: Float> ParamGuard for KnnRParams<F> {
    type Checked = KnnRValidParams<F>;
    type Error = LocalError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.neighborhood.check()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
