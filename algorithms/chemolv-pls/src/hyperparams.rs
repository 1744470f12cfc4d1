use chemolv::{Float, LvRange, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::PlsError;

/// Extraction of the dominant direction of `X' D Y` for several responses
///
/// With a single response the direction is computed directly and both variants agree.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(PartialEq, Debug, Clone, Copy, Eq, Hash)]
pub enum Algorithm {
    /// Power method
    Nipals,
    /// Full SVD of the cross-covariance matrix
    Svd,
}

fn check_iterations<F: Float>(tolerance: F, max_iter: usize) -> Result<(), PlsError> {
    if tolerance.is_negative() || tolerance.is_nan() || tolerance.is_infinite() {
        Err(PlsError::InvalidTolerance(tolerance.to_f32().unwrap_or(f32::NAN)))
    } else if max_iter == 0 {
        Err(PlsError::ZeroMaxIter)
    } else {
        Ok(())
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsValidParams<F: Float> {
    nlv: usize,
    max_iter: usize,
    tolerance: F,
    scale: bool,
    algorithm: Algorithm,
}

impl<F: Float> PlsValidParams<F> {
    pub fn nlv(&self) -> usize {
        self.nlv
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn scale(&self) -> bool {
        self.scale
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Same settings with another number of latent variables
    pub(crate) fn with_nlv(mut self, nlv: usize) -> Self {
        self.nlv = nlv;
        self
    }
}

/// A hyper-parameter set for weighted PLS regression
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | nlv | | Number of latent variables, capped at `min(n - 1, p)` | `[0, inf)` |
/// | [scale](Self::scale) | `false` | Scale predictors by their weighted standard deviation | `false`, `true` |
/// | [algorithm](Self::algorithm) | `Nipals` | Direction extraction for several responses | `Nipals`, `Svd` |
/// | [max_iterations](Self::max_iterations) | `500` | Iterations of the power method | `[1, inf)` |
/// | [tolerance](Self::tolerance) | `1e-6` | Convergence of the power method | `[0, inf)` |
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsParams<F: Float>(pub(crate) PlsValidParams<F>);

impl<F: Float> PlsParams<F> {
    pub fn new(nlv: usize) -> PlsParams<F> {
        Self(PlsValidParams {
            nlv,
            max_iter: 500,
            tolerance: F::cast(1e-6),
            scale: false,
            algorithm: Algorithm::Nipals,
        })
    }

    /// Set the maximum number of iterations of the power method when algorithm='Nipals'.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    /// Set the tolerance used as convergence criteria in the power method: the algorithm
    /// stops whenever the squared norm of `w_i - w_{i-1}` is less than tol.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Set whether to scale the predictors
    pub fn scale(mut self, scale: bool) -> Self {
        self.0.scale = scale;
        self
    }

    /// Set the algorithm used to estimate the dominant direction of the cross-covariance
    /// matrix. `Nipals` uses the power method while `Svd` will compute the whole SVD.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.0.algorithm = algorithm;
        self
    }
}

impl<F: Float> ParamGuard for PlsParams<F> {
    type Checked = PlsValidParams<F>;
    type Error = PlsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        check_iterations(self.0.tolerance, self.0.max_iter)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Kernel function of kernel PLS
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel<F> {
    /// `<x, y>`
    Linear,
    /// `exp(-gamma ||x - y||^2)`
    Gaussian { gamma: F },
    /// `(gamma <x, y> + coef0)^degree`
    Polynomial { degree: u32, gamma: F, coef0: F },
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelPlsValidParams<F: Float> {
    nlv: usize,
    kernel: Kernel<F>,
    max_iter: usize,
    tolerance: F,
}

impl<F: Float> KernelPlsValidParams<F> {
    pub fn nlv(&self) -> usize {
        self.nlv
    }

    pub fn kernel(&self) -> Kernel<F> {
        self.kernel
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }
}

/// A hyper-parameter set for kernel PLS
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | nlv | | Number of latent variables, capped at `n - 1` | `[0, inf)` |
/// | [kernel](Self::kernel) | `Gaussian { gamma: 1 }` | Kernel function | `gamma > 0`, `degree >= 1` |
/// | [max_iterations](Self::max_iterations) | `500` | Iterations of the power method | `[1, inf)` |
/// | [tolerance](Self::tolerance) | `1e-6` | Convergence of the power method | `[0, inf)` |
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelPlsParams<F: Float>(KernelPlsValidParams<F>);

impl<F: Float> KernelPlsParams<F> {
    pub fn new(nlv: usize) -> Self {
        Self(KernelPlsValidParams {
            nlv,
            kernel: Kernel::Gaussian { gamma: F::one() },
            max_iter: 500,
            tolerance: F::cast(1e-6),
        })
    }

    pub fn kernel(mut self, kernel: Kernel<F>) -> Self {
        self.0.kernel = kernel;
        self
    }

    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }
}

impl<F: Float> ParamGuard for KernelPlsParams<F> {
    type Checked = KernelPlsValidParams<F>;
    type Error = PlsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        check_iterations(self.0.tolerance, self.0.max_iter)?;
        match self.0.kernel {
            Kernel::Gaussian { gamma } | Kernel::Polynomial { gamma, .. }
                if !(gamma > F::zero() && gamma.is_finite()) =>
            {
                Err(PlsError::InvalidKernel(format!(
                    "gamma should be positive, got {}",
                    gamma
                )))
            }
            Kernel::Polynomial { degree: 0, .. } => Err(PlsError::InvalidKernel(
                "polynomial degree should be at least 1".into(),
            )),
            _ => Ok(&self.0),
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Combination of the per-count predictions of a PLS ensemble
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvgPolicy {
    /// Equal weights
    Uniform,
    /// Weights inversely proportional to the cross-validated MSEP of every count
    Cv { n_folds: usize, rep: usize, seed: u64 },
    /// Akaike weights with `1 + k` degrees of freedom for `k` latent variables
    Aic,
    /// Linear regression of the response on out-of-fold per-count predictions
    Stacking { n_folds: usize, seed: u64 },
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsAvgValidParams<F: Float> {
    range: LvRange,
    policy: AvgPolicy,
    pls: PlsValidParams<F>,
}

impl<F: Float> PlsAvgValidParams<F> {
    pub fn range(&self) -> LvRange {
        self.range
    }

    pub fn policy(&self) -> AvgPolicy {
        self.policy
    }

    pub fn pls(&self) -> &PlsValidParams<F> {
        &self.pls
    }
}

/// A hyper-parameter set for the averaging of PLS models over a range of latent variables
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | range | | Counts of latent variables to combine | `high <= min(n - 1, p)` |
/// | [policy](Self::policy) | `Uniform` | Combination of the counts | folds `>= 2` |
/// | [scale](Self::scale) | `false` | Scale predictors | `false`, `true` |
/// | [algorithm](Self::algorithm) | `Nipals` | Direction extraction | `Nipals`, `Svd` |
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsAvgParams<F: Float>(PlsAvgValidParams<F>);

impl<F: Float> PlsAvgParams<F> {
    pub fn new(range: LvRange) -> Self {
        Self(PlsAvgValidParams {
            range,
            policy: AvgPolicy::Uniform,
            pls: PlsParams::new(range.high()).0,
        })
    }

    pub fn policy(mut self, policy: AvgPolicy) -> Self {
        self.0.policy = policy;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0.pls.scale = scale;
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.0.pls.algorithm = algorithm;
        self
    }
}

impl<F: Float> ParamGuard for PlsAvgParams<F> {
    type Checked = PlsAvgValidParams<F>;
    type Error = PlsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        check_iterations(self.0.pls.tolerance, self.0.pls.max_iter)?;
        match self.0.policy {
            AvgPolicy::Cv { n_folds, .. } | AvgPolicy::Stacking { n_folds, .. } if n_folds < 2 => {
                Err(PlsError::InvalidFolds(n_folds))
            }
            AvgPolicy::Cv { rep: 0, .. } => Err(PlsError::BaseCrate(chemolv::Error::Parameters(
                "at least one replication is needed".into(),
            ))),
            _ => Ok(&self.0),
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Class priors of the discriminant models
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prior {
    /// Priors follow the (weighted) class frequencies
    Proportional,
    /// Every class gets the same prior, observations are reweighted inversely to the
    /// weight of their class
    Uniform,
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsDaValidParams<F: Float> {
    prior: Prior,
    pls: PlsValidParams<F>,
}

impl<F: Float> PlsDaValidParams<F> {
    pub fn nlv(&self) -> usize {
        self.pls.nlv
    }

    pub fn prior(&self) -> Prior {
        self.prior
    }

    pub fn pls(&self) -> &PlsValidParams<F> {
        &self.pls
    }
}

/// A hyper-parameter set for PLS discriminant analysis
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :---| :--- |
/// | nlv | | Number of latent variables | `[0, inf)` |
/// | [prior](Self::prior) | `Uniform` | Class priors | `Proportional`, `Uniform` |
/// | [scale](Self::scale) | `false` | Scale predictors | `false`, `true` |
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsDaParams<F: Float>(PlsDaValidParams<F>);

impl<F: Float> PlsDaParams<F> {
    pub fn new(nlv: usize) -> Self {
        Self(PlsDaValidParams {
            prior: Prior::Uniform,
            pls: PlsParams::new(nlv).0,
        })
    }

    pub fn prior(mut self, prior: Prior) -> Self {
        self.0.prior = prior;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0.pls.scale = scale;
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.0.pls.algorithm = algorithm;
        self
    }
}

impl<F: Float> ParamGuard for PlsDaParams<F> {
    type Checked = PlsDaValidParams<F>;
    type Error = PlsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        check_iterations(self.0.pls.tolerance, self.0.pls.max_iter)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Checked hyper-parameters of PLS-LDA, the same settings as PLS-DA
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsLdaValidParams<F: Float>(pub(crate) PlsDaValidParams<F>);

/// A hyper-parameter set for PLS followed by linear discriminant analysis on the scores
///
/// The prior is used by the discriminant step, the PLS step keeps the observation weights.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsLdaParams<F: Float>(PlsLdaValidParams<F>);

impl<F: Float> PlsLdaParams<F> {
    pub fn new(nlv: usize) -> Self {
        Self(PlsLdaValidParams(PlsDaParams::new(nlv).0))
    }

    pub fn prior(mut self, prior: Prior) -> Self {
        self.0 .0.prior = prior;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.0 .0.pls.scale = scale;
        self
    }
}

impl<F: Float> ParamGuard for PlsLdaParams<F> {
    type Checked = PlsLdaValidParams<F>;
    type Error = PlsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        check_iterations(self.0 .0.pls.tolerance, self.0 .0.pls.max_iter)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            PlsParams::<f64>::new(2).tolerance(-1.).check(),
            Err(PlsError::InvalidTolerance(_))
        ));
        assert!(matches!(
            PlsParams::<f64>::new(2).max_iterations(0).check(),
            Err(PlsError::ZeroMaxIter)
        ));
        assert!(matches!(
            KernelPlsParams::<f64>::new(2)
                .kernel(Kernel::Gaussian { gamma: 0. })
                .check(),
            Err(PlsError::InvalidKernel(_))
        ));
        assert!(matches!(
            PlsAvgParams::<f64>::new(LvRange::new(1, 3).unwrap())
                .policy(AvgPolicy::Stacking { n_folds: 1, seed: 0 })
                .check(),
            Err(PlsError::InvalidFolds(1))
        ));
        assert!(PlsDaParams::<f64>::new(3).check().is_ok());
    }
}
