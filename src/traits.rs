//! Provide traits for different classes of algorithms
//!

use crate::dataset::DatasetBase;
use crate::error::Result;
use ndarray::{ArrayBase, Data, Ix2};

/// Transformation algorithms
///
/// A transformer takes a dataset or a matrix and projects it into another space, for example
/// the scores of a latent-variable model.
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}

/// Fittable algorithms
///
/// A fittable algorithm takes a dataset and creates a concept of some kind about it. The
/// hyperparameters live in `self`, the fitted model is returned as `Self::Object`.
pub trait Fit<F, T, E: std::error::Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, dataset: &DatasetBase<F, T>) -> std::result::Result<Self::Object, E>;
}

/// Predict with model into a mutable reference of targets.
pub trait PredictInplace<R, T> {
    /// Predict something in place
    fn predict_inplace<'a>(&'a self, x: &'a R, y: &mut T);

    /// Create targets that `predict_inplace` works with.
    fn default_target(&self, x: &R) -> T;
}

/// Predict with model
///
/// This trait assumes the `PredictInplace` implementation and provides additional input/output
/// combinations.
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}

impl<'a, F, D, T, O> Predict<&'a ArrayBase<D, Ix2>, T> for O
where
    D: Data<Elem = F>,
    O: PredictInplace<ArrayBase<D, Ix2>, T>,
{
    fn predict(&self, records: &'a ArrayBase<D, Ix2>) -> T {
        let mut targets = self.default_target(records);
        self.predict_inplace(records, &mut targets);
        targets
    }
}

/// Models whose predictions can be truncated to a prefix of their latent variables
///
/// A single fit at the maximal number of latent variables answers every smaller count, which is
/// what the latent-variable grid search and the count ensembles rely on.
pub trait PredictLv<R, T> {
    /// Number of latent variables available for truncation
    fn max_lv(&self) -> usize;

    /// Predict with the first `nlv` latent variables, `nlv = 0` predicts the intercept only
    fn predict_lv(&self, x: &R, nlv: usize) -> Result<T>;
}

/// Models whose predictions can be evaluated along a regularization path
pub trait PredictLambda<F, R, T> {
    /// Predict with the penalty `lambda`
    fn predict_lambda(&self, x: &R, lambda: F) -> Result<T>;
}
