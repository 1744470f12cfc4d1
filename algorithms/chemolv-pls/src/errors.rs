use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlsError>;

#[derive(Error, Debug, Clone)]
pub enum PlsError {
    #[error("number of samples should be greater than 0, got {0}")]
    NotEnoughSamples(usize),
    #[error("tolerance should be positive, but is {0}")]
    InvalidTolerance(f32),
    #[error("maximum number of iterations should be greater than zero")]
    ZeroMaxIter,
    #[error("power method not converged after {0} iterations")]
    PowerMethodNotConverged(usize),
    /// Not even the first component has a non-zero score, the predictors are constant
    #[error("latent variable {0} has a zero-norm score")]
    DegenerateComponent(usize),
    #[error("invalid kernel parameter {0}")]
    InvalidKernel(String),
    #[error("number of folds should be at least 2, got {0}")]
    InvalidFolds(usize),
    #[error(transparent)]
    BaseCrate(#[from] chemolv::Error),
}

impl From<chemolv_linear::LinearError> for PlsError {
    fn from(error: chemolv_linear::LinearError) -> PlsError {
        match error {
            chemolv_linear::LinearError::BaseCrate(err) => PlsError::BaseCrate(err),
            other => PlsError::BaseCrate(chemolv::Error::Parameters(other.to_string())),
        }
    }
}

impl From<PlsError> for chemolv::Error {
    fn from(error: PlsError) -> chemolv::Error {
        match error {
            PlsError::BaseCrate(err) => err,
            other => chemolv::Error::Parameters(other.to_string()),
        }
    }
}
