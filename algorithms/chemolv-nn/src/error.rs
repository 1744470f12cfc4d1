use thiserror::Error;

pub type Result<T> = std::result::Result<T, NnError>;

/// Error returned when building a neighbor index, querying it or weighting distances
#[derive(Error, Debug, Clone)]
pub enum NnError {
    #[error("points have dimension of 0")]
    ZeroDimension,
    #[error("query point has dimension {1}, the index was built on dimension {0}")]
    WrongDimension(usize, usize),
    #[error("points and distances must be finite")]
    NonFinite,
    #[error("distances must be non-negative")]
    NegativeDistance,
    #[error("bandwidth should be positive, but is {0}")]
    InvalidBandwidth(f32),
    #[error("weight floor should lie in [0, 1], but is {0}")]
    InvalidTolerance(f32),
    #[error("robust cutoff should be positive, but is {0}")]
    InvalidCutoff(f32),
    /// The reference covariance has no Cholesky factor, usually more variables than points
    #[error("reference covariance is singular")]
    SingularCovariance,
    #[error(transparent)]
    BaseCrate(#[from] chemolv::Error),
}

impl From<NnError> for chemolv::Error {
    fn from(error: NnError) -> chemolv::Error {
        match error {
            NnError::BaseCrate(err) => err,
            other => chemolv::Error::Parameters(other.to_string()),
        }
    }
}
