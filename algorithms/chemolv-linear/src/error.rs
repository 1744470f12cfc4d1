//! An error when fitting a linear model
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinearError>;

/// An error when fitting a linear model
#[derive(Error, Debug, Clone)]
pub enum LinearError {
    #[error(transparent)]
    BaseCrate(#[from] chemolv::Error),
    #[error("at least one sample needed")]
    NotEnoughSamples,
    #[error("penalty should be finite and non-negative, got {0}")]
    InvalidPenalty(f32),
}
