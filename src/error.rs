//! Error types in Chemolv
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    /// Row or column counts of two inputs disagree
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    Dimension {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A range of complexities (latent variables, lambdas) is empty or out of bounds
    #[error("invalid range {low}..={high}, admissible upper bound is {max}")]
    Range { low: usize, high: usize, max: usize },
    /// A range specification that is empty or cannot be parsed
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// A fast factorization path met a rank-deficient matrix
    #[error("singular matrix: {0}")]
    Singular(String),
    #[error("{requested} neighbors requested but only {available} observations available")]
    InsufficientNeighbors { requested: usize, available: usize },
    #[error("not enough samples")]
    NotEnoughSamples,
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
    #[error("linear algebra error {0}")]
    Linalg(String),
}

impl From<linfa_linalg::LinalgError> for Error {
    fn from(error: linfa_linalg::LinalgError) -> Error {
        Error::Linalg(error.to_string())
    }
}

impl Error {
    /// Checks that two row counts agree
    pub fn check_rows(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            Err(Error::Dimension {
                what,
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    }
}
