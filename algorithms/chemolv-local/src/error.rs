use chemolv_nn::NnError;
use chemolv_pls::PlsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocalError>;

#[derive(Error, Debug, Clone)]
pub enum LocalError {
    #[error("number of neighbors should be at least 1")]
    ZeroNeighbors,
    #[error(transparent)]
    Pls(#[from] PlsError),
    #[error(transparent)]
    Nn(#[from] NnError),
    #[error(transparent)]
    BaseCrate(#[from] chemolv::Error),
}

impl From<LocalError> for chemolv::Error {
    fn from(error: LocalError) -> chemolv::Error {
        match error {
            LocalError::BaseCrate(err) => err,
            LocalError::Pls(err) => err.into(),
            LocalError::Nn(err) => err.into(),
            other => chemolv::Error::Parameters(other.to_string()),
        }
    }
}
