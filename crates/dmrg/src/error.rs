use environment::EnvError;
use thiserror::Error;
use tn::TnError;

#[derive(Debug, Error)]
pub enum DmrgError {
    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Tensor(#[from] TnError),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The Krylov iteration started from, or collapsed to, a zero vector.
    #[error("lanczos breakdown: {0}")]
    Breakdown(String),
}

pub type Result<T> = std::result::Result<T, DmrgError>;
