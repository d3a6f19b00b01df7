use crate::bond::Bond;
use thiserror::Error;
use tn::TnError;

/// Failures of the environment engine. All of them abort the current sweep
/// step; restart policy belongs to the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvError {
    /// Chains disagree on length, physical dimensions or boundary legs.
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// The boundary tensor a call depends on was never computed or was
    /// cleared; updates were issued out of sweep order.
    #[error("no boundary tensor cached at bond {bond}")]
    MissingBoundary { bond: Bond },

    #[error("bond {bond} does not connect neighbouring positions of a {len}-site chain")]
    InvalidBond { bond: Bond, len: usize },

    #[error("site {site} outside a {len}-site chain")]
    SiteOutOfRange { site: usize, len: usize },

    /// Raised by callers that assume a Hermitian effective operator.
    #[error("effective operator deviates from hermiticity by {defect:.3e} (tolerance {tolerance:.1e})")]
    NumericNonHermitian { defect: f64, tolerance: f64 },

    #[error("deflation projector has no local projections for the current window")]
    NoProjectionWindow,

    #[error(transparent)]
    Tensor(#[from] TnError),
}

pub type Result<T> = std::result::Result<T, EnvError>;
