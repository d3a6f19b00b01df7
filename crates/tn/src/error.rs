use thiserror::Error;

/// Errors raised by the tensor and chain layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TnError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("expected rank {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    #[error("invalid axes {axes:?} for a rank-{rank} tensor")]
    InvalidAxes { axes: Vec<usize>, rank: usize },

    #[error("data length {actual} does not match shape volume {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("leg {0} carries no fusion history")]
    NotFused(usize),

    #[error("tensor with {0} elements is not a scalar")]
    NotScalar(usize),

    #[error("invalid chain: {0}")]
    InvalidChain(String),
}

pub type Result<T> = std::result::Result<T, TnError>;
