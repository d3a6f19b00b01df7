//! Dense tensors with leg descriptors and the chains (MPS/MPO) built from them.

pub mod chain;
pub mod error;
pub mod leg;
pub mod linalg;
pub mod mpo;
pub mod tensor;
pub mod truncation;

pub use chain::{Chain, ChainKind, End};
pub use error::{Result, TnError};
pub use leg::Leg;
pub use tensor::{Tensor, C64};
pub use truncation::Truncation;
