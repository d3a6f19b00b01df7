//! Ground and low-lying states of chain operators by sweeping variational
//! optimization on top of the boundary environments.

pub mod error;
pub mod lanczos;
pub mod output;
pub mod sweep;

pub use error::{DmrgError, Result};
pub use lanczos::{dense_spectrum, lowest_eigenpair, Eigenpair, LanczosOptions};
pub use sweep::{check_hermitian, run, DmrgOptions, DmrgResult, Method};
