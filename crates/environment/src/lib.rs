//! Boundary environments for networks of the form `<bra| op |ket>` built
//! from matrix product chains, and the effective operators they induce on
//! zero, one, or two sites.

pub mod bond;
pub mod cache;
pub mod engine;
pub mod error;
pub mod layers;
pub mod overlap;
pub mod periodic;
pub mod projector;
pub mod purification;
pub mod sandwich;

pub use bond::{Bond, Direction};
pub use cache::BoundaryCache;
pub use engine::{Environment, EnvironmentEngine, Variant};
pub use error::{EnvError, Result};
pub use layers::{Layers, Target};
pub use overlap::OverlapEnv;
pub use periodic::PeriodicEnv;
pub use projector::{DeflationProjector, Window};
pub use purification::PurificationEnv;
pub use sandwich::SandwichEnv;
