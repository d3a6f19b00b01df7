pub mod energy;
pub mod hamiltonian;
pub mod observables;
pub mod spin;
pub mod states;
