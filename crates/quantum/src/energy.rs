use crate::hamiltonian::{Heisenberg, Ising};
use crate::observables::{norm_squared, sandwich};
use environment::Result;
use tn::Chain;

/// `<psi|H|psi> / <psi|psi>` for any operator chain, open or periodic.
pub fn expectation(psi: &Chain, h: &Chain) -> Result<f64> {
    let norm = norm_squared(psi)?;
    if norm == 0.0 {
        return Ok(0.0);
    }
    Ok(sandwich(psi, h)?.re / norm)
}

/// Expectation value ⟨ψ|H|ψ⟩ for an Ising chain.
pub fn energy(psi: &Chain, h: &Ising) -> Result<f64> {
    expectation(psi, &h.to_mpo()?)
}

/// Expectation value ⟨ψ|H|ψ⟩ for a nearest-neighbor Heisenberg chain.
pub fn energy_heisenberg(psi: &Chain, h: &Heisenberg) -> Result<f64> {
    expectation(psi, &h.to_mpo()?)
}
