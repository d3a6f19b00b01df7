use crate::spin::{identity, pauli_x, pauli_y, pauli_z, phys_leg, to_tensor, Local};
use environment::{Bond, Direction, Environment, EnvironmentEngine, Layers, Result};
use tn::{mpo, Chain, C64};

/// `<psi|psi>`.
pub fn norm_squared(psi: &Chain) -> Result<f64> {
    let layers = Layers::overlap(psi, psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new())?;
    env.setup(Direction::First, &layers)?;
    Ok(env.measure(Bond::default(), &layers)?.re)
}

/// `<psi| op |psi>` for an operator chain, without normalization.
pub fn sandwich(psi: &Chain, op: &Chain) -> Result<C64> {
    let layers = Layers::expectation(psi, op);
    let mut env = EnvironmentEngine::new(&layers, Vec::new())?;
    env.setup(Direction::First, &layers)?;
    env.measure(Bond::default(), &layers)
}

/// Normalized expectation value of a one-site operator at site `k`.
pub fn expect_local(psi: &Chain, k: usize, op: Local) -> Result<f64> {
    let op = to_tensor(op)?;
    let layers = Layers::overlap(psi, psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new())?;
    env.setup(Direction::First, &layers)?;
    for n in 0..k {
        env.update(n, Direction::Last, &layers)?;
    }
    let norm = env.measure(Bond::left_of(k), &layers)?;
    if norm.norm() == 0.0 {
        return Ok(0.0);
    }
    env.update_with_local_op(k, Direction::Last, &op, &layers)?;
    let numer = env.measure(Bond::produced_by(k, Direction::Last), &layers)?;
    Ok((numer / norm).re)
}

/// Normalized expectation value of `a_i b_j`, `i != j`.
pub fn expect_pair(psi: &Chain, i: usize, a: Local, j: usize, b: Local) -> Result<f64> {
    let ops = (0..psi.len())
        .map(|s| {
            to_tensor(if s == i {
                a
            } else if s == j {
                b
            } else {
                identity()
            })
        })
        .collect::<tn::Result<Vec<_>>>()?;
    let op = mpo::product(&phys_leg(), &ops)?;
    let norm = norm_squared(psi)?;
    if norm == 0.0 {
        return Ok(0.0);
    }
    Ok(sandwich(psi, &op)?.re / norm)
}

/// Expectation value ⟨Z_k⟩ for the spin at site k.
pub fn expect_z(psi: &Chain, k: usize) -> Result<f64> {
    expect_local(psi, k, pauli_z())
}

/// Expectation value ⟨X_k⟩ for the spin at site k.
pub fn expect_x(psi: &Chain, k: usize) -> Result<f64> {
    expect_local(psi, k, pauli_x())
}

/// Expectation value ⟨Y_k⟩ for the spin at site k.
pub fn expect_y(psi: &Chain, k: usize) -> Result<f64> {
    expect_local(psi, k, pauli_y())
}

/// Expectation value ⟨Z_i Z_j⟩.
pub fn expect_zz(psi: &Chain, i: usize, j: usize) -> Result<f64> {
    expect_pair(psi, i, pauli_z(), j, pauli_z())
}

/// Expectation value ⟨X_i X_j⟩.
pub fn expect_xx(psi: &Chain, i: usize, j: usize) -> Result<f64> {
    expect_pair(psi, i, pauli_x(), j, pauli_x())
}

/// Expectation value ⟨Y_i Y_j⟩.
pub fn expect_yy(psi: &Chain, i: usize, j: usize) -> Result<f64> {
    expect_pair(psi, i, pauli_y(), j, pauli_y())
}
