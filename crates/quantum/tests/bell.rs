use quantum::{
    observables::{expect_local, expect_z, expect_zz},
    spin::{combine, identity, pauli_z},
    states::bell_pair,
};

#[test]
fn bell_state_z_correlation() {
    let psi = bell_pair().unwrap();

    // Projectors onto |up> and |down> at each site.
    let up = combine(0.5, identity(), 0.5, pauli_z());
    let down = combine(0.5, identity(), -0.5, pauli_z());

    let p_up = expect_local(&psi, 0, up).unwrap();
    let p_down = expect_local(&psi, 0, down).unwrap();
    assert!((p_up - 0.5).abs() < 1e-12, "P(up) = {}", p_up);
    assert!((p_down - 0.5).abs() < 1e-12, "P(down) = {}", p_down);

    // Perfect correlation: anti-aligned outcomes never occur.
    let zz = expect_zz(&psi, 0, 1).unwrap();
    let p_anti = (1.0 - zz) / 2.0;
    assert!(p_anti.abs() < 1e-12, "Found anti-aligned pair, p = {}", p_anti);

    assert!(expect_z(&psi, 1).unwrap().abs() < 1e-12);
}
