use dmrg::{dense_spectrum, run, DmrgError, DmrgOptions, Method};
use environment::EnvError;
use quantum::{
    energy::expectation,
    hamiltonian::{Heisenberg, Ising},
    spin::phys_leg,
};
use rng::XofRng;
use tn::{mpo, Chain, Tensor, Truncation};

fn start(n: usize, d: usize, seed: &[u8]) -> Chain {
    let mut rng = XofRng::new(seed);
    Chain::random_mps(n, &phys_leg(), d, &mut rng).unwrap()
}

#[test]
fn two_site_heisenberg_matches_exact() {
    let n = 6;
    let h = Heisenberg::uniform(n, 1.0).to_mpo().unwrap();
    let exact = dense_spectrum(&h.to_dense_operator().unwrap()).unwrap()[0];

    let mut psi = start(n, 2, b"heis-2site");
    let res = run(&mut psi, &h, &[], &DmrgOptions::default()).unwrap();

    assert!(res.converged);
    assert!((res.energy - exact).abs() < 1e-8, "E = {} vs {}", res.energy, exact);
    let e = expectation(&psi, &h).unwrap();
    assert!((e - exact).abs() < 1e-8, "<H> = {}", e);
}

#[test]
fn one_site_ising_matches_exact() {
    let n = 6;
    let h = Ising::transverse(n, 1.1, 0.2, 1.0).to_mpo().unwrap();
    let exact = dense_spectrum(&h.to_dense_operator().unwrap()).unwrap()[0];

    // Bond dimension 8 is exact for six spins.
    let mut psi = start(n, 8, b"ising-1site");
    let opts = DmrgOptions {
        method: Method::OneSite,
        ..DmrgOptions::default()
    };
    let res = run(&mut psi, &h, &[], &opts).unwrap();
    assert!((res.energy - exact).abs() < 1e-8, "E = {} vs {}", res.energy, exact);
    assert_eq!(res.max_discarded, 0.0);
}

#[test]
fn ring_matches_exact() {
    let n = 6;
    let h = Heisenberg::uniform(n, 1.0).ring_mpo(1.0).unwrap();
    let exact = dense_spectrum(&h.to_dense_operator().unwrap()).unwrap()[0];

    let mut psi = start(n, 2, b"ring");
    let opts = DmrgOptions {
        truncation: Truncation {
            max_bond: 16,
            cutoff: 1e-12,
        },
        ..DmrgOptions::default()
    };
    let res = run(&mut psi, &h, &[], &opts).unwrap();
    assert!((res.energy - exact).abs() < 1e-8, "E = {} vs {}", res.energy, exact);
}

#[test]
fn truncation_bounds_bond_dimension() {
    let n = 8;
    let h = Heisenberg::uniform(n, 1.0).to_mpo().unwrap();
    let mut psi = start(n, 2, b"trunc");
    let opts = DmrgOptions {
        truncation: Truncation {
            max_bond: 3,
            cutoff: 1e-12,
        },
        max_sweeps: 4,
        ..DmrgOptions::default()
    };
    let res = run(&mut psi, &h, &[], &opts).unwrap();
    assert!(psi.bond_dims().iter().all(|&d| d <= 3));
    assert!(res.max_discarded > 0.0);
}

#[test]
fn non_hermitian_operator_is_reported() {
    let n = 4;
    let mut rng = XofRng::new(b"non-hermitian");
    let legs = || vec![phys_leg(), phys_leg().conj()];
    let onsite: Vec<Tensor> = (0..n).map(|_| Tensor::random(legs(), &mut rng)).collect();
    let pairs = vec![(Tensor::random(legs(), &mut rng), Tensor::random(legs(), &mut rng))];
    let couplings = vec![vec![num_complex::Complex64::new(1.0, 0.0)]; n - 1];
    let h = mpo::nearest_neighbor(&phys_leg(), &onsite, &pairs, &couplings).unwrap();

    let mut psi = start(n, 2, b"nh-start");
    let err = run(&mut psi, &h, &[], &DmrgOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        DmrgError::Environment(EnvError::NumericNonHermitian { .. })
    ));
}

#[test]
fn one_site_grows_bonds_from_product_start() {
    let n = 6;
    let h = Heisenberg::uniform(n, 1.0).to_mpo().unwrap();
    let exact = dense_spectrum(&h.to_dense_operator().unwrap()).unwrap()[0];

    let mut psi = start(n, 1, b"heis-grow");
    let opts = DmrgOptions {
        method: Method::OneSite,
        ..DmrgOptions::default()
    };
    let res = run(&mut psi, &h, &[], &opts).unwrap();
    assert!((res.energy - exact).abs() < 1e-8, "E = {} vs {}", res.energy, exact);
    assert!(psi.bond_dims().iter().any(|&d| d > 1), "bonds {:?}", psi.bond_dims());
}
