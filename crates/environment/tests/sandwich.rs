mod common;

use common::{close, dense_sandwich, heisenberg, normalized_psi, phys, random_mpo, random_psi};
use environment::{Bond, Direction, EnvError, Environment, EnvironmentEngine, Layers};
use rng::XofRng;
use tn::{Chain, Leg, Tensor, Truncation, C64};

fn ready(layers: &Layers<'_>, n: usize) -> EnvironmentEngine {
    // Boundaries left of site n toward the last site, everything else toward
    // the first.
    let mut env = EnvironmentEngine::new(layers, Vec::new()).unwrap();
    env.setup(Direction::First, layers).unwrap();
    for k in 0..n {
        env.update(k, Direction::Last, layers).unwrap();
    }
    env
}

#[test]
fn sandwich_matches_dense_contraction() {
    for n in [1, 2, 5] {
        let bra = random_psi(n, 3, format!("sbra-{}", n).as_bytes());
        let ket = random_psi(n, 4, format!("sket-{}", n).as_bytes());
        let mut op = random_mpo(n, format!("sop-{}", n).as_bytes());
        op.set_factor(C64::new(0.5, -1.0));
        let layers = Layers::sandwich(&bra, &op, &ket);
        let expect = dense_sandwich(&bra, &op, &ket);

        let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
        env.setup(Direction::Last, &layers).unwrap();
        let last = Bond::new(n as isize - 1, n as isize);
        let got = env.measure(last, &layers).unwrap();
        assert!(close(got, expect, 1e-10), "n = {}: {} vs {}", n, got, expect);
        assert!(close(env.factor(&layers), layers.factor(), 0.0));
    }
}

#[test]
fn identity_operator_on_normalized_state() {
    let psi = normalized_psi(6, 4, b"identity");
    let id = Chain::identity_mpo(6, &phys()).unwrap();
    let layers = Layers::expectation(&psi, &id);
    let env = ready(&layers, 3);
    let v = env.measure(Bond::left_of(3), &layers).unwrap();
    assert!(close(v, C64::new(1.0, 0.0), 1e-10), "<psi|1|psi> = {}", v);
}

#[test]
fn identity_on_two_site_product_state_from_either_end() {
    let s = 1.0 / 2.0_f64.sqrt();
    let psi = Chain::product_state(
        &phys(),
        &[
            vec![C64::new(0.6, 0.0), C64::new(0.8, 0.0)],
            vec![C64::new(s, 0.0), C64::new(0.0, s)],
        ],
    )
    .unwrap();
    let id = Chain::identity_mpo(2, &phys()).unwrap();
    let layers = Layers::expectation(&psi, &id);
    let one = C64::new(1.0, 0.0);

    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(Direction::First, &layers).unwrap();
    let v = env.measure(Bond::left_of(0), &layers).unwrap();
    assert!(close(v, one, 1e-12), "toward first: {}", v);

    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(Direction::Last, &layers).unwrap();
    let v = env.measure(Bond::right_of(1), &layers).unwrap();
    assert!(close(v, one, 1e-12), "toward last: {}", v);
}

#[test]
fn heff1_recovers_two_site_ground_energy() {
    // Site 0 is the identity isometry, site 1 holds the singlet amplitudes.
    let s = 1.0 / 2.0_f64.sqrt();
    let a = Tensor::from_real(
        vec![Leg::trivial(1, 1), phys(), Leg::trivial(2, -1)],
        &[1.0, 0.0, 0.0, 1.0],
    )
    .unwrap();
    let b = Tensor::from_real(
        vec![Leg::trivial(2, 1), phys(), Leg::trivial(1, -1)],
        &[0.0, s, -s, 0.0],
    )
    .unwrap();
    let psi = Chain::mps(vec![a, b]).unwrap();
    let h = heisenberg(2, 1.0);
    let layers = Layers::expectation(&psi, &h);

    let mut env = ready(&layers, 1);
    let hb = env.heff1(psi.site(1), 1, &layers).unwrap();
    let e0 = C64::new(-3.0, 0.0);
    let residual = hb.add_scaled(psi.site(1), -e0).unwrap();
    assert!(residual.norm() < 1e-10, "residual {}", residual.norm());
}

#[test]
fn effective_operators_reproduce_measure() {
    let psi = random_psi(5, 3, b"heff");
    let h = random_mpo(5, b"heff-op");
    let layers = Layers::expectation(&psi, &h);

    for n in 0..5 {
        let mut env = ready(&layers, n);
        let full = env.measure(Bond::left_of(n), &layers).unwrap();

        let a = psi.site(n);
        let ha = env.heff1(a, n, &layers).unwrap();
        assert_eq!(ha.shape(), a.shape());
        assert!(close(a.vdot(&ha).unwrap(), full, 1e-10));

        if n + 1 < 5 {
            let aa = psi.merge_two_sites(n, n + 1).unwrap();
            let bond = Bond::new(n as isize, n as isize + 1);
            let haa = env.heff2(&aa, bond, &layers).unwrap();
            assert_eq!(haa.shape(), aa.shape());
            assert!(close(aa.vdot(&haa).unwrap(), full, 1e-10));
        }

        // Zero-site operator on the identity of the bond left of site n.
        let d = psi.site(n).shape()[0];
        let c = Tensor::eye(Leg::trivial(d, 1), Leg::trivial(d, -1)).unwrap();
        let hc = env.heff0(&c, Bond::left_of(n), &layers).unwrap();
        assert!(close(c.vdot(&hc).unwrap(), full, 1e-10));
    }
}

#[test]
fn heff2_ignores_bond_orientation() {
    let psi = random_psi(4, 3, b"orient");
    let h = random_mpo(4, b"orient-op");
    let layers = Layers::expectation(&psi, &h);
    let mut env = ready(&layers, 1);
    let aa = psi.merge_two_sites(1, 2).unwrap();
    let fwd = env.heff2(&aa, Bond::new(1, 2), &layers).unwrap();
    let bwd = env.heff2(&aa, Bond::new(2, 1), &layers).unwrap();
    assert!(fwd.max_abs_diff(&bwd).unwrap() == 0.0);
}

#[test]
fn heff1_is_scaled_by_operator_factor() {
    let psi = random_psi(3, 2, b"scale");
    let mut h = random_mpo(3, b"scale-op");
    let layers = Layers::expectation(&psi, &h);
    let plain = ready(&layers, 1).heff1(psi.site(1), 1, &layers).unwrap();

    h.set_factor(C64::new(0.0, 3.0));
    let layers = Layers::expectation(&psi, &h);
    let scaled = ready(&layers, 1).heff1(psi.site(1), 1, &layers).unwrap();
    let expect = plain.scale(C64::new(0.0, 3.0));
    assert!(scaled.max_abs_diff(&expect).unwrap() < 1e-12);
}

#[test]
fn hole_closes_to_measure() {
    let psi = random_psi(4, 3, b"hole");
    let h = random_mpo(4, b"hole-op");
    let layers = Layers::expectation(&psi, &h);
    for n in 0..4 {
        let env = ready(&layers, n);
        let hole = env.hole(n, &layers).unwrap();
        let closed = hole
            .tensordot(h.site(n), &[0, 1, 2, 3], &[0, 1, 2, 3])
            .unwrap()
            .to_number()
            .unwrap();
        let full = env.measure(Bond::left_of(n), &layers).unwrap();
        assert!(close(closed, full, 1e-10));
    }
}

#[test]
fn heff1_requires_both_boundaries() {
    let psi = random_psi(4, 2, b"missing");
    let h = random_mpo(4, b"missing-op");
    let layers = Layers::expectation(&psi, &h);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    let err = env.heff1(psi.site(2), 2, &layers).unwrap_err();
    assert!(matches!(err, EnvError::MissingBoundary { .. }));
    let err = env.heff1(psi.site(0), 4, &layers).unwrap_err();
    assert_eq!(err, EnvError::SiteOutOfRange { site: 4, len: 4 });
}

#[test]
fn physical_mismatch_is_rejected() {
    let psi = random_psi(3, 2, b"phys");
    let wide = Leg::trivial(3, 1);
    let op = Chain::identity_mpo(3, &wide).unwrap();
    let err = EnvironmentEngine::new(&Layers::expectation(&psi, &op), Vec::new()).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)));
}

#[test]
fn end_dimension_mismatch_is_rejected() {
    let mut rng = XofRng::new(b"ends");
    let bra = Chain::random_mps_with_bonds(&phys(), &[2, 2, 2, 2], &mut rng).unwrap();
    let ket = Chain::random_mps_with_bonds(&phys(), &[3, 3, 3, 3], &mut rng).unwrap();
    let id = Chain::identity_mpo(3, &phys()).unwrap();

    let err = EnvironmentEngine::new(&Layers::sandwich(&bra, &id, &ket), Vec::new()).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)), "{:?}", err);
    let err = EnvironmentEngine::new(&Layers::overlap(&bra, &ket), Vec::new()).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)), "{:?}", err);
}

#[test]
fn enlarge_bond_follows_state_and_limits() {
    let h = heisenberg(4, 1.0);
    let trunc = Truncation::default();

    // Bond dimension one everywhere: every inner bond can grow.
    let thin = random_psi(4, 1, b"thin");
    let layers = Layers::expectation(&thin, &h);
    let env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    assert!(env.enlarge_bond(Bond::new(1, 2), &layers, &trunc).unwrap());
    assert!(env.enlarge_bond(Bond::new(2, 1), &layers, &trunc).unwrap());
    assert!(!env.enlarge_bond(Bond::new(-1, 0), &layers, &trunc).unwrap());
    assert!(!env.enlarge_bond(Bond::new(3, 4), &layers, &trunc).unwrap());
    let capped = Truncation {
        max_bond: 1,
        cutoff: 1e-12,
    };
    assert!(!env.enlarge_bond(Bond::new(1, 2), &layers, &capped).unwrap());

    // Every bond is as wide as one of its neighbouring sites allows.
    let full = normalized_psi(4, 4, b"full");
    let layers = Layers::expectation(&full, &h);
    let env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    for k in 0..3 {
        let bond = Bond::new(k, k + 1);
        assert!(!env.enlarge_bond(bond, &layers, &trunc).unwrap(), "{}", bond);
    }
}

#[test]
fn enlarge_bond_when_state_misses_sectors() {
    let h = heisenberg(3, 1.0);
    let mut rng = XofRng::new(b"sectors");
    // Same dimension as the spin leg, but only the up charge.
    let narrow = Leg::new(1, vec![1, 1]);
    let psi = Chain::random_mps(3, &narrow, 1, &mut rng).unwrap();
    let layers = Layers::expectation(&psi, &h);
    let env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    let capped = Truncation {
        max_bond: 1,
        cutoff: 0.0,
    };
    assert!(env.enlarge_bond(Bond::new(0, 1), &layers, &capped).unwrap());

    let overlap = Layers::overlap(&psi, &psi);
    let env = EnvironmentEngine::new(&overlap, Vec::new()).unwrap();
    let err = env.enlarge_bond(Bond::new(0, 1), &overlap, &capped).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)));
}
