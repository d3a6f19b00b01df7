mod common;

use common::{close, dense_overlap, normalized_psi, phys, random_psi, z};
use environment::{Bond, Direction, EnvError, Environment, EnvironmentEngine, Layers};
use rng::XofRng;
use tn::{Chain, C64};

fn measured_overlap(bra: &Chain, ket: &Chain, to: Direction) -> C64 {
    let layers = Layers::overlap(bra, ket);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(to, &layers).unwrap();
    let bond = match to {
        Direction::Last => Bond::new(bra.len() as isize - 1, bra.len() as isize),
        Direction::First => Bond::default(),
    };
    env.measure(bond, &layers).unwrap()
}

#[test]
fn overlap_matches_dense_contraction() {
    for n in [1, 2, 6] {
        let bra = random_psi(n, 4, format!("bra-{}", n).as_bytes());
        let ket = random_psi(n, 3, format!("ket-{}", n).as_bytes());
        let expect = dense_overlap(&bra, &ket);
        for to in [Direction::First, Direction::Last] {
            let got = measured_overlap(&bra, &ket, to);
            assert!(close(got, expect, 1e-10), "n = {}: {} vs {}", n, got, expect);
        }
    }
}

#[test]
fn measure_agrees_on_every_bond() {
    let psi = random_psi(5, 4, b"every-bond");
    let layers = Layers::overlap(&psi, &psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(Direction::First, &layers).unwrap();
    let reference = env.measure(Bond::default(), &layers).unwrap();
    for n in 0..5 {
        env.update(n, Direction::Last, &layers).unwrap();
        let v = env.measure(Bond::new(n as isize, n as isize + 1), &layers).unwrap();
        assert!(close(v, reference, 1e-10));
        // Bond orientation does not matter.
        let w = env.measure(Bond::new(n as isize + 1, n as isize), &layers).unwrap();
        assert!(close(w, v, 1e-14));
    }
}

#[test]
fn wide_boundaries_are_paired() {
    let mut rng = XofRng::new(b"wide");
    let bra = Chain::random_mps_with_bonds(&phys(), &[2, 3, 3, 2], &mut rng).unwrap();
    let ket = Chain::random_mps_with_bonds(&phys(), &[2, 2, 4, 2], &mut rng).unwrap();
    let got = measured_overlap(&bra, &ket, Direction::Last);
    assert!(close(got, dense_overlap(&bra, &ket), 1e-10));
}

#[test]
fn factors_enter_conjugated_on_the_bra() {
    let mut bra = random_psi(3, 2, b"fbra");
    let mut ket = random_psi(3, 2, b"fket");
    let raw = measured_overlap(&bra, &ket, Direction::Last);
    bra.set_factor(C64::new(0.0, 2.0));
    ket.set_factor(C64::new(0.5, 0.0));
    let scaled = measured_overlap(&bra, &ket, Direction::Last);
    let expect = C64::new(0.0, -2.0) * C64::new(0.5, 0.0) * raw;
    assert!(close(scaled, expect, 1e-12));
}

#[test]
fn clear_then_update_restores_setup() {
    let psi = random_psi(6, 3, b"clear");
    let layers = Layers::overlap(&psi, &psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(Direction::Last, &layers).unwrap();
    let before: Vec<_> = (0..6)
        .map(|n| env.boundary(Bond::new(n, n + 1)).unwrap().clone())
        .collect();

    env.clear(&[2, 3]);
    assert!(env.boundary(Bond::new(2, 3)).is_err());
    assert!(env.boundary(Bond::new(3, 4)).is_err());
    assert!(env.boundary(Bond::new(1, 2)).is_ok());

    env.update(2, Direction::Last, &layers).unwrap();
    env.update(3, Direction::Last, &layers).unwrap();
    for n in 0..6 {
        let t = env.boundary(Bond::new(n, n + 1)).unwrap();
        assert!(t.max_abs_diff(&before[n as usize]).unwrap() < 1e-14);
    }
}

#[test]
fn terminals_exist_from_construction() {
    let psi = random_psi(4, 2, b"terminals");
    let layers = Layers::overlap(&psi, &psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.clear(&[0, 1, 2, 3]);
    assert!(env.boundary(Bond::default()).is_ok());
    assert!(env.boundary(Bond::new(4, 3)).is_ok());
}

#[test]
fn out_of_order_update_is_reported() {
    let psi = random_psi(4, 2, b"order");
    let layers = Layers::overlap(&psi, &psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    let err = env.update(2, Direction::Last, &layers).unwrap_err();
    assert_eq!(
        err,
        EnvError::MissingBoundary {
            bond: Bond::new(1, 2)
        }
    );
    let err = env.measure(Bond::new(1, 2), &layers).unwrap_err();
    assert!(matches!(err, EnvError::MissingBoundary { .. }));
}

#[test]
fn mismatched_chains_are_rejected() {
    let a = random_psi(4, 2, b"a");
    let b = random_psi(5, 2, b"b");
    let err = EnvironmentEngine::new(&Layers::overlap(&a, &b), Vec::new()).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)));

    // Same length, but the layers change shape between calls.
    let c = random_psi(5, 2, b"c");
    let layers = Layers::overlap(&b, &c);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    let err = env.update(0, Direction::Last, &Layers::overlap(&a, &a)).unwrap_err();
    assert!(matches!(err, EnvError::StructuralMismatch(_)));
}

#[test]
fn local_operator_insertion() {
    let psi = normalized_psi(4, 3, b"local-op");
    let layers = Layers::overlap(&psi, &psi);
    let mut env = EnvironmentEngine::new(&layers, Vec::new()).unwrap();
    env.setup(Direction::First, &layers).unwrap();
    env.update(0, Direction::Last, &layers).unwrap();
    env.update_with_local_op(1, Direction::Last, &z(), &layers).unwrap();
    let via_last = env.measure(Bond::new(1, 2), &layers).unwrap();

    env.setup(Direction::Last, &layers).unwrap();
    env.update(3, Direction::First, &layers).unwrap();
    env.update(2, Direction::First, &layers).unwrap();
    env.update_with_local_op(1, Direction::First, &z(), &layers).unwrap();
    let via_first = env.measure(Bond::new(1, 0), &layers).unwrap();

    assert!(close(via_last, via_first, 1e-10));
    assert!(via_last.im.abs() < 1e-10);
    assert!(via_last.re.abs() <= 1.0 + 1e-10);
}
