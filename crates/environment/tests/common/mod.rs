#![allow(dead_code)]

use rng::XofRng;
use tn::{mpo, Chain, End, Leg, Tensor, C64};

pub fn phys() -> Leg {
    Leg::new(1, vec![1, -1])
}

fn local(data: [C64; 4]) -> Tensor {
    Tensor::from_vec(vec![phys(), phys().conj()], data.to_vec()).unwrap()
}

pub fn x() -> Tensor {
    let (z, o) = (C64::new(0.0, 0.0), C64::new(1.0, 0.0));
    local([z, o, o, z])
}

pub fn y() -> Tensor {
    let z = C64::new(0.0, 0.0);
    local([z, C64::new(0.0, -1.0), C64::new(0.0, 1.0), z])
}

pub fn z() -> Tensor {
    let (z, o) = (C64::new(0.0, 0.0), C64::new(1.0, 0.0));
    local([o, z, z, -o])
}

pub fn eye() -> Tensor {
    let (z, o) = (C64::new(0.0, 0.0), C64::new(1.0, 0.0));
    local([o, z, z, o])
}

pub fn random_psi(n: usize, d: usize, seed: &[u8]) -> Chain {
    let mut rng = XofRng::new(seed);
    Chain::random_mps(n, &phys(), d, &mut rng).unwrap()
}

/// Random purified state: MPO-shaped sites `(left, phys, right, ancilla)`.
pub fn random_purified(n: usize, d: usize, seed: &[u8]) -> Chain {
    let mut rng = XofRng::new(seed);
    let sites = (0..n)
        .map(|s| {
            let dl = if s == 0 { 1 } else { d };
            let dr = if s + 1 == n { 1 } else { d };
            let legs = vec![Leg::trivial(dl, 1), phys(), Leg::trivial(dr, -1), phys().conj()];
            Tensor::random(legs, &mut rng)
        })
        .collect();
    Chain::mpo(sites).unwrap()
}

/// Normalized random state in canonical form toward the first site.
pub fn normalized_psi(n: usize, d: usize, seed: &[u8]) -> Chain {
    let mut psi = random_psi(n, d, seed);
    psi.canonize(End::First).unwrap();
    psi.set_factor(C64::new(1.0, 0.0));
    psi
}

/// Nearest-neighbour operator with random, non-Hermitian local terms.
pub fn random_mpo(n: usize, seed: &[u8]) -> Chain {
    let mut rng = XofRng::new(seed);
    let legs = || vec![phys(), phys().conj()];
    let onsite: Vec<Tensor> = (0..n).map(|_| Tensor::random(legs(), &mut rng)).collect();
    let pairs = vec![
        (Tensor::random(legs(), &mut rng), Tensor::random(legs(), &mut rng)),
        (Tensor::random(legs(), &mut rng), Tensor::random(legs(), &mut rng)),
    ];
    let couplings: Vec<Vec<C64>> = (1..n)
        .map(|_| {
            (0..2)
                .map(|_| C64::new(rng.normal(b"J"), 0.0))
                .collect()
        })
        .collect();
    mpo::nearest_neighbor(&phys(), &onsite, &pairs, &couplings).unwrap()
}

pub fn heisenberg(n: usize, j: f64) -> Chain {
    let zero = Tensor::zeros(vec![phys(), phys().conj()]);
    let pairs = vec![(x(), x()), (y(), y()), (z(), z())];
    let couplings = vec![vec![C64::new(j, 0.0); 3]; n - 1];
    mpo::nearest_neighbor(&phys(), &vec![zero; n], &pairs, &couplings).unwrap()
}

/// Heisenberg ring: the open chain plus the bond between the two ends.
pub fn heisenberg_ring(n: usize, j: f64) -> Chain {
    let mut parts = vec![mpo::to_periodic(&heisenberg(n, j)).unwrap()];
    for p in [x(), y(), z()] {
        let ops: Vec<Tensor> = (0..n)
            .map(|s| if s == 0 || s + 1 == n { p.clone() } else { eye() })
            .collect();
        let mut term = mpo::product(&phys(), &ops).unwrap();
        term.set_factor(C64::new(j, 0.0));
        parts.push(term);
    }
    mpo::periodic_direct_sum(&parts).unwrap()
}

/// `<bra|ket>` from the fully contracted chains, boundary indices paired.
pub fn dense_overlap(bra: &Chain, ket: &Chain) -> C64 {
    let b = bra.to_dense().unwrap();
    let k = ket.to_dense().unwrap();
    let raw: C64 = b.vdot(&k).unwrap();
    bra.factor().conj() * ket.factor() * raw
}

/// `<bra| op |ket>` from dense vectors and the dense operator matrix.
pub fn dense_sandwich(bra: &Chain, op: &Chain, ket: &Chain) -> C64 {
    let b = bra.to_dense().unwrap();
    let k = ket.to_dense().unwrap();
    let h = op.to_dense_operator().unwrap();
    let dim = h.shape()[0];
    let mut acc = C64::new(0.0, 0.0);
    for o in 0..dim {
        for i in 0..dim {
            acc += b.data()[o].conj() * h.get(&[o, i]) * k.data()[i];
        }
    }
    bra.factor().conj() * op.factor() * ket.factor() * acc
}

pub fn close(a: C64, b: C64, tol: f64) -> bool {
    (a - b).norm() <= tol * (1.0 + b.norm())
}
