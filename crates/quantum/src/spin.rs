//! Spin-1/2 site space and Pauli matrices as `(out, in)` tensors.

use num_complex::Complex64;
use tn::{Leg, Result, Tensor};

pub type C64 = Complex64;
pub type Local = [[C64; 2]; 2];

/// Physical leg of one spin; the basis is (up, down) with charges 2Sz.
pub fn phys_leg() -> Leg {
    Leg::new(1, vec![1, -1])
}

pub fn identity() -> Local {
    let z = C64::new(0.0, 0.0);
    let o = C64::new(1.0, 0.0);
    [[o, z], [z, o]]
}

pub fn pauli_x() -> Local {
    let z = C64::new(0.0, 0.0);
    let o = C64::new(1.0, 0.0);
    [[z, o], [o, z]]
}

pub fn pauli_y() -> Local {
    let z = C64::new(0.0, 0.0);
    let i = C64::new(0.0, 1.0);
    let ni = C64::new(0.0, -1.0);
    [[z, ni], [i, z]]
}

pub fn pauli_z() -> Local {
    let z = C64::new(0.0, 0.0);
    let o = C64::new(1.0, 0.0);
    let m = C64::new(-1.0, 0.0);
    [[o, z], [z, m]]
}

pub fn zero() -> Local {
    [[C64::new(0.0, 0.0); 2]; 2]
}

/// `a * x + b * y`
pub fn combine(a: f64, x: Local, b: f64, y: Local) -> Local {
    let mut out = zero();
    for i in 0..2 {
        for j in 0..2 {
            out[i][j] = x[i][j] * a + y[i][j] * b;
        }
    }
    out
}

pub fn to_tensor(m: Local) -> Result<Tensor> {
    let data = m.iter().flatten().copied().collect();
    Tensor::from_vec(vec![phys_leg(), phys_leg().conj()], data)
}
