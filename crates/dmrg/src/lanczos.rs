//! Lowest eigenpair of a Hermitian linear map given only its action.

use crate::error::{DmrgError, Result};
use faer::{Mat, Side};
use log::debug;
use num_complex::Complex64;
use tn::Tensor;

type C64 = Complex64;

#[derive(Clone, Copy, Debug)]
pub struct LanczosOptions {
    /// Krylov vectors per restart.
    pub krylov: usize,
    /// Residual norm `|Hx - ex|` accepted as converged.
    pub tol: f64,
    pub max_restarts: usize,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            krylov: 30,
            tol: 1e-10,
            max_restarts: 20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Eigenpair {
    pub value: f64,
    /// Normalized eigenvector.
    pub vector: Tensor,
    pub residual: f64,
    /// Applications of the map, restarts included.
    pub applications: usize,
}

/// Eigenvalues of a Hermitian matrix in ascending order, with eigenvectors as
/// the columns of the returned matrix. Only the lower triangle is read.
pub fn hermitian_spectrum(h: &Mat<C64>) -> (Vec<f64>, Mat<C64>) {
    let n = h.nrows();
    let evd = h.selfadjoint_eigendecomposition(Side::Lower);
    let u = evd.u();
    // Rayleigh quotients of the unit eigenvectors give the eigenvalues.
    let rayleigh = |k: usize| {
        let mut acc = C64::new(0.0, 0.0);
        for i in 0..n {
            let hu = (0..n)
                .map(|j| {
                    let hij = if i >= j { h.read(i, j) } else { h.read(j, i).conj() };
                    hij * u.read(j, k)
                })
                .sum::<C64>();
            acc += u.read(i, k).conj() * hu;
        }
        acc.re
    };
    let mut pairs: Vec<(f64, usize)> = (0..u.ncols()).map(|k| (rayleigh(k), k)).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let values = pairs.iter().map(|p| p.0).collect();
    let vectors = Mat::<C64>::from_fn(n, pairs.len(), |i, k| u.read(i, pairs[k].1));
    (values, vectors)
}

/// Ascending eigenvalues of a Hermitian `(out, in)` operator tensor.
pub fn dense_spectrum(op: &Tensor) -> Result<Vec<f64>> {
    let dims = op.shape();
    if dims.len() != 2 || dims[0] != dims[1] {
        return Err(DmrgError::InvalidOptions(format!(
            "dense spectrum needs a square matrix, got shape {:?}",
            dims
        )));
    }
    let n = dims[0];
    let h = Mat::<C64>::from_fn(n, n, |i, j| op.get(&[i, j]));
    Ok(hermitian_spectrum(&h).0)
}

fn ritz_pair(alpha: &[f64], beta: &[f64]) -> (f64, Vec<C64>) {
    let m = alpha.len();
    let t = Mat::<C64>::from_fn(m, m, |i, j| {
        if i == j {
            C64::new(alpha[i], 0.0)
        } else if i + 1 == j {
            C64::new(beta[i], 0.0)
        } else if j + 1 == i {
            C64::new(beta[j], 0.0)
        } else {
            C64::new(0.0, 0.0)
        }
    });
    let (values, vectors) = hermitian_spectrum(&t);
    let y = (0..m).map(|i| vectors.read(i, 0)).collect();
    (values[0], y)
}

/// Restarted Lanczos with full re-orthogonalization, started from `x0`.
pub fn lowest_eigenpair<F>(mut apply: F, x0: &Tensor, opts: &LanczosOptions) -> Result<Eigenpair>
where
    F: FnMut(&Tensor) -> std::result::Result<Tensor, environment::EnvError>,
{
    if opts.krylov == 0 {
        return Err(DmrgError::InvalidOptions("krylov size must be positive".into()));
    }
    let dim = x0.len();
    let mut x = x0.clone();
    let mut applications = 0;
    let mut best: Option<Eigenpair> = None;

    for restart in 0..=opts.max_restarts {
        let norm = x.norm();
        if norm == 0.0 {
            return Err(DmrgError::Breakdown("zero start vector".into()));
        }
        let mut basis = vec![x.scale(C64::new(1.0 / norm, 0.0))];
        let mut alpha = Vec::new();
        let mut beta: Vec<f64> = Vec::new();

        for j in 0..opts.krylov.min(dim) {
            let mut w = apply(&basis[j])?;
            applications += 1;
            let a = basis[j].vdot(&w)?.re;
            alpha.push(a);
            w = w.add_scaled(&basis[j], C64::new(-a, 0.0))?;
            if j > 0 {
                w = w.add_scaled(&basis[j - 1], C64::new(-beta[j - 1], 0.0))?;
            }
            for v in &basis {
                let c = v.vdot(&w)?;
                w = w.add_scaled(v, -c)?;
            }
            let b = w.norm();
            if b < 1e-14 || j + 1 == opts.krylov.min(dim) {
                break;
            }
            beta.push(b);
            basis.push(w.scale(C64::new(1.0 / b, 0.0)));
        }

        let (value, y) = ritz_pair(&alpha, &beta);
        let mut vector = basis[0].scale(y[0]);
        for (v, c) in basis.iter().zip(&y).skip(1) {
            vector = vector.add_scaled(v, *c)?;
        }
        let n = vector.norm();
        if n == 0.0 {
            return Err(DmrgError::Breakdown("ritz vector vanished".into()));
        }
        vector = vector.scale(C64::new(1.0 / n, 0.0));

        let hv = apply(&vector)?;
        applications += 1;
        let residual = hv.add_scaled(&vector, C64::new(-value, 0.0))?.norm();
        x = vector.clone();
        best = Some(Eigenpair {
            value,
            vector,
            residual,
            applications,
        });
        if residual <= opts.tol {
            debug!(
                "lanczos converged: e = {:.12}, residual {:.2e}, {} restarts",
                value, residual, restart
            );
            break;
        }
    }
    best.ok_or_else(|| DmrgError::Breakdown("no iterations performed".into()))
}
