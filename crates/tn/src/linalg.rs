use crate::error::{Result, TnError};
use crate::leg::Leg;
use crate::tensor::{Tensor, C64};
use crate::truncation::Truncation;
use faer::Mat;

/// Row-major `(m x k) * (k x n)` product.
pub(crate) fn matmul(a: &[C64], b: &[C64], m: usize, k: usize, n: usize) -> Vec<C64> {
    if m == 0 || n == 0 {
        return Vec::new();
    }
    if k == 0 {
        return vec![C64::new(0.0, 0.0); m * n];
    }
    let am = Mat::<C64>::from_fn(m, k, |i, j| a[i * k + j]);
    let bm = Mat::<C64>::from_fn(k, n, |i, j| b[i * n + j]);
    let cm = &am * &bm;

    let mut out = Vec::with_capacity(m * n);
    for i in 0..m {
        for j in 0..n {
            out.push(cm.read(i, j));
        }
    }
    out
}

/// Result of splitting a tensor into `u * diag(s) * vh`.
pub struct SvdSplit {
    pub u: Tensor,
    pub s: Vec<f64>,
    pub vh: Tensor,
    /// Sum of squares of the dropped singular values.
    pub discarded: f64,
}

/// Thin SVD of `t` viewed as a matrix whose rows are its first `row_legs`
/// legs. The new bond is the last leg of `u` (signature -1) and the first
/// leg of `vh` (signature +1).
pub fn svd_split(t: &Tensor, row_legs: usize, trunc: &Truncation) -> Result<SvdSplit> {
    if row_legs == 0 || row_legs >= t.rank() {
        return Err(TnError::InvalidAxes {
            axes: vec![row_legs],
            rank: t.rank(),
        });
    }
    let dims = t.shape();
    let rows: usize = dims[..row_legs].iter().product();
    let cols: usize = dims[row_legs..].iter().product();
    let data = t.data();

    let theta = Mat::<C64>::from_fn(rows, cols, |i, j| data[i * cols + j]);
    let svd = theta.thin_svd();
    let s = svd.s_diagonal();

    let mut s_all = Vec::with_capacity(s.nrows());
    for i in 0..s.nrows() {
        s_all.push(s.read(i).re);
    }
    let kept = trunc.kept(&s_all);
    let discarded = s_all[kept..].iter().map(|x| x * x).sum::<f64>();

    let u_full = svd.u();
    let v_full = svd.v();

    let mut u_data = Vec::with_capacity(rows * kept);
    for i in 0..rows {
        for m in 0..kept {
            u_data.push(u_full.read(i, m));
        }
    }
    let mut vh_data = Vec::with_capacity(kept * cols);
    for m in 0..kept {
        for j in 0..cols {
            vh_data.push(v_full.read(j, m).conj());
        }
    }

    let bond = Leg::trivial(kept, -1);
    let mut u_legs: Vec<Leg> = t.legs()[..row_legs].to_vec();
    u_legs.push(bond.clone());
    let mut vh_legs = vec![bond.conj()];
    vh_legs.extend_from_slice(&t.legs()[row_legs..]);

    s_all.truncate(kept);
    Ok(SvdSplit {
        u: Tensor::from_vec(u_legs, u_data)?,
        s: s_all,
        vh: Tensor::from_vec(vh_legs, vh_data)?,
        discarded,
    })
}
