use crate::error::{Result, TnError};
use crate::leg::Leg;
use crate::linalg;
use num_complex::Complex64;
use rng::XofRng;

pub type C64 = Complex64;

const ZERO: C64 = C64::new(0.0, 0.0);
const ONE: C64 = C64::new(1.0, 0.0);

/// Dense row-major tensor with a `Leg` descriptor per axis.
#[derive(Clone, Debug)]
pub struct Tensor {
    legs: Vec<Leg>,
    data: Vec<C64>,
}

fn volume(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn strides(dims: &[usize]) -> Vec<usize> {
    let mut s = vec![1usize; dims.len()];
    for ax in (0..dims.len().saturating_sub(1)).rev() {
        s[ax] = s[ax + 1] * dims[ax + 1];
    }
    s
}

/// Advance a row-major multi-index; returns false after the last one.
fn increment(idx: &mut [usize], dims: &[usize]) -> bool {
    for ax in (0..dims.len()).rev() {
        idx[ax] += 1;
        if idx[ax] < dims[ax] {
            return true;
        }
        idx[ax] = 0;
    }
    false
}

fn check_axes(axes: &[usize], rank: usize) -> Result<()> {
    let mut seen = vec![false; rank];
    for &ax in axes {
        if ax >= rank || seen[ax] {
            return Err(TnError::InvalidAxes {
                axes: axes.to_vec(),
                rank,
            });
        }
        seen[ax] = true;
    }
    Ok(())
}

impl Tensor {
    pub fn zeros(legs: Vec<Leg>) -> Self {
        let n = legs.iter().map(Leg::dim).product();
        Self {
            legs,
            data: vec![ZERO; n],
        }
    }

    pub fn from_vec(legs: Vec<Leg>, data: Vec<C64>) -> Result<Self> {
        let expected: usize = legs.iter().map(Leg::dim).product();
        if expected != data.len() {
            return Err(TnError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { legs, data })
    }

    pub fn from_real(legs: Vec<Leg>, data: &[f64]) -> Result<Self> {
        Self::from_vec(legs, data.iter().map(|&x| C64::new(x, 0.0)).collect())
    }

    /// Rank-0 tensor holding `value`.
    pub fn scalar(value: C64) -> Self {
        Self {
            legs: Vec::new(),
            data: vec![value],
        }
    }

    /// Identity between two legs of equal dimension.
    pub fn eye(a: Leg, b: Leg) -> Result<Self> {
        if a.dim() != b.dim() {
            return Err(TnError::ShapeMismatch {
                expected: vec![a.dim(), a.dim()],
                actual: vec![a.dim(), b.dim()],
            });
        }
        let d = a.dim();
        let mut t = Self::zeros(vec![a, b]);
        for i in 0..d {
            t.data[i * d + i] = ONE;
        }
        Ok(t)
    }

    /// Ones on every entry whose signed charges add up to zero.
    pub fn ones(legs: Vec<Leg>) -> Self {
        let mut t = Self::zeros(legs);
        let dims = t.shape();
        if t.data.is_empty() {
            return t;
        }
        let mut idx = vec![0usize; dims.len()];
        let mut off = 0;
        loop {
            let total: i64 = t
                .legs
                .iter()
                .zip(&idx)
                .map(|(leg, &i)| leg.sig() as i64 * leg.charge(i))
                .sum();
            if total == 0 {
                t.data[off] = ONE;
            }
            off += 1;
            if !increment(&mut idx, &dims) {
                break;
            }
        }
        t
    }

    /// Complex Gaussian entries drawn from `rng`.
    pub fn random(legs: Vec<Leg>, rng: &mut XofRng) -> Self {
        let mut t = Self::zeros(legs);
        for v in t.data.iter_mut() {
            *v = C64::new(rng.normal(b"TENSOR_RE"), rng.normal(b"TENSOR_IM"));
        }
        t
    }

    pub fn rank(&self) -> usize {
        self.legs.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.legs.iter().map(Leg::dim).collect()
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn leg(&self, axis: usize) -> &Leg {
        &self.legs[axis]
    }

    pub fn data(&self) -> &[C64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, idx: &[usize]) -> usize {
        let dims = self.shape();
        idx.iter().zip(strides(&dims)).map(|(&i, s)| i * s).sum()
    }

    pub fn get(&self, idx: &[usize]) -> C64 {
        self.data[self.offset(idx)]
    }

    pub fn set(&mut self, idx: &[usize], v: C64) {
        let i = self.offset(idx);
        self.data[i] = v;
    }

    /// Replace leg descriptors without touching data; dimensions must agree.
    pub fn with_legs(mut self, legs: Vec<Leg>) -> Result<Self> {
        let dims: Vec<usize> = legs.iter().map(Leg::dim).collect();
        if dims != self.shape() {
            return Err(TnError::ShapeMismatch {
                expected: self.shape(),
                actual: dims,
            });
        }
        self.legs = legs;
        Ok(self)
    }

    /// Complex conjugate; every leg signature flips.
    pub fn conj(&self) -> Self {
        Self {
            legs: self.legs.iter().map(Leg::conj).collect(),
            data: self.data.iter().map(|v| v.conj()).collect(),
        }
    }

    /// Hermitian transpose: conjugate and reverse the leg order.
    pub fn adjoint(&self) -> Result<Self> {
        let perm: Vec<usize> = (0..self.rank()).rev().collect();
        self.conj().transpose(&perm)
    }

    pub fn transpose(&self, perm: &[usize]) -> Result<Self> {
        let rank = self.rank();
        if perm.len() != rank {
            return Err(TnError::InvalidAxes {
                axes: perm.to_vec(),
                rank,
            });
        }
        check_axes(perm, rank)?;
        if perm.iter().enumerate().all(|(i, &p)| i == p) {
            return Ok(self.clone());
        }

        let dims = self.shape();
        let src = strides(&dims);
        let new_dims: Vec<usize> = perm.iter().map(|&p| dims[p]).collect();
        let mut data = Vec::with_capacity(self.data.len());
        if !self.data.is_empty() {
            let mut idx = vec![0usize; rank];
            loop {
                let off: usize = idx.iter().zip(perm).map(|(&i, &p)| i * src[p]).sum();
                data.push(self.data[off]);
                if !increment(&mut idx, &new_dims) {
                    break;
                }
            }
        }
        Ok(Self {
            legs: perm.iter().map(|&p| self.legs[p].clone()).collect(),
            data,
        })
    }

    /// Contract `axes_a` of `self` with `axes_b` of `other`. The result keeps
    /// the free legs of `self` followed by the free legs of `other`.
    pub fn tensordot(&self, other: &Tensor, axes_a: &[usize], axes_b: &[usize]) -> Result<Self> {
        if axes_a.len() != axes_b.len() {
            return Err(TnError::InvalidAxes {
                axes: axes_b.to_vec(),
                rank: other.rank(),
            });
        }
        check_axes(axes_a, self.rank())?;
        check_axes(axes_b, other.rank())?;
        for (&a, &b) in axes_a.iter().zip(axes_b) {
            if self.legs[a].dim() != other.legs[b].dim() {
                return Err(TnError::ShapeMismatch {
                    expected: axes_a.iter().map(|&x| self.legs[x].dim()).collect(),
                    actual: axes_b.iter().map(|&x| other.legs[x].dim()).collect(),
                });
            }
        }

        let free_a: Vec<usize> = (0..self.rank()).filter(|ax| !axes_a.contains(ax)).collect();
        let free_b: Vec<usize> = (0..other.rank()).filter(|ax| !axes_b.contains(ax)).collect();

        let perm_a: Vec<usize> = free_a.iter().chain(axes_a).copied().collect();
        let perm_b: Vec<usize> = axes_b.iter().chain(&free_b).copied().collect();
        let ta = self.transpose(&perm_a)?;
        let tb = other.transpose(&perm_b)?;

        let m = volume(&free_a.iter().map(|&x| self.legs[x].dim()).collect::<Vec<_>>());
        let k = volume(&axes_a.iter().map(|&x| self.legs[x].dim()).collect::<Vec<_>>());
        let n = volume(&free_b.iter().map(|&x| other.legs[x].dim()).collect::<Vec<_>>());

        let legs = free_a
            .iter()
            .map(|&x| self.legs[x].clone())
            .chain(free_b.iter().map(|&x| other.legs[x].clone()))
            .collect();
        Ok(Self {
            legs,
            data: linalg::matmul(&ta.data, &tb.data, m, k, n),
        })
    }

    /// Fuse groups of legs. Groups must cover every axis exactly once; the
    /// tensor is first permuted into group order.
    pub fn fuse_legs(&self, groups: &[Vec<usize>]) -> Result<Self> {
        let perm: Vec<usize> = groups.iter().flatten().copied().collect();
        let t = self.transpose(&perm)?;
        let legs = groups
            .iter()
            .map(|g| {
                if g.len() == 1 {
                    self.legs[g[0]].clone()
                } else {
                    Leg::fuse(&g.iter().map(|&x| self.legs[x].clone()).collect::<Vec<_>>())
                }
            })
            .collect();
        Ok(Self { legs, data: t.data })
    }

    /// Split a fused leg back into the legs it was built from.
    pub fn unfuse_leg(&self, axis: usize) -> Result<Self> {
        if axis >= self.rank() {
            return Err(TnError::InvalidAxes {
                axes: vec![axis],
                rank: self.rank(),
            });
        }
        let subs = self.legs[axis].subs().ok_or(TnError::NotFused(axis))?;
        let mut legs = Vec::with_capacity(self.rank() + subs.len() - 1);
        legs.extend_from_slice(&self.legs[..axis]);
        legs.extend_from_slice(subs);
        legs.extend_from_slice(&self.legs[axis + 1..]);
        Ok(Self {
            legs,
            data: self.data.clone(),
        })
    }

    fn check_same_shape(&self, other: &Tensor) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(TnError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    /// Inner product `<self|other>`, conjugating `self`.
    pub fn vdot(&self, other: &Tensor) -> Result<C64> {
        self.check_same_shape(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a.conj() * b)
            .sum())
    }

    pub fn norm(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
    }

    pub fn scale(&self, alpha: C64) -> Self {
        Self {
            legs: self.legs.clone(),
            data: self.data.iter().map(|v| v * alpha).collect(),
        }
    }

    /// `self + alpha * other`; legs of `self` are kept.
    pub fn add_scaled(&self, other: &Tensor, alpha: C64) -> Result<Self> {
        self.check_same_shape(other)?;
        Ok(Self {
            legs: self.legs.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a + alpha * b)
                .collect(),
        })
    }

    /// Multiply slices along `axis` by the matching entry of `weights`.
    pub fn scale_axis(&self, axis: usize, weights: &[f64]) -> Result<Self> {
        if axis >= self.rank() {
            return Err(TnError::InvalidAxes {
                axes: vec![axis],
                rank: self.rank(),
            });
        }
        let dims = self.shape();
        if weights.len() != dims[axis] {
            return Err(TnError::ShapeMismatch {
                expected: vec![dims[axis]],
                actual: vec![weights.len()],
            });
        }
        let inner: usize = dims[axis + 1..].iter().product();
        let mut out = self.clone();
        for (i, v) in out.data.iter_mut().enumerate() {
            *v *= weights[(i / inner) % dims[axis]];
        }
        Ok(out)
    }

    /// Value of a tensor with exactly one element.
    pub fn to_number(&self) -> Result<C64> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            other => Err(TnError::NotScalar(other.len())),
        }
    }

    pub fn max_abs_diff(&self, other: &Tensor) -> Result<f64> {
        self.check_same_shape(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max))
    }
}
