use crate::error::{Result, TnError};
use crate::leg::Leg;
use crate::linalg::svd_split;
use crate::tensor::{Tensor, C64};
use crate::truncation::Truncation;
use log::debug;
use rng::XofRng;

/// Role of the local tensors of a chain.
///
/// MPS sites have legs `(left, phys, right)`; MPO sites have legs
/// `(left, out, right, in)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainKind {
    Mps,
    Mpo,
}

/// Which end of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum End {
    First,
    Last,
}

/// Ordered sequence of local tensors with a global scale factor kept apart
/// from the tensor contents.
///
/// A periodic chain is read as the trace over its first and last virtual legs.
#[derive(Clone, Debug)]
pub struct Chain {
    kind: ChainKind,
    sites: Vec<Tensor>,
    factor: C64,
    periodic: bool,
}

impl Chain {
    fn build(kind: ChainKind, sites: Vec<Tensor>, periodic: bool) -> Result<Self> {
        let rank = match kind {
            ChainKind::Mps => 3,
            ChainKind::Mpo => 4,
        };
        if sites.is_empty() {
            return Err(TnError::InvalidChain("chain has no sites".into()));
        }
        for s in &sites {
            if s.rank() != rank {
                return Err(TnError::RankMismatch {
                    expected: rank,
                    actual: s.rank(),
                });
            }
        }
        for (n, pair) in sites.windows(2).enumerate() {
            let dr = pair[0].leg(2).dim();
            let dl = pair[1].leg(0).dim();
            if dr != dl {
                return Err(TnError::InvalidChain(format!(
                    "bond ({}, {}) has dimensions {} and {}",
                    n,
                    n + 1,
                    dr,
                    dl
                )));
            }
        }
        if periodic {
            let first = sites[0].leg(0).dim();
            let last = sites[sites.len() - 1].leg(2).dim();
            if first != last {
                return Err(TnError::InvalidChain(format!(
                    "periodic chain closes dimensions {} and {}",
                    last, first
                )));
            }
        }
        Ok(Self {
            kind,
            sites,
            factor: C64::new(1.0, 0.0),
            periodic,
        })
    }

    pub fn mps(sites: Vec<Tensor>) -> Result<Self> {
        Self::build(ChainKind::Mps, sites, false)
    }

    pub fn mpo(sites: Vec<Tensor>) -> Result<Self> {
        Self::build(ChainKind::Mpo, sites, false)
    }

    /// MPO read as the trace over its boundary virtual legs.
    pub fn periodic_mpo(sites: Vec<Tensor>) -> Result<Self> {
        Self::build(ChainKind::Mpo, sites, true)
    }

    /// Product state from one local vector per site.
    pub fn product_state(phys: &Leg, vectors: &[Vec<C64>]) -> Result<Self> {
        let sites = vectors
            .iter()
            .map(|v| {
                let legs = vec![Leg::trivial(1, 1), phys.clone(), Leg::trivial(1, -1)];
                Tensor::from_vec(legs, v.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Self::mps(sites)
    }

    /// Random MPS with the given virtual dimensions; `bonds` has one entry
    /// per bond including both ends, so `bonds.len() == n + 1`.
    pub fn random_mps_with_bonds(phys: &Leg, bonds: &[usize], rng: &mut XofRng) -> Result<Self> {
        if bonds.len() < 2 {
            return Err(TnError::InvalidChain("need at least two bond dimensions".into()));
        }
        let sites = bonds
            .windows(2)
            .map(|d| {
                let legs = vec![Leg::trivial(d[0], 1), phys.clone(), Leg::trivial(d[1], -1)];
                Tensor::random(legs, rng)
            })
            .collect();
        Self::mps(sites)
    }

    /// Random MPS of `n` sites with bulk bond dimension `d_max` and
    /// one-dimensional ends.
    pub fn random_mps(n: usize, phys: &Leg, d_max: usize, rng: &mut XofRng) -> Result<Self> {
        let bonds: Vec<usize> = (0..=n)
            .map(|b| if b == 0 || b == n { 1 } else { d_max })
            .collect();
        Self::random_mps_with_bonds(phys, &bonds, rng)
    }

    /// Identity operator on `n` sites of space `phys`.
    pub fn identity_mpo(n: usize, phys: &Leg) -> Result<Self> {
        let d = phys.dim();
        let sites = (0..n)
            .map(|_| {
                let legs = vec![
                    Leg::trivial(1, 1),
                    phys.clone(),
                    Leg::trivial(1, -1),
                    phys.conj(),
                ];
                let mut w = Tensor::zeros(legs);
                for p in 0..d {
                    w.set(&[0, p, 0, p], C64::new(1.0, 0.0));
                }
                w
            })
            .collect();
        Self::mpo(sites)
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn site(&self, n: usize) -> &Tensor {
        &self.sites[n]
    }

    pub fn sites(&self) -> &[Tensor] {
        &self.sites
    }

    /// Replace the tensor at `n`. Environments built on this chain must be
    /// cleared at `n` by their owner.
    pub fn set_site(&mut self, n: usize, t: Tensor) -> Result<()> {
        if n >= self.len() {
            return Err(TnError::InvalidChain(format!(
                "site {} of a {}-site chain",
                n,
                self.len()
            )));
        }
        if t.rank() != self.sites[n].rank() {
            return Err(TnError::RankMismatch {
                expected: self.sites[n].rank(),
                actual: t.rank(),
            });
        }
        self.sites[n] = t;
        Ok(())
    }

    pub fn factor(&self) -> C64 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: C64) {
        self.factor = factor;
    }

    /// Outer virtual leg at the given end.
    pub fn virtual_leg(&self, end: End) -> &Leg {
        match end {
            End::First => self.sites[0].leg(0),
            End::Last => self.sites[self.len() - 1].leg(2),
        }
    }

    /// Physical dimensions at site `n`: `(out, in)`; equal for an MPS.
    pub fn phys_dims(&self, n: usize) -> (usize, usize) {
        let s = &self.sites[n];
        match self.kind {
            ChainKind::Mps => (s.leg(1).dim(), s.leg(1).dim()),
            ChainKind::Mpo => (s.leg(1).dim(), s.leg(3).dim()),
        }
    }

    pub fn bond_dims(&self) -> Vec<usize> {
        let mut dims: Vec<usize> = self.sites.iter().map(|s| s.leg(0).dim()).collect();
        dims.push(self.virtual_leg(End::Last).dim());
        dims
    }

    /// Two neighbouring MPS sites contracted into `(left, p1, p2, right)`.
    pub fn merge_two_sites(&self, n1: usize, n2: usize) -> Result<Tensor> {
        if n2 != n1 + 1 || n2 >= self.len() {
            return Err(TnError::InvalidChain(format!(
                "sites {} and {} are not neighbours",
                n1, n2
            )));
        }
        self.sites[n1].tensordot(&self.sites[n2], &[2], &[0])
    }

    /// MPS contracted to one tensor `(left, phys, right)` with the physical
    /// legs fused in site order. The factor is not applied.
    pub fn to_dense(&self) -> Result<Tensor> {
        if self.kind != ChainKind::Mps {
            return Err(TnError::InvalidChain("to_dense expects an MPS".into()));
        }
        let mut acc = self.sites[0].clone();
        for site in &self.sites[1..] {
            let t = acc.tensordot(site, &[2], &[0])?;
            acc = t.fuse_legs(&[vec![0], vec![1, 2], vec![3]])?;
        }
        Ok(acc)
    }

    /// MPO contracted to a matrix `(out, in)`. Open chains are summed over
    /// their boundary virtual indices, periodic chains are traced. The factor
    /// is not applied.
    pub fn to_dense_operator(&self) -> Result<Tensor> {
        if self.kind != ChainKind::Mpo {
            return Err(TnError::InvalidChain("to_dense_operator expects an MPO".into()));
        }
        let mut acc = self.sites[0].clone();
        for site in &self.sites[1..] {
            // (l, O, I, o, r, i) -> (l, O o, r, I i)
            let t = acc.tensordot(site, &[2], &[0])?;
            acc = t.fuse_legs(&[vec![0], vec![1, 3], vec![4], vec![2, 5]])?;
        }
        let dims = acc.shape();
        let legs = vec![acc.leg(1).clone(), acc.leg(3).clone()];
        let mut out = Tensor::zeros(legs);
        for o in 0..dims[1] {
            for i in 0..dims[3] {
                let mut v = C64::new(0.0, 0.0);
                for l in 0..dims[0] {
                    if self.periodic {
                        v += acc.get(&[l, o, l, i]);
                    } else {
                        for r in 0..dims[2] {
                            v += acc.get(&[l, o, r, i]);
                        }
                    }
                }
                out.set(&[o, i], v);
            }
        }
        Ok(out)
    }

    /// Bring an MPS into canonical form toward `end` by successive SVDs; the
    /// norm moves into the factor.
    ///
    /// `End::First` leaves sites `1..n` right-orthonormal with the weight on
    /// site 0; `End::Last` leaves sites `0..n-1` left-orthonormal.
    pub fn canonize(&mut self, end: End) -> Result<()> {
        if self.kind != ChainKind::Mps {
            return Err(TnError::InvalidChain("canonize expects an MPS".into()));
        }
        let n = self.len();
        let trunc = Truncation::exact();
        match end {
            End::First => {
                for k in (1..n).rev() {
                    let split = svd_split(&self.sites[k], 1, &trunc)?;
                    let us = split.u.scale_axis(1, &split.s)?;
                    self.sites[k] = split.vh;
                    self.sites[k - 1] = self.sites[k - 1].tensordot(&us, &[2], &[0])?;
                }
            }
            End::Last => {
                for k in 0..n - 1 {
                    let split = svd_split(&self.sites[k], 2, &trunc)?;
                    let svh = split.vh.scale_axis(0, &split.s)?;
                    self.sites[k] = split.u;
                    self.sites[k + 1] = svh.tensordot(&self.sites[k + 1], &[1], &[0])?;
                }
            }
        }
        let k = match end {
            End::First => 0,
            End::Last => n - 1,
        };
        let norm = self.sites[k].norm();
        if norm > 0.0 {
            self.sites[k] = self.sites[k].scale(C64::new(1.0 / norm, 0.0));
            self.factor *= norm;
        }
        debug!("canonized {}-site chain toward {:?}, norm {:.6e}", n, end, norm);
        Ok(())
    }
}
