use crate::bond::{Bond, Direction};
use crate::cache::BoundaryCache;
use crate::engine::{check_site, Environment};
use crate::error::{EnvError, Result};
use crate::layers::Layers;
use crate::overlap::bond_pair;
use tn::linalg::svd_split;
use tn::{End, Leg, Tensor, Truncation, C64};

/// Environment of `<bra| op |ket>` for an open operator chain.
///
/// Boundaries toward the last site carry legs `(bra, op, ket)`, boundaries
/// toward the first site `(ket, op, bra)`.
#[derive(Clone, Debug)]
pub struct SandwichEnv {
    cache: BoundaryCache,
}

/// Identity on the state legs times a unit vector on a one-dimensional
/// operator leg; all-ones when the operator leg is wider.
pub(crate) fn terminal(state_a: Leg, w: Leg, state_b: Leg, end: &str) -> Result<Tensor> {
    if state_a.dim() != state_b.dim() {
        return Err(EnvError::StructuralMismatch(format!(
            "{} boundary legs of dimensions {} and {} cannot be joined",
            end,
            state_a.dim(),
            state_b.dim()
        )));
    }
    if w.is_resolved() {
        let id = Tensor::eye(state_a, state_b)?;
        let unit = Tensor::from_real(vec![w], &[1.0])?;
        Ok(id.tensordot(&unit, &[], &[])?.transpose(&[0, 2, 1])?)
    } else {
        Ok(Tensor::ones(vec![state_a, w, state_b]))
    }
}

/// Sorted, deduplicated charges of a leg.
fn sectors(leg: &Leg) -> Vec<i64> {
    let mut c = leg.charges().to_vec();
    c.sort_unstable();
    c.dedup();
    c
}

/// Whether a one-site update should first grow the bond between the two
/// sites of `bond`, judged from the ket and the operator.
///
/// Bonds that reach outside the chain never grow. A bond grows when the ket
/// misses charge sectors the operator acts on next to it. Otherwise it grows
/// unless it is already as wide as its neighbours allow or as `trunc.max_bond`,
/// and only while the smallest singular value across it exceeds the cutoff.
pub(crate) fn enlarge_bond(bond: Bond, layers: &Layers<'_>, trunc: &Truncation) -> Result<bool> {
    let len = layers.len();
    let b = bond.ascending();
    if !b.is_adjacent() {
        return Err(EnvError::InvalidBond { bond, len });
    }
    if b.from < 0 || b.to >= len as isize {
        return Ok(false);
    }
    let (n1, n2) = (b.from as usize, b.to as usize);
    let op = layers.operator()?;
    let ket = layers.ket;
    if sectors(op.site(n1).leg(1)) != sectors(ket.site(n1).leg(1))
        || sectors(op.site(n2).leg(1)) != sectors(ket.site(n2).leg(1))
    {
        return Ok(true);
    }

    let (al, ar) = (ket.site(n1).shape(), ket.site(n2).shape());
    let d = al[2];
    if al[0] * al[1] == d || ar[1] * ar[2] == d || d >= trunc.max_bond {
        return Ok(false);
    }
    if trunc.cutoff > 0.0 {
        // The first `d` singular values of the merged pair are those of the
        // bond itself.
        let split = svd_split(&ket.merge_two_sites(n1, n2)?, 2, &Truncation::exact())?;
        let smallest = split.s.get(d - 1).copied().unwrap_or(0.0);
        return Ok(smallest > 1.1 * trunc.cutoff);
    }
    Ok(false)
}

impl SandwichEnv {
    pub fn new(layers: &Layers<'_>) -> Result<Self> {
        layers.validate()?;
        if layers.is_purified() {
            return Err(EnvError::StructuralMismatch(
                "purified states go through the purification environment".into(),
            ));
        }
        let op = layers.operator()?;
        let (bra, ket) = (layers.bra, layers.ket);
        let left = terminal(
            bra.virtual_leg(End::First).clone(),
            op.virtual_leg(End::First).conj(),
            ket.virtual_leg(End::First).conj(),
            "first",
        )?;
        let right = terminal(
            ket.virtual_leg(End::Last).conj(),
            op.virtual_leg(End::Last).conj(),
            bra.virtual_leg(End::Last).clone(),
            "last",
        )?;
        Ok(Self {
            cache: BoundaryCache::new(ket.len(), left, right),
        })
    }

    /// Whether a one-site update should grow `bond` first. The answer depends
    /// on the ket and the operator only, not on cached boundaries.
    pub fn enlarge_bond(&self, bond: Bond, layers: &Layers<'_>, trunc: &Truncation) -> Result<bool> {
        enlarge_bond(bond, layers, trunc)
    }

    /// Everything but operator site `n`, with legs `(w, out, w', in)`
    /// matching the operator site it was cut from.
    pub fn hole(&self, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        check_site(n, self.cache.len())?;
        let left = self.cache.get(Bond::left_of(n))?;
        let right = self.cache.get(Bond::right_of(n))?;
        let t = left.tensordot(layers.ket.site(n), &[2], &[0])?;
        let t = t.tensordot(right, &[3], &[0])?;
        let t = t.tensordot(&layers.bra.site(n).conj(), &[0, 4], &[0, 2])?;
        Ok(t.transpose(&[0, 3, 2, 1])?.scale(layers.factor()))
    }
}

impl Environment for SandwichEnv {
    fn len(&self) -> usize {
        self.cache.len()
    }

    fn boundary(&self, bond: Bond) -> Result<&Tensor> {
        self.cache.get(bond)
    }

    fn update(&mut self, n: usize, to: Direction, layers: &Layers<'_>) -> Result<()> {
        check_site(n, self.cache.len())?;
        let w = layers.operator()?.site(n);
        let bra = layers.bra.site(n).conj();
        let ket = layers.ket.site(n);
        let prev = self.cache.get(Bond::consumed_by(n, to))?;
        let next = match to {
            Direction::Last => {
                let t = prev.tensordot(ket, &[2], &[0])?; // (b, w, i, k')
                let t = t.tensordot(w, &[1, 2], &[0, 3])?; // (b, k', o, w')
                let t = bra.tensordot(&t, &[0, 1], &[0, 2])?; // (b', k', w')
                t.transpose(&[0, 2, 1])?
            }
            Direction::First => {
                let t = ket.tensordot(prev, &[2], &[0])?; // (k, i, w', b')
                let t = t.tensordot(w, &[1, 2], &[3, 2])?; // (k, b', w, o)
                t.tensordot(&bra, &[3, 1], &[1, 2])?
            }
        };
        self.cache.insert(Bond::produced_by(n, to), next)
    }

    fn clear(&mut self, sites: &[usize]) {
        for &n in sites {
            self.cache.clear_site(n);
        }
    }

    fn heff0(&self, c: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let t = left.tensordot(c, &[2], &[0])?;
        let t = t.tensordot(right, &[1, 2], &[1, 0])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn heff1(&mut self, a: &Tensor, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        check_site(n, self.cache.len())?;
        let w = layers.operator()?.site(n);
        let left = self.cache.get(Bond::left_of(n))?;
        let right = self.cache.get(Bond::right_of(n))?;
        let t = a.tensordot(right, &[2], &[0])?; // (k, i, w', b')
        let t = w.tensordot(&t, &[2, 3], &[2, 1])?; // (w, o, k, b')
        let t = left.tensordot(&t, &[1, 2], &[0, 2])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn heff2(&mut self, aa: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        let (n1, n2) = bond.sites(self.cache.len())?;
        let op = layers.operator()?;
        let left = self.cache.get(Bond::left_of(n1))?;
        let right = self.cache.get(Bond::right_of(n2))?;
        // Left virtual and first physical leg ride along fused while the
        // second operator site is applied.
        let t = aa.fuse_legs(&[vec![0, 1], vec![2], vec![3]])?;
        let t = t.tensordot(right, &[2], &[0])?; // (kp, i2, w', b')
        let t = op.site(n2).tensordot(&t, &[2, 3], &[2, 1])?; // (w, o2, kp, b')
        let t = t.unfuse_leg(2)?; // (w, o2, k, i1, b')
        let t = op.site(n1).tensordot(&t, &[2, 3], &[0, 3])?; // (w, o1, o2, k, b')
        let t = left.tensordot(&t, &[1, 2], &[0, 3])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let v = left.tensordot(right, &[0, 1, 2], &[2, 1, 0])?.to_number()?;
        Ok(layers.factor() * v)
    }
}
