use crate::bond::{Bond, Direction};
use crate::cache::BoundaryCache;
use crate::engine::{check_site, Environment};
use crate::error::{EnvError, Result};
use crate::layers::{Layers, Target};
use crate::overlap::bond_pair;
use crate::sandwich::terminal;
use tn::{End, Tensor, C64};

/// Environment of `<bra| op |ket>` for purified states: MPO chains whose
/// sites carry legs `(left, phys, right, ancilla)`.
///
/// The operator acts on the leg picked by [`Layers::target`]; the other leg
/// is traced between bra and ket. Boundaries have the legs of
/// [`SandwichEnv`](crate::SandwichEnv).
#[derive(Clone, Debug)]
pub struct PurificationEnv {
    cache: BoundaryCache,
}

/// Site axes `(acted, spectator)` of a purified state.
fn axes(target: Target) -> (usize, usize) {
    match target {
        Target::Physical => (1, 3),
        Target::Ancilla => (3, 1),
    }
}

impl PurificationEnv {
    pub fn new(layers: &Layers<'_>) -> Result<Self> {
        layers.validate()?;
        if !layers.is_purified() {
            return Err(EnvError::StructuralMismatch(
                "purification environment needs MPO-shaped states".into(),
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
}

impl Environment for PurificationEnv {
    fn len(&self) -> usize {
        self.cache.len()
    }

    fn boundary(&self, bond: Bond) -> Result<&Tensor> {
        self.cache.get(bond)
    }

    fn update(&mut self, n: usize, to: Direction, layers: &Layers<'_>) -> Result<()> {
        check_site(n, self.cache.len())?;
        let (act, spec) = axes(layers.target);
        let w = layers.operator()?.site(n);
        let bra = layers.bra.site(n).conj();
        let ket = layers.ket.site(n);
        let prev = self.cache.get(Bond::consumed_by(n, to))?;
        let next = match to {
            Direction::Last => {
                let t = prev.tensordot(ket, &[2], &[0])?; // (b, w, k1, k', k3)
                let (ka, ks) = if act == 1 { (2, 2) } else { (4, 1) };
                let t = t.tensordot(w, &[1, ka], &[0, 3])?;
                let t = t.tensordot(&bra, &[0, 3, ks], &[0, act, spec])?; // (k', w', b')
                t.transpose(&[2, 1, 0])?
            }
            Direction::First => {
                let t = ket.tensordot(prev, &[2], &[0])?; // (k, k1, k3, w', b')
                let ka = if act == 1 { 1 } else { 2 };
                let t = t.tensordot(w, &[ka, 3], &[3, 2])?; // (k, ks, b', w, o)
                t.tensordot(&bra, &[1, 2, 4], &[spec, 2, act])?
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
        let t = left.tensordot(a, &[2], &[0])?; // (b, w, a1, a', a3)
        let t = match layers.target {
            Target::Physical => {
                let t = t.tensordot(w, &[1, 2], &[0, 3])?; // (b, a', a3, o, w')
                let t = t.tensordot(right, &[1, 4], &[0, 1])?; // (b, a3, o, b')
                t.transpose(&[0, 2, 3, 1])?
            }
            Target::Ancilla => {
                let t = t.tensordot(w, &[1, 4], &[0, 3])?; // (b, a1, a', o, w')
                let t = t.tensordot(right, &[2, 4], &[0, 1])?; // (b, a1, o, b')
                t.transpose(&[0, 1, 3, 2])?
            }
        };
        Ok(t.scale(layers.op_factor()))
    }

    /// `aa` has legs `(left, p1, a1, p2, right, a2)`, as produced by
    /// `Chain::merge_two_sites` on purified states.
    fn heff2(&mut self, aa: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        let (n1, n2) = bond.sites(self.cache.len())?;
        let op = layers.operator()?;
        let left = self.cache.get(Bond::left_of(n1))?;
        let right = self.cache.get(Bond::right_of(n2))?;
        let t = left.tensordot(aa, &[2], &[0])?; // (b, w, p1, a1, p2, r, a2)
        let t = match layers.target {
            Target::Physical => {
                let t = t.tensordot(op.site(n1), &[1, 2], &[0, 3])?; // (b, a1, p2, r, a2, o1, w)
                let t = t.tensordot(op.site(n2), &[6, 2], &[0, 3])?; // (b, a1, r, a2, o1, o2, w')
                let t = t.tensordot(right, &[2, 6], &[0, 1])?; // (b, a1, a2, o1, o2, b')
                t.transpose(&[0, 3, 1, 4, 5, 2])?
            }
            Target::Ancilla => {
                let t = t.tensordot(op.site(n1), &[1, 3], &[0, 3])?; // (b, p1, p2, r, a2, o1, w)
                let t = t.tensordot(op.site(n2), &[6, 4], &[0, 3])?; // (b, p1, p2, r, o1, o2, w')
                let t = t.tensordot(right, &[3, 6], &[0, 1])?; // (b, p1, p2, o1, o2, b')
                t.transpose(&[0, 1, 3, 2, 5, 4])?
            }
        };
        Ok(t.scale(layers.op_factor()))
    }

    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let v = left.tensordot(right, &[0, 1, 2], &[2, 1, 0])?.to_number()?;
        Ok(layers.factor() * v)
    }
}
