use crate::bond::{Bond, Direction};
use crate::cache::BoundaryCache;
use crate::engine::{check_site, terminal_eye, Environment};
use crate::error::Result;
use crate::layers::Layers;
use crate::overlap::bond_pair;
use tn::{End, Tensor, C64};

/// Environment of `<bra| op |ket>` for an operator chain closed into a ring.
///
/// Every boundary carries one extra auxiliary leg that transports the
/// operator's closing virtual index from one end of the chain to the other:
/// legs `(bra, op, aux, ket)` toward the last site and `(ket, op, aux, bra)`
/// toward the first. The auxiliary legs are traced against each other
/// whenever a left and a right boundary meet.
#[derive(Clone, Debug)]
pub struct PeriodicEnv {
    cache: BoundaryCache,
}

impl PeriodicEnv {
    pub fn new(layers: &Layers<'_>) -> Result<Self> {
        layers.validate()?;
        let op = layers.operator()?;
        let (bra, ket) = (layers.bra, layers.ket);

        let states = terminal_eye(
            bra.virtual_leg(End::First).clone(),
            ket.virtual_leg(End::First).conj(),
            "first",
        )?;
        let closing = terminal_eye(
            op.virtual_leg(End::First).conj(),
            op.virtual_leg(End::First).clone(),
            "first",
        )?;
        // (b, k) x (w, a) -> (b, w, a, k)
        let left = states
            .tensordot(&closing, &[], &[])?
            .transpose(&[0, 2, 3, 1])?;

        let states = terminal_eye(
            ket.virtual_leg(End::Last).conj(),
            bra.virtual_leg(End::Last).clone(),
            "last",
        )?;
        let closing = terminal_eye(
            op.virtual_leg(End::Last).conj(),
            op.virtual_leg(End::Last).clone(),
            "last",
        )?;
        let right = states
            .tensordot(&closing, &[], &[])?
            .transpose(&[0, 2, 3, 1])?;

        Ok(Self {
            cache: BoundaryCache::new(ket.len(), left, right),
        })
    }

    /// Everything but operator site `n`, legs `(w, out, w', in)`.
    pub fn hole(&self, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        check_site(n, self.cache.len())?;
        let left = self.cache.get(Bond::left_of(n))?;
        let right = self.cache.get(Bond::right_of(n))?;
        let t = left.tensordot(layers.ket.site(n), &[3], &[0])?; // (b, w, a, i, k')
        let t = t.tensordot(right, &[4, 2], &[0, 2])?; // (b, w, i, w', b')
        let t = t.tensordot(&layers.bra.site(n).conj(), &[0, 4], &[0, 2])?;
        Ok(t.transpose(&[0, 3, 2, 1])?.scale(layers.factor()))
    }
}

impl Environment for PeriodicEnv {
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
                let t = prev.tensordot(ket, &[3], &[0])?; // (b, w, a, i, k')
                let t = t.tensordot(w, &[1, 3], &[0, 3])?; // (b, a, k', o, w')
                let t = bra.tensordot(&t, &[0, 1], &[0, 3])?; // (b', a, k', w')
                t.transpose(&[0, 3, 1, 2])?
            }
            Direction::First => {
                let t = ket.tensordot(prev, &[2], &[0])?; // (k, i, w', a, b')
                let t = t.tensordot(w, &[1, 2], &[3, 2])?; // (k, a, b', w, o)
                let t = t.tensordot(&bra, &[4, 2], &[1, 2])?; // (k, a, w, b)
                t.transpose(&[0, 2, 1, 3])?
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
        let t = left.tensordot(c, &[3], &[0])?; // (b, w, a, k')
        let t = t.tensordot(right, &[1, 2, 3], &[1, 2, 0])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn heff1(&mut self, a: &Tensor, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        check_site(n, self.cache.len())?;
        let w = layers.operator()?.site(n);
        let left = self.cache.get(Bond::left_of(n))?;
        let right = self.cache.get(Bond::right_of(n))?;
        let t = a.tensordot(right, &[2], &[0])?; // (k, i, w', a, b')
        let t = w.tensordot(&t, &[2, 3], &[2, 1])?; // (w, o, k, a, b')
        let t = left.tensordot(&t, &[1, 2, 3], &[0, 3, 2])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn heff2(&mut self, aa: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        let (n1, n2) = bond.sites(self.cache.len())?;
        let op = layers.operator()?;
        let left = self.cache.get(Bond::left_of(n1))?;
        let right = self.cache.get(Bond::right_of(n2))?;
        let t = aa.tensordot(right, &[3], &[0])?; // (k, i1, i2, w', a, b')
        let t = op.site(n2).tensordot(&t, &[2, 3], &[3, 2])?; // (w, o2, k, i1, a, b')
        let t = op.site(n1).tensordot(&t, &[2, 3], &[0, 3])?; // (w, o1, o2, k, a, b')
        let t = left.tensordot(&t, &[1, 2, 3], &[0, 4, 3])?;
        Ok(t.scale(layers.op_factor()))
    }

    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let v = left
            .tensordot(right, &[0, 1, 2, 3], &[3, 1, 2, 0])?
            .to_number()?;
        Ok(layers.factor() * v)
    }
}
