use crate::bond::{Bond, Direction};
use crate::cache::BoundaryCache;
use crate::engine::{check_site, terminal_eye, Environment};
use crate::error::{EnvError, Result};
use crate::layers::Layers;
use tn::{End, Tensor, C64};

/// Environment of `<bra|ket>` with no operator in between.
///
/// Boundaries toward the last site carry legs `(bra, ket)`, boundaries toward
/// the first site `(ket, bra)`.
#[derive(Clone, Debug)]
pub struct OverlapEnv {
    cache: BoundaryCache,
}

impl OverlapEnv {
    pub fn new(layers: &Layers<'_>) -> Result<Self> {
        layers.validate()?;
        if layers.op.is_some() {
            return Err(EnvError::StructuralMismatch(
                "overlap environment takes no operator chain".into(),
            ));
        }
        let (bra, ket) = (layers.bra, layers.ket);
        let left = terminal_eye(
            bra.virtual_leg(End::First).clone(),
            ket.virtual_leg(End::First).conj(),
            "first",
        )?;
        let right = terminal_eye(
            ket.virtual_leg(End::Last).conj(),
            bra.virtual_leg(End::Last).clone(),
            "last",
        )?;
        Ok(Self {
            cache: BoundaryCache::new(ket.len(), left, right),
        })
    }

    /// Like `update`, with the one-site operator `local` (legs `(out, in)`)
    /// inserted between bra and ket at site `n`.
    ///
    /// The boundary written this way no longer describes the plain overlap;
    /// clear site `n` before relying on the cache for anything else.
    pub fn update_with_local_op(
        &mut self,
        n: usize,
        to: Direction,
        local: &Tensor,
        layers: &Layers<'_>,
    ) -> Result<()> {
        check_site(n, self.cache.len())?;
        let d = layers.ket.site(n).leg(1).dim();
        if local.shape() != vec![d, d] {
            return Err(EnvError::StructuralMismatch(format!(
                "local operator of shape {:?} on a site of dimension {}",
                local.shape(),
                d
            )));
        }
        let bra = layers.bra.site(n).conj();
        let ket = layers.ket.site(n);
        let prev = self.cache.get(Bond::consumed_by(n, to))?;
        let next = match to {
            Direction::Last => {
                let t = prev.tensordot(ket, &[1], &[0])?;
                let t = local.tensordot(&t, &[1], &[1])?;
                bra.tensordot(&t, &[0, 1], &[1, 0])?
            }
            Direction::First => {
                let t = ket.tensordot(prev, &[2], &[0])?;
                let t = t.tensordot(local, &[1], &[1])?;
                t.tensordot(&bra, &[2, 1], &[1, 2])?
            }
        };
        self.cache.insert(Bond::produced_by(n, to), next)
    }
}

impl Environment for OverlapEnv {
    fn len(&self) -> usize {
        self.cache.len()
    }

    fn boundary(&self, bond: Bond) -> Result<&Tensor> {
        self.cache.get(bond)
    }

    fn update(&mut self, n: usize, to: Direction, layers: &Layers<'_>) -> Result<()> {
        check_site(n, self.cache.len())?;
        let bra = layers.bra.site(n).conj();
        let ket = layers.ket.site(n);
        let prev = self.cache.get(Bond::consumed_by(n, to))?;
        let next = match to {
            Direction::Last => {
                // (b, k) x (k, p, k') -> (b, p, k')
                let t = prev.tensordot(ket, &[1], &[0])?;
                bra.tensordot(&t, &[0, 1], &[0, 1])?
            }
            Direction::First => {
                // (k, p, k') x (k', b') -> (k, p, b')
                let t = ket.tensordot(prev, &[2], &[0])?;
                t.tensordot(&bra, &[1, 2], &[1, 2])?
            }
        };
        self.cache.insert(Bond::produced_by(n, to), next)
    }

    fn clear(&mut self, sites: &[usize]) {
        for &n in sites {
            self.cache.clear_site(n);
        }
    }

    fn heff0(&self, c: &Tensor, bond: Bond, _layers: &Layers<'_>) -> Result<Tensor> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let t = left.tensordot(c, &[1], &[0])?;
        Ok(t.tensordot(right, &[1], &[0])?)
    }

    fn heff1(&mut self, a: &Tensor, n: usize, _layers: &Layers<'_>) -> Result<Tensor> {
        check_site(n, self.cache.len())?;
        let left = self.cache.get(Bond::left_of(n))?;
        let right = self.cache.get(Bond::right_of(n))?;
        let t = left.tensordot(a, &[1], &[0])?;
        Ok(t.tensordot(right, &[2], &[0])?)
    }

    fn heff2(&mut self, aa: &Tensor, bond: Bond, _layers: &Layers<'_>) -> Result<Tensor> {
        let (n1, n2) = bond.sites(self.cache.len())?;
        let left = self.cache.get(Bond::left_of(n1))?;
        let right = self.cache.get(Bond::right_of(n2))?;
        let t = left.tensordot(aa, &[1], &[0])?;
        Ok(t.tensordot(right, &[3], &[0])?)
    }

    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64> {
        let (left, right) = bond_pair(&self.cache, bond)?;
        let v = left.tensordot(right, &[0, 1], &[1, 0])?.to_number()?;
        Ok(layers.factor() * v)
    }
}

/// The two boundaries meeting at `bond`, the one toward the last site first.
pub(crate) fn bond_pair(cache: &BoundaryCache, bond: Bond) -> Result<(&Tensor, &Tensor)> {
    if !bond.is_adjacent() {
        return Err(EnvError::InvalidBond {
            bond,
            len: cache.len(),
        });
    }
    let asc = bond.ascending();
    Ok((cache.get(asc)?, cache.get(asc.reversed())?))
}
