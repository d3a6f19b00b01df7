use crate::bond::{Bond, Direction};
use crate::error::{EnvError, Result};
use tn::Tensor;

/// Boundary tensors of a chain of `len` sites, keyed by directed bond.
///
/// Storage is two fixed arenas of `len + 1` slots, one per direction. Bond
/// `(k, k + 1)` lives in slot `k + 1` of the forward arena and bond
/// `(k, k - 1)` in slot `k` of the backward arena, so the terminals
/// `(-1, 0)` and `(len, len - 1)` sit in slots `0` and `len`.
#[derive(Clone, Debug)]
pub struct BoundaryCache {
    len: usize,
    toward_last: Vec<Option<Tensor>>,
    toward_first: Vec<Option<Tensor>>,
}

impl BoundaryCache {
    /// Cache holding only the two terminal boundaries.
    pub fn new(len: usize, left: Tensor, right: Tensor) -> Self {
        let mut toward_last = vec![None; len + 1];
        let mut toward_first = vec![None; len + 1];
        toward_last[0] = Some(left);
        toward_first[len] = Some(right);
        Self {
            len,
            toward_last,
            toward_first,
        }
    }

    /// Number of chain sites the cache spans.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, bond: Bond) -> Option<(Direction, usize)> {
        let dir = bond.direction()?;
        let idx = match dir {
            Direction::Last => bond.from + 1,
            Direction::First => bond.from,
        };
        (0..=self.len as isize)
            .contains(&idx)
            .then_some((dir, idx as usize))
    }

    pub fn get(&self, bond: Bond) -> Result<&Tensor> {
        let entry = self.slot(bond).and_then(|(dir, idx)| match dir {
            Direction::Last => self.toward_last[idx].as_ref(),
            Direction::First => self.toward_first[idx].as_ref(),
        });
        entry.ok_or(EnvError::MissingBoundary { bond })
    }

    pub fn contains(&self, bond: Bond) -> bool {
        self.get(bond).is_ok()
    }

    pub fn insert(&mut self, bond: Bond, t: Tensor) -> Result<()> {
        let (dir, idx) = self.slot(bond).ok_or(EnvError::InvalidBond {
            bond,
            len: self.len,
        })?;
        match dir {
            Direction::Last => self.toward_last[idx] = Some(t),
            Direction::First => self.toward_first[idx] = Some(t),
        }
        Ok(())
    }

    /// Drop the two boundaries that originate at site `n`. Terminals are
    /// never touched; sites outside the chain are ignored.
    pub fn clear_site(&mut self, n: usize) {
        if n >= self.len {
            return;
        }
        self.toward_last[n + 1] = None;
        self.toward_first[n] = None;
    }

    /// Every bond currently holding a tensor.
    pub fn cached(&self) -> Vec<Bond> {
        let fwd = self
            .toward_last
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| Bond::new(i as isize - 1, i as isize));
        let bwd = self
            .toward_first
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| Bond::new(i as isize, i as isize - 1));
        fwd.chain(bwd).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::BoundaryCache;
    use crate::bond::Bond;
    use crate::error::EnvError;
    use tn::{Tensor, C64};

    fn cache(len: usize) -> BoundaryCache {
        let one = Tensor::scalar(C64::new(1.0, 0.0));
        BoundaryCache::new(len, one.clone(), one)
    }

    #[test]
    fn terminals_survive_clear() {
        let mut c = cache(3);
        for n in 0..3 {
            c.clear_site(n);
        }
        assert!(c.contains(Bond::new(-1, 0)));
        assert!(c.contains(Bond::new(3, 2)));
        assert_eq!(c.cached().len(), 2);
    }

    #[test]
    fn clear_drops_both_directions() {
        let mut c = cache(3);
        let t = Tensor::scalar(C64::new(2.0, 0.0));
        c.insert(Bond::new(1, 2), t.clone()).unwrap();
        c.insert(Bond::new(1, 0), t).unwrap();
        assert!(c.contains(Bond::new(1, 2)));
        c.clear_site(1);
        assert!(!c.contains(Bond::new(1, 2)));
        assert!(!c.contains(Bond::new(1, 0)));
    }

    #[test]
    fn out_of_range_bonds() {
        let mut c = cache(2);
        assert_eq!(
            c.get(Bond::new(0, 1)).unwrap_err(),
            EnvError::MissingBoundary {
                bond: Bond::new(0, 1)
            }
        );
        assert!(c.get(Bond::new(2, 3)).is_err());
        assert!(c.get(Bond::new(0, 2)).is_err());
        let t = Tensor::scalar(C64::new(1.0, 0.0));
        assert!(c.insert(Bond::new(3, 2), t).is_err());
    }
}
