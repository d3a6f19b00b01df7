/// Descriptor of one tensor leg: its signature, one abelian charge per basis
/// index, and the legs it was fused from (if any).
///
/// Storage stays dense; charges only decide which entries `Tensor::eye` and
/// `Tensor::ones` populate and which sector a one-dimensional leg sits in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leg {
    sig: i8,
    charges: Vec<i64>,
    fused: Option<Vec<Leg>>,
}

impl Leg {
    pub fn new(sig: i8, charges: Vec<i64>) -> Self {
        Self {
            sig: if sig < 0 { -1 } else { 1 },
            charges,
            fused: None,
        }
    }

    /// Leg of dimension `dim` in the neutral sector.
    pub fn trivial(dim: usize, sig: i8) -> Self {
        Self::new(sig, vec![0; dim])
    }

    pub fn dim(&self) -> usize {
        self.charges.len()
    }

    pub fn sig(&self) -> i8 {
        self.sig
    }

    pub fn charges(&self) -> &[i64] {
        &self.charges
    }

    pub fn charge(&self, i: usize) -> i64 {
        self.charges[i]
    }

    /// A one-dimensional leg has a single, known charge.
    pub fn is_resolved(&self) -> bool {
        self.dim() == 1
    }

    pub fn is_fused(&self) -> bool {
        self.fused.is_some()
    }

    pub fn subs(&self) -> Option<&[Leg]> {
        self.fused.as_deref()
    }

    /// Same space with opposite signature.
    pub fn conj(&self) -> Leg {
        Leg {
            sig: -self.sig,
            charges: self.charges.clone(),
            fused: self
                .fused
                .as_ref()
                .map(|subs| subs.iter().map(Leg::conj).collect()),
        }
    }

    /// Product leg, indices enumerated row-major over `legs`. The result takes
    /// the signature of the first leg and the signed sum of sub-leg charges.
    pub fn fuse(legs: &[Leg]) -> Leg {
        let sig = legs.first().map_or(1, |l| l.sig);
        let mut charges = vec![0i64];
        for leg in legs {
            let mut next = Vec::with_capacity(charges.len() * leg.dim());
            for &c in &charges {
                for &q in &leg.charges {
                    next.push(c + leg.sig as i64 * q);
                }
            }
            charges = next;
        }
        for c in charges.iter_mut() {
            *c *= sig as i64;
        }
        Leg {
            sig,
            charges,
            fused: Some(legs.to_vec()),
        }
    }

    /// Concatenation of two spaces, used for block-diagonal sums.
    pub fn direct_sum(&self, other: &Leg) -> Leg {
        let mut charges = self.charges.clone();
        charges.extend(other.charges.iter().map(|&q| q * (self.sig * other.sig) as i64));
        Leg::new(self.sig, charges)
    }
}

#[cfg(test)]
mod tests {
    use super::Leg;

    #[test]
    fn fuse_multiplies_dims_and_adds_charges() {
        let a = Leg::new(1, vec![1, -1]);
        let b = Leg::new(-1, vec![0, 2, 4]);
        let f = Leg::fuse(&[a.clone(), b.clone()]);
        assert_eq!(f.dim(), 6);
        assert_eq!(f.charges(), &[1, -1, -3, -1, -3, -5]);
        assert_eq!(f.subs().unwrap(), &[a, b]);
    }

    #[test]
    fn conj_flips_signature_recursively() {
        let f = Leg::fuse(&[Leg::trivial(2, 1), Leg::trivial(3, -1)]);
        let c = f.conj();
        assert_eq!(c.sig(), -1);
        assert_eq!(c.subs().unwrap()[0].sig(), -1);
        assert_eq!(c.subs().unwrap()[1].sig(), 1);
        assert_eq!(c.conj(), f);
    }
}
