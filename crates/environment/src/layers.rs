use crate::error::{EnvError, Result};
use tn::{Chain, ChainKind, C64};

/// Which physical leg of a two-leg (purified) state the operator acts on.
/// Single-leg states only have [`Target::Physical`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Target {
    #[default]
    Physical,
    Ancilla,
}

/// The chains an environment contracts, borrowed for the duration of one
/// call. `bra` is conjugated; `op`, when present, sits between the two.
///
/// States are MPS chains, or MPO chains read as purified states with legs
/// `(left, phys, right, ancilla)`.
#[derive(Clone, Copy, Debug)]
pub struct Layers<'a> {
    pub bra: &'a Chain,
    pub op: Option<&'a Chain>,
    pub ket: &'a Chain,
    pub target: Target,
}

impl<'a> Layers<'a> {
    pub fn overlap(bra: &'a Chain, ket: &'a Chain) -> Self {
        Self {
            bra,
            op: None,
            ket,
            target: Target::Physical,
        }
    }

    pub fn sandwich(bra: &'a Chain, op: &'a Chain, ket: &'a Chain) -> Self {
        Self {
            bra,
            op: Some(op),
            ket,
            target: Target::Physical,
        }
    }

    /// `<psi| op |psi>`.
    pub fn expectation(psi: &'a Chain, op: &'a Chain) -> Self {
        Self::sandwich(psi, op, psi)
    }

    /// Let the operator act on the ancilla legs of purified states instead.
    pub fn on_ancilla(self) -> Self {
        Self {
            target: Target::Ancilla,
            ..self
        }
    }

    /// Both states carry an ancilla leg next to the physical one.
    pub fn is_purified(&self) -> bool {
        self.ket.kind() == ChainKind::Mpo
    }

    pub fn len(&self) -> usize {
        self.ket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ket.is_empty()
    }

    pub fn is_periodic(&self) -> bool {
        self.op.is_some_and(Chain::is_periodic)
    }

    pub(crate) fn operator(&self) -> Result<&'a Chain> {
        self.op.ok_or_else(|| {
            EnvError::StructuralMismatch("environment needs an operator chain".into())
        })
    }

    /// Product of the factors of all participating chains, the bra conjugated.
    pub fn factor(&self) -> C64 {
        let op = self.op.map_or(C64::new(1.0, 0.0), Chain::factor);
        self.bra.factor().conj() * op * self.ket.factor()
    }

    /// Scale applied to effective operators: the operator chain's factor.
    pub(crate) fn op_factor(&self) -> C64 {
        self.op.map_or(C64::new(1.0, 0.0), Chain::factor)
    }

    /// Check chain kinds, lengths and physical dimensions site by site.
    pub fn validate(&self) -> Result<()> {
        let n = self.ket.len();
        if self.bra.kind() != self.ket.kind() {
            return Err(EnvError::StructuralMismatch(
                "bra and ket must be chains of the same kind".into(),
            ));
        }
        if self.bra.is_periodic() || self.ket.is_periodic() {
            return Err(EnvError::StructuralMismatch(
                "states must have open boundaries".into(),
            ));
        }
        if self.bra.len() != n {
            return Err(EnvError::StructuralMismatch(format!(
                "bra has {} sites, ket has {}",
                self.bra.len(),
                n
            )));
        }
        if self.is_purified() && self.op.map_or(true, Chain::is_periodic) {
            return Err(EnvError::StructuralMismatch(
                "purified states need an open operator chain".into(),
            ));
        }
        if !self.is_purified() && self.target == Target::Ancilla {
            return Err(EnvError::StructuralMismatch(
                "only purified states carry an ancilla leg".into(),
            ));
        }
        let op = match self.op {
            Some(op) => op,
            None => {
                for s in 0..n {
                    let (b, _) = self.bra.phys_dims(s);
                    let (k, _) = self.ket.phys_dims(s);
                    if b != k {
                        return Err(EnvError::StructuralMismatch(format!(
                            "site {}: bra physical dimension {} against ket {}",
                            s, b, k
                        )));
                    }
                }
                return Ok(());
            }
        };
        if op.kind() != ChainKind::Mpo {
            return Err(EnvError::StructuralMismatch(
                "operator must be an MPO chain".into(),
            ));
        }
        if op.len() != n {
            return Err(EnvError::StructuralMismatch(format!(
                "operator has {} sites, states have {}",
                op.len(),
                n
            )));
        }
        for s in 0..n {
            let (bp, ba) = self.bra.phys_dims(s);
            let (kp, ka) = self.ket.phys_dims(s);
            let (out, inp) = op.phys_dims(s);
            // The leg the operator acts on, then the leg it leaves alone.
            let ((b, k), (sb, sk)) = match self.target {
                Target::Physical => ((bp, kp), (ba, ka)),
                Target::Ancilla => ((ba, ka), (bp, kp)),
            };
            if b != out || k != inp {
                return Err(EnvError::StructuralMismatch(format!(
                    "site {}: operator maps {} to {}, states carry bra {} and ket {}",
                    s, inp, out, b, k
                )));
            }
            if self.is_purified() && sb != sk {
                return Err(EnvError::StructuralMismatch(format!(
                    "site {}: spectator legs of dimensions {} and {}",
                    s, sb, sk
                )));
            }
        }
        Ok(())
    }
}
