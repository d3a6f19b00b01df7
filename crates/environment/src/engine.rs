use crate::bond::{Bond, Direction};
use crate::error::{EnvError, Result};
use crate::layers::Layers;
use crate::overlap::OverlapEnv;
use crate::periodic::PeriodicEnv;
use crate::projector::{DeflationProjector, Window};
use crate::purification::PurificationEnv;
use crate::sandwich::{self, SandwichEnv};
use log::debug;
use tn::{Chain, Leg, Tensor, Truncation, C64};

/// Operations shared by every environment flavour.
///
/// Boundary tensors are addressed by directed bonds; an update of site `n`
/// toward the last site reads bond `(n - 1, n)` and writes `(n, n + 1)`.
/// Chains are not owned: each call receives the current [`Layers`].
pub trait Environment {
    /// Number of chain sites.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached boundary tensor at `bond`.
    fn boundary(&self, bond: Bond) -> Result<&Tensor>;

    /// Absorb site `n` into the boundary on its far side from `to`.
    fn update(&mut self, n: usize, to: Direction, layers: &Layers<'_>) -> Result<()>;

    /// Drop the boundaries originating at the given sites.
    fn clear(&mut self, sites: &[usize]);

    /// Effective operator on the zero-site tensor of `bond`.
    fn heff0(&self, c: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor>;

    /// Effective operator on site `n`, legs `(left, phys, right)`.
    fn heff1(&mut self, a: &Tensor, n: usize, layers: &Layers<'_>) -> Result<Tensor>;

    /// Effective operator on the merged sites of `bond`, legs
    /// `(left, p1, p2, right)` in ascending site order.
    fn heff2(&mut self, aa: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor>;

    /// Full contraction through the boundaries meeting at `bond`, scaled by
    /// [`Environment::factor`].
    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64>;

    /// `conj(bra.factor) * op.factor * ket.factor`.
    fn factor(&self, layers: &Layers<'_>) -> C64 {
        layers.factor()
    }

    /// Update every site in sweep order toward `to`.
    fn setup(&mut self, to: Direction, layers: &Layers<'_>) -> Result<()> {
        for n in to.sites(self.len()) {
            self.update(n, to, layers)?;
        }
        Ok(())
    }
}

pub(crate) fn check_site(n: usize, len: usize) -> Result<()> {
    if n >= len {
        return Err(EnvError::SiteOutOfRange { site: n, len });
    }
    Ok(())
}

/// Identity between two boundary legs, which must match in dimension.
pub(crate) fn terminal_eye(a: Leg, b: Leg, end: &str) -> Result<Tensor> {
    if a.dim() != b.dim() {
        return Err(EnvError::StructuralMismatch(format!(
            "{} boundary legs of dimensions {} and {} cannot be joined",
            end,
            a.dim(),
            b.dim()
        )));
    }
    Ok(Tensor::eye(a, b)?)
}

/// The contraction flavour, fixed when the engine is built.
#[derive(Clone, Debug)]
pub enum Variant {
    Overlap(OverlapEnv),
    Sandwich(SandwichEnv),
    Periodic(PeriodicEnv),
    Purification(PurificationEnv),
}

impl Variant {
    fn env(&self) -> &dyn Environment {
        match self {
            Variant::Overlap(e) => e,
            Variant::Sandwich(e) => e,
            Variant::Periodic(e) => e,
            Variant::Purification(e) => e,
        }
    }

    fn env_mut(&mut self) -> &mut dyn Environment {
        match self {
            Variant::Overlap(e) => e,
            Variant::Sandwich(e) => e,
            Variant::Periodic(e) => e,
            Variant::Purification(e) => e,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Variant::Overlap(_) => "overlap",
            Variant::Sandwich(_) => "sandwich",
            Variant::Periodic(_) => "periodic",
            Variant::Purification(_) => "purification",
        }
    }
}

/// Boundary cache for one `<bra| op |ket>` network plus an optional
/// projector that deflates effective operators against reference states.
///
/// The flavour follows the layers given at construction: no operator gives
/// an overlap environment, an open operator a sandwich, a periodic operator
/// the ring variant, and purified states the purification variant. Later
/// calls must pass layers of the same shape.
#[derive(Clone, Debug)]
pub struct EnvironmentEngine {
    variant: Variant,
    projector: Option<DeflationProjector>,
}

impl EnvironmentEngine {
    /// Validate the layers and build the terminal boundaries. Non-empty
    /// `references` switch on deflation in `heff1` and `heff2`; they must
    /// match the bra chain in length and physical dimensions.
    ///
    /// Only the terminals are cached afterwards; call
    /// [`Environment::setup`] before asking for anything in the bulk.
    pub fn new(layers: &Layers<'_>, references: Vec<Chain>) -> Result<Self> {
        layers.validate()?;
        let variant = match layers.op {
            Some(_) if layers.is_purified() => {
                Variant::Purification(PurificationEnv::new(layers)?)
            }
            None => Variant::Overlap(OverlapEnv::new(layers)?),
            Some(op) if op.is_periodic() => Variant::Periodic(PeriodicEnv::new(layers)?),
            Some(_) => Variant::Sandwich(SandwichEnv::new(layers)?),
        };
        let projector = if references.is_empty() {
            None
        } else {
            Some(DeflationProjector::new(layers.bra, references)?)
        };
        debug!(
            "{} environment over {} sites, {} reference states",
            variant.name(),
            layers.len(),
            projector.as_ref().map_or(0, DeflationProjector::len)
        );
        Ok(Self { variant, projector })
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn projector(&self) -> Option<&DeflationProjector> {
        self.projector.as_ref()
    }

    fn check(&self, layers: &Layers<'_>) -> Result<()> {
        if layers.len() != self.len() || layers.bra.len() != self.len() {
            return Err(EnvError::StructuralMismatch(format!(
                "{}-site environment called with {}-site chains",
                self.len(),
                layers.len()
            )));
        }
        let fits = match (&self.variant, layers.op) {
            (Variant::Overlap(_), None) => true,
            (Variant::Sandwich(_), Some(op)) => !op.is_periodic() && !layers.is_purified(),
            (Variant::Periodic(_), Some(op)) => op.is_periodic(),
            (Variant::Purification(_), Some(op)) => !op.is_periodic() && layers.is_purified(),
            _ => false,
        };
        if !fits {
            return Err(EnvError::StructuralMismatch(format!(
                "layers do not fit a {} environment",
                self.variant.name()
            )));
        }
        Ok(())
    }

    /// Remove the reference components from `t`, first refreshing the local
    /// projections if the window moved. Without references `t` is returned
    /// as is.
    ///
    /// `heff1` and `heff2` apply this to their input and output; callers use
    /// it to put start vectors into the same subspace.
    pub fn deflate(&mut self, window: Window, t: Tensor, layers: &Layers<'_>) -> Result<Tensor> {
        let Some(projector) = self.projector.as_mut() else {
            return Ok(t);
        };
        if projector.window() != Some(window) {
            match window {
                Window::Site(n) => projector.refresh_site(n, layers.bra)?,
                Window::Bond(n1, n2) => {
                    projector.refresh_bond(Bond::new(n1 as isize, n2 as isize), layers.bra)?
                }
            }
        }
        projector.project(&t)
    }

    /// Environment of operator site `n`; see [`SandwichEnv::hole`].
    pub fn hole(&self, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        self.check(layers)?;
        match &self.variant {
            Variant::Sandwich(e) => e.hole(n, layers),
            Variant::Periodic(e) => e.hole(n, layers),
            Variant::Overlap(_) | Variant::Purification(_) => Err(EnvError::StructuralMismatch(
                format!("no operator hole in a {} environment", self.variant.name()),
            )),
        }
    }

    /// Whether a one-site update should grow `bond` first; see
    /// [`SandwichEnv::enlarge_bond`]. Needs an operator acting on MPS states.
    pub fn enlarge_bond(&self, bond: Bond, layers: &Layers<'_>, trunc: &Truncation) -> Result<bool> {
        self.check(layers)?;
        match &self.variant {
            Variant::Sandwich(e) => e.enlarge_bond(bond, layers, trunc),
            Variant::Periodic(_) => sandwich::enlarge_bond(bond, layers, trunc),
            _ => Err(EnvError::StructuralMismatch(format!(
                "bond enlargement is not defined for a {} environment",
                self.variant.name()
            ))),
        }
    }

    /// See [`OverlapEnv::update_with_local_op`].
    pub fn update_with_local_op(
        &mut self,
        n: usize,
        to: Direction,
        local: &Tensor,
        layers: &Layers<'_>,
    ) -> Result<()> {
        self.check(layers)?;
        match &mut self.variant {
            Variant::Overlap(e) => e.update_with_local_op(n, to, local, layers),
            _ => Err(EnvError::StructuralMismatch(
                "local operator insertion needs an overlap environment".into(),
            )),
        }
    }
}

impl Environment for EnvironmentEngine {
    fn len(&self) -> usize {
        self.variant.env().len()
    }

    fn boundary(&self, bond: Bond) -> Result<&Tensor> {
        self.variant.env().boundary(bond)
    }

    fn update(&mut self, n: usize, to: Direction, layers: &Layers<'_>) -> Result<()> {
        self.check(layers)?;
        debug!("update site {} toward {:?}", n, to);
        self.variant.env_mut().update(n, to, layers)?;
        if let Some(p) = self.projector.as_mut() {
            p.update(n, to, layers.bra)?;
        }
        Ok(())
    }

    fn clear(&mut self, sites: &[usize]) {
        self.variant.env_mut().clear(sites);
        if let Some(p) = self.projector.as_mut() {
            p.clear(sites);
        }
    }

    fn heff0(&self, c: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        self.check(layers)?;
        self.variant.env().heff0(c, bond, layers)
    }

    fn heff1(&mut self, a: &Tensor, n: usize, layers: &Layers<'_>) -> Result<Tensor> {
        self.check(layers)?;
        let a = self.deflate(Window::Site(n), a.clone(), layers)?;
        let out = self.variant.env_mut().heff1(&a, n, layers)?;
        self.deflate(Window::Site(n), out, layers)
    }

    fn heff2(&mut self, aa: &Tensor, bond: Bond, layers: &Layers<'_>) -> Result<Tensor> {
        self.check(layers)?;
        let (n1, n2) = bond.sites(self.len())?;
        let window = Window::Bond(n1, n2);
        let aa = self.deflate(window, aa.clone(), layers)?;
        let out = self.variant.env_mut().heff2(&aa, bond, layers)?;
        self.deflate(window, out, layers)
    }

    fn measure(&self, bond: Bond, layers: &Layers<'_>) -> Result<C64> {
        self.check(layers)?;
        self.variant.env().measure(bond, layers)
    }
}
