use crate::bond::{Bond, Direction};
use crate::engine::{check_site, Environment};
use crate::error::{EnvError, Result};
use crate::layers::Layers;
use crate::overlap::OverlapEnv;
use tn::{Chain, Tensor};

/// Region of the chain the local projections currently refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    Site(usize),
    /// Two neighbouring sites in ascending order.
    Bond(usize, usize),
}

/// Orthogonalizes local candidates against a set of reference states.
///
/// For each reference the projector keeps an overlap environment between the
/// primary (bra) chain and that reference. The local projection of reference
/// `i` on a window is the reference's window tensor dressed by those
/// boundaries. Reference factors are not applied, so references are taken to
/// be normalized.
#[derive(Clone, Debug)]
pub struct DeflationProjector {
    references: Vec<Chain>,
    envs: Vec<OverlapEnv>,
    window: Option<Window>,
    local: Vec<Tensor>,
}

impl DeflationProjector {
    pub fn new(primary: &Chain, references: Vec<Chain>) -> Result<Self> {
        let envs = references
            .iter()
            .map(|r| OverlapEnv::new(&Layers::overlap(primary, r)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            references,
            envs,
            window: None,
            local: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn references(&self) -> &[Chain] {
        &self.references
    }

    /// Window the current local projections belong to, if any.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn local(&self) -> &[Tensor] {
        &self.local
    }

    pub fn update(&mut self, n: usize, to: Direction, primary: &Chain) -> Result<()> {
        self.window = None;
        for (env, r) in self.envs.iter_mut().zip(&self.references) {
            env.update(n, to, &Layers::overlap(primary, r))?;
        }
        Ok(())
    }

    pub fn clear(&mut self, sites: &[usize]) {
        self.window = None;
        for env in self.envs.iter_mut() {
            env.clear(sites);
        }
    }

    /// Recompute the local projections on site `n`.
    pub fn refresh_site(&mut self, n: usize, primary: &Chain) -> Result<()> {
        self.window = None;
        check_site(n, primary.len())?;
        let local = self
            .envs
            .iter_mut()
            .zip(&self.references)
            .map(|(env, r)| env.heff1(r.site(n), n, &Layers::overlap(primary, r)))
            .collect::<Result<Vec<_>>>()?;
        self.local = local;
        self.window = Some(Window::Site(n));
        Ok(())
    }

    /// Recompute the local projections on the two sites of `bond`.
    pub fn refresh_bond(&mut self, bond: Bond, primary: &Chain) -> Result<()> {
        self.window = None;
        let (n1, n2) = bond.sites(primary.len())?;
        let local = self
            .envs
            .iter_mut()
            .zip(&self.references)
            .map(|(env, r)| {
                let aa = r.merge_two_sites(n1, n2)?;
                env.heff2(&aa, bond, &Layers::overlap(primary, r))
            })
            .collect::<Result<Vec<_>>>()?;
        self.local = local;
        self.window = Some(Window::Bond(n1, n2));
        Ok(())
    }

    /// Subtract from `candidate` its overlap with each local projection, one
    /// reference after another.
    pub fn project(&self, candidate: &Tensor) -> Result<Tensor> {
        if self.references.is_empty() {
            return Ok(candidate.clone());
        }
        if self.window.is_none() {
            return Err(EnvError::NoProjectionWindow);
        }
        let mut out = candidate.clone();
        for proj in &self.local {
            let x = proj.vdot(&out)?;
            out = out.add_scaled(proj, -x)?;
        }
        Ok(out)
    }
}
