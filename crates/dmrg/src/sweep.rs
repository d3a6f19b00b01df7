use crate::error::{DmrgError, Result};
use crate::lanczos::{lowest_eigenpair, LanczosOptions};
use environment::{
    Bond, Direction, EnvError, Environment, EnvironmentEngine, Layers, Window,
};
use log::{debug, info, warn};
use num_complex::Complex64;
use tn::linalg::svd_split;
use tn::{Chain, End, Tensor, Truncation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Optimize one site at a time. A bond the environment asks to enlarge
    /// is handled by a two-site step instead, so bonds grow up to the
    /// truncation limits.
    OneSite,
    /// Optimize neighbouring pairs and truncate the split by SVD.
    TwoSite,
}

#[derive(Clone, Copy, Debug)]
pub struct DmrgOptions {
    pub method: Method,
    /// Each sweep runs to the last site and back.
    pub max_sweeps: usize,
    /// Stop once the energy changes by less than this between sweeps.
    pub energy_tol: f64,
    pub truncation: Truncation,
    pub lanczos: LanczosOptions,
    /// Relative defect tolerated before the effective operator is declared
    /// non-Hermitian.
    pub hermitian_tol: f64,
}

impl Default for DmrgOptions {
    fn default() -> Self {
        Self {
            method: Method::TwoSite,
            max_sweeps: 20,
            energy_tol: 1e-10,
            truncation: Truncation::default(),
            lanczos: LanczosOptions::default(),
            hermitian_tol: 1e-8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DmrgResult {
    pub energy: f64,
    /// Energy at the end of each sweep.
    pub energies: Vec<f64>,
    pub converged: bool,
    /// Largest truncated weight of any two-site split.
    pub max_discarded: f64,
}

/// Compare `<x|H(Hx)>` with `<Hx|Hx>`; the two agree for Hermitian `H`.
pub fn check_hermitian<F>(mut apply: F, x: &Tensor, tol: f64) -> Result<()>
where
    F: FnMut(&Tensor) -> std::result::Result<Tensor, EnvError>,
{
    let hx = apply(x)?;
    let hhx = apply(&hx)?;
    let a = x.vdot(&hhx)?;
    let b = hx.vdot(&hx)?;
    let defect = (a - b).norm() / b.norm().max(f64::MIN_POSITIVE);
    if defect > tol {
        return Err(EnvError::NumericNonHermitian {
            defect,
            tolerance: tol,
        }
        .into());
    }
    Ok(())
}

fn unit() -> Complex64 {
    Complex64::new(1.0, 0.0)
}

fn normalized(t: &Tensor) -> Result<Tensor> {
    let n = t.norm();
    if n == 0.0 {
        return Err(DmrgError::Breakdown("optimized tensor vanished".into()));
    }
    Ok(t.scale(Complex64::new(1.0 / n, 0.0)))
}

struct Sweeper<'a> {
    h: &'a Chain,
    env: EnvironmentEngine,
    opts: &'a DmrgOptions,
    max_discarded: f64,
    check_next: bool,
}

impl Sweeper<'_> {
    fn one_site(&mut self, psi: &mut Chain, n: usize, to: Direction) -> Result<f64> {
        let len = psi.len();
        let ahead = Bond::produced_by(n, to);
        let grow = self.env.enlarge_bond(
            ahead,
            &Layers::expectation(psi, self.h),
            &self.opts.truncation,
        )?;
        if grow {
            debug!("bond {} grows through a two-site step", ahead);
            let first = match to {
                Direction::Last => n,
                Direction::First => n - 1,
            };
            return self.two_site(psi, first, to);
        }
        let layers = Layers::expectation(psi, self.h);
        let x0 = self
            .env
            .deflate(Window::Site(n), psi.site(n).clone(), &layers)?;
        if self.check_next {
            check_hermitian(
                |v| self.env.heff1(v, n, &layers),
                &x0,
                self.opts.hermitian_tol,
            )?;
            self.check_next = false;
        }
        let pair = lowest_eigenpair(
            |v| self.env.heff1(v, n, &layers),
            &x0,
            &self.opts.lanczos,
        )?;
        let x = normalized(&pair.vector)?;

        match to {
            Direction::Last if n + 1 < len => {
                let split = svd_split(&x, 2, &Truncation::exact())?;
                let svh = split.vh.scale_axis(0, &split.s)?;
                let next = svh.tensordot(psi.site(n + 1), &[1], &[0])?;
                psi.set_site(n, split.u)?;
                psi.set_site(n + 1, next)?;
                self.env.clear(&[n, n + 1]);
                self.env.update(n, to, &Layers::expectation(psi, self.h))?;
            }
            Direction::First if n > 0 => {
                let split = svd_split(&x, 1, &Truncation::exact())?;
                let us = split.u.scale_axis(1, &split.s)?;
                let prev = psi.site(n - 1).tensordot(&us, &[2], &[0])?;
                psi.set_site(n, split.vh)?;
                psi.set_site(n - 1, prev)?;
                self.env.clear(&[n - 1, n]);
                self.env.update(n, to, &Layers::expectation(psi, self.h))?;
            }
            _ => {
                psi.set_site(n, x)?;
                self.env.clear(&[n]);
            }
        }
        Ok(pair.value)
    }

    fn two_site(&mut self, psi: &mut Chain, n: usize, to: Direction) -> Result<f64> {
        let bond = Bond::new(n as isize, n as isize + 1);
        let layers = Layers::expectation(psi, self.h);
        let aa = psi.merge_two_sites(n, n + 1)?;
        let x0 = self.env.deflate(Window::Bond(n, n + 1), aa, &layers)?;
        if self.check_next {
            check_hermitian(
                |v| self.env.heff2(v, bond, &layers),
                &x0,
                self.opts.hermitian_tol,
            )?;
            self.check_next = false;
        }
        let pair = lowest_eigenpair(
            |v| self.env.heff2(v, bond, &layers),
            &x0,
            &self.opts.lanczos,
        )?;

        let split = svd_split(&pair.vector, 2, &self.opts.truncation)?;
        self.max_discarded = self.max_discarded.max(split.discarded);
        let kept = split.s.iter().map(|s| s * s).sum::<f64>().sqrt();
        let s: Vec<f64> = split.s.iter().map(|v| v / kept).collect();
        let (left, right) = match to {
            Direction::Last => (split.u, split.vh.scale_axis(0, &s)?),
            Direction::First => (split.u.scale_axis(2, &s)?, split.vh),
        };
        psi.set_site(n, left)?;
        psi.set_site(n + 1, right)?;
        self.env.clear(&[n, n + 1]);
        let moved = match to {
            Direction::Last => n,
            Direction::First => n + 1,
        };
        self.env.update(moved, to, &Layers::expectation(psi, self.h))?;
        Ok(pair.value)
    }

    fn sweep(&mut self, psi: &mut Chain, to: Direction) -> Result<f64> {
        let len = psi.len();
        let mut energy = f64::NAN;
        match self.opts.method {
            Method::OneSite => {
                for n in to.sites(len) {
                    energy = self.one_site(psi, n, to)?;
                }
            }
            Method::TwoSite => {
                for n in to.sites(len - 1) {
                    energy = self.two_site(psi, n, to)?;
                }
            }
        }
        Ok(energy)
    }
}

/// Variational ground state of `h` in the space orthogonal to `references`.
///
/// `psi` is the starting state and is overwritten with the result,
/// normalized and in canonical form toward the first site. References must
/// be normalized; passing previously converged states yields excited states.
pub fn run(psi: &mut Chain, h: &Chain, references: &[Chain], opts: &DmrgOptions) -> Result<DmrgResult> {
    if opts.method == Method::TwoSite && psi.len() < 2 {
        return Err(DmrgError::InvalidOptions(
            "two-site sweeps need at least two sites".into(),
        ));
    }
    if opts.max_sweeps == 0 {
        return Err(DmrgError::InvalidOptions("max_sweeps must be positive".into()));
    }
    psi.canonize(End::First)?;
    psi.set_factor(unit());

    let layers = Layers::expectation(psi, h);
    let mut env = EnvironmentEngine::new(&layers, references.to_vec())?;
    env.setup(Direction::First, &layers)?;

    let mut sweeper = Sweeper {
        h,
        env,
        opts,
        max_discarded: 0.0,
        check_next: true,
    };
    let mut energies: Vec<f64> = Vec::with_capacity(opts.max_sweeps);
    let mut converged = false;
    for sweep in 0..opts.max_sweeps {
        sweeper.check_next = true;
        sweeper.sweep(psi, Direction::Last)?;
        let energy = sweeper.sweep(psi, Direction::First)?;
        let delta = energies.last().map_or(f64::INFINITY, |e| (energy - e).abs());
        energies.push(energy);
        info!(
            "sweep {}: energy {:.12}, change {:.3e}, bonds {:?}",
            sweep,
            energy,
            delta,
            psi.bond_dims()
        );
        if delta < opts.energy_tol {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(
            "no convergence to {:.1e} after {} sweeps",
            opts.energy_tol, opts.max_sweeps
        );
    }
    debug!("largest discarded weight {:.3e}", sweeper.max_discarded);

    Ok(DmrgResult {
        energy: energies.last().copied().unwrap_or(f64::NAN),
        energies,
        converged,
        max_discarded: sweeper.max_discarded,
    })
}
