use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dmrg::{output::write_csv, run, DmrgOptions, LanczosOptions, Method};
use quantum::{
    hamiltonian::{Heisenberg, Ising},
    observables::{expect_x, expect_z},
    spin::phys_leg,
};
use rng::XofRng;
use tn::{Chain, Truncation};

/// Ground and low-lying states of a spin chain by DMRG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value_t = Model::Heisenberg)]
    model: Model,

    /// Number of spins
    #[arg(long, default_value_t = 16)]
    n: usize,

    /// Nearest-neighbour coupling
    #[arg(long, default_value_t = 1.0)]
    j: f64,

    /// Transverse field (Ising only)
    #[arg(long, default_value_t = 1.0)]
    hx: f64,

    /// Longitudinal field (Ising only)
    #[arg(long, default_value_t = 0.0)]
    hz: f64,

    /// Close the chain into a ring with this coupling between the ends
    #[arg(long)]
    ring: Option<f64>,

    #[arg(long, value_enum, default_value_t = Sweep::Two)]
    method: Sweep,

    /// Number of lowest states to target
    #[arg(long, default_value_t = 1)]
    states: usize,

    #[arg(long, default_value_t = 32)]
    max_bond: usize,

    /// SVD cutoff
    #[arg(long, default_value_t = 1e-10)]
    cutoff: f64,

    #[arg(long, default_value_t = 20)]
    sweeps: usize,

    /// Energy change between sweeps counted as converged
    #[arg(long, default_value_t = 1e-9)]
    tol: f64,

    /// Bond dimension of the random start state
    #[arg(long, default_value_t = 4)]
    start_bond: usize,

    /// RNG seed for the start states
    #[arg(long, default_value = "dmrg-chain")]
    seed: String,

    /// Output CSV path (one energy per state)
    #[arg(long, default_value = "dmrg_states.csv")]
    out: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Model {
    Heisenberg,
    Ising,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Sweep {
    One,
    Two,
}

fn hamiltonian(args: &Args) -> Result<Chain> {
    let h = match (args.model, args.ring) {
        (Model::Heisenberg, None) => Heisenberg::uniform(args.n, args.j).to_mpo()?,
        (Model::Heisenberg, Some(w)) => Heisenberg::uniform(args.n, args.j).ring_mpo(w)?,
        (Model::Ising, None) => Ising::transverse(args.n, args.hx, args.hz, args.j).to_mpo()?,
        (Model::Ising, Some(w)) => {
            Ising::transverse(args.n, args.hx, args.hz, args.j).ring_mpo(w)?
        }
    };
    Ok(h)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    if args.n < 2 {
        bail!("need at least two spins, got {}", args.n);
    }
    if args.states == 0 {
        bail!("--states must be positive");
    }

    let h = hamiltonian(&args)?;
    let opts = DmrgOptions {
        method: match args.method {
            Sweep::One => Method::OneSite,
            Sweep::Two => Method::TwoSite,
        },
        max_sweeps: args.sweeps,
        energy_tol: args.tol,
        truncation: Truncation {
            max_bond: args.max_bond,
            cutoff: args.cutoff,
        },
        lanczos: LanczosOptions::default(),
        ..DmrgOptions::default()
    };

    let mut found: Vec<Chain> = Vec::with_capacity(args.states);
    let mut rows = Vec::new();
    for k in 0..args.states {
        let mut rng = XofRng::new(format!("{}-state-{}", args.seed, k).as_bytes());
        let mut psi = Chain::random_mps(args.n, &phys_leg(), args.start_bond, &mut rng)?;
        let res = run(&mut psi, &h, &found, &opts)
            .with_context(|| format!("DMRG for state {} failed", k))?;

        rows.push((k as f64, res.energy));
        let mz: f64 = (0..args.n)
            .map(|s| expect_z(&psi, s))
            .sum::<environment::Result<f64>>()?
            / args.n as f64;
        let mx: f64 = (0..args.n)
            .map(|s| expect_x(&psi, s))
            .sum::<environment::Result<f64>>()?
            / args.n as f64;
        println!(
            "state {}: E = {:.12} (converged: {}, sweeps: {}, discarded: {:.2e}) <Z> = {:.6} <X> = {:.6} bonds = {:?}",
            k,
            res.energy,
            res.converged,
            res.energies.len(),
            res.max_discarded,
            mz,
            mx,
            psi.bond_dims()
        );
        found.push(psi);
    }

    write_csv(&args.out, "state,energy", &rows)
        .with_context(|| format!("failed to write {}", args.out))?;
    Ok(())
}
