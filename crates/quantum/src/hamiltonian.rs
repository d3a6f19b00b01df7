use crate::spin::{combine, identity, pauli_x, pauli_y, pauli_z, phys_leg, to_tensor, zero, Local};
use num_complex::Complex64;
use tn::{mpo, Chain, Result, Tensor};

/// Ising chain `sum_i hx_i X_i + hz_i Z_i + sum_i J_i Z_i Z_{i+1}`.
#[derive(Clone, Debug)]
pub struct Ising {
    /// transverse fields hx_i * X_i
    pub x_fields: Vec<f64>,
    /// longitudinal fields hz_i * Z_i
    pub z_fields: Vec<f64>,
    /// nearest-neighbor couplings J_i * Z_i Z_{i+1}
    pub zz_couplings: Vec<f64>,
}

impl Ising {
    pub fn transverse(n: usize, hx: f64, hz: f64, j: f64) -> Self {
        Self {
            x_fields: vec![hx; n],
            z_fields: vec![hz; n],
            zz_couplings: vec![j; n.saturating_sub(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.z_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_fields.is_empty()
    }

    pub fn to_mpo(&self) -> Result<Chain> {
        let onsite = self
            .x_fields
            .iter()
            .zip(&self.z_fields)
            .map(|(&hx, &hz)| to_tensor(combine(hx, pauli_x(), hz, pauli_z())))
            .collect::<Result<Vec<_>>>()?;
        let pairs = vec![(to_tensor(pauli_z())?, to_tensor(pauli_z())?)];
        let couplings: Vec<Vec<Complex64>> = self
            .zz_couplings
            .iter()
            .map(|&j| vec![Complex64::new(j, 0.0)])
            .collect();
        mpo::nearest_neighbor(&phys_leg(), &onsite, &pairs, &couplings)
    }

    /// Trace MPO of the chain closed by `wrap * Z_0 Z_{n-1}`.
    pub fn ring_mpo(&self, wrap: f64) -> Result<Chain> {
        let n = self.len();
        let parts = vec![
            mpo::to_periodic(&self.to_mpo()?)?,
            closing_term(n, pauli_z(), wrap)?,
        ];
        mpo::periodic_direct_sum(&parts)
    }
}

/// Heisenberg chain `sum_i jx_i X_i X_{i+1} + jy_i Y_i Y_{i+1} + jz_i Z_i Z_{i+1}`.
#[derive(Clone, Debug)]
pub struct Heisenberg {
    pub jx: Vec<f64>,
    pub jy: Vec<f64>,
    pub jz: Vec<f64>,
}

impl Heisenberg {
    pub fn uniform(n: usize, j: f64) -> Self {
        Self {
            jx: vec![j; n.saturating_sub(1)],
            jy: vec![j; n.saturating_sub(1)],
            jz: vec![j; n.saturating_sub(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.jz.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_mpo(&self) -> Result<Chain> {
        let nothing = to_tensor(zero())?;
        let onsite: Vec<Tensor> = vec![nothing; self.len()];
        let pairs = vec![
            (to_tensor(pauli_x())?, to_tensor(pauli_x())?),
            (to_tensor(pauli_y())?, to_tensor(pauli_y())?),
            (to_tensor(pauli_z())?, to_tensor(pauli_z())?),
        ];
        let couplings: Vec<Vec<Complex64>> = (0..self.jz.len())
            .map(|i| {
                [self.jx[i], self.jy[i], self.jz[i]]
                    .iter()
                    .map(|&j| Complex64::new(j, 0.0))
                    .collect()
            })
            .collect();
        mpo::nearest_neighbor(&phys_leg(), &onsite, &pairs, &couplings)
    }

    /// Trace MPO of the ring closed by an isotropic bond of strength `wrap`
    /// between the last and the first site.
    pub fn ring_mpo(&self, wrap: f64) -> Result<Chain> {
        let n = self.len();
        let parts = vec![
            mpo::to_periodic(&self.to_mpo()?)?,
            closing_term(n, pauli_x(), wrap)?,
            closing_term(n, pauli_y(), wrap)?,
            closing_term(n, pauli_z(), wrap)?,
        ];
        mpo::periodic_direct_sum(&parts)
    }
}

/// `wrap * P_0 P_{n-1}` as a product MPO.
fn closing_term(n: usize, p: Local, wrap: f64) -> Result<Chain> {
    let ops = (0..n)
        .map(|s| to_tensor(if s == 0 || s + 1 == n { p } else { identity() }))
        .collect::<Result<Vec<_>>>()?;
    let mut chain = mpo::product(&phys_leg(), &ops)?;
    chain.set_factor(Complex64::new(wrap, 0.0));
    Ok(chain)
}
