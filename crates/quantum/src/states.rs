use crate::spin::{phys_leg, C64};
use tn::{Chain, Leg, Result, Tensor};

/// Product state with every spin up.
pub fn all_up(n: usize) -> Result<Chain> {
    let up = vec![C64::new(1.0, 0.0), C64::new(0.0, 0.0)];
    Chain::product_state(&phys_leg(), &vec![up; n])
}

/// Product state alternating up and down, starting with up.
pub fn neel(n: usize) -> Result<Chain> {
    let up = vec![C64::new(1.0, 0.0), C64::new(0.0, 0.0)];
    let down = vec![C64::new(0.0, 0.0), C64::new(1.0, 0.0)];
    let vectors: Vec<Vec<C64>> = (0..n)
        .map(|s| if s % 2 == 0 { up.clone() } else { down.clone() })
        .collect();
    Chain::product_state(&phys_leg(), &vectors)
}

/// `(|up up> + |down down>) / sqrt(2)` with a two-dimensional bond.
pub fn bell_pair() -> Result<Chain> {
    let s = 1.0 / 2.0_f64.sqrt();
    let a = Tensor::from_real(
        vec![Leg::trivial(1, 1), phys_leg(), Leg::trivial(2, -1)],
        &[s, 0.0, 0.0, s],
    )?;
    let b = Tensor::from_real(
        vec![Leg::trivial(2, 1), phys_leg(), Leg::trivial(1, -1)],
        &[1.0, 0.0, 0.0, 1.0],
    )?;
    Chain::mps(vec![a, b])
}
