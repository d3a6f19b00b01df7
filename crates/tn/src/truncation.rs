/// Bond truncation applied when a two-site tensor is split by SVD.
#[derive(Clone, Copy, Debug)]
pub struct Truncation {
    pub max_bond: usize,
    /// Singular values at or below this are dropped.
    pub cutoff: f64,
}

impl Default for Truncation {
    fn default() -> Self {
        Self {
            max_bond: 64,
            cutoff: 1e-12,
        }
    }
}

impl Truncation {
    /// No truncation beyond numerically zero singular values.
    pub fn exact() -> Self {
        Self {
            max_bond: usize::MAX,
            cutoff: 1e-14,
        }
    }

    /// Number of singular values to keep out of a descending spectrum (at least one).
    pub fn kept(&self, singular_values: &[f64]) -> usize {
        let mut kept = 0;
        for &sv in singular_values {
            if sv > self.cutoff && kept < self.max_bond {
                kept += 1;
            }
        }
        kept.max(1)
    }
}
