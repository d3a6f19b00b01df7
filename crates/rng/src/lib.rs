use sha3::{digest::{ExtendableOutput, Update, XofReader}, Shake256};

/// Deterministic random source keyed by a seed and a per-draw context label.
///
/// Two generators built from the same seed produce the same stream as long as
/// they are asked for values with the same labels, which keeps random test
/// chains reproducible across platforms.
pub struct XofRng {
    state: [u8; 32],
    draws: u64,
}

impl XofRng {
    pub fn new(seed: &[u8]) -> Self {
        let mut state = [0u8; 32];
        absorb(&[seed, b"XOF_RNG_SEED"], &mut state);
        Self { state, draws: 0 }
    }

    /// Child generator for an independent stream, e.g. one per chain site.
    pub fn fork(&mut self, label: &[u8]) -> Self {
        let mut state = [0u8; 32];
        absorb(&[&self.state, label, b"FORK"], &mut state);
        self.advance();
        Self { state, draws: 0 }
    }

    /// Uniform sample in `[0, 1]`.
    pub fn uniform(&mut self, ctx: &[u8]) -> f64 {
        self.advance();
        let mut out = [0u8; 8];
        absorb(&[&self.state, ctx], &mut out);
        (u64::from_be_bytes(out) as f64) / (u64::MAX as f64)
    }

    /// Standard normal sample (Box-Muller).
    pub fn normal(&mut self, ctx: &[u8]) -> f64 {
        let u1 = self.uniform(ctx).max(f64::MIN_POSITIVE);
        let u2 = self.uniform(ctx);
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn advance(&mut self) {
        self.draws += 1;
        let prev = self.state;
        absorb(&[&prev, &self.draws.to_be_bytes(), b"STEP"], &mut self.state);
    }
}

fn absorb(parts: &[&[u8]], out: &mut [u8]) {
    let mut h = Shake256::default();
    for p in parts {
        h.update(p);
    }
    let mut r = h.finalize_xof();
    r.read(out);
}

#[cfg(test)]
mod tests {
    use super::XofRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = XofRng::new(b"seed");
        let mut b = XofRng::new(b"seed");
        for _ in 0..16 {
            assert_eq!(a.uniform(b"U"), b.uniform(b"U"));
        }
        assert_eq!(a.draws(), 16);
    }

    #[test]
    fn forks_diverge() {
        let mut root = XofRng::new(b"seed");
        let mut f1 = root.fork(b"site-0");
        let mut f2 = root.fork(b"site-0");
        assert!((f1.uniform(b"U") - f2.uniform(b"U")).abs() > 0.0);
    }

    #[test]
    fn uniform_in_unit_interval() {
        let mut r = XofRng::new(b"range");
        for _ in 0..200 {
            let x = r.uniform(b"U");
            assert!((0.0..=1.0).contains(&x));
        }
    }
}
