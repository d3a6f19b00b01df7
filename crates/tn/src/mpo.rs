//! Builders for operator chains.

use crate::chain::{Chain, ChainKind, End};
use crate::error::{Result, TnError};
use crate::leg::Leg;
use crate::tensor::{Tensor, C64};

fn check_local_op(op: &Tensor, d: usize) -> Result<()> {
    if op.shape() != vec![d, d] {
        return Err(TnError::ShapeMismatch {
            expected: vec![d, d],
            actual: op.shape(),
        });
    }
    Ok(())
}

/// Add `coeff * op[o, i]` to `w[l, o, r, i]`.
fn place(w: &mut Tensor, l: usize, r: usize, op: &Tensor, coeff: C64) {
    let d = op.shape()[0];
    for o in 0..d {
        for i in 0..d {
            let v = w.get(&[l, o, r, i]) + coeff * op.get(&[o, i]);
            w.set(&[l, o, r, i], v);
        }
    }
}

fn site_tensor(phys: &Leg, dl: usize, dr: usize) -> Tensor {
    Tensor::zeros(vec![
        Leg::trivial(dl, 1),
        phys.clone(),
        Leg::trivial(dr, -1),
        phys.conj(),
    ])
}

/// MPO of `sum_n onsite[n] + sum_n sum_k couplings[n][k] * A_k(n) B_k(n+1)`.
///
/// Local operators are `(out, in)` matrices on the space `phys`. The
/// virtual space between sites holds a "nothing placed" channel, one
/// channel per pending pair, and a "done" channel.
pub fn nearest_neighbor(
    phys: &Leg,
    onsite: &[Tensor],
    pairs: &[(Tensor, Tensor)],
    couplings: &[Vec<C64>],
) -> Result<Chain> {
    let n = onsite.len();
    let d = phys.dim();
    if n == 0 {
        return Err(TnError::InvalidChain("operator has no sites".into()));
    }
    if couplings.len() + 1 != n {
        return Err(TnError::InvalidChain(format!(
            "{} sites need {} coupling sets, got {}",
            n,
            n - 1,
            couplings.len()
        )));
    }
    for op in onsite {
        check_local_op(op, d)?;
    }
    for (a, b) in pairs {
        check_local_op(a, d)?;
        check_local_op(b, d)?;
    }
    if let Some(bad) = couplings.iter().find(|c| c.len() != pairs.len()) {
        return Err(TnError::InvalidChain(format!(
            "{} couplings given for {} operator pairs",
            bad.len(),
            pairs.len()
        )));
    }

    let m = pairs.len();
    let start = 0;
    let done = m + 1;
    let one = C64::new(1.0, 0.0);
    let eye = Tensor::eye(phys.clone(), phys.conj())?;

    let mut sites = Vec::with_capacity(n);
    for s in 0..n {
        if n == 1 {
            let mut w = site_tensor(phys, 1, 1);
            place(&mut w, 0, 0, &onsite[0], one);
            sites.push(w);
            break;
        }
        let first = s == 0;
        let last = s == n - 1;
        let dl = if first { 1 } else { m + 2 };
        let dr = if last { 1 } else { m + 2 };
        // Row and column indices of the channels on this site's legs.
        let row = |ch: usize| if first { Some(0).filter(|_| ch == start) } else { Some(ch) };
        let col = |ch: usize| if last { Some(0).filter(|_| ch == done) } else { Some(ch) };

        let mut w = site_tensor(phys, dl, dr);
        if let (Some(l), Some(r)) = (row(start), col(start)) {
            place(&mut w, l, r, &eye, one);
        }
        if let (Some(l), Some(r)) = (row(done), col(done)) {
            place(&mut w, l, r, &eye, one);
        }
        if let (Some(l), Some(r)) = (row(start), col(done)) {
            place(&mut w, l, r, &onsite[s], one);
        }
        for (k, (a, b)) in pairs.iter().enumerate() {
            if !last {
                if let (Some(l), Some(r)) = (row(start), col(k + 1)) {
                    place(&mut w, l, r, a, one);
                }
            }
            if !first {
                if let (Some(l), Some(r)) = (row(k + 1), col(done)) {
                    place(&mut w, l, r, b, couplings[s - 1][k]);
                }
            }
        }
        sites.push(w);
    }
    Chain::mpo(sites)
}

/// Product operator `ops[0] ⊗ ops[1] ⊗ ...` with one-dimensional bonds.
pub fn product(phys: &Leg, ops: &[Tensor]) -> Result<Chain> {
    let d = phys.dim();
    let sites = ops
        .iter()
        .map(|op| {
            check_local_op(op, d)?;
            let mut w = site_tensor(phys, 1, 1);
            place(&mut w, 0, 0, op, C64::new(1.0, 0.0));
            Ok(w)
        })
        .collect::<Result<Vec<_>>>()?;
    Chain::mpo(sites)
}

/// Rewrite an open MPO as a trace MPO representing the same operator.
///
/// The boundary sums of the open chain are folded into the first site, whose
/// left leg becomes a copy of the last right leg.
pub fn to_periodic(open: &Chain) -> Result<Chain> {
    if open.kind() != ChainKind::Mpo || open.is_periodic() {
        return Err(TnError::InvalidChain("to_periodic expects an open MPO".into()));
    }
    let first = open.virtual_leg(End::First).clone();
    let closing = open.virtual_leg(End::Last).conj();

    let sum_left = Tensor::ones(vec![first.conj()]);
    let w0 = sum_left.tensordot(open.site(0), &[0], &[0])?;
    let fan_out = Tensor::ones(vec![closing.clone()]);
    // (a) x (o, r, i) -> (a, o, r, i)
    let w0 = fan_out.tensordot(&w0, &[], &[])?;

    let mut sites = open.sites().to_vec();
    sites[0] = w0;
    let mut chain = Chain::periodic_mpo(sites)?;
    chain.set_factor(open.factor());
    Ok(chain)
}

/// Block-diagonal sum of trace MPOs: the trace of the result equals the sum of
/// the traces of the parts. Open parts with one-dimensional boundaries are
/// accepted as they are. Factors are folded into each part's first site.
pub fn periodic_direct_sum(parts: &[Chain]) -> Result<Chain> {
    let first = parts
        .first()
        .ok_or_else(|| TnError::InvalidChain("direct sum of no operators".into()))?;
    let n = first.len();
    for p in parts {
        if p.kind() != ChainKind::Mpo || p.len() != n {
            return Err(TnError::InvalidChain(
                "direct sum needs MPOs of equal length".into(),
            ));
        }
        let open_ends = p.virtual_leg(End::First).dim() == 1 && p.virtual_leg(End::Last).dim() == 1;
        if !p.is_periodic() && !open_ends {
            return Err(TnError::InvalidChain(
                "open MPO with wide boundaries must go through to_periodic first".into(),
            ));
        }
    }

    let mut sites = Vec::with_capacity(n);
    for s in 0..n {
        let ws: Vec<Tensor> = parts
            .iter()
            .map(|p| {
                if s == 0 {
                    p.site(0).scale(p.factor())
                } else {
                    p.site(s).clone()
                }
            })
            .collect();
        let left = ws[1..]
            .iter()
            .fold(ws[0].leg(0).clone(), |acc, w| acc.direct_sum(w.leg(0)));
        let right = ws[1..]
            .iter()
            .fold(ws[0].leg(2).clone(), |acc, w| acc.direct_sum(w.leg(2)));
        let mut out = Tensor::zeros(vec![
            left,
            ws[0].leg(1).clone(),
            right,
            ws[0].leg(3).clone(),
        ]);
        let (mut l0, mut r0) = (0, 0);
        for w in &ws {
            let [dl, dout, dr, din] = [w.shape()[0], w.shape()[1], w.shape()[2], w.shape()[3]];
            for l in 0..dl {
                for o in 0..dout {
                    for r in 0..dr {
                        for i in 0..din {
                            out.set(&[l0 + l, o, r0 + r, i], w.get(&[l, o, r, i]));
                        }
                    }
                }
            }
            l0 += dl;
            r0 += dr;
        }
        sites.push(out);
    }
    Chain::periodic_mpo(sites)
}

#[cfg(test)]
mod tests {
    use super::{nearest_neighbor, periodic_direct_sum, product, to_periodic};
    use crate::chain::Chain;
    use crate::leg::Leg;
    use crate::tensor::{Tensor, C64};

    fn phys() -> Leg {
        Leg::new(1, vec![1, -1])
    }

    fn z() -> Tensor {
        Tensor::from_real(vec![phys(), phys().conj()], &[1.0, 0.0, 0.0, -1.0]).unwrap()
    }

    fn x() -> Tensor {
        Tensor::from_real(vec![phys(), phys().conj()], &[0.0, 1.0, 1.0, 0.0]).unwrap()
    }

    #[test]
    fn two_site_zz_is_diagonal() {
        let zero = Tensor::zeros(vec![phys(), phys().conj()]);
        let h = nearest_neighbor(
            &phys(),
            &[zero.clone(), zero],
            &[(z(), z())],
            &[vec![C64::new(1.5, 0.0)]],
        )
        .unwrap();
        let m = h.to_dense_operator().unwrap();
        let diag = [1.5, -1.5, -1.5, 1.5];
        for a in 0..4 {
            for b in 0..4 {
                let expect = if a == b { diag[a] } else { 0.0 };
                assert!((m.get(&[a, b]).re - expect).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn periodic_rewrite_keeps_operator() {
        let h = nearest_neighbor(
            &phys(),
            &[x(), x(), x()],
            &[(z(), z())],
            &[vec![C64::new(1.0, 0.0)], vec![C64::new(-0.5, 0.0)]],
        )
        .unwrap();
        let p = to_periodic(&h).unwrap();
        assert!(p.is_periodic());
        let a = h.to_dense_operator().unwrap();
        let b = p.to_dense_operator().unwrap();
        assert!(a.max_abs_diff(&b).unwrap() < 1e-12);
    }

    #[test]
    fn direct_sum_adds_operators() {
        let id = Chain::identity_mpo(3, &phys()).unwrap();
        let zzz = product(&phys(), &[z(), z(), z()]).unwrap();
        let sum = periodic_direct_sum(&[id.clone(), zzz.clone()]).unwrap();
        let a = id.to_dense_operator().unwrap();
        let b = zzz.to_dense_operator().unwrap();
        let expect = a.add_scaled(&b, C64::new(1.0, 0.0)).unwrap();
        let got = sum.to_dense_operator().unwrap();
        assert!(got.max_abs_diff(&expect).unwrap() < 1e-12);
    }
}
