//! SIMD path for the particle-on-particle velocity pass.
//!
//! The dominant cost of a step is the all-pairs velocity sum. This module
//! vectorizes it across targets with `pulp`, selecting the widest available
//! instruction set at runtime. The scalar implementation in
//! [`super::particles`] is the reference the SIMD path must match.
//!
//! The denominator is padded with the smallest positive double so that a
//! coincident pair divides a zero numerator by a nonzero denominator and
//! contributes exactly zero, matching the scalar skip.

use pulp::{Arch, Simd, WithSimd};

/// Denominator pad; keeps a fully-coincident zero-radius pair finite.
const DEN_PAD: f64 = 1.0e-300;

#[inline]
fn vel_points_on_points_simd_inner<S: Simd>(
    simd: S,
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
) {
    let (tx_head, tx_tail) = S::as_simd_f64s(tx);
    let (ty_head, ty_tail) = S::as_simd_f64s(ty);
    let (out_u_head, out_u_tail) = S::as_mut_simd_f64s(out_u);
    let (out_v_head, out_v_tail) = S::as_mut_simd_f64s(out_v);

    let pad = simd.splat_f64s(DEN_PAD);

    // Vector lanes run across targets; each source is broadcast.
    for (((txv, tyv), uv), vv) in tx_head
        .iter()
        .zip(ty_head.iter())
        .zip(out_u_head.iter_mut())
        .zip(out_v_head.iter_mut())
    {
        let mut sum_u = simd.splat_f64s(0.0);
        let mut sum_v = simd.splat_f64s(0.0);
        for j in 0..sx.len() {
            let sxv = simd.splat_f64s(sx[j]);
            let syv = simd.splat_f64s(sy[j]);
            let ssv = simd.splat_f64s(ss[j]);
            let r2v = simd.splat_f64s(sr[j] * sr[j]);

            let dx = simd.sub_f64s(*txv, sxv);
            let dy = simd.sub_f64s(*tyv, syv);
            let mut den = simd.mul_add_f64s(dx, dx, r2v);
            den = simd.mul_add_f64s(dy, dy, den);
            den = simd.add_f64s(den, pad);

            let f = simd.div_f64s(ssv, den);
            sum_u = simd.sub_f64s(sum_u, simd.mul_f64s(f, dy));
            sum_v = simd.mul_add_f64s(f, dx, sum_v);
        }
        *uv = simd.add_f64s(*uv, sum_u);
        *vv = simd.add_f64s(*vv, sum_v);
    }

    // Scalar tail.
    for (((txs, tys), us), vs) in tx_tail
        .iter()
        .zip(ty_tail.iter())
        .zip(out_u_tail.iter_mut())
        .zip(out_v_tail.iter_mut())
    {
        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        for j in 0..sx.len() {
            let dx = txs - sx[j];
            let dy = tys - sy[j];
            let den = dx * dx + dy * dy + sr[j] * sr[j] + DEN_PAD;
            let f = ss[j] / den;
            sum_u -= f * dy;
            sum_v += f * dx;
        }
        *us += sum_u;
        *vs += sum_v;
    }
}

/// Particle-on-particle velocity accumulation with automatic SIMD dispatch.
pub fn vel_points_on_points(
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
) {
    struct Impl<'a> {
        sx: &'a [f64],
        sy: &'a [f64],
        ss: &'a [f64],
        sr: &'a [f64],
        tx: &'a [f64],
        ty: &'a [f64],
        out_u: &'a mut [f64],
        out_v: &'a mut [f64],
    }

    impl WithSimd for Impl<'_> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            vel_points_on_points_simd_inner(
                simd, self.sx, self.sy, self.ss, self.sr, self.tx, self.ty, self.out_u,
                self.out_v,
            );
        }
    }

    Arch::new().dispatch(Impl {
        sx,
        sy,
        ss,
        sr,
        tx,
        ty,
        out_u,
        out_v,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::particles::vel_points_on_points_scalar;

    #[test]
    fn test_simd_matches_scalar() {
        let n_src = 37;
        let n_tgt = 23;
        let mut sx = Vec::new();
        let mut sy = Vec::new();
        let mut ss = Vec::new();
        let mut sr = Vec::new();
        for j in 0..n_src {
            let a = j as f64 * 0.37;
            sx.push(a.sin());
            sy.push((a * 1.3).cos());
            ss.push(0.5 * (a * 0.7).sin());
            sr.push(0.05 + 0.01 * (j % 5) as f64);
        }
        let mut tx = Vec::new();
        let mut ty = Vec::new();
        for i in 0..n_tgt {
            let a = i as f64 * 0.61;
            tx.push(2.0 * a.cos());
            ty.push(2.0 * a.sin());
        }

        let mut u_ref = vec![0.0; n_tgt];
        let mut v_ref = vec![0.0; n_tgt];
        vel_points_on_points_scalar(&sx, &sy, &ss, &sr, &tx, &ty, &mut u_ref, &mut v_ref);

        let mut u = vec![0.0; n_tgt];
        let mut v = vec![0.0; n_tgt];
        vel_points_on_points(&sx, &sy, &ss, &sr, &tx, &ty, &mut u, &mut v);

        for i in 0..n_tgt {
            assert!((u[i] - u_ref[i]).abs() < 1e-12, "u[{}]: {} vs {}", i, u[i], u_ref[i]);
            assert!((v[i] - v_ref[i]).abs() < 1e-12, "v[{}]: {} vs {}", i, v[i], v_ref[i]);
        }
    }
}
