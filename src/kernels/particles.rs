//! Scalar particle-influence kernels.
//!
//! All kernels accumulate the *unscaled* Biot-Savart sums; the `1/(2 pi)`
//! prefactor is applied once in `finalize_vels`. A source of circulation
//! `G` and core radius `r` at distance `d` from the target contributes
//! through the regularized denominator `D = d^2 + r^2`:
//!
//! ```text
//! u   += -G * dy / D
//! v   +=  G * dx / D
//! w   +=  G * 2 r^2 / D^2          (curl of the regularized velocity)
//! psi += -G * ln(D) / 2
//! ```
//!
//! Velocity, gradient, and vorticity contributions vanish or stay finite at
//! coincident points thanks to the regularization; only the streamfunction
//! needs an explicit coincidence skip.

/// Squared-distance threshold below which a target/source pair counts as
/// coincident for the streamfunction kernel.
pub const COINCIDENT_D2: f64 = 1.0e-24;

/// Accumulate velocity sums at every target from every source particle.
///
/// # Arguments
/// * `sx`, `sy` - source positions
/// * `ss` - source circulations
/// * `sr` - source core radii
/// * `tx`, `ty` - target positions
/// * `out_u`, `out_v` - accumulated, unscaled velocity sums per target
pub fn vel_points_on_points_scalar(
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
) {
    debug_assert_eq!(sx.len(), sy.len());
    debug_assert_eq!(sx.len(), ss.len());
    debug_assert_eq!(sx.len(), sr.len());
    debug_assert_eq!(tx.len(), out_u.len());
    debug_assert_eq!(tx.len(), out_v.len());

    for i in 0..tx.len() {
        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        for j in 0..sx.len() {
            let dx = tx[i] - sx[j];
            let dy = ty[i] - sy[j];
            let den = dx * dx + dy * dy + sr[j] * sr[j];
            if den <= 0.0 {
                continue;
            }
            let f = ss[j] / den;
            sum_u -= f * dy;
            sum_v += f * dx;
        }
        out_u[i] += sum_u;
        out_v[i] += sum_v;
    }
}

/// Accumulate velocity and vorticity sums at every target.
#[allow(clippy::too_many_arguments)]
pub fn vel_vort_points_on_points_scalar(
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
    out_w: &mut [f64],
) {
    debug_assert_eq!(tx.len(), out_w.len());

    for i in 0..tx.len() {
        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        let mut sum_w = 0.0;
        for j in 0..sx.len() {
            let dx = tx[i] - sx[j];
            let dy = ty[i] - sy[j];
            let r2 = sr[j] * sr[j];
            let den = dx * dx + dy * dy + r2;
            if den <= 0.0 {
                continue;
            }
            let f = ss[j] / den;
            sum_u -= f * dy;
            sum_v += f * dx;
            sum_w += 2.0 * r2 * f / den;
        }
        out_u[i] += sum_u;
        out_v[i] += sum_v;
        out_w[i] += sum_w;
    }
}

/// Accumulate velocity and velocity-gradient sums at every target.
///
/// Gradient output order is `[du/dx, du/dy, dv/dx, dv/dy]`; the trace is
/// zero by construction (the regularized field is divergence-free).
#[allow(clippy::too_many_arguments)]
pub fn vel_grad_points_on_points_scalar(
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
    out_g: &mut [&mut [f64]; 4],
) {
    for i in 0..tx.len() {
        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        let mut g = [0.0; 4];
        for j in 0..sx.len() {
            let dx = tx[i] - sx[j];
            let dy = ty[i] - sy[j];
            let den = dx * dx + dy * dy + sr[j] * sr[j];
            if den <= 0.0 {
                continue;
            }
            let f = ss[j] / den;
            sum_u -= f * dy;
            sum_v += f * dx;

            let f2 = f / den;
            // du/dx = G * 2 dx dy / D^2, du/dy = -G (D - 2 dy^2) / D^2
            g[0] += 2.0 * f2 * dx * dy;
            g[1] -= f2 * (den - 2.0 * dy * dy);
            // dv/dx = G (D - 2 dx^2) / D^2, dv/dy = -du/dx
            g[2] += f2 * (den - 2.0 * dx * dx);
            g[3] -= 2.0 * f2 * dx * dy;
        }
        out_u[i] += sum_u;
        out_v[i] += sum_v;
        for k in 0..4 {
            out_g[k][i] += g[k];
        }
    }
}

/// Accumulate streamfunction sums at every target.
pub fn psi_points_on_points_scalar(
    sx: &[f64],
    sy: &[f64],
    ss: &[f64],
    sr: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_psi: &mut [f64],
) {
    for i in 0..tx.len() {
        let mut sum = 0.0;
        for j in 0..sx.len() {
            let dx = tx[i] - sx[j];
            let dy = ty[i] - sy[j];
            let d2 = dx * dx + dy * dy;
            if d2 < COINCIDENT_D2 {
                continue;
            }
            sum -= 0.5 * ss[j] * (d2 + sr[j] * sr[j]).ln();
        }
        out_psi[i] += sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

    #[test]
    fn test_point_vortex_far_field() {
        // A unit vortex at the origin induces |u| = 1/(2 pi d) at distance d,
        // perpendicular to the separation.
        let mut u = [0.0];
        let mut v = [0.0];
        vel_points_on_points_scalar(
            &[0.0], &[0.0], &[1.0], &[0.0],
            &[10.0], &[0.0],
            &mut u, &mut v,
        );
        // Unscaled sums; apply the prefactor by hand.
        let u_phys = u[0] / TWO_PI;
        let v_phys = v[0] / TWO_PI;
        assert!(u_phys.abs() < 1e-15);
        assert!((v_phys - 1.0 / (TWO_PI * 10.0)).abs() < 1e-15);
    }

    #[test]
    fn test_coincident_velocity_is_zero() {
        let mut u = [0.0];
        let mut v = [0.0];
        vel_points_on_points_scalar(
            &[1.0], &[2.0], &[3.0], &[0.1],
            &[1.0], &[2.0],
            &mut u, &mut v,
        );
        assert_eq!(u[0], 0.0);
        assert_eq!(v[0], 0.0);
    }

    #[test]
    fn test_vorticity_peak_at_center() {
        // At the particle center the regularized vorticity sum is 2 G / r^2;
        // scaled by 1/(2 pi) that is G / (pi r^2).
        let r = 0.25;
        let mut u = [0.0];
        let mut v = [0.0];
        let mut w = [0.0];
        vel_vort_points_on_points_scalar(
            &[0.0], &[0.0], &[1.0], &[r],
            &[0.0], &[0.0],
            &mut u, &mut v, &mut w,
        );
        let w_phys = w[0] / TWO_PI;
        let expect = 1.0 / (std::f64::consts::PI * r * r);
        assert!((w_phys - expect).abs() / expect < 1e-14);
    }

    #[test]
    fn test_gradient_is_traceless() {
        let mut u = [0.0];
        let mut v = [0.0];
        let mut g0 = [0.0];
        let mut g1 = [0.0];
        let mut g2 = [0.0];
        let mut g3 = [0.0];
        {
            let mut g: [&mut [f64]; 4] = [&mut g0, &mut g1, &mut g2, &mut g3];
            vel_grad_points_on_points_scalar(
                &[0.3, -0.2], &[0.1, 0.4], &[1.0, -2.0], &[0.1, 0.2],
                &[1.0], &[1.5],
                &mut u, &mut v, &mut g,
            );
        }
        assert!((g0[0] + g3[0]).abs() < 1e-14, "divergence-free field");
    }

    #[test]
    fn test_streamfunction_far_field() {
        // psi of a unit vortex at distance d is -ln(d)/(2 pi), up to the
        // core regularization.
        let d: f64 = 7.0;
        let mut psi = [0.0];
        psi_points_on_points_scalar(&[0.0], &[0.0], &[1.0], &[0.0], &[d], &[0.0], &mut psi);
        let expect = -d.ln();
        assert!((psi[0] - expect).abs() < 1e-12, "psi {} vs {}", psi[0], expect);

        // Coincident pairs are skipped rather than diverging.
        let mut psi = [0.0];
        psi_points_on_points_scalar(&[1.0], &[1.0], &[1.0], &[0.0], &[1.0], &[1.0], &mut psi);
        assert_eq!(psi[0], 0.0);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let sx = [0.3];
        let sy = [-0.1];
        let ss = [0.7];
        let sr = [0.2];
        let (tx, ty) = (0.9, 0.4);
        let h = 1e-6;

        let vel = |x: f64, y: f64| {
            let mut u = [0.0];
            let mut v = [0.0];
            vel_points_on_points_scalar(&sx, &sy, &ss, &sr, &[x], &[y], &mut u, &mut v);
            (u[0], v[0])
        };

        let mut u = [0.0];
        let mut v = [0.0];
        let mut g0 = [0.0];
        let mut g1 = [0.0];
        let mut g2 = [0.0];
        let mut g3 = [0.0];
        {
            let mut g: [&mut [f64]; 4] = [&mut g0, &mut g1, &mut g2, &mut g3];
            vel_grad_points_on_points_scalar(&sx, &sy, &ss, &sr, &[tx], &[ty], &mut u, &mut v, &mut g);
        }

        let (up, _) = vel(tx + h, ty);
        let (um, _) = vel(tx - h, ty);
        let dudx_fd = (up - um) / (2.0 * h);
        assert!((g0[0] - dudx_fd).abs() < 1e-5, "du/dx {} vs {}", g0[0], dudx_fd);

        let (_, vp) = vel(tx, ty + h);
        let (_, vm) = vel(tx, ty - h);
        let dvdy_fd = (vp - vm) / (2.0 * h);
        assert!((g3[0] - dvdy_fd).abs() < 1e-5, "dv/dy {} vs {}", g3[0], dvdy_fd);
    }
}
