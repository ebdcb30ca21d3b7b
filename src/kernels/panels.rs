//! Influence of straight panels carrying constant-strength sheets.
//!
//! Velocity uses the exact integral of the Biot-Savart kernel over the
//! segment, expressed in panel-local coordinates (`xi` along the tangent
//! from node 0, `eta` along the normal into the fluid):
//!
//! ```text
//! u_xi  = -gamma * ( atan((L - xi)/eta) + atan(xi/eta) )
//! u_eta =  gamma / 2 * ln( (xi^2 + eta^2) / ((xi - L)^2 + eta^2) )
//! ```
//!
//! (unscaled; the `1/(2 pi)` prefactor is applied in `finalize_vels`). A
//! source sheet is the same field rotated a quarter turn. Evaluation points
//! on the sheet itself take a side limit: the arctangent sum becomes
//! `+/- pi`, positive on the fluid (normal) side. Endpoint log
//! singularities are clamped to a small fraction of the panel length.
//!
//! Streamfunction and velocity-gradient contributions fall back to a
//! point-vortex quadrature over panel subdivisions.

/// Which limit to take for targets lying on the sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetSide {
    /// Approach from the fluid side (along the normal).
    Fluid,
    /// Approach from the body side (against the normal).
    Body,
}

/// Relative distance from the sheet below which a target counts as on it.
const ON_SHEET_TOL: f64 = 1.0e-10;
/// Endpoint clamp as a fraction of the panel length.
const ENDPOINT_TOL: f64 = 1.0e-8;

/// Unscaled velocity at `(tx, ty)` from a unit-strength vortex sheet on the
/// segment `(x0, y0) -> (x1, y1)`, fluid on the left.
///
/// `on_sheet_side` resolves the tangential jump for targets on the sheet.
pub fn vortex_panel_unit_vel(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    tx: f64,
    ty: f64,
    on_sheet_side: SheetSide,
) -> (f64, f64) {
    let (txu, tyu, nxu, nyu, len, xi, eta) = panel_local(x0, y0, x1, y1, tx, ty);

    let (u_xi, u_eta) = local_vortex_vel(len, xi, eta, on_sheet_side);

    // Rotate back to global coordinates.
    (
        u_xi * txu + u_eta * nxu,
        u_xi * tyu + u_eta * nyu,
    )
}

/// Unscaled velocity at `(tx, ty)` from a unit-strength source sheet on the
/// segment. The source field is the vortex field rotated by -90 degrees.
pub fn source_panel_unit_vel(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    tx: f64,
    ty: f64,
    on_sheet_side: SheetSide,
) -> (f64, f64) {
    let (txu, tyu, nxu, nyu, len, xi, eta) = panel_local(x0, y0, x1, y1, tx, ty);

    let (v_xi, v_eta) = local_vortex_vel(len, xi, eta, on_sheet_side);
    // (u_xi, u_eta)_source = (u_eta, -u_xi)_vortex
    let (u_xi, u_eta) = (v_eta, -v_xi);

    (
        u_xi * txu + u_eta * nxu,
        u_xi * tyu + u_eta * nyu,
    )
}

/// Accumulate unscaled velocity sums at targets from every panel of a
/// surface, given per-panel vortex and optional source sheet strengths.
#[allow(clippy::too_many_arguments)]
pub fn vel_panels_on_points_scalar(
    nodes_x: &[f64],
    nodes_y: &[f64],
    idx: &[usize],
    gamma: &[f64],
    sigma: Option<&[f64]>,
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
) {
    let np = idx.len() / 2;
    debug_assert_eq!(gamma.len(), np);

    for i in 0..tx.len() {
        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        for p in 0..np {
            let i0 = idx[2 * p];
            let i1 = idx[2 * p + 1];
            let (x0, y0) = (nodes_x[i0], nodes_y[i0]);
            let (x1, y1) = (nodes_x[i1], nodes_y[i1]);

            let (du, dv) = vortex_panel_unit_vel(x0, y0, x1, y1, tx[i], ty[i], SheetSide::Fluid);
            sum_u += gamma[p] * du;
            sum_v += gamma[p] * dv;

            if let Some(sig) = sigma {
                if sig[p] != 0.0 {
                    let (du, dv) =
                        source_panel_unit_vel(x0, y0, x1, y1, tx[i], ty[i], SheetSide::Fluid);
                    sum_u += sig[p] * du;
                    sum_v += sig[p] * dv;
                }
            }
        }
        out_u[i] += sum_u;
        out_v[i] += sum_v;
    }
}

/// Number of sub-segments used for the quadrature fallbacks.
const N_SUBSEG: usize = 4;

/// Accumulate unscaled streamfunction sums at targets by point-vortex
/// quadrature over panel subdivisions.
pub fn psi_panels_on_points_scalar(
    nodes_x: &[f64],
    nodes_y: &[f64],
    idx: &[usize],
    gamma: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_psi: &mut [f64],
) {
    let np = idx.len() / 2;
    for i in 0..tx.len() {
        let mut sum = 0.0;
        for p in 0..np {
            let i0 = idx[2 * p];
            let i1 = idx[2 * p + 1];
            let (x0, y0) = (nodes_x[i0], nodes_y[i0]);
            let (dx, dy) = (nodes_x[i1] - x0, nodes_y[i1] - y0);
            let len = (dx * dx + dy * dy).sqrt();
            let sub_str = gamma[p] * len / N_SUBSEG as f64;
            for k in 0..N_SUBSEG {
                let frac = (k as f64 + 0.5) / N_SUBSEG as f64;
                let ddx = tx[i] - (x0 + frac * dx);
                let ddy = ty[i] - (y0 + frac * dy);
                let d2 = ddx * ddx + ddy * ddy;
                if d2 < super::particles::COINCIDENT_D2 {
                    continue;
                }
                sum -= 0.5 * sub_str * d2.ln();
            }
        }
        out_psi[i] += sum;
    }
}

/// Accumulate unscaled velocity-gradient sums at targets by point-vortex
/// quadrature over panel subdivisions.
#[allow(clippy::too_many_arguments)]
pub fn grad_panels_on_points_scalar(
    nodes_x: &[f64],
    nodes_y: &[f64],
    idx: &[usize],
    gamma: &[f64],
    tx: &[f64],
    ty: &[f64],
    out_g: &mut [&mut [f64]; 4],
) {
    let np = idx.len() / 2;
    for i in 0..tx.len() {
        let mut g = [0.0; 4];
        for p in 0..np {
            let i0 = idx[2 * p];
            let i1 = idx[2 * p + 1];
            let (x0, y0) = (nodes_x[i0], nodes_y[i0]);
            let (dx, dy) = (nodes_x[i1] - x0, nodes_y[i1] - y0);
            let len = (dx * dx + dy * dy).sqrt();
            let sub_str = gamma[p] * len / N_SUBSEG as f64;
            for k in 0..N_SUBSEG {
                let frac = (k as f64 + 0.5) / N_SUBSEG as f64;
                let ddx = tx[i] - (x0 + frac * dx);
                let ddy = ty[i] - (y0 + frac * dy);
                let den = ddx * ddx + ddy * ddy;
                if den < super::particles::COINCIDENT_D2 {
                    continue;
                }
                let f2 = sub_str / (den * den);
                g[0] += 2.0 * f2 * ddx * ddy;
                g[1] -= f2 * (den - 2.0 * ddy * ddy);
                g[2] += f2 * (den - 2.0 * ddx * ddx);
                g[3] -= 2.0 * f2 * ddx * ddy;
            }
        }
        for k in 0..4 {
            out_g[k][i] += g[k];
        }
    }
}

/// Panel-local frame and target coordinates: unit tangent, unit normal,
/// length, and the target's `(xi, eta)`.
fn panel_local(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    tx: f64,
    ty: f64,
) -> (f64, f64, f64, f64, f64, f64, f64) {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len = (dx * dx + dy * dy).sqrt();
    debug_assert!(len > 0.0, "degenerate panel in influence kernel");
    let txu = dx / len;
    let tyu = dy / len;
    let nxu = -tyu;
    let nyu = txu;

    let rx = tx - x0;
    let ry = ty - y0;
    let xi = rx * txu + ry * tyu;
    let eta = rx * nxu + ry * nyu;
    (txu, tyu, nxu, nyu, len, xi, eta)
}

/// Vortex-sheet velocity in the panel-local frame for unit strength.
fn local_vortex_vel(len: f64, xi: f64, eta: f64, side: SheetSide) -> (f64, f64) {
    let u_xi = if eta.abs() < ON_SHEET_TOL * len {
        if xi > 0.0 && xi < len {
            // On the sheet: the arctangent sum jumps to +/- pi.
            match side {
                SheetSide::Fluid => -std::f64::consts::PI,
                SheetSide::Body => std::f64::consts::PI,
            }
        } else {
            // Collinear with the sheet but beyond an endpoint: no swirl.
            0.0
        }
    } else {
        -(((len - xi) / eta).atan() + (xi / eta).atan())
    };

    let clamp = (ENDPOINT_TOL * len) * (ENDPOINT_TOL * len);
    let r0sq = (xi * xi + eta * eta).max(clamp);
    let r1sq = ((xi - len) * (xi - len) + eta * eta).max(clamp);
    let u_eta = 0.5 * (r0sq / r1sq).ln();

    (u_xi, u_eta)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

    #[test]
    fn test_self_induction_tangential_jump() {
        // Unit sheet on the x axis, fluid above. At the panel center the
        // fluid-side tangential velocity is -gamma/2 and the body side
        // +gamma/2 (after the 1/(2 pi) prefactor).
        let (uf, vf) = vortex_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, 0.0, SheetSide::Fluid);
        assert!((uf / TWO_PI + 0.5).abs() < 1e-12, "fluid side {}", uf / TWO_PI);
        assert!(vf.abs() < 1e-12, "no normal component at center");

        let (ub, _) = vortex_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, 0.0, SheetSide::Body);
        assert!((ub / TWO_PI - 0.5).abs() < 1e-12, "body side {}", ub / TWO_PI);
    }

    #[test]
    fn test_far_field_matches_point_vortex() {
        // Far away, a panel of circulation gamma * L looks like a point
        // vortex of the same circulation.
        let d = 100.0;
        let (u, v) = vortex_panel_unit_vel(-0.5, 0.0, 0.5, 0.0, 0.0, d, SheetSide::Fluid);
        // Point vortex of strength 1 * L = 1 at origin, target (0, d):
        // unscaled u = -1 * d / d^2, v = 0.
        assert!((u - (-1.0 / d)).abs() < 1e-6, "u {}", u);
        assert!(v.abs() < 1e-6, "v {}", v);
    }

    #[test]
    fn test_source_panel_normal_jump() {
        // Unit source sheet: the normal velocity jumps to +sigma/2 on the
        // fluid side and -sigma/2 on the body side.
        let (_, vf) = source_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, 0.0, SheetSide::Fluid);
        assert!((vf / TWO_PI - 0.5).abs() < 1e-12, "fluid side {}", vf / TWO_PI);
        let (_, vb) = source_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, 0.0, SheetSide::Body);
        assert!((vb / TWO_PI + 0.5).abs() < 1e-12, "body side {}", vb / TWO_PI);
    }

    #[test]
    fn test_side_limits_are_continuous() {
        // Just off the sheet, the computed velocity approaches the side
        // limit used on it.
        let eps = 1e-7;
        let (u_above, _) = vortex_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, eps, SheetSide::Fluid);
        let (u_on, _) = vortex_panel_unit_vel(0.0, 0.0, 1.0, 0.0, 0.5, 0.0, SheetSide::Fluid);
        assert!((u_above - u_on).abs() < 1e-5);
    }
}
