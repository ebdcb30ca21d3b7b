//! Regularized Biot-Savart influence kernels.
//!
//! Kernels accumulate unscaled sums; collections apply the `1/(2 pi)`
//! prefactor (and the freestream) in `finalize_vels`. Particle kernels are
//! regularized by the source core radius; panel kernels integrate the sheet
//! exactly and take explicit side limits on the sheet itself.

pub mod panels;
pub mod particles;

#[cfg(feature = "simd")]
pub mod simd;

pub use panels::{
    grad_panels_on_points_scalar, psi_panels_on_points_scalar, source_panel_unit_vel,
    vel_panels_on_points_scalar, vortex_panel_unit_vel, SheetSide,
};
pub use particles::{
    psi_points_on_points_scalar, vel_grad_points_on_points_scalar, vel_points_on_points_scalar,
    vel_vort_points_on_points_scalar,
};

/// Particle-on-particle velocity accumulation, SIMD when available.
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
    #[cfg(feature = "simd")]
    {
        simd::vel_points_on_points(sx, sy, ss, sr, tx, ty, out_u, out_v);
    }
    #[cfg(not(feature = "simd"))]
    {
        particles::vel_points_on_points_scalar(sx, sy, ss, sr, tx, ty, out_u, out_v);
    }
}
