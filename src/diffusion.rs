//! Viscous diffusion: core spreading plus boundary vorticity shedding.
//!
//! The particle field diffuses by the core-spreading model: every core
//! radius grows as `r^2 += 4 dt / Re` per step. Solid boundaries shed their
//! solved sheet strength as a row of particles pushed one offset into the
//! fluid, after which a merge pass keeps the population bounded.

use tracing::debug;

use crate::elements::Collection;
use crate::error::Result;
use crate::merge::merge_operation;

/// Diffusion-phase knobs.
#[derive(Clone, Copy, Debug)]
pub struct Diffusion {
    /// Shed particles are pushed this multiple of `vdelta` along the panel
    /// normal.
    pub shed_offset_factor: f64,
    /// Merge-pass overlap threshold.
    pub merge_overlap: f64,
    /// Merge-pass strength-agreement threshold.
    pub merge_thresh: f64,
}

impl Default for Diffusion {
    fn default() -> Self {
        Self {
            shed_offset_factor: 1.0,
            merge_overlap: 1.5,
            merge_thresh: 0.2,
        }
    }
}

impl Diffusion {
    /// Advance the viscous part of the step.
    ///
    /// Core radii grow, reactive surfaces shed their sheet strength (with
    /// the rotation-equivalent strengths applied at the solved rate) as
    /// particles appended to the first particle collection, and a merge
    /// pass coalesces the result.
    pub fn step(
        &self,
        _t: f64,
        dt: f64,
        re: f64,
        vdelta: f64,
        vort: &mut [Collection],
        bdry: &mut [Collection],
    ) -> Result<()> {
        // Core spreading.
        let growth = 4.0 * dt / re;
        for coll in vort.iter_mut() {
            if let Some(p) = coll.as_points_mut() {
                if !p.is_inert() {
                    for r in p.r.iter_mut() {
                        *r = (*r * *r + growth).sqrt();
                    }
                }
            }
        }

        // Shed boundary vorticity into the first particle collection.
        let mut shed = Vec::new();
        for coll in bdry.iter_mut() {
            if let Some(surf) = coll.as_surfaces_mut() {
                if surf.ps.is_none() || surf.get_npanels() == 0 {
                    continue;
                }
                surf.add_solved_rot_strengths(1.0);
                shed.extend(surf.represent_as_particles(
                    self.shed_offset_factor * vdelta,
                    vdelta,
                ));
                surf.reset_augmentation_vars();
            }
        }
        if !shed.is_empty() {
            if let Some(p) = vort.iter_mut().find_map(|c| c.as_points_mut()) {
                let n_new = shed.len() / 4;
                p.add_new(&shed)?;
                debug!(shed = n_new, "boundary vorticity shed as particles");
            }
        }

        merge_operation(vort, self.merge_overlap, self.merge_thresh, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{circle_geometry, BcSet, Collection, Points, Surfaces};
    use crate::types::{ElemType, MoveType};

    #[test]
    fn test_shedding_moves_sheet_circulation_to_particles() {
        let (x, idx) = circle_geometry([0.0, 0.0], 0.5, 16);
        let mut surf = Surfaces::new(
            &x,
            &idx,
            &vec![0.0; 16],
            ElemType::Reactive,
            MoveType::Fixed,
            None,
            BcSet::default(),
        )
        .unwrap();
        surf.ps = Some(vec![0.25; 16]);
        let sheet_circ = surf.get_total_circ(0.0);

        let mut vort = vec![Collection::Points(Points::empty())];
        let mut bdry = vec![Collection::Surfaces(surf)];

        let d = Diffusion::default();
        d.step(0.0, 0.01, 100.0, 0.05, &mut vort, &mut bdry).unwrap();

        let p = vort[0].as_points().unwrap();
        assert_eq!(p.get_n(), 16);
        assert!(
            (p.base().get_total_circ(0.0) - sheet_circ).abs() < 1e-12,
            "shed circulation matches the sheet"
        );
        assert!((p.max_core_size() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_core_spreading_growth() {
        let pts = Points::new(
            &[0.0, 0.0, 1.0, 0.1],
            ElemType::Active,
            MoveType::Lagrangian,
            None,
        )
        .unwrap();
        let mut vort = vec![Collection::Points(pts)];

        let d = Diffusion::default();
        d.step(0.0, 0.01, 100.0, 0.1, &mut vort, &mut []).unwrap();

        let r = vort[0].as_points().unwrap().r[0];
        let expect = (0.1_f64 * 0.1 + 4.0 * 0.01 / 100.0).sqrt();
        assert!((r - expect).abs() < 1e-14);
    }
}
