//! Boundary-element solve for panel strengths.
//!
//! Per solve: pack the reactive surfaces into contiguous row ranges, build
//! the right-hand side from particle-induced velocities, freestream, and
//! (negated) body motion at the panel centers, assemble the dense influence
//! operator, solve it, and scatter the solution back through `set_str`.
//!
//! After a successful solve, the panel-induced plus particle-induced plus
//! freestream velocity projected on each reactive panel's designated
//! direction matches its boundary condition to within the solver residual.

mod fgmres;
pub mod influence;

pub use fgmres::{fgmres, FgmresConfig, Preconditioner};

use tracing::{debug, info};

use crate::convection::Convection;
use crate::elements::Collection;
use crate::error::Result;
use crate::types::{ElemType, DIMENSIONS};

/// Linear solver selection; FGMRES is the only method offered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverType {
    #[default]
    Fgmres,
}

/// BEM driver.
#[derive(Clone, Debug, Default)]
pub struct Bem {
    pub solver_type: SolverType,
    pub config: FgmresConfig,
}

impl Bem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve for the panel strengths of every reactive surface at time `t`.
    ///
    /// `vort` supplies the particle sources; `bdry` holds the surfaces.
    /// Non-convergence surfaces [`crate::error::Error::Solver`] so the
    /// caller can shrink the step.
    pub fn solve(
        &self,
        t: f64,
        fs: [f64; DIMENSIONS],
        vort: &[Collection],
        bdry: &mut [Collection],
        conv: &mut Convection,
    ) -> Result<()> {
        let (layouts, n) = influence::pack_rows(bdry);
        if n == 0 {
            return Ok(());
        }

        // Fixed-strength (active) surfaces are sources, not unknowns; their
        // influence lands on the right-hand side.
        let active_sources: Vec<Collection> = bdry
            .iter()
            .filter(|c| {
                c.as_surfaces().is_some() && c.get_elem_type() == ElemType::Active
            })
            .cloned()
            .collect();

        // Panel-center velocities from particles, freestream, and active
        // sheets; then subtract the prescribed body motion.
        for l in &layouts {
            conv.find_vels(
                fs,
                vort,
                &active_sources,
                std::slice::from_mut(&mut bdry[l.coll]),
                crate::types::SolveTarget::VelOnly,
                true,
            );
            let surf = bdry[l.coll].as_surfaces_mut().unwrap();
            surf.add_body_motion(-1.0, t);
        }

        let (a, rhs) = influence::assemble(bdry, &layouts, n);

        let solution = match self.solver_type {
            SolverType::Fgmres => fgmres(&a, &rhs, &self.config)?,
        };

        influence::scatter(bdry, &layouts, &solution);
        conv.mark_dirty();

        info!(unknowns = n, surfaces = layouts.len(), "BEM solve complete");
        debug!(?layouts, "BEM row layout");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::elements::{circle_geometry, BcSet, Surfaces};
    use crate::types::MoveType;
    use std::sync::Arc;

    fn circle_surface(
        n_panels: usize,
        body: Option<Arc<Body>>,
        winding_ccw: bool,
    ) -> Surfaces {
        let (mut x, idx) = circle_geometry([0.0, 0.0], 0.5, n_panels);
        if winding_ccw {
            // Flip the winding by negating y.
            for c in x.chunks_mut(2) {
                c[1] = -c[1];
            }
        }
        let move_type = if body.is_some() {
            MoveType::BodyBound
        } else {
            MoveType::Fixed
        };
        Surfaces::new(
            &x,
            &idx,
            &vec![0.0; n_panels],
            ElemType::Reactive,
            move_type,
            body,
            BcSet::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rest_cylinder_no_through_flow() {
        // Uniform freestream past a fixed cylinder: the solved sheet must
        // cancel the normal velocity on every panel.
        let fs = [1.0, 0.0];
        let surf = circle_surface(64, None, false);
        let mut bdry = vec![Collection::Surfaces(surf)];
        let mut conv = Convection::new();

        let bem = Bem::new();
        bem.solve(0.0, fs, &[], &mut bdry, &mut conv).unwrap();

        // Evaluate the full velocity at the panel centers.
        let sources = bdry.clone();
        let mut probes = bdry.clone();
        conv.find_vels(fs, &[], &sources, &mut probes, crate::types::SolveTarget::VelOnly, true);

        let s = probes[0].as_surfaces().unwrap();
        for i in 0..s.get_npanels() {
            let un = s.pu[0][i] * s.b[1][0][i] + s.pu[1][i] * s.b[1][1][i];
            assert!(
                un.abs() < 1e-3,
                "panel {} normal velocity {}",
                i,
                un
            );
        }
    }

    #[test]
    fn test_augmented_rotation_recovers_omega() {
        // A cylinder spinning at 1 rad/s with no other sources: the
        // augmented solve returns the prescribed rate and the Kelvin
        // identity holds.
        let body = Arc::new(Body::new("rotor").with_rotation(1.0));
        let surf = circle_surface(64, Some(body), false);
        assert!(surf.is_augmented());
        let mut bdry = vec![Collection::Surfaces(surf)];
        let mut conv = Convection::new();

        let bem = Bem::new();
        bem.solve(0.0, [0.0, 0.0], &[], &mut bdry, &mut conv).unwrap();

        let s = bdry[0].as_surfaces().unwrap();
        assert!(
            (s.solved_omega() - 1.0).abs() < 1e-6,
            "solved omega {}",
            s.solved_omega()
        );

        // Kelvin identity: 2 vol omega + sum(ps * area) = 0.
        let circ = s.get_total_circ(0.0);
        let kelvin = 2.0 * s.get_vol() * s.solved_omega() + circ;
        assert!(
            kelvin.abs() < 1e-6 * circ.abs().max(1.0),
            "kelvin residual {}",
            kelvin
        );
    }

    #[test]
    fn test_internal_rotation_circulation() {
        // The same cylinder wound for internal flow is not augmented; the
        // solved circulation balances the enclosed rotation:
        // sum(ps * area) = -2 vol omega.
        let body = Arc::new(Body::new("spinner").with_rotation(1.0));
        let surf = circle_surface(64, Some(body), true);
        assert!(surf.get_vol() < 0.0, "internal enclosure has negative volume");
        assert!(!surf.is_augmented());
        let mut bdry = vec![Collection::Surfaces(surf)];
        let mut conv = Convection::new();

        let bem = Bem::new();
        bem.solve(0.0, [0.0, 0.0], &[], &mut bdry, &mut conv).unwrap();

        let s = bdry[0].as_surfaces().unwrap();
        let circ = s.get_total_circ(0.0);
        let expect = -2.0 * s.get_vol() * 1.0;
        assert!(
            (circ - expect).abs() < 1e-3 * expect.abs(),
            "circulation {} vs {}",
            circ,
            expect
        );
    }
}
