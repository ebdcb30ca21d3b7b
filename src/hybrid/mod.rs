//! Euler/Lagrangian hybrid exchange.
//!
//! The hybrid layer couples the particle field to an external high-order
//! Eulerian solver over one or more mesh volumes. Each coupled step runs
//! three phases:
//!
//! - **A** - solve the BEM, then hand the solver Lagrangian velocities at
//!   its open-boundary points;
//! - **B** - let the solver integrate forward and pull back its vorticity
//!   at the solution points;
//! - **C** - iteratively insert particles carrying the masked vorticity
//!   deficit until the Lagrangian field reproduces the Eulerian one.

mod config;
mod solver_iface;

pub use config::HybridConfig;
pub use solver_iface::{DummySolver, HighOrderSolver};

use tracing::{debug, info};

use crate::bem::Bem;
use crate::convection::Convection;
use crate::elements::{Collection, HOVolumes, Points};
use crate::error::{Error, Result};
use crate::merge::merge_operation;
use crate::types::{SolveTarget, DIMENSIONS};

/// Relative deficit below which the correction loop stops.
const CORRECTION_TOL: f64 = 0.01;
/// Iteration cap for the correction loop.
const MAX_CORRECTION_ITERS: usize = 20;

/// Hybrid driver state.
pub struct Hybrid {
    config: HybridConfig,
    initialized: bool,
    solver: Box<dyn HighOrderSolver>,
}

impl Hybrid {
    pub fn new(solver: Box<dyn HighOrderSolver>, config: HybridConfig) -> Self {
        Self {
            config,
            initialized: false,
            solver,
        }
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled
    }

    pub fn set_active(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Forget the solver initialization, e.g. after a simulation reset.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    /// Push geometry to the external solver and retrieve its sample
    /// coordinates. Exactly one volume is supported.
    pub fn init(&mut self, euler: &mut [HOVolumes]) -> Result<()> {
        if euler.len() != 1 {
            return Err(Error::invariant(format!(
                "hybrid supports exactly one volume, got {}",
                euler.len()
            )));
        }
        self.solver.set_element_order(self.config.element_order);

        for vol in euler.iter_mut() {
            vol.move_t(0.0, 0.0);
            self.solver.init(
                &vol.get_node_pos(),
                &vol.elem_idx,
                &vol.wall_idx,
                &vol.open_idx,
            )?;
            vol.set_soln_pts(&self.solver.get_soln_pts())?;
            vol.set_open_pts(&self.solver.get_open_pts())?;
            info!(%vol, "hybrid volume initialized");
        }

        self.initialized = true;
        Ok(())
    }

    /// Send the initial open-boundary velocities and interior vorticity to
    /// the solver before the first coupled step.
    #[allow(clippy::too_many_arguments)]
    pub fn first_step(
        &mut self,
        time: f64,
        fs: [f64; DIMENSIONS],
        vort: &[Collection],
        bdry: &[Collection],
        _bem: &Bem,
        conv: &mut Convection,
        euler: &mut [HOVolumes],
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if !self.initialized {
            self.init(euler)?;
        }
        debug!(time, "hybrid first step");

        for vol in euler.iter_mut() {
            vol.move_t(time, 0.0);
            let open_vels = self.lagrangian_open_vels(fs, vort, bdry, vol, conv)?;
            self.solver.set_open_vels(&open_vels)?;

            let lagvort = lagrangian_soln_vort(fs, vort, bdry, vol, conv)?;
            self.solver.set_soln_vort(&lagvort)?;
        }
        Ok(())
    }

    /// One coupled forward step.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        time: f64,
        dt: f64,
        re: f64,
        fs: [f64; DIMENSIONS],
        vort: &mut Vec<Collection>,
        bdry: &mut [Collection],
        bem: &Bem,
        conv: &mut Convection,
        euler: &mut [HOVolumes],
        vdelta: f64,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if !self.initialized {
            self.init(euler)?;
        }
        debug!(time, dt, "hybrid step");

        // Phase A: refresh the BEM and push boundary velocities.
        bem.solve(time, fs, vort, bdry, conv)?;
        for vol in euler.iter_mut() {
            vol.move_t(time, 0.0);
            let open_vels = self.lagrangian_open_vels(fs, vort, bdry, vol, conv)?;
            self.solver.set_open_vels(&open_vels)?;
        }

        // Phase B: external solve, then pull the vorticity field.
        self.solver
            .solve_to(time, self.config.num_substeps, self.config.time_order, re)?;

        for vol in euler.iter_mut() {
            let n_soln = vol
                .get_vol_nodes()
                .map(Points::get_n)
                .unwrap_or(0);
            let eulvort = self.solver.get_all_vorts();
            if eulvort.len() != n_soln {
                return Err(Error::ExternalSolver(format!(
                    "vorticity of length {} for {} solution points",
                    eulvort.len(),
                    n_soln
                )));
            }

            // Phase C: fixed-point correction of the particle strengths.
            vol.set_mask_area(vdelta);
            if vol.get_mask_area().len() != n_soln {
                return Err(Error::ExternalSolver(format!(
                    "{} mask areas for {} solution points",
                    vol.get_mask_area().len(),
                    n_soln
                )));
            }

            let mask = vol.get_mask_area().to_vec();
            let total: f64 = eulvort
                .iter()
                .zip(mask.iter())
                .map(|(e, a)| (e * a).abs())
                .sum();
            if total <= f64::EPSILON {
                debug!("hybrid correction skipped: no Eulerian circulation");
                continue;
            }

            let mut iter = 0;
            loop {
                let lagvort = lagrangian_soln_vort(fs, vort, bdry, vol, conv)?;
                let deficit: Vec<f64> = eulvort
                    .iter()
                    .zip(lagvort.iter())
                    .zip(mask.iter())
                    .map(|((e, l), a)| (e - l) * a)
                    .collect();
                let err: f64 = deficit.iter().map(|d| d.abs()).sum::<f64>() / total;
                debug!(iter, err, "hybrid correction");
                if err <= CORRECTION_TOL || iter >= MAX_CORRECTION_ITERS {
                    break;
                }

                let new_parts = vol.get_equivalent_particles(&deficit, vdelta)?;
                let target = vort
                    .iter_mut()
                    .find_map(|c| c.as_points_mut())
                    .ok_or_else(|| {
                        Error::invariant("hybrid correction needs a particle collection".to_string())
                    })?;
                target.add_new_with_radius(&new_parts, vdelta)?;

                merge_operation(vort, 1.5, 0.2, false);
                conv.mark_dirty();
                iter += 1;
            }
        }
        Ok(())
    }

    /// Lagrangian velocities at a volume's open-boundary points, packed
    /// `(x, y)` per point.
    fn lagrangian_open_vels(
        &self,
        fs: [f64; DIMENSIONS],
        vort: &[Collection],
        bdry: &[Collection],
        vol: &HOVolumes,
        conv: &mut Convection,
    ) -> Result<Vec<f64>> {
        let bc = vol
            .get_bc_nodes()
            .ok_or_else(|| Error::invariant("open points have not been set".to_string()))?;
        let mut targets = vec![Collection::Points(bc.clone())];
        conv.find_vels(fs, vort, bdry, &mut targets, SolveTarget::VelOnly, true);

        let p = targets[0].as_points().unwrap();
        let n = p.get_n();
        let mut packed = Vec::with_capacity(DIMENSIONS * n);
        for i in 0..n {
            packed.push(p.base().u[0][i]);
            packed.push(p.base().u[1][i]);
        }
        Ok(packed)
    }
}

/// Lagrangian vorticity at a volume's solution points.
fn lagrangian_soln_vort(
    fs: [f64; DIMENSIONS],
    vort: &[Collection],
    bdry: &[Collection],
    vol: &HOVolumes,
    conv: &mut Convection,
) -> Result<Vec<f64>> {
    let soln = vol
        .get_vol_nodes()
        .ok_or_else(|| Error::invariant("solution points have not been set".to_string()))?;
    let mut targets = vec![Collection::Points(soln.clone())];
    conv.find_vels(fs, vort, bdry, &mut targets, SolveTarget::VelAndVort, true);

    let p = targets[0].as_points().unwrap();
    Ok(p.vorticity().expect("vorticity buffer filled by the pass").to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::uniform_rectangle;

    fn test_volume() -> HOVolumes {
        let (x, elem_idx, wall_idx, open_idx) = uniform_rectangle(0.0, 1.0, 0.0, 1.0, 4, 4);
        HOVolumes::new(&x, &elem_idx, &wall_idx, &open_idx, None).unwrap()
    }

    #[test]
    fn test_init_requires_single_volume() {
        let mut hybrid = Hybrid::new(
            Box::new(DummySolver::new()),
            HybridConfig {
                enabled: true,
                ..Default::default()
            },
        );
        let mut none: Vec<HOVolumes> = Vec::new();
        assert!(hybrid.init(&mut none).is_err());

        let mut two = vec![test_volume(), test_volume()];
        assert!(hybrid.init(&mut two).is_err());

        let mut one = vec![test_volume()];
        hybrid.init(&mut one).unwrap();
        assert_eq!(one[0].get_vol_nodes().unwrap().get_n(), 16);
        assert!(one[0].get_bc_nodes().unwrap().get_n() > 0);
    }

    #[test]
    fn test_inactive_step_is_noop() {
        let mut hybrid = Hybrid::new(Box::new(DummySolver::new()), HybridConfig::default());
        let mut vort: Vec<Collection> = vec![Collection::Points(Points::empty())];
        let mut euler = vec![test_volume()];
        let bem = Bem::new();
        let mut conv = Convection::new();
        hybrid
            .step(
                0.0,
                0.01,
                100.0,
                [0.0, 0.0],
                &mut vort,
                &mut [],
                &bem,
                &mut conv,
                &mut euler,
                0.1,
            )
            .unwrap();
        assert_eq!(vort[0].get_n(), 0);
    }
}
