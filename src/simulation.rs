//! Step orchestration.
//!
//! A [`Simulation`] owns the bodies, the vorticity and boundary
//! collections, the optional Eulerian exchange volumes, and the solver
//! drivers. One step runs the fixed phase sequence
//! `BEM -> convect -> diffuse -> hybrid -> move -> emit`; each phase
//! observes the field left by the previous one.

use std::sync::Arc;

use tracing::{debug, info};

use crate::bem::Bem;
use crate::body::Body;
use crate::convection::Convection;
use crate::diffusion::Diffusion;
use crate::elements::{Collection, HOVolumes, Points, Surfaces};
use crate::error::Result;
use crate::features::{FlowFeature, MeasureFeature};
use crate::hybrid::Hybrid;
use crate::types::{SolveTarget, DIMENSIONS};

/// Numeric knobs for a run.
#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    /// Time step.
    pub dt: f64,
    /// Reynolds number.
    pub re: f64,
    /// Freestream velocity.
    pub fs: [f64; DIMENSIONS],
    /// Nominal inter-particle spacing for feature seeding.
    pub ips: f64,
    /// Core radius as a multiple of `ips`.
    pub core_overlap: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            re: 100.0,
            fs: [0.0, 0.0],
            ips: 0.1,
            core_overlap: 1.2,
        }
    }
}

impl SimulationConfig {
    /// Particle core radius implied by the spacing and overlap.
    pub fn vdelta(&self) -> f64 {
        self.core_overlap * self.ips
    }
}

/// The coupled vortex/panel/hybrid engine.
pub struct Simulation {
    pub config: SimulationConfig,
    pub time: f64,
    steps: usize,

    bodies: Vec<Arc<Body>>,
    /// Vorticity-bearing collections; the first is the free particle cloud.
    pub vort: Vec<Collection>,
    /// Boundary collections.
    pub bdry: Vec<Collection>,
    /// Measurement targets.
    pub fldpts: Vec<Collection>,
    /// Eulerian exchange volumes.
    pub euler: Vec<HOVolumes>,

    flow_features: Vec<FlowFeature>,
    measure_features: Vec<MeasureFeature>,

    pub bem: Bem,
    conv: Convection,
    diffusion: Diffusion,
    hybrid: Option<Hybrid>,

    seeded: bool,
    hybrid_primed: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            time: 0.0,
            steps: 0,
            bodies: vec![Body::ground()],
            vort: vec![Collection::Points(Points::empty())],
            bdry: Vec::new(),
            fldpts: Vec::new(),
            euler: Vec::new(),
            flow_features: Vec::new(),
            measure_features: Vec::new(),
            bem: Bem::new(),
            conv: Convection::new(),
            diffusion: Diffusion::default(),
            hybrid: None,
            seeded: false,
            hybrid_primed: false,
        }
    }

    /// Register a body and hand back the shared handle.
    pub fn add_body(&mut self, body: Body) -> Arc<Body> {
        let b = Arc::new(body);
        self.bodies.push(b.clone());
        b
    }

    /// Every registered body; index 0 is always ground.
    pub fn bodies(&self) -> &[Arc<Body>] {
        &self.bodies
    }

    pub fn add_flow_feature(&mut self, feature: FlowFeature) {
        self.flow_features.push(feature);
    }

    pub fn add_measure_feature(&mut self, feature: MeasureFeature) {
        self.measure_features.push(feature);
    }

    pub fn add_boundary(&mut self, surf: Surfaces) {
        self.bdry.push(Collection::Surfaces(surf));
    }

    pub fn add_euler_volume(&mut self, vol: HOVolumes) {
        self.euler.push(vol);
    }

    pub fn set_hybrid(&mut self, hybrid: Hybrid) {
        self.hybrid = Some(hybrid);
    }

    pub fn n_particles(&self) -> usize {
        self.vort.iter().map(Collection::get_n).sum()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Total circulation over all vorticity-bearing collections.
    pub fn total_circulation(&self) -> f64 {
        self.vort.iter().map(|c| c.get_total_circ(self.time)).sum()
    }

    /// Seed the initial particle field from the registered features.
    ///
    /// Called lazily by the first [`step`](Self::step); call it directly to
    /// inspect the initial field.
    pub fn initialize(&mut self) -> Result<()> {
        if self.seeded {
            return Ok(());
        }
        let vdelta = self.config.vdelta();
        let mut packet = Vec::new();
        for f in &self.flow_features {
            let mut px = f.init_particles(self.config.ips);
            for chunk in px.chunks_mut(4) {
                if chunk[3] == 0.0 {
                    chunk[3] = vdelta;
                }
            }
            packet.extend(px);
        }
        if !packet.is_empty() {
            let cloud = self.vort[0]
                .as_points_mut()
                .expect("the first vorticity collection is the particle cloud");
            cloud.add_new(&packet)?;
        }

        let mut mpacket = Vec::new();
        for m in &self.measure_features {
            mpacket.extend(m.init_particles(self.config.ips));
        }
        if !mpacket.is_empty() {
            self.fldpts.push(Collection::Points(Points::new(
                &mpacket,
                crate::types::ElemType::Inert,
                crate::types::MoveType::Lagrangian,
                None,
            )?));
        }

        self.seeded = true;
        info!(
            particles = self.n_particles(),
            circulation = self.total_circulation(),
            "initial field seeded"
        );
        Ok(())
    }

    /// Advance one step.
    pub fn step(&mut self) -> Result<()> {
        self.initialize()?;
        let t = self.time;
        let dt = self.config.dt;
        let fs = self.config.fs;
        let vdelta = self.config.vdelta();
        debug!(step = self.steps, t, "step begin");

        // (a) Panel strengths from the current particle field and motion.
        self.bem.solve(t, fs, &self.vort, &mut self.bdry, &mut self.conv)?;

        // (b) Convect with the velocities induced by particles, panels, and
        // freestream.
        self.conv
            .find_vels_in_place(fs, &mut self.vort, &self.bdry, SolveTarget::VelOnly, true);
        for coll in self.vort.iter_mut() {
            coll.move_t(t, dt);
        }
        if !self.fldpts.is_empty() {
            self.conv
                .find_vels(fs, &self.vort, &self.bdry, &mut self.fldpts, SolveTarget::VelOnly, true);
            for coll in self.fldpts.iter_mut() {
                coll.move_t(t, dt);
            }
        }
        self.conv.mark_dirty();

        // (c) Viscous diffusion and boundary shedding.
        self.diffusion
            .step(t, dt, self.config.re, vdelta, &mut self.vort, &mut self.bdry)?;
        self.conv.mark_dirty();

        // (d) Euler/Lagrangian exchange.
        if let Some(hybrid) = self.hybrid.as_mut() {
            if hybrid.is_active() {
                if !self.hybrid_primed {
                    hybrid.first_step(
                        t,
                        fs,
                        &self.vort,
                        &self.bdry,
                        &self.bem,
                        &mut self.conv,
                        &mut self.euler,
                    )?;
                    self.hybrid_primed = true;
                }
                hybrid.step(
                    t + dt,
                    dt,
                    self.config.re,
                    fs,
                    &mut self.vort,
                    &mut self.bdry,
                    &self.bem,
                    &mut self.conv,
                    &mut self.euler,
                    vdelta,
                )?;
            }
        }

        // (e) Bodies (and anything bound to them) move to the new time.
        for coll in self.bdry.iter_mut() {
            coll.move_t(t, dt);
        }
        for vol in self.euler.iter_mut() {
            vol.move_t(t, dt);
        }
        self.conv.mark_dirty();

        // (f) Emitters release this step's particles.
        let mut packet = Vec::new();
        for f in &self.flow_features {
            let mut px = f.step_particles(self.config.ips);
            for chunk in px.chunks_mut(4) {
                if chunk[3] == 0.0 {
                    chunk[3] = vdelta;
                }
            }
            packet.extend(px);
        }
        if !packet.is_empty() {
            if let Some(cloud) = self.vort[0].as_points_mut() {
                cloud.add_new(&packet)?;
            }
        }

        self.time += dt;
        self.steps += 1;
        debug!(
            particles = self.n_particles(),
            circulation = self.total_circulation(),
            "step complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_and_step_free_blob() {
        let mut sim = Simulation::new(SimulationConfig {
            fs: [1.0, 0.0],
            ..Default::default()
        });
        sim.add_flow_feature(FlowFeature::VortexBlob {
            center: [0.0, 0.0],
            radius: 0.5,
            softness: 0.1,
            strength: 1.0,
            enabled: true,
        });

        sim.initialize().unwrap();
        let n0 = sim.n_particles();
        assert!(n0 > 0);
        let circ0 = sim.total_circulation();
        assert!((circ0 - 1.0).abs() < 1e-6);

        sim.step().unwrap();
        // Convection and merging keep the total circulation intact.
        assert!((sim.total_circulation() - 1.0).abs() < 1e-6);
        assert_eq!(sim.steps(), 1);
        assert!((sim.time - sim.config.dt).abs() < 1e-15);
    }

    #[test]
    fn test_emitter_adds_one_per_step() {
        let mut sim = Simulation::new(SimulationConfig::default());
        sim.add_flow_feature(FlowFeature::ParticleEmitter {
            center: [0.0, 0.0],
            strength: 0.1,
            enabled: true,
        });

        sim.step().unwrap();
        assert_eq!(sim.n_particles(), 1);
        sim.step().unwrap();
        assert_eq!(sim.n_particles(), 2);
    }
}
