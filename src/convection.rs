//! Influence pass: velocities (and optionally vorticity, gradients, or
//! streamfunction) at targets from all sources.
//!
//! Sources are snapshotted before accumulation so a collection can be its
//! own target. Particle sources go through the SIMD velocity kernel; panel
//! sources use the exact sheet integrals. After accumulation each target is
//! finalized with the freestream and the `1/(2 pi)` prefactor.
//!
//! The driver keeps a one-slot cache: a repeated call with the same mode is
//! skipped until [`mark_dirty`](Convection::mark_dirty) is called or
//! `force` is passed, matching the step loop's "compute once per phase"
//! usage.

use tracing::debug;

use crate::elements::Collection;
use crate::kernels;
use crate::types::{SolveTarget, DIMENSIONS};

/// Snapshot of every particle source.
struct ParticleSources {
    x: Vec<f64>,
    y: Vec<f64>,
    s: Vec<f64>,
    r: Vec<f64>,
}

/// Snapshot of one surface's panel sources.
struct PanelSources {
    nodes_x: Vec<f64>,
    nodes_y: Vec<f64>,
    idx: Vec<usize>,
    gamma: Vec<f64>,
    sigma: Option<Vec<f64>>,
}

/// Influence-pass driver.
#[derive(Default)]
pub struct Convection {
    solved: Option<SolveTarget>,
}

impl Convection {
    pub fn new() -> Self {
        Self { solved: None }
    }

    /// Invalidate the cache; call after anything moves or changes strength.
    pub fn mark_dirty(&mut self) {
        self.solved = None;
    }

    /// Compute the requested quantities at every target node (panel centers
    /// for surfaces) from all vorticity-bearing and boundary sources.
    ///
    /// `force` bypasses the same-mode skip.
    pub fn find_vels(
        &mut self,
        fs: [f64; DIMENSIONS],
        vort: &[Collection],
        bdry: &[Collection],
        targets: &mut [Collection],
        mode: SolveTarget,
        force: bool,
    ) {
        if !force && self.solved == Some(mode) {
            debug!(%mode, "influence pass skipped (cached)");
            return;
        }

        let particles = gather_particle_sources(vort);
        let panels = gather_panel_sources(bdry);

        for target in targets.iter_mut() {
            accumulate_target(&particles, &panels, target, mode);
            target.finalize_vels(fs);
        }

        self.solved = Some(mode);
        debug!(
            %mode,
            n_particle_sources = particles.x.len(),
            n_panel_sources = panels.iter().map(|p| p.gamma.len()).sum::<usize>(),
            "influence pass complete"
        );
    }

    /// Influence pass where the vorticity collections are also the targets
    /// (the usual advection case). Sources are snapshotted first, so the
    /// aliasing is safe.
    pub fn find_vels_in_place(
        &mut self,
        fs: [f64; DIMENSIONS],
        vort: &mut [Collection],
        bdry: &[Collection],
        mode: SolveTarget,
        force: bool,
    ) {
        if !force && self.solved == Some(mode) {
            return;
        }
        let particles = gather_particle_sources(vort);
        let panels = gather_panel_sources(bdry);
        for target in vort.iter_mut() {
            accumulate_target(&particles, &panels, target, mode);
            target.finalize_vels(fs);
        }
        self.solved = Some(mode);
    }

}

fn gather_particle_sources(colls: &[Collection]) -> ParticleSources {
    let mut src = ParticleSources {
        x: Vec::new(),
        y: Vec::new(),
        s: Vec::new(),
        r: Vec::new(),
    };
    for coll in colls {
        if let Collection::Points(p) = coll {
            if let Some(s) = p.base().strengths() {
                src.x.extend_from_slice(&p.base().x[0]);
                src.y.extend_from_slice(&p.base().x[1]);
                src.s.extend_from_slice(s);
                src.r.extend_from_slice(&p.r);
            }
        }
    }
    src
}

fn gather_panel_sources(colls: &[Collection]) -> Vec<PanelSources> {
    let mut out = Vec::new();
    for coll in colls {
        if let Collection::Surfaces(s) = coll {
            let gamma = match s.ps.as_ref() {
                Some(ps) if s.get_npanels() > 0 => ps.clone(),
                _ => continue,
            };
            // Source sheets: rotation-induced plus any solved source
            // strengths.
            let sigma = match (s.rs[1].as_ref(), s.pss.as_ref()) {
                (Some(rs), Some(pss)) => {
                    Some(rs.iter().zip(pss.iter()).map(|(a, b)| a + b).collect())
                }
                (Some(rs), None) => Some(rs.clone()),
                (None, Some(pss)) => Some(pss.clone()),
                (None, None) => None,
            };
            out.push(PanelSources {
                nodes_x: s.base().x[0].clone(),
                nodes_y: s.base().x[1].clone(),
                idx: s.idx.clone(),
                gamma,
                sigma,
            });
        }
    }
    out
}

/// Accumulate all source influence into one target collection.
fn accumulate_target(
    particles: &ParticleSources,
    panels: &[PanelSources],
    target: &mut Collection,
    mode: SolveTarget,
) {
    match target {
        Collection::Points(p) => {
            p.prepare_results(mode);
            p.zero_vels();
            let n = p.get_n();
            if n == 0 {
                return;
            }
            // Split borrows: positions are read, results are written.
            let (tx, ty) = {
                let b = p.base();
                (b.x[0].clone(), b.x[1].clone())
            };
            match mode {
                SolveTarget::VelOnly => {
                    let u = &mut p.base.u;
                    let (u0, u1) = u.split_at_mut(1);
                    vel_from_particles(particles, &tx, &ty, &mut u0[0], &mut u1[0]);
                    for pan in panels {
                        kernels::vel_panels_on_points_scalar(
                            &pan.nodes_x,
                            &pan.nodes_y,
                            &pan.idx,
                            &pan.gamma,
                            pan.sigma.as_deref(),
                            &tx,
                            &ty,
                            &mut u0[0],
                            &mut u1[0],
                        );
                    }
                }
                SolveTarget::VelAndVort => {
                    let w = p.w.as_mut().unwrap();
                    let (u0, rest) = p.base.u.split_at_mut(1);
                    kernels::vel_vort_points_on_points_scalar(
                        &particles.x,
                        &particles.y,
                        &particles.s,
                        &particles.r,
                        &tx,
                        &ty,
                        &mut u0[0],
                        &mut rest[0],
                        w,
                    );
                    for pan in panels {
                        // Sheets carry no off-sheet vorticity.
                        kernels::vel_panels_on_points_scalar(
                            &pan.nodes_x,
                            &pan.nodes_y,
                            &pan.idx,
                            &pan.gamma,
                            pan.sigma.as_deref(),
                            &tx,
                            &ty,
                            &mut u0[0],
                            &mut rest[0],
                        );
                    }
                }
                SolveTarget::VelAndGrad => {
                    {
                        let ug = p.ug.as_mut().unwrap();
                        let (g01, g23) = ug.split_at_mut(2);
                        let (g0, g1) = g01.split_at_mut(1);
                        let (g2, g3) = g23.split_at_mut(1);
                        let mut grads: [&mut [f64]; 4] =
                            [&mut g0[0], &mut g1[0], &mut g2[0], &mut g3[0]];
                        let (u0, rest) = p.base.u.split_at_mut(1);
                        kernels::vel_grad_points_on_points_scalar(
                            &particles.x,
                            &particles.y,
                            &particles.s,
                            &particles.r,
                            &tx,
                            &ty,
                            &mut u0[0],
                            &mut rest[0],
                            &mut grads,
                        );
                        for pan in panels {
                            kernels::grad_panels_on_points_scalar(
                                &pan.nodes_x,
                                &pan.nodes_y,
                                &pan.idx,
                                &pan.gamma,
                                &tx,
                                &ty,
                                &mut grads,
                            );
                        }
                    }
                    for pan in panels {
                        let (u0, rest) = p.base.u.split_at_mut(1);
                        kernels::vel_panels_on_points_scalar(
                            &pan.nodes_x,
                            &pan.nodes_y,
                            &pan.idx,
                            &pan.gamma,
                            pan.sigma.as_deref(),
                            &tx,
                            &ty,
                            &mut u0[0],
                            &mut rest[0],
                        );
                    }
                }
                SolveTarget::PsiOnly => {
                    let psi = p.psi.as_mut().unwrap();
                    kernels::psi_points_on_points_scalar(
                        &particles.x,
                        &particles.y,
                        &particles.s,
                        &particles.r,
                        &tx,
                        &ty,
                        psi,
                    );
                    for pan in panels {
                        kernels::psi_panels_on_points_scalar(
                            &pan.nodes_x,
                            &pan.nodes_y,
                            &pan.idx,
                            &pan.gamma,
                            &tx,
                            &ty,
                            psi,
                        );
                    }
                }
            }
        }
        Collection::Surfaces(s) => {
            s.zero_vels();
            let np = s.get_npanels();
            if np == 0 {
                return;
            }
            // Targets are the panel centers; results land in `pu`.
            let mut tx = Vec::with_capacity(np);
            let mut ty = Vec::with_capacity(np);
            for i in 0..np {
                let c = s.panel_center(i);
                tx.push(c[0]);
                ty.push(c[1]);
            }
            let (pu0, pu1) = s.pu.split_at_mut(1);
            vel_from_particles(particles, &tx, &ty, &mut pu0[0], &mut pu1[0]);
            for pan in panels {
                kernels::vel_panels_on_points_scalar(
                    &pan.nodes_x,
                    &pan.nodes_y,
                    &pan.idx,
                    &pan.gamma,
                    pan.sigma.as_deref(),
                    &tx,
                    &ty,
                    &mut pu0[0],
                    &mut pu1[0],
                );
            }
        }
        Collection::Volumes(v) => {
            v.base_mut().zero_vels();
            let n = v.get_n();
            if n == 0 {
                return;
            }
            let (tx, ty) = (v.base().x[0].clone(), v.base().x[1].clone());
            let (u0, u1) = v.base_mut().u.split_at_mut(1);
            vel_from_particles(particles, &tx, &ty, &mut u0[0], &mut u1[0]);
            for pan in panels {
                kernels::vel_panels_on_points_scalar(
                    &pan.nodes_x,
                    &pan.nodes_y,
                    &pan.idx,
                    &pan.gamma,
                    pan.sigma.as_deref(),
                    &tx,
                    &ty,
                    &mut u0[0],
                    &mut u1[0],
                );
            }
        }
    }
}

/// Particle velocity accumulation, parallel across target rows when the
/// `parallel` feature is on.
fn vel_from_particles(
    src: &ParticleSources,
    tx: &[f64],
    ty: &[f64],
    out_u: &mut [f64],
    out_v: &mut [f64],
) {
    if src.x.is_empty() {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        const CHUNK: usize = 256;
        if tx.len() >= 2 * CHUNK {
            out_u
                .par_chunks_mut(CHUNK)
                .zip(out_v.par_chunks_mut(CHUNK))
                .enumerate()
                .for_each(|(c, (ou, ov))| {
                    let lo = c * CHUNK;
                    let hi = lo + ou.len();
                    kernels::vel_points_on_points(
                        &src.x,
                        &src.y,
                        &src.s,
                        &src.r,
                        &tx[lo..hi],
                        &ty[lo..hi],
                        ou,
                        ov,
                    );
                });
            return;
        }
    }

    kernels::vel_points_on_points(&src.x, &src.y, &src.s, &src.r, tx, ty, out_u, out_v);
}
