//! Dense influence-system assembly.
//!
//! Unknowns are the per-panel sheet strengths of every reactive surface
//! (vortex and/or source, per its boundary-condition set) plus one rotation
//! rate per augmented surface. Rows are the Dirichlet conditions at the
//! panel centers, evaluated on the non-fluid side of each sheet, plus one
//! Kelvin row per augmented surface tying the sheet circulation to the
//! rotation rate:
//!
//! ```text
//! sum_j gamma_j * area_j + 2 * vol * omega = 0
//! ```
//!
//! The rotation-rate column carries the influence of the unit-rotation
//! equivalent sheets plus, on the surface's own rows, the direct surface
//! velocity of a unit rotation about the transformed center.

use faer::Mat;

use crate::elements::{Collection, Surfaces, BIOT_SAVART_PREFACTOR};
use crate::kernels::{source_panel_unit_vel, vortex_panel_unit_vel, SheetSide};

/// Column/row sub-layout of one reactive surface inside the global system.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceLayout {
    /// Index of the surface in the boundary list.
    pub coll: usize,
    /// First global row/column.
    pub first: usize,
    pub n_panels: usize,
    pub has_vortex: bool,
    pub has_source: bool,
    pub augmented: bool,
}

impl SurfaceLayout {
    pub fn n_rows(&self) -> usize {
        self.n_panels * (usize::from(self.has_vortex) + usize::from(self.has_source))
            + usize::from(self.augmented)
    }

    fn gamma_col(&self, p: usize) -> usize {
        debug_assert!(self.has_vortex);
        self.first + p
    }

    fn sigma_col(&self, p: usize) -> usize {
        debug_assert!(self.has_source);
        self.first + self.n_panels * usize::from(self.has_vortex) + p
    }

    fn omega_col(&self) -> usize {
        self.first + self.n_rows() - 1
    }

    fn tangential_row(&self, i: usize) -> usize {
        debug_assert!(self.has_vortex);
        self.first + i
    }

    fn normal_row(&self, i: usize) -> usize {
        debug_assert!(self.has_source);
        self.first + self.n_panels * usize::from(self.has_vortex) + i
    }

    fn kelvin_row(&self) -> usize {
        self.first + self.n_rows() - 1
    }
}

/// Pack the reactive surfaces into contiguous row ranges and return the
/// layout plus the total system size.
pub fn pack_rows(bdry: &mut [Collection]) -> (Vec<SurfaceLayout>, usize) {
    let mut layouts = Vec::new();
    let mut next = 0usize;
    for (ci, coll) in bdry.iter_mut().enumerate() {
        let surf = match coll.as_surfaces_mut() {
            Some(s) if s.num_unknowns_per_panel() > 0 && s.get_npanels() > 0 => s,
            _ => continue,
        };
        surf.set_first_row(next);
        let layout = SurfaceLayout {
            coll: ci,
            first: next,
            n_panels: surf.get_npanels(),
            has_vortex: surf.bc[0].is_some(),
            has_source: surf.bc[1].is_some(),
            augmented: surf.is_augmented(),
        };
        next = surf.get_next_row();
        debug_assert_eq!(next, layout.first + layout.n_rows());
        layouts.push(layout);
    }
    (layouts, next)
}

/// Assemble the influence matrix and the right-hand side.
///
/// Panel-center velocities (`pu`) must already hold the particle,
/// freestream, and (negated) body-motion contributions.
pub fn assemble(bdry: &[Collection], layouts: &[SurfaceLayout], n: usize) -> (Mat<f64>, Vec<f64>) {
    let mut a = Mat::<f64>::zeros(n, n);
    let mut rhs = vec![0.0; n];

    // Unit-rotation equivalent sheets per augmented source surface.
    let unit_rots: Vec<Option<(Vec<f64>, Vec<f64>)>> = layouts
        .iter()
        .map(|sl| {
            if sl.augmented {
                bdry[sl.coll].as_surfaces().and_then(Surfaces::unit_rot_sheets)
            } else {
                None
            }
        })
        .collect();

    for tl in layouts {
        let target = bdry[tl.coll].as_surfaces().expect("layout points at a surface");

        for i in 0..tl.n_panels {
            let c = target.panel_center(i);
            let tan = [target.b[0][0][i], target.b[0][1][i]];
            let nor = [target.b[1][0][i], target.b[1][1][i]];

            // Right-hand side: boundary condition minus the accumulated
            // panel-center velocity, projected per row kind.
            if tl.has_vortex {
                let bc = target.bc[0].as_ref().unwrap()[i];
                let pu = [target.pu[0][i], target.pu[1][i]];
                rhs[tl.tangential_row(i)] = bc - (pu[0] * tan[0] + pu[1] * tan[1]);
            }
            if tl.has_source {
                let bc = target.bc[1].as_ref().unwrap()[i];
                let pu = [target.pu[0][i], target.pu[1][i]];
                rhs[tl.normal_row(i)] = bc - (pu[0] * nor[0] + pu[1] * nor[1]);
            }

            for (si, sl) in layouts.iter().enumerate() {
                let source = bdry[sl.coll].as_surfaces().expect("layout points at a surface");
                let unit_rot = unit_rots[si].as_ref();
                let mut omega_coef_t = 0.0;
                let mut omega_coef_n = 0.0;

                for p in 0..sl.n_panels {
                    let (p0, p1) = source.panel_nodes(p);
                    let side = if sl.coll == tl.coll && p == i {
                        SheetSide::Body
                    } else {
                        SheetSide::Fluid
                    };

                    let (vu, vv) =
                        vortex_panel_unit_vel(p0[0], p0[1], p1[0], p1[1], c[0], c[1], side);
                    let kv_t = BIOT_SAVART_PREFACTOR * (vu * tan[0] + vv * tan[1]);
                    let kv_n = BIOT_SAVART_PREFACTOR * (vu * nor[0] + vv * nor[1]);

                    if sl.has_vortex {
                        if tl.has_vortex {
                            a[(tl.tangential_row(i), sl.gamma_col(p))] = kv_t;
                        }
                        if tl.has_source {
                            a[(tl.normal_row(i), sl.gamma_col(p))] = kv_n;
                        }
                    }

                    let needs_source_kernel =
                        sl.has_source || unit_rot.map(|(_, s)| s[p] != 0.0).unwrap_or(false);
                    let (ks_t, ks_n) = if needs_source_kernel {
                        let (su, sv) =
                            source_panel_unit_vel(p0[0], p0[1], p1[0], p1[1], c[0], c[1], side);
                        (
                            BIOT_SAVART_PREFACTOR * (su * tan[0] + sv * tan[1]),
                            BIOT_SAVART_PREFACTOR * (su * nor[0] + sv * nor[1]),
                        )
                    } else {
                        (0.0, 0.0)
                    };

                    if sl.has_source {
                        if tl.has_vortex {
                            a[(tl.tangential_row(i), sl.sigma_col(p))] = ks_t;
                        }
                        if tl.has_source {
                            a[(tl.normal_row(i), sl.sigma_col(p))] = ks_n;
                        }
                    }

                    if let Some((gu, su)) = unit_rot {
                        omega_coef_t += gu[p] * kv_t + su[p] * ks_t;
                        omega_coef_n += gu[p] * kv_n + su[p] * ks_n;
                    }
                }

                if sl.augmented {
                    if sl.coll == tl.coll {
                        // Direct surface velocity of a unit rotation about
                        // the transformed center.
                        let tc = source.get_geom_center();
                        let rot = [-(c[1] - tc[1]), c[0] - tc[0]];
                        omega_coef_t += rot[0] * tan[0] + rot[1] * tan[1];
                        omega_coef_n += rot[0] * nor[0] + rot[1] * nor[1];
                    }
                    if tl.has_vortex {
                        a[(tl.tangential_row(i), sl.omega_col())] = omega_coef_t;
                    }
                    if tl.has_source {
                        a[(tl.normal_row(i), sl.omega_col())] = omega_coef_n;
                    }
                }
            }
        }

        // Kelvin row for an augmented surface: the sheet circulation plus
        // the enclosed rotational circulation vanishes.
        if tl.augmented {
            let row = tl.kelvin_row();
            if tl.has_vortex {
                for p in 0..tl.n_panels {
                    a[(row, tl.gamma_col(p))] = target.area[p];
                }
            }
            a[(row, tl.omega_col())] = 2.0 * target.get_vol();
            rhs[row] = 0.0;
        }
    }

    (a, rhs)
}

/// Scatter a solved vector back into the surfaces.
pub fn scatter(bdry: &mut [Collection], layouts: &[SurfaceLayout], solution: &[f64]) {
    for l in layouts {
        let surf: &mut Surfaces = bdry[l.coll]
            .as_surfaces_mut()
            .expect("layout points at a surface");
        let n_rows = l.n_rows();
        let slice = solution[l.first..l.first + n_rows].to_vec();
        surf.set_str(l.first, n_rows, slice);
    }
}
