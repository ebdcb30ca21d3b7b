//! Segmented boundary surfaces for the BEM.
//!
//! A surface is an ordered node array plus a flat index array of two node
//! indices per panel. The fluid lies on the left of each directed edge:
//! walking from node 0 to node 1, the unit tangent points along the edge and
//! the unit normal is its 90-degree counter-clockwise rotation, into the
//! fluid. An external body is therefore wound clockwise and has positive
//! enclosed volume; an internal-flow enclosure is wound counter-clockwise
//! and has negative volume.
//!
//! Panel-wise state lives here (areas, basis vectors, panel-center
//! velocities, strengths, boundary conditions, rotation-induced strengths);
//! node-wise state lives in the shared [`ElementBase`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::types::{ElemType, MoveType, DIMENSIONS};

use super::base::{ElementBase, BIOT_SAVART_PREFACTOR};

/// Which boundary-condition kinds a reactive surface solves for.
///
/// Index 0 is the tangential (vortex) condition, index 1 the normal
/// (source) condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BcSet {
    pub vortex: bool,
    pub source: bool,
}

impl Default for BcSet {
    fn default() -> Self {
        // Vortex-only matches the reference build of the original method.
        Self {
            vortex: true,
            source: false,
        }
    }
}

impl BcSet {
    pub fn count(&self) -> usize {
        usize::from(self.vortex) + usize::from(self.source)
    }
}

/// A collection of straight boundary panels.
#[derive(Clone, Debug)]
pub struct Surfaces {
    pub(crate) base: ElementBase,

    /// Panel count.
    np: usize,
    /// Two node indices per panel.
    pub idx: Vec<usize>,
    /// Panel lengths.
    pub area: Vec<f64>,
    /// Basis vectors: `b[0]` tangent, `b[1]` normal, each per dimension.
    pub b: [[Vec<f64>; DIMENSIONS]; 2],
    /// Panel-center velocities (distinct from the node velocities in the
    /// base).
    pub pu: [Vec<f64>; DIMENSIONS],

    /// Panel vortex strengths per unit length (active and reactive
    /// surfaces).
    pub ps: Option<Vec<f64>>,
    /// Solved panel source strengths, present only when the source boundary
    /// condition is selected.
    pub pss: Option<Vec<f64>>,
    /// Boundary conditions: `bc[0]` tangential/vortex, `bc[1]`
    /// normal/source. Present only on reactive surfaces.
    pub bc: [Option<Vec<f64>>; 2],
    /// Rotation-induced strengths standing in for the body's volume
    /// vorticity: `rs[0]` vortex, `rs[1]` source.
    pub rs: [Option<Vec<f64>>; 2],

    bc_set: BcSet,

    /// First row of this surface in the global BEM system.
    istart: usize,
    /// Signed enclosed area (positive for an external body).
    vol: f64,
    /// Untransformed geometric center.
    utc: [f64; DIMENSIONS],
    /// Transformed geometric center.
    tc: [f64; DIMENSIONS],

    solved_omega: f64,
    omega_error: f64,
    /// Rotation rate recorded at the most recent shedding event.
    this_omega: f64,
    /// Circulation reabsorbed by this surface since the last shedding event.
    reabsorbed_gamma: f64,

    max_strength: f64,
}

impl Surfaces {
    /// Build a surface from nodes, panel indices, and one value per panel.
    ///
    /// For an active surface the value is a fixed sheet strength; for a
    /// reactive surface it is the boundary condition for each selected BC
    /// kind; for an inert surface it is ignored.
    pub fn new(
        x: &[f64],
        idx: &[usize],
        val: &[f64],
        elem_type: ElemType,
        move_type: MoveType,
        body: Option<Arc<Body>>,
        bc_set: BcSet,
    ) -> Result<Self> {
        if idx.len() % 2 != 0 {
            return Err(Error::Shape {
                what: "panel index array",
                len: idx.len(),
                stride: 2,
            });
        }
        if x.len() % DIMENSIONS != 0 {
            return Err(Error::Shape {
                what: "surface node array",
                len: x.len(),
                stride: DIMENSIONS,
            });
        }
        let nsurfs = idx.len() / 2;
        let nnodes = x.len() / DIMENSIONS;

        let mut base = ElementBase::new(elem_type, move_type, body);
        for d in 0..DIMENSIONS {
            base.x[d] = (0..nnodes).map(|i| x[DIMENSIONS * i + d]).collect();
            base.u[d] = vec![0.0; nnodes];
        }
        if let Some(ux) = base.ux.as_mut() {
            for d in 0..DIMENSIONS {
                ux[d] = base.x[d].clone();
            }
        }
        base.n = nnodes;
        // Node-wise strength is unused for panels; the panel-wise `ps`
        // carries it instead.
        base.s = None;

        for (k, &i) in idx.iter().enumerate() {
            if i >= nnodes {
                return Err(Error::invariant(format!(
                    "panel index {} at position {} exceeds node count {}",
                    i, k, nnodes
                )));
            }
        }

        if nsurfs > 0 && val.len() != nsurfs {
            return Err(Error::Shape {
                what: "panel value array",
                len: val.len(),
                stride: nsurfs,
            });
        }

        let mut ps = None;
        let mut pss = None;
        let mut bc: [Option<Vec<f64>>; 2] = [None, None];
        match elem_type {
            ElemType::Active => {
                ps = Some(val.to_vec());
            }
            ElemType::Reactive => {
                if bc_set.vortex {
                    bc[0] = Some(val.to_vec());
                }
                if bc_set.source {
                    bc[1] = Some(val.to_vec());
                    pss = Some(vec![0.0; nsurfs]);
                }
                ps = Some(vec![0.0; nsurfs]);
            }
            ElemType::Inert => {}
        }

        let mut surf = Self {
            base,
            np: nsurfs,
            idx: idx.to_vec(),
            area: Vec::new(),
            b: [
                [Vec::new(), Vec::new()],
                [Vec::new(), Vec::new()],
            ],
            pu: [vec![0.0; nsurfs], vec![0.0; nsurfs]],
            ps,
            pss,
            bc,
            rs: [None, None],
            bc_set,
            istart: 0,
            vol: -1.0,
            utc: [0.0; DIMENSIONS],
            tc: [0.0; DIMENSIONS],
            solved_omega: 0.0,
            omega_error: 0.0,
            this_omega: 0.0,
            reabsorbed_gamma: 0.0,
            max_strength: -1.0,
        };

        surf.compute_bases(nsurfs)?;

        if surf.base.get_body().is_some() && nsurfs > 0 {
            surf.set_geom_center()?;
            surf.tc = surf.utc;
        }
        if surf.base.get_move_type() == MoveType::BodyBound {
            surf.transform(0.0);
        }

        debug!(
            panels = nsurfs,
            nodes = nnodes,
            "created surface collection"
        );
        Ok(surf)
    }

    pub fn get_n(&self) -> usize {
        self.base.get_n()
    }

    pub fn get_npanels(&self) -> usize {
        self.np
    }

    pub fn is_inert(&self) -> bool {
        self.base.is_inert()
    }

    pub fn base(&self) -> &ElementBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    pub fn get_vol(&self) -> f64 {
        self.vol
    }

    pub fn get_geom_center(&self) -> [f64; DIMENSIONS] {
        self.tc
    }

    pub fn bc_set(&self) -> BcSet {
        self.bc_set
    }

    /// Panel center coordinates.
    pub fn panel_center(&self, i: usize) -> [f64; DIMENSIONS] {
        let i0 = self.idx[2 * i];
        let i1 = self.idx[2 * i + 1];
        [
            0.5 * (self.base.x[0][i0] + self.base.x[0][i1]),
            0.5 * (self.base.x[1][i0] + self.base.x[1][i1]),
        ]
    }

    /// Panel endpoints `(node0, node1)` coordinates.
    pub fn panel_nodes(&self, i: usize) -> ([f64; DIMENSIONS], [f64; DIMENSIONS]) {
        let i0 = self.idx[2 * i];
        let i1 = self.idx[2 * i + 1];
        (
            [self.base.x[0][i0], self.base.x[1][i0]],
            [self.base.x[0][i1], self.base.x[1][i1]],
        )
    }

    /// Recompute panel areas and basis vectors for the first `nnew` panels.
    ///
    /// Idempotent; must be called whenever node positions change. Rejects
    /// degenerate (zero-length) panels.
    pub fn compute_bases(&mut self, nnew: usize) -> Result<()> {
        assert_eq!(2 * nnew, self.idx.len(), "panel index array size mismatch");

        for bi in self.b.iter_mut() {
            for bd in bi.iter_mut() {
                bd.resize(nnew, 0.0);
            }
        }
        self.area.resize(nnew, 0.0);

        for i in 0..nnew {
            let i0 = self.idx[2 * i];
            let i1 = self.idx[2 * i + 1];

            let mut t = [
                self.base.x[0][i1] - self.base.x[0][i0],
                self.base.x[1][i1] - self.base.x[1][i0],
            ];
            let len = (t[0] * t[0] + t[1] * t[1]).sqrt();
            if len <= 0.0 || !len.is_finite() {
                return Err(Error::invariant(format!(
                    "panel {} is degenerate: nodes {} and {} coincide",
                    i, i0, i1
                )));
            }
            t[0] /= len;
            t[1] /= len;

            self.area[i] = len;

            // Normal is the 90-degree CCW rotation of the tangent, into the
            // fluid.
            let n = [-t[1], t[0]];

            for d in 0..DIMENSIONS {
                self.b[0][d][i] = t[d];
                self.b[1][d][i] = n[d];
            }
        }
        Ok(())
    }

    /// Compute the untransformed geometric center and signed volume from
    /// triangles spanned by the origin and each panel.
    ///
    /// Requires a body and untransformed coordinates. Triangle areas come
    /// from Heron's formula; the sign follows the winding, so an external
    /// (clockwise) boundary accumulates positive volume.
    pub fn set_geom_center(&mut self) -> Result<()> {
        if self.base.get_body().is_none() {
            return Err(Error::invariant(
                "set_geom_center requires an attached body".to_string(),
            ));
        }
        let ux = self
            .base
            .ux
            .as_ref()
            .ok_or_else(|| Error::invariant("set_geom_center requires untransformed positions".to_string()))?;

        let mut asum = 0.0;
        let mut xsum = 0.0;
        let mut ysum = 0.0;
        for i in 0..self.np {
            let j = self.idx[2 * i];
            let jp1 = self.idx[2 * i + 1];
            let xc = (ux[0][j] + ux[0][jp1]) / 3.0;
            let yc = (ux[1][j] + ux[1][jp1]) / 3.0;
            let panel_x = ux[0][jp1] - ux[0][j];
            let panel_y = ux[1][jp1] - ux[1][j];

            // Side lengths of the origin triangle.
            let a = (ux[0][j] * ux[0][j] + ux[1][j] * ux[1][j]).sqrt();
            let b = (panel_x * panel_x + panel_y * panel_y).sqrt();
            let c = (ux[0][jp1] * ux[0][jp1] + ux[1][jp1] * ux[1][jp1]).sqrt();

            let hs = 0.5 * (a + b + c);
            let mut tri = (hs * (hs - a) * (hs - b) * (hs - c)).max(0.0).sqrt();
            if ux[1][j] * panel_x - ux[0][j] * panel_y < 0.0 {
                tri = -tri;
            }

            asum += tri;
            xsum += xc * tri;
            ysum += yc * tri;
        }

        if asum == 0.0 {
            return Err(Error::invariant(
                "surface encloses zero signed area".to_string(),
            ));
        }
        self.vol = asum;
        self.utc = [xsum / asum, ysum / asum];
        debug!(
            vol = self.vol,
            center_x = self.utc[0],
            center_y = self.utc[1],
            "surface geometric center"
        );
        Ok(())
    }

    /// Transform nodes to the body pose at `t`, recompute the panel bases,
    /// and carry the geometric center along.
    pub fn transform(&mut self, t: f64) {
        self.base.transform(t);
        self.compute_bases(self.np)
            .expect("panel degenerated during rigid transform");

        if let (Some(body), MoveType::BodyBound) = (self.base.get_body().cloned(), self.base.get_move_type()) {
            let pos = body.pos(t);
            let theta = body.orient(t);
            let (st, ct) = theta.sin_cos();
            self.tc = [
                pos[0] + self.utc[0] * ct - self.utc[1] * st,
                pos[1] + self.utc[0] * st + self.utc[1] * ct,
            ];
        } else {
            self.tc = self.utc;
        }
    }

    /// Move the surface over `dt`: body-bound surfaces re-transform, fixed
    /// surfaces stay put.
    pub fn move_t(&mut self, t: f64, dt: f64) {
        match self.base.get_move_type() {
            MoveType::BodyBound => self.transform(t + dt),
            MoveType::Lagrangian => {
                self.base.move_t(t, dt);
                self.compute_bases(self.np)
                    .expect("panel degenerated during advection");
            }
            MoveType::Fixed => {}
        }
    }

    /// Zero panel-center and node velocities.
    pub fn zero_vels(&mut self) {
        for d in 0..DIMENSIONS {
            self.pu[d].iter_mut().for_each(|v| *v = 0.0);
        }
        self.base.zero_vels();
    }

    /// Finalize panel-center and node velocities with the freestream.
    pub fn finalize_vels(&mut self, fs: [f64; DIMENSIONS]) {
        for d in 0..DIMENSIONS {
            for v in self.pu[d].iter_mut() {
                *v = fs[d] + *v * BIOT_SAVART_PREFACTOR;
            }
        }
        self.base.finalize_vels(fs);
    }

    /// Zero panel strengths and rotation-induced strengths.
    pub fn zero_strengths(&mut self) {
        self.base.zero_strengths();
        if let Some(ps) = self.ps.as_mut() {
            ps.iter_mut().for_each(|v| *v = 0.0);
        }
        if let Some(pss) = self.pss.as_mut() {
            pss.iter_mut().for_each(|v| *v = 0.0);
        }
        for r in self.rs.iter_mut().flatten() {
            r.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    // ------------------------------------------------------------------
    // BEM row layout
    // ------------------------------------------------------------------

    pub fn set_first_row(&mut self, i: usize) {
        self.istart = i;
    }

    pub fn num_unknowns_per_panel(&self) -> usize {
        usize::from(self.bc[0].is_some()) + usize::from(self.bc[1].is_some())
    }

    pub fn get_first_row(&self) -> usize {
        self.istart
    }

    pub fn get_num_rows(&self) -> usize {
        self.np * self.num_unknowns_per_panel() + usize::from(self.is_augmented())
    }

    pub fn get_next_row(&self) -> usize {
        self.istart + self.get_num_rows()
    }

    /// Should the BEM add a rotation-rate unknown for this surface?
    ///
    /// Augment iff the surface is reactive, attached to a body other than
    /// ground, and bounds an external body (positive volume).
    pub fn is_augmented(&self) -> bool {
        match self.base.get_body() {
            Some(body) => {
                self.base.get_elem_type() == ElemType::Reactive
                    && !body.is_ground()
                    && self.vol > 0.0
            }
            None => false,
        }
    }

    /// Accept solved strengths from the BEM.
    ///
    /// For an augmented surface the last entry is the solved rotation rate:
    /// it is popped off, stored, and compared against the body's prescribed
    /// rate. When both boundary-condition kinds are active the vortex block
    /// precedes the source block; either way the whole strength vector is
    /// replaced.
    pub fn set_str(&mut self, _ioffset: usize, _icnt: usize, mut new_vec: Vec<f64>) {
        if self.is_augmented() {
            let omega = new_vec.pop().expect("augmented solution is missing the rotation rate");
            self.solved_omega = omega;
            let prescribed = self
                .base
                .get_body()
                .map(|b| b.rotvel(0.0))
                .unwrap_or(0.0);
            self.omega_error = omega - prescribed;
            debug!(
                solved_omega = self.solved_omega,
                omega_error = self.omega_error,
                "augmented BEM rotation rate"
            );
        }

        let ps = self.ps.as_mut().expect("set_str on a surface without strengths");
        if let Some(pss) = self.pss.as_mut() {
            assert_eq!(
                new_vec.len(),
                ps.len() + pss.len(),
                "solved strength count does not match panel count"
            );
            let sigma = new_vec.split_off(ps.len());
            *pss = sigma;
        } else {
            assert_eq!(
                new_vec.len(),
                ps.len(),
                "solved strength count does not match panel count"
            );
        }
        *ps = new_vec;
    }

    pub fn solved_omega(&self) -> f64 {
        self.solved_omega
    }

    pub fn omega_error(&self) -> f64 {
        self.omega_error
    }

    // ------------------------------------------------------------------
    // Body motion and rotation-induced strengths
    // ------------------------------------------------------------------

    /// Add `factor` times the body's rigid velocity (translation plus
    /// rotation about the transformed center) to each panel-center velocity.
    ///
    /// Requires a computed geometric center.
    pub fn add_body_motion(&mut self, factor: f64, t: f64) {
        let body = match self.base.get_body() {
            Some(b) if !b.is_ground() => b.clone(),
            _ => return,
        };
        assert!(
            self.vol != 0.0 && self.vol.is_finite(),
            "add_body_motion requires a valid geometric center"
        );

        let vel = body.vel(t);
        let rotvel = body.rotvel(t);
        for i in 0..self.np {
            let c = self.panel_center(i);
            self.pu[0][i] += factor * (vel[0] - rotvel * (c[1] - self.tc[1]));
            self.pu[1][i] += factor * (vel[1] + rotvel * (c[0] - self.tc[0]));
        }
    }

    /// Add rotation-induced strengths scaled by the body's current rate.
    pub fn add_rot_strengths(&mut self, factor: f64) {
        let rotvel = match self.base.get_body() {
            Some(b) => b.rotvel(0.0),
            None => return,
        };
        self.add_rot_strengths_base(factor * rotvel);
    }

    /// Add rotation-induced strengths for a unit rotation rate; used when
    /// building the BEM augmentation column.
    pub fn add_unit_rot_strengths(&mut self) {
        self.add_rot_strengths_base(1.0);
    }

    /// Add rotation-induced strengths scaled by the BEM-solved rate when
    /// augmented, the prescribed rate otherwise.
    pub fn add_solved_rot_strengths(&mut self, factor: f64) {
        if self.is_augmented() {
            self.add_rot_strengths_base(factor * self.solved_omega);
        } else {
            self.add_rot_strengths(factor);
        }
    }

    /// The per-panel vortex and source sheet strengths equivalent to a unit
    /// rotation rate, without mutating the surface. `None` when the surface
    /// has no rotating body.
    pub fn unit_rot_sheets(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let body = self.base.get_body()?;
        if body.is_ground() || self.ps.is_none() {
            return None;
        }
        let ux = self.base.ux.as_ref()?;

        let mut gamma = vec![0.0; self.np];
        let mut sigma = vec![0.0; self.np];
        for i in 0..self.np {
            let (g, s) = self.rot_increment(ux, i, 1.0);
            gamma[i] = g;
            sigma[i] = s;
        }
        Some((gamma, sigma))
    }

    /// Strength increments for panel `i` from rotation at `factor` rad/s,
    /// computed on the untransformed geometry.
    fn rot_increment(&self, ux: &[Vec<f64>; DIMENSIONS], i: usize, factor: f64) -> (f64, f64) {
        let j = self.idx[2 * i];
        let jp1 = self.idx[2 * i + 1];
        // Vector from the geometric center to the panel center.
        let dx = 0.5 * (ux[0][j] + ux[0][jp1]) - self.utc[0];
        let dy = 0.5 * (ux[1][j] + ux[1][jp1]) - self.utc[1];
        // Velocity of the panel center under the rotation.
        let ui = -factor * dy;
        let vi = factor * dx;

        // Unit tangent on the untransformed panel.
        let mut tx = ux[0][jp1] - ux[0][j];
        let mut ty = ux[1][jp1] - ux[1][j];
        let inv_len = 1.0 / self.area[i];
        tx *= inv_len;
        ty *= inv_len;

        let new_vort = -(ui * tx + vi * ty);
        let new_src = -(ui * ty - vi * tx);
        (new_vort, new_src)
    }

    fn add_rot_strengths_base(&mut self, factor: f64) {
        let body = match self.base.get_body() {
            Some(b) => b.clone(),
            None => return,
        };
        if body.is_ground() || self.ps.is_none() {
            return;
        }
        assert!(
            self.vol != 0.0 && self.vol.is_finite(),
            "add_rot_strengths requires a valid geometric center"
        );
        let ux = match self.base.ux.clone() {
            Some(ux) => ux,
            None => return,
        };

        for r in self.rs.iter_mut() {
            match r {
                Some(v) => v.resize(self.np, 0.0),
                None => *r = Some(vec![0.0; self.np]),
            }
        }

        let np = self.np;
        assert_eq!(
            self.ps.as_ref().map(Vec::len),
            Some(np),
            "strength array is not the same as panel count"
        );

        for i in 0..np {
            let (new_vort, new_src) = self.rot_increment(&ux, i, factor);
            self.ps.as_mut().unwrap()[i] += new_vort;
            self.rs[0].as_mut().unwrap()[i] += new_vort;
            self.rs[1].as_mut().unwrap()[i] += new_src;
        }
    }

    // ------------------------------------------------------------------
    // Shedding and circulation accounting
    // ------------------------------------------------------------------

    /// Convert every panel to one particle at its center, pushed `offset`
    /// along the normal into the fluid, with strength `(ps + vortex bc) *
    /// area` and core radius `vdelta`. Packed `(x, y, s, r)`.
    pub fn represent_as_particles(&self, offset: f64, vdelta: f64) -> Vec<f64> {
        let ps = match self.ps.as_ref() {
            Some(ps) => ps,
            None => return Vec::new(),
        };
        let reactive = self.base.get_elem_type() == ElemType::Reactive;

        let mut px = Vec::with_capacity(4 * self.np);
        for i in 0..self.np {
            let c = self.panel_center(i);
            px.push(c[0] + offset * self.b[1][0][i]);
            px.push(c[1] + offset * self.b[1][1][i]);
            let mut this_str = ps[i];
            if reactive {
                if let Some(bc0) = self.bc[0].as_ref() {
                    this_str += bc0[i];
                }
            }
            px.push(this_str * self.area[i]);
            px.push(vdelta);
        }
        px
    }

    /// Peak strength magnitude over the panels.
    pub fn get_max_str(&self) -> f64 {
        match self.ps.as_ref() {
            Some(ps) if !ps.is_empty() => ps.iter().fold(0.0_f64, |m, v| m.max(v.abs())),
            _ => 1.0,
        }
    }

    /// Smooth the running peak strength: 10% new, 90% old.
    pub fn update_max_str(&mut self) {
        let this_max = self.get_max_str();
        if self.max_strength < 0.0 {
            self.max_strength = this_max;
        } else {
            self.max_strength = 0.1 * this_max + 0.9 * self.max_strength;
        }
    }

    /// Total circulation: sheet strength times panel length, summed.
    pub fn get_total_circ(&self, _t: f64) -> f64 {
        match self.ps.as_ref() {
            Some(ps) => ps.iter().zip(self.area.iter()).map(|(s, a)| s * a).sum(),
            None => 0.0,
        }
    }

    /// Circulation enclosed by the rotating body: `2 * vol * omega`.
    pub fn get_body_circ(&self, t: f64) -> f64 {
        match self.base.get_body() {
            Some(body) => 2.0 * self.vol * body.rotvel(t),
            None => 0.0,
        }
    }

    /// Enclosed circulation at the last shedding event.
    pub fn get_last_body_circ(&self) -> f64 {
        2.0 * self.vol * self.this_omega
    }

    /// Circulation error implied by the last augmented solve.
    pub fn get_last_body_circ_error(&self) -> f64 {
        2.0 * self.vol * self.omega_error
    }

    /// Record the current rotation rate and reset the reabsorption counter;
    /// called at each shedding event.
    pub fn reset_augmentation_vars(&mut self) {
        if let Some(body) = self.base.get_body() {
            self.this_omega = body.rotvel(0.0);
        }
        self.reabsorbed_gamma = 0.0;
    }

    /// Accumulate circulation reabsorbed into this surface.
    pub fn add_to_reabsorbed(&mut self, circ: f64) {
        self.reabsorbed_gamma += circ;
    }

    pub fn get_reabsorbed(&self) -> f64 {
        self.reabsorbed_gamma
    }

    /// Largest boundary-condition magnitude, zero for non-reactive surfaces.
    pub fn get_max_bc_value(&self) -> f64 {
        if self.base.get_elem_type() != ElemType::Reactive {
            return 0.0;
        }
        let mut this_max = 0.0_f64;
        for bc in self.bc.iter().flatten() {
            for v in bc.iter() {
                this_max = this_max.max(v.abs());
            }
        }
        this_max
    }

    // ------------------------------------------------------------------
    // Growth
    // ------------------------------------------------------------------

    /// Append nodes and panels. Panel indices are local to the appended
    /// nodes and are offset into the merged node array; values follow the
    /// same per-type meaning as in the constructor.
    pub fn add_new(&mut self, x: &[f64], idx: &[usize], val: &[f64]) -> Result<()> {
        if idx.len() % 2 != 0 {
            return Err(Error::Shape {
                what: "panel index array",
                len: idx.len(),
                stride: 2,
            });
        }
        let nsurfs = idx.len() / 2;
        if nsurfs == 0 {
            return Ok(());
        }
        if x.len() % DIMENSIONS != 0 {
            return Err(Error::Shape {
                what: "surface node array",
                len: x.len(),
                stride: DIMENSIONS,
            });
        }
        if val.len() != nsurfs {
            return Err(Error::Shape {
                what: "panel value array",
                len: val.len(),
                stride: nsurfs,
            });
        }
        let nnold = self.base.get_n();
        let neold = self.np;
        let nnodes = x.len() / DIMENSIONS;

        for d in 0..DIMENSIONS {
            for i in 0..nnodes {
                self.base.x[d].push(x[DIMENSIONS * i + d]);
            }
            self.base.u[d].resize(nnold + nnodes, 0.0);
        }
        if let Some(ux) = self.base.ux.as_mut() {
            for d in 0..DIMENSIONS {
                for i in 0..nnodes {
                    ux[d].push(x[DIMENSIONS * i + d]);
                }
            }
        }

        for (k, &i) in idx.iter().enumerate() {
            if i >= nnodes {
                return Err(Error::invariant(format!(
                    "appended panel index {} at position {} exceeds appended node count {}",
                    i, k, nnodes
                )));
            }
            self.idx.push(nnold + i);
        }

        self.base.n = nnold + nnodes;
        self.np = neold + nsurfs;

        self.compute_bases(self.np)?;

        match self.base.get_elem_type() {
            ElemType::Active => {
                let ps = self.ps.as_mut().unwrap();
                ps.extend_from_slice(val);
            }
            ElemType::Reactive => {
                for bc in self.bc.iter_mut().flatten() {
                    bc.extend_from_slice(val);
                }
                self.ps.as_mut().unwrap().resize(self.np, 0.0);
                if let Some(pss) = self.pss.as_mut() {
                    pss.resize(self.np, 0.0);
                }
            }
            ElemType::Inert => {}
        }

        for d in 0..DIMENSIONS {
            self.pu[d].resize(self.np, 0.0);
        }

        debug!(panels = nsurfs, nodes = nnodes, "appended to surface collection");

        if self.base.get_move_type() == MoveType::BodyBound {
            self.set_geom_center()?;
        }
        Ok(())
    }
}

impl fmt::Display for Surfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} panels over {}", self.np, self.base)
    }
}

/// Node and index arrays for a closed circle, wound for an external body
/// (clockwise, fluid outside).
pub fn circle_geometry(center: [f64; 2], radius: f64, n_panels: usize) -> (Vec<f64>, Vec<usize>) {
    assert!(n_panels >= 3, "need at least three panels to close a circle");
    let mut x = Vec::with_capacity(2 * n_panels);
    for i in 0..n_panels {
        // Negative angle increment winds clockwise.
        let theta = -2.0 * std::f64::consts::PI * (i as f64) / (n_panels as f64);
        x.push(center[0] + radius * theta.cos());
        x.push(center[1] + radius * theta.sin());
    }
    let mut idx = Vec::with_capacity(2 * n_panels);
    for i in 0..n_panels {
        idx.push(i);
        idx.push((i + 1) % n_panels);
    }
    (x, idx)
}
