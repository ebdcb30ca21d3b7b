//! Shared structure-of-arrays substrate for all collections.
//!
//! Every collection (particles, panel surfaces, high-order volumes) stores
//! its per-node state here: one `Vec<f64>` per spatial dimension for
//! positions and velocities, an optional strength vector, and, for
//! body-bound collections, the untransformed (body-frame) positions.
//!
//! Strength is a sum type (`Option<Vec<f64>>`), never a zero-filled
//! sentinel: inert collections have no strength and accessors make that
//! visible.

use std::fmt;
use std::sync::Arc;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::types::{ElemType, MoveType, DIMENSIONS};

/// Kernel sums are accumulated unscaled; this factor is applied once in
/// [`ElementBase::finalize_vels`].
pub const BIOT_SAVART_PREFACTOR: f64 = 0.5 / std::f64::consts::PI;

/// Common state for every collection kind.
#[derive(Clone, Debug)]
pub struct ElementBase {
    elem_type: ElemType,
    move_type: MoveType,
    body: Option<Arc<Body>>,

    /// Node count; every per-node array has this length.
    pub(crate) n: usize,

    /// Node positions, one array per dimension.
    pub x: [Vec<f64>; DIMENSIONS],
    /// Node velocities, one array per dimension.
    pub u: [Vec<f64>; DIMENSIONS],
    /// Strengths, present unless the collection is inert.
    pub s: Option<Vec<f64>>,
    /// Untransformed (body-frame) positions, present when body-bound.
    pub ux: Option<[Vec<f64>; DIMENSIONS]>,
}

impl ElementBase {
    /// Create an empty base of the given element and movement type.
    ///
    /// A strength vector is allocated unless `elem_type` is inert, and
    /// untransformed positions are kept whenever a body handle is given.
    pub fn new(elem_type: ElemType, move_type: MoveType, body: Option<Arc<Body>>) -> Self {
        let s = if elem_type == ElemType::Inert {
            None
        } else {
            Some(Vec::new())
        };
        let ux = body.as_ref().map(|_| [Vec::new(), Vec::new()]);
        Self {
            elem_type,
            move_type,
            body,
            n: 0,
            x: [Vec::new(), Vec::new()],
            u: [Vec::new(), Vec::new()],
            s,
            ux,
        }
    }

    pub fn get_n(&self) -> usize {
        self.n
    }

    pub fn is_inert(&self) -> bool {
        self.elem_type == ElemType::Inert
    }

    pub fn get_elem_type(&self) -> ElemType {
        self.elem_type
    }

    pub fn get_move_type(&self) -> MoveType {
        self.move_type
    }

    pub fn get_body(&self) -> Option<&Arc<Body>> {
        self.body.as_ref()
    }

    /// Strengths, if this collection has any.
    pub fn strengths(&self) -> Option<&[f64]> {
        self.s.as_deref()
    }

    /// Number of floats per element expected by [`add_new`](Self::add_new):
    /// `(x, y)` when inert, `(x, y, strength, radius)` otherwise.
    pub fn stride(&self) -> usize {
        if self.is_inert() {
            2
        } else {
            4
        }
    }

    /// Append elements from a flat packed array.
    ///
    /// Position goes into `x`, strength (if present) into `s`; the radius
    /// slot is ignored here and handled by collections that carry radii.
    /// Velocities are extended with zeros. Body-bound collections record the
    /// new positions as untransformed as well.
    pub fn add_new(&mut self, flat: &[f64]) -> Result<()> {
        if flat.is_empty() {
            return Ok(());
        }
        let stride = self.stride();
        if flat.len() % stride != 0 {
            return Err(Error::Shape {
                what: "element packet",
                len: flat.len(),
                stride,
            });
        }
        let nnew = flat.len() / stride;

        for d in 0..DIMENSIONS {
            self.x[d].reserve(nnew);
            for i in 0..nnew {
                self.x[d].push(flat[stride * i + d]);
            }
            self.u[d].resize(self.n + nnew, 0.0);
        }

        if let Some(s) = self.s.as_mut() {
            s.reserve(nnew);
            for i in 0..nnew {
                s.push(flat[stride * i + 2]);
            }
        }

        if let Some(ux) = self.ux.as_mut() {
            for d in 0..DIMENSIONS {
                for i in 0..nnew {
                    ux[d].push(flat[stride * i + d]);
                }
            }
        }

        self.n += nnew;
        Ok(())
    }

    /// Grow every per-node array to `n_new`, padding positions and strengths
    /// with zero. Shrinking is not supported here.
    pub fn resize(&mut self, n_new: usize) {
        if n_new == self.n {
            return;
        }
        for d in 0..DIMENSIONS {
            self.x[d].resize(n_new, 0.0);
            self.u[d].resize(n_new, 0.0);
        }
        if let Some(s) = self.s.as_mut() {
            s.resize(n_new, 0.0);
        }
        if let Some(ux) = self.ux.as_mut() {
            for d in 0..DIMENSIONS {
                ux[d].resize(n_new, 0.0);
            }
        }
        self.n = n_new;
    }

    /// Zero the node velocities before an accumulation pass.
    pub fn zero_vels(&mut self) {
        for d in 0..DIMENSIONS {
            for v in self.u[d].iter_mut() {
                *v = 0.0;
            }
        }
    }

    /// Turn raw kernel sums into physical velocities:
    /// `u <- fs + u / (2 pi)`.
    pub fn finalize_vels(&mut self, fs: [f64; DIMENSIONS]) {
        for d in 0..DIMENSIONS {
            for v in self.u[d].iter_mut() {
                *v = fs[d] + *v * BIOT_SAVART_PREFACTOR;
            }
        }
    }

    /// Zero all strengths.
    pub fn zero_strengths(&mut self) {
        if let Some(s) = self.s.as_mut() {
            for v in s.iter_mut() {
                *v = 0.0;
            }
        }
    }

    /// Place nodes at the rigid transform of the untransformed positions
    /// under the attached body's pose at time `t`. No-op unless body-bound.
    pub fn transform(&mut self, t: f64) {
        if self.move_type != MoveType::BodyBound {
            return;
        }
        let (body, ux) = match (self.body.as_ref(), self.ux.as_ref()) {
            (Some(b), Some(ux)) => (b, ux),
            _ => return,
        };
        let pos = body.pos(t);
        let theta = body.orient(t);
        let (st, ct) = theta.sin_cos();
        for i in 0..self.n {
            self.x[0][i] = pos[0] + ux[0][i] * ct - ux[1][i] * st;
            self.x[1][i] = pos[1] + ux[0][i] * st + ux[1][i] * ct;
        }
    }

    /// First-order position update over `dt`.
    ///
    /// Lagrangian collections advect with their node velocities; body-bound
    /// collections are re-transformed to `t + dt`; fixed collections do not
    /// move.
    pub fn move_t(&mut self, t: f64, dt: f64) {
        match self.move_type {
            MoveType::Lagrangian => {
                for d in 0..DIMENSIONS {
                    for i in 0..self.n {
                        self.x[d][i] += dt * self.u[d][i];
                    }
                }
            }
            MoveType::BodyBound => self.transform(t + dt),
            MoveType::Fixed => {}
        }
    }

    /// Two-stage blended position update, used by second-order integrators:
    /// `x += dt * (w1 * u1 + w2 * u2)` where `u1`, `u2` are the velocity
    /// arrays of two stage evaluations of this same collection.
    pub fn move_weighted(
        &mut self,
        t: f64,
        dt: f64,
        w1: f64,
        u1: &ElementBase,
        w2: f64,
        u2: &ElementBase,
    ) {
        match self.move_type {
            MoveType::Lagrangian => {
                assert_eq!(u1.n, self.n, "stage-1 velocity count mismatch");
                assert_eq!(u2.n, self.n, "stage-2 velocity count mismatch");
                for d in 0..DIMENSIONS {
                    for i in 0..self.n {
                        self.x[d][i] += dt * (w1 * u1.u[d][i] + w2 * u2.u[d][i]);
                    }
                }
            }
            MoveType::BodyBound => self.transform(t + dt),
            MoveType::Fixed => {}
        }
    }

    /// Peak strength magnitude, or 1 when the collection has no strengths
    /// to report.
    pub fn get_max_str(&self) -> f64 {
        match self.s.as_ref() {
            Some(s) if !s.is_empty() => s.iter().fold(0.0_f64, |m, v| m.max(v.abs())),
            _ => 1.0,
        }
    }

    /// Total circulation: the plain sum of strengths. Surfaces override
    /// this to scale by panel length.
    pub fn get_total_circ(&self, _t: f64) -> f64 {
        self.s.as_ref().map(|s| s.iter().sum()).unwrap_or(0.0)
    }

    /// Replace the entire strength vector.
    ///
    /// The offset/count pair is validated for shape only; partial
    /// replacement is not supported.
    pub fn set_str(&mut self, _ioffset: usize, icnt: usize, new_s: Vec<f64>) {
        let s = self
            .s
            .as_mut()
            .expect("set_str called on a collection without strengths");
        assert_eq!(icnt, new_s.len(), "set_str count does not match packet");
        assert_eq!(new_s.len(), s.len(), "set_str packet does not match element count");
        *s = new_s;
    }
}

impl fmt::Display for ElementBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = match self.elem_type {
            ElemType::Active => "active",
            ElemType::Reactive => "reactive",
            ElemType::Inert => "inert",
        };
        let m = match self.move_type {
            MoveType::Lagrangian => "lagrangian",
            MoveType::BodyBound => "body-bound",
            MoveType::Fixed => "fixed",
        };
        write!(f, "{} {} {} elements", self.n, e, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_new_strides() {
        let mut inert = ElementBase::new(ElemType::Inert, MoveType::Fixed, None);
        inert.add_new(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(inert.get_n(), 2);
        assert_eq!(inert.x[0], vec![0.0, 2.0]);
        assert_eq!(inert.x[1], vec![1.0, 3.0]);
        assert!(inert.strengths().is_none());

        let mut active = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        active.add_new(&[0.0, 1.0, 0.5, 0.1]).unwrap();
        assert_eq!(active.get_n(), 1);
        assert_eq!(active.strengths().unwrap(), &[0.5]);
    }

    #[test]
    fn test_add_new_rejects_ragged_packet() {
        let mut active = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        let err = active.add_new(&[0.0, 1.0, 0.5]).unwrap_err();
        assert!(matches!(err, Error::Shape { stride: 4, len: 3, .. }));
    }

    #[test]
    fn test_resize_pads_with_zero() {
        let mut base = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        base.add_new(&[1.0, 2.0, 3.0, 0.1]).unwrap();
        base.resize(3);
        assert_eq!(base.get_n(), 3);
        assert_eq!(base.x[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(base.strengths().unwrap(), &[3.0, 0.0, 0.0]);
        assert_eq!(base.u[0].len(), 3);
    }

    #[test]
    fn test_finalize_vels_without_sources_is_freestream() {
        let mut base = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        base.add_new(&[0.0, 0.0, 1.0, 0.1, 5.0, 5.0, -1.0, 0.1]).unwrap();
        base.zero_vels();
        base.finalize_vels([1.5, -0.5]);
        for i in 0..base.get_n() {
            assert_eq!(base.u[0][i], 1.5);
            assert_eq!(base.u[1][i], -0.5);
        }
    }

    #[test]
    fn test_move_zero_dt_is_identity() {
        let mut base = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        base.add_new(&[1.0, 2.0, 1.0, 0.1]).unwrap();
        base.u[0][0] = 3.0;
        base.u[1][0] = 4.0;
        base.move_t(0.0, 0.0);
        assert_eq!(base.x[0][0], 1.0);
        assert_eq!(base.x[1][0], 2.0);
    }

    #[test]
    fn test_move_weighted_blend() {
        let mut base = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        base.add_new(&[0.0, 0.0, 1.0, 0.1]).unwrap();

        let mut u1 = base.clone();
        u1.u[0][0] = 1.0;
        u1.u[1][0] = 0.0;
        let mut u2 = base.clone();
        u2.u[0][0] = 0.0;
        u2.u[1][0] = 1.0;

        base.move_weighted(0.0, 1.0, 0.5, &u1, 0.5, &u2);
        assert!((base.x[0][0] - 0.5).abs() < 1e-15);
        assert!((base.x[1][0] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_empty_boundaries() {
        let base = ElementBase::new(ElemType::Active, MoveType::Lagrangian, None);
        assert_eq!(base.get_n(), 0);
        assert_eq!(base.get_max_str(), 1.0);
        assert_eq!(base.get_total_circ(0.0), 0.0);

        let inert = ElementBase::new(ElemType::Inert, MoveType::Fixed, None);
        assert_eq!(inert.get_max_str(), 1.0);
    }

    #[test]
    fn test_transform_rigid_map() {
        let body = std::sync::Arc::new(
            Body::new("mover").with_pose([1.0, 0.0], 0.0).with_rotation(std::f64::consts::FRAC_PI_2),
        );
        let mut base = ElementBase::new(ElemType::Inert, MoveType::BodyBound, Some(body));
        base.add_new(&[1.0, 0.0]).unwrap();

        // At t=1 the body has turned 90 degrees: (1,0) -> (0,1), plus the offset.
        base.transform(1.0);
        assert!((base.x[0][0] - 1.0).abs() < 1e-12);
        assert!((base.x[1][0] - 1.0).abs() < 1e-12);
    }
}
