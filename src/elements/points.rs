//! Vortex particles.
//!
//! A particle carries a signed circulation and a positive core radius used
//! to regularize the Biot-Savart kernel. Particles are created by flow
//! features or by the hybrid correction loop, and destroyed by merging or
//! explicit removal.
//!
//! Result buffers for vorticity, velocity gradient, and streamfunction are
//! allocated lazily when an influence pass asks for them.

use std::fmt;
use std::sync::Arc;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::types::{ElemType, MoveType, SolveTarget, DIMENSIONS};

use super::base::{ElementBase, BIOT_SAVART_PREFACTOR};

/// A cloud of vortex particles in structure-of-arrays layout.
#[derive(Clone, Debug)]
pub struct Points {
    pub(crate) base: ElementBase,
    /// Core radii, parallel to the base arrays.
    pub r: Vec<f64>,
    /// Vorticity results, filled by a `VelAndVort` pass.
    pub w: Option<Vec<f64>>,
    /// Velocity-gradient results `[du/dx, du/dy, dv/dx, dv/dy]`, filled by
    /// a `VelAndGrad` pass.
    pub ug: Option<[Vec<f64>; 4]>,
    /// Streamfunction results, filled by a `PsiOnly` pass.
    pub psi: Option<Vec<f64>>,
}

impl Points {
    /// Create particles from a flat packet.
    ///
    /// Packing is `(x, y)` per element when `elem_type` is inert, otherwise
    /// `(x, y, strength, radius)`.
    pub fn new(
        packet: &[f64],
        elem_type: ElemType,
        move_type: MoveType,
        body: Option<Arc<Body>>,
    ) -> Result<Self> {
        let mut base = ElementBase::new(elem_type, move_type, body);
        base.add_new(packet)?;
        let n = base.get_n();
        let mut r = vec![0.0; n];
        if !base.is_inert() {
            let stride = base.stride();
            for i in 0..n {
                r[i] = packet[stride * i + 3];
            }
        }
        let mut pts = Self {
            base,
            r,
            w: None,
            ug: None,
            psi: None,
        };
        if move_type == MoveType::BodyBound {
            pts.base.transform(0.0);
        }
        Ok(pts)
    }

    /// An empty active Lagrangian cloud; the usual starting point of a
    /// simulation's vorticity field.
    pub fn empty() -> Self {
        Self {
            base: ElementBase::new(ElemType::Active, MoveType::Lagrangian, None),
            r: Vec::new(),
            w: None,
            ug: None,
            psi: None,
        }
    }

    pub fn get_n(&self) -> usize {
        self.base.get_n()
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

    /// Append `(x, y, strength)` triples, filling every new radius with
    /// `vdelta`.
    ///
    /// This is the packing the hybrid correction loop produces.
    pub fn add_new_with_radius(&mut self, packet: &[f64], vdelta: f64) -> Result<()> {
        if packet.is_empty() {
            return Ok(());
        }
        if packet.len() % 3 != 0 {
            return Err(Error::Shape {
                what: "particle triple packet",
                len: packet.len(),
                stride: 3,
            });
        }
        let nnew = packet.len() / 3;
        // Repack to the base stride of four so the base can do the rest.
        let mut flat = Vec::with_capacity(4 * nnew);
        for i in 0..nnew {
            flat.push(packet[3 * i]);
            flat.push(packet[3 * i + 1]);
            flat.push(packet[3 * i + 2]);
            flat.push(vdelta);
        }
        self.add_new(&flat)
    }

    /// Append elements using the base packing (`(x, y, s, r)` for non-inert
    /// clouds, `(x, y)` for inert ones).
    pub fn add_new(&mut self, flat: &[f64]) -> Result<()> {
        let old_n = self.base.get_n();
        self.base.add_new(flat)?;
        let nnew = self.base.get_n() - old_n;
        let stride = self.base.stride();
        if self.base.is_inert() {
            self.r.resize(old_n + nnew, 0.0);
        } else {
            for i in 0..nnew {
                self.r.push(flat[stride * i + 3]);
            }
        }
        self.sync_result_buffers();
        Ok(())
    }

    /// Remove a particle by swapping it with the last one.
    ///
    /// Order is not preserved; callers that iterate while removing must
    /// account for the swap.
    pub fn remove(&mut self, i: usize) {
        let n = self.base.get_n();
        assert!(i < n, "remove index {} out of range {}", i, n);
        let last = n - 1;
        for d in 0..DIMENSIONS {
            self.base.x[d].swap(i, last);
            self.base.x[d].pop();
            self.base.u[d].swap(i, last);
            self.base.u[d].pop();
        }
        if let Some(s) = self.base.s.as_mut() {
            s.swap(i, last);
            s.pop();
        }
        if let Some(ux) = self.base.ux.as_mut() {
            for d in 0..DIMENSIONS {
                ux[d].swap(i, last);
                ux[d].pop();
            }
        }
        self.r.swap(i, last);
        self.r.pop();
        self.base.n = last;
        self.sync_result_buffers();
    }

    /// Largest core radius, or zero for an empty cloud.
    pub fn max_core_size(&self) -> f64 {
        self.r.iter().fold(0.0_f64, |a, &b| f64::max(a, b))
    }

    /// Ensure the result buffers an influence pass needs exist and match
    /// the element count.
    pub fn prepare_results(&mut self, mode: SolveTarget) {
        let n = self.base.get_n();
        if mode.wants_vort() {
            self.w.get_or_insert_with(Vec::new).resize(n, 0.0);
        }
        if mode.wants_grad() {
            let ug = self
                .ug
                .get_or_insert_with(|| [Vec::new(), Vec::new(), Vec::new(), Vec::new()]);
            for g in ug.iter_mut() {
                g.resize(n, 0.0);
            }
        }
        if mode.wants_psi() {
            self.psi.get_or_insert_with(Vec::new).resize(n, 0.0);
        }
    }

    /// Zero velocities and any allocated result buffers.
    pub fn zero_vels(&mut self) {
        self.base.zero_vels();
        if let Some(w) = self.w.as_mut() {
            w.iter_mut().for_each(|v| *v = 0.0);
        }
        if let Some(ug) = self.ug.as_mut() {
            for g in ug.iter_mut() {
                g.iter_mut().for_each(|v| *v = 0.0);
            }
        }
        if let Some(psi) = self.psi.as_mut() {
            psi.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Finalize velocities with the freestream, and scale the other raw
    /// kernel sums by the same `1/(2 pi)` prefactor. Vorticity, gradients
    /// and streamfunction get no freestream contribution.
    pub fn finalize_vels(&mut self, fs: [f64; DIMENSIONS]) {
        self.base.finalize_vels(fs);
        if let Some(w) = self.w.as_mut() {
            w.iter_mut().for_each(|v| *v *= BIOT_SAVART_PREFACTOR);
        }
        if let Some(ug) = self.ug.as_mut() {
            for g in ug.iter_mut() {
                g.iter_mut().for_each(|v| *v *= BIOT_SAVART_PREFACTOR);
            }
        }
        if let Some(psi) = self.psi.as_mut() {
            psi.iter_mut().for_each(|v| *v *= BIOT_SAVART_PREFACTOR);
        }
    }

    /// Vorticity results from the latest `VelAndVort` pass.
    pub fn vorticity(&self) -> Option<&[f64]> {
        self.w.as_deref()
    }

    fn sync_result_buffers(&mut self) {
        let n = self.base.get_n();
        if let Some(w) = self.w.as_mut() {
            w.resize(n, 0.0);
        }
        if let Some(ug) = self.ug.as_mut() {
            for g in ug.iter_mut() {
                g.resize(n, 0.0);
            }
        }
        if let Some(psi) = self.psi.as_mut() {
            psi.resize(n, 0.0);
        }
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as particles", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unpacks_radii() {
        let pts = Points::new(
            &[0.0, 0.0, 1.0, 0.1, 2.0, 0.0, -0.5, 0.2],
            ElemType::Active,
            MoveType::Lagrangian,
            None,
        )
        .unwrap();
        assert_eq!(pts.get_n(), 2);
        assert_eq!(pts.r, vec![0.1, 0.2]);
        assert_eq!(pts.base().strengths().unwrap(), &[1.0, -0.5]);
    }

    #[test]
    fn test_add_new_with_radius() {
        let mut pts = Points::empty();
        pts.add_new_with_radius(&[1.0, 2.0, 0.5, 3.0, 4.0, -0.5], 0.05).unwrap();
        assert_eq!(pts.get_n(), 2);
        assert_eq!(pts.r, vec![0.05, 0.05]);
        assert_eq!(pts.base().x[0], vec![1.0, 3.0]);
        assert_eq!(pts.base().x[1], vec![2.0, 4.0]);
    }

    #[test]
    fn test_remove_swaps_last() {
        let mut pts = Points::new(
            &[0.0, 0.0, 1.0, 0.1, 1.0, 0.0, 2.0, 0.2, 2.0, 0.0, 3.0, 0.3],
            ElemType::Active,
            MoveType::Lagrangian,
            None,
        )
        .unwrap();
        pts.remove(0);
        assert_eq!(pts.get_n(), 2);
        assert_eq!(pts.base().x[0], vec![2.0, 1.0]);
        assert_eq!(pts.base().strengths().unwrap(), &[3.0, 2.0]);
        assert_eq!(pts.r, vec![0.3, 0.2]);
    }

    #[test]
    fn test_inert_points_have_no_strength() {
        let pts = Points::new(&[0.0, 1.0, 2.0, 3.0], ElemType::Inert, MoveType::Fixed, None).unwrap();
        assert_eq!(pts.get_n(), 2);
        assert!(pts.base().strengths().is_none());
        assert_eq!(pts.base().get_max_str(), 1.0);
    }
}
