//! Tagged variant over the three collection shapes.
//!
//! Convection and the hybrid driver work over heterogeneous lists of
//! collections; dispatch is an exhaustive `match`, and the numeric kernels
//! are monomorphized per source/target kind rather than virtualized.

use std::fmt;

use crate::types::{ElemType, MoveType, DIMENSIONS};

use super::hovolumes::HOVolumes;
use super::points::Points;
use super::surfaces::Surfaces;

/// A particle cloud, a panel surface, or an Eulerian exchange mesh.
#[derive(Clone, Debug)]
pub enum Collection {
    Points(Points),
    Surfaces(Surfaces),
    Volumes(HOVolumes),
}

impl Collection {
    pub fn get_n(&self) -> usize {
        match self {
            Collection::Points(p) => p.get_n(),
            Collection::Surfaces(s) => s.get_n(),
            Collection::Volumes(v) => v.get_n(),
        }
    }

    pub fn is_inert(&self) -> bool {
        match self {
            Collection::Points(p) => p.base().is_inert(),
            Collection::Surfaces(s) => s.base().is_inert(),
            Collection::Volumes(v) => v.base().is_inert(),
        }
    }

    pub fn get_elem_type(&self) -> ElemType {
        match self {
            Collection::Points(p) => p.base().get_elem_type(),
            Collection::Surfaces(s) => s.base().get_elem_type(),
            Collection::Volumes(v) => v.base().get_elem_type(),
        }
    }

    pub fn get_move_type(&self) -> MoveType {
        match self {
            Collection::Points(p) => p.base().get_move_type(),
            Collection::Surfaces(s) => s.base().get_move_type(),
            Collection::Volumes(v) => v.base().get_move_type(),
        }
    }

    /// Zero velocity accumulators ahead of an influence pass.
    pub fn zero_vels(&mut self) {
        match self {
            Collection::Points(p) => p.zero_vels(),
            Collection::Surfaces(s) => s.zero_vels(),
            Collection::Volumes(v) => v.base_mut().zero_vels(),
        }
    }

    /// Apply freestream and kernel prefactor to accumulated sums.
    pub fn finalize_vels(&mut self, fs: [f64; DIMENSIONS]) {
        match self {
            Collection::Points(p) => p.finalize_vels(fs),
            Collection::Surfaces(s) => s.finalize_vels(fs),
            Collection::Volumes(v) => v.base_mut().finalize_vels(fs),
        }
    }

    /// First-order move over `dt`.
    pub fn move_t(&mut self, t: f64, dt: f64) {
        match self {
            Collection::Points(p) => p.base_mut().move_t(t, dt),
            Collection::Surfaces(s) => s.move_t(t, dt),
            Collection::Volumes(v) => v.move_t(t, dt),
        }
    }

    pub fn get_max_str(&self) -> f64 {
        match self {
            Collection::Points(p) => p.base().get_max_str(),
            Collection::Surfaces(s) => s.get_max_str(),
            Collection::Volumes(v) => v.base().get_max_str(),
        }
    }

    pub fn get_total_circ(&self, t: f64) -> f64 {
        match self {
            Collection::Points(p) => p.base().get_total_circ(t),
            Collection::Surfaces(s) => s.get_total_circ(t),
            Collection::Volumes(v) => v.base().get_total_circ(t),
        }
    }

    /// Borrow as particles, if that is what this is.
    pub fn as_points(&self) -> Option<&Points> {
        match self {
            Collection::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_points_mut(&mut self) -> Option<&mut Points> {
        match self {
            Collection::Points(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow as a surface, if that is what this is.
    pub fn as_surfaces(&self) -> Option<&Surfaces> {
        match self {
            Collection::Surfaces(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_surfaces_mut(&mut self) -> Option<&mut Surfaces> {
        match self {
            Collection::Surfaces(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_volumes(&self) -> Option<&HOVolumes> {
        match self {
            Collection::Volumes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_volumes_mut(&mut self) -> Option<&mut HOVolumes> {
        match self {
            Collection::Volumes(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Points(p) => p.fmt(f),
            Collection::Surfaces(s) => s.fmt(f),
            Collection::Volumes(v) => v.fmt(f),
        }
    }
}

impl From<Points> for Collection {
    fn from(p: Points) -> Self {
        Collection::Points(p)
    }
}

impl From<Surfaces> for Collection {
    fn from(s: Surfaces) -> Self {
        Collection::Surfaces(s)
    }
}

impl From<HOVolumes> for Collection {
    fn from(v: HOVolumes) -> Self {
        Collection::Volumes(v)
    }
}
