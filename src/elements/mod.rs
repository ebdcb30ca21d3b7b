//! Collections and their shared element substrate.
//!
//! Three shapes share one structure-of-arrays base:
//! - [`Points`]: vortex particles with strength and core radius
//! - [`Surfaces`]: straight boundary panels for the BEM
//! - [`HOVolumes`]: the Eulerian exchange mesh for the hybrid solver
//!
//! [`Collection`] is the closed tagged variant used wherever a
//! heterogeneous list of sources or targets is needed.

mod base;
mod collection;
mod hovolumes;
mod points;
mod surfaces;

pub use base::{ElementBase, BIOT_SAVART_PREFACTOR};
pub use collection::Collection;
pub use hovolumes::{uniform_rectangle, HOVolumes};
pub use points::Points;
pub use surfaces::{circle_geometry, BcSet, Surfaces};
