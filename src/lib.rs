//! # vpm2d
//!
//! A two-dimensional viscous vortex-particle method with boundary-element
//! surfaces and hybrid Eulerian coupling.
//!
//! This crate provides the core building blocks of the engine:
//! - Collections: particle clouds, panel surfaces, high-order volumes
//! - Rigid-body kinematics and body-bound transforms
//! - Regularized Biot-Savart influence kernels (scalar and SIMD)
//! - Boundary-element solve for panel strengths, with rotation-rate
//!   augmentation
//! - Particle merging that preserves circulation moments
//! - Core-spreading diffusion and boundary vorticity shedding
//! - Euler/Lagrangian hybrid exchange against an external high-order solver
//! - Flow-feature seeding from configuration documents

pub mod bem;
pub mod body;
pub mod convection;
pub mod diffusion;
pub mod elements;
pub mod error;
pub mod features;
pub mod hybrid;
pub mod kernels;
pub mod merge;
pub mod simulation;
pub mod types;

// Re-export the main types for convenience.
pub use bem::{Bem, FgmresConfig, Preconditioner, SolverType};
pub use body::{Body, GROUND_NAME};
pub use convection::Convection;
pub use diffusion::Diffusion;
pub use elements::{
    circle_geometry, uniform_rectangle, BcSet, Collection, ElementBase, HOVolumes, Points,
    Surfaces, BIOT_SAVART_PREFACTOR,
};
pub use error::{Error, Result};
pub use features::{parse_flow_features, FlowFeature, MeasureFeature};
pub use hybrid::{DummySolver, HighOrderSolver, Hybrid, HybridConfig};
pub use merge::merge_operation;
pub use simulation::{Simulation, SimulationConfig};
pub use types::{ElemType, MoveType, SolveTarget, DIMENSIONS};
