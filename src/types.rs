//! Core domain enums shared by every collection.
//!
//! These are deliberately small, closed types: dispatch over them is
//! exhaustive `match`, never dynamic.

/// Number of spatial dimensions.
pub const DIMENSIONS: usize = 2;

/// How a collection relates to its strength.
///
/// - `Active`: owns a free strength that evolves with the flow.
/// - `Reactive`: strength is solved by the BEM from a boundary condition.
/// - `Inert`: carries no strength at all (measurement points, mesh nodes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemType {
    Active,
    Reactive,
    Inert,
}

/// How a collection's positions evolve.
///
/// - `Lagrangian`: advected by the local velocity.
/// - `BodyBound`: rigidly tied to a [`Body`](crate::body::Body).
/// - `Fixed`: never moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveType {
    Lagrangian,
    BodyBound,
    Fixed,
}

/// What an influence pass computes at each target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveTarget {
    /// Velocity only.
    VelOnly,
    /// Velocity and the 2x2 velocity gradient.
    VelAndGrad,
    /// Streamfunction only.
    PsiOnly,
    /// Velocity and vorticity.
    VelAndVort,
}

impl SolveTarget {
    /// Does this pass fill the streamfunction buffer?
    pub fn wants_psi(self) -> bool {
        matches!(self, SolveTarget::PsiOnly)
    }

    /// Does this pass fill the velocity buffers?
    pub fn wants_vel(self) -> bool {
        !matches!(self, SolveTarget::PsiOnly)
    }

    /// Does this pass fill the velocity-gradient buffers?
    pub fn wants_grad(self) -> bool {
        matches!(self, SolveTarget::VelAndGrad)
    }

    /// Does this pass fill the vorticity buffer?
    pub fn wants_vort(self) -> bool {
        matches!(self, SolveTarget::VelAndVort)
    }
}

impl std::fmt::Display for SolveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolveTarget::VelOnly => "vel",
            SolveTarget::VelAndGrad => "vel+grad",
            SolveTarget::PsiOnly => "psi",
            SolveTarget::VelAndVort => "vel+vort",
        };
        write!(f, "{}", name)
    }
}
