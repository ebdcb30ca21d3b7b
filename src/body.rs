//! Rigid-body kinematic state.
//!
//! A [`Body`] is a named rigid frame whose pose and velocity are prescribed
//! functions of time. Collections that move with a body hold a shared handle
//! (`Arc<Body>`); bodies never reference collections, so no cycles form.
//!
//! The distinguished name `"ground"` denotes the fixed world frame. Surfaces
//! attached to ground are never augmented in the BEM.

use std::sync::Arc;

use crate::types::DIMENSIONS;

/// Name of the fixed world frame.
pub const GROUND_NAME: &str = "ground";

/// A rigid frame with prescribed constant-rate motion.
///
/// Pose at time `t`:
/// ```text
/// position(t)    = pos0 + vel * t
/// orientation(t) = theta0 + omega * t
/// ```
#[derive(Clone, Debug)]
pub struct Body {
    name: String,
    pos0: [f64; DIMENSIONS],
    vel: [f64; DIMENSIONS],
    theta0: f64,
    omega: f64,
}

impl Body {
    /// Create a stationary body at the origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pos0: [0.0; DIMENSIONS],
            vel: [0.0; DIMENSIONS],
            theta0: 0.0,
            omega: 0.0,
        }
    }

    /// The fixed world frame.
    pub fn ground() -> Arc<Self> {
        Arc::new(Self::new(GROUND_NAME))
    }

    /// Set the pose at `t = 0`.
    pub fn with_pose(mut self, pos: [f64; DIMENSIONS], theta: f64) -> Self {
        self.pos0 = pos;
        self.theta0 = theta;
        self
    }

    /// Set the constant translational velocity.
    pub fn with_velocity(mut self, vel: [f64; DIMENSIONS]) -> Self {
        self.vel = vel;
        self
    }

    /// Set the constant angular velocity (rad/s, counter-clockwise positive).
    pub fn with_rotation(mut self, omega: f64) -> Self {
        self.omega = omega;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is this the fixed world frame?
    pub fn is_ground(&self) -> bool {
        self.name == GROUND_NAME
    }

    /// Position of the body origin at time `t`.
    pub fn pos(&self, t: f64) -> [f64; DIMENSIONS] {
        [self.pos0[0] + self.vel[0] * t, self.pos0[1] + self.vel[1] * t]
    }

    /// Orientation (radians) at time `t`.
    pub fn orient(&self, t: f64) -> f64 {
        self.theta0 + self.omega * t
    }

    /// Translational velocity at time `t`.
    pub fn vel(&self, _t: f64) -> [f64; DIMENSIONS] {
        self.vel
    }

    /// Angular velocity at time `t`.
    pub fn rotvel(&self, _t: f64) -> f64 {
        self.omega
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_is_ground() {
        let g = Body::ground();
        assert!(g.is_ground());
        assert_eq!(g.pos(10.0), [0.0, 0.0]);
        assert_eq!(g.rotvel(10.0), 0.0);
    }

    #[test]
    fn test_prescribed_motion() {
        let b = Body::new("rotor")
            .with_pose([1.0, 2.0], 0.5)
            .with_velocity([0.1, -0.2])
            .with_rotation(2.0);

        let p = b.pos(10.0);
        assert!((p[0] - 2.0).abs() < 1e-14);
        assert!((p[1] - 0.0).abs() < 1e-14);
        assert!((b.orient(10.0) - 20.5).abs() < 1e-14);
        assert_eq!(b.vel(3.0), [0.1, -0.2]);
        assert_eq!(b.rotvel(3.0), 2.0);
    }
}
