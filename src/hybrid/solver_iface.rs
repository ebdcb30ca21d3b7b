//! Interface to the external high-order Eulerian solver.
//!
//! The solver is an opaque service: geometry and boundary data go in as
//! flat packed arrays, sample coordinates and vorticity come back the same
//! way. 2-vectors pack as `(x, y, x, y, ...)`, scalars as `(v, v, ...)`.
//! Array lengths must agree with the counts implied by `get_soln_pts` /
//! `get_open_pts`.
//!
//! [`DummySolver`] is a stand-in peer for tests and dry runs: it echoes
//! back a configurable vorticity field on the cell centroids it is given.

use crate::error::Result;

/// The call surface of the external high-order solver.
pub trait HighOrderSolver {
    /// Set the spatial element order, 1 to 5.
    fn set_element_order(&mut self, k: u32);

    /// Hand over the mesh: packed nodes, cell connectivity, wall node
    /// indices, open-boundary node indices.
    fn init(
        &mut self,
        nodes: &[f64],
        elem_idx: &[usize],
        wall_idx: &[usize],
        open_idx: &[usize],
    ) -> Result<()>;

    /// Interior solution-point coordinates, packed.
    fn get_soln_pts(&self) -> Vec<f64>;

    /// Open-boundary sample coordinates, packed.
    fn get_open_pts(&self) -> Vec<f64>;

    /// Provide velocities at the open-boundary points, packed.
    fn set_open_vels(&mut self, packed: &[f64]) -> Result<()>;

    /// Provide vorticity at the solution points.
    fn set_soln_vort(&mut self, vort: &[f64]) -> Result<()>;

    /// Integrate the Eulerian field forward to `time`.
    fn solve_to(&mut self, time: f64, num_substeps: u32, time_order: u32, re: f64) -> Result<()>;

    /// Vorticity at every solution point after the last solve.
    fn get_all_vorts(&self) -> Vec<f64>;
}

/// A test double standing in for the real Eulerian peer.
///
/// Solution points are the centroids of the cells it is initialized with;
/// open points are the open-boundary nodes. `get_all_vorts` returns the
/// last vorticity it was given plus a constant offset, which makes
/// correction-loop behavior easy to script.
#[derive(Clone, Debug, Default)]
pub struct DummySolver {
    element_order: u32,
    soln_pts: Vec<f64>,
    open_pts: Vec<f64>,
    open_vels: Vec<f64>,
    soln_vort: Vec<f64>,
    /// Constant added to the stored vorticity by `get_all_vorts`.
    pub vort_offset: f64,
    solved_to: f64,
}

impl DummySolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest open-boundary velocities received.
    pub fn open_vels(&self) -> &[f64] {
        &self.open_vels
    }

    pub fn element_order(&self) -> u32 {
        self.element_order
    }

    pub fn solved_to(&self) -> f64 {
        self.solved_to
    }
}

impl HighOrderSolver for DummySolver {
    fn set_element_order(&mut self, k: u32) {
        self.element_order = k;
    }

    fn init(
        &mut self,
        nodes: &[f64],
        elem_idx: &[usize],
        _wall_idx: &[usize],
        open_idx: &[usize],
    ) -> Result<()> {
        // One solution point per cell, at the centroid.
        self.soln_pts.clear();
        for cell in elem_idx.chunks(4) {
            let mut cx = 0.0;
            let mut cy = 0.0;
            for &i in cell {
                cx += nodes[2 * i];
                cy += nodes[2 * i + 1];
            }
            self.soln_pts.push(cx / 4.0);
            self.soln_pts.push(cy / 4.0);
        }
        self.open_pts.clear();
        for &i in open_idx {
            self.open_pts.push(nodes[2 * i]);
            self.open_pts.push(nodes[2 * i + 1]);
        }
        self.soln_vort = vec![0.0; self.soln_pts.len() / 2];
        Ok(())
    }

    fn get_soln_pts(&self) -> Vec<f64> {
        self.soln_pts.clone()
    }

    fn get_open_pts(&self) -> Vec<f64> {
        self.open_pts.clone()
    }

    fn set_open_vels(&mut self, packed: &[f64]) -> Result<()> {
        self.open_vels = packed.to_vec();
        Ok(())
    }

    fn set_soln_vort(&mut self, vort: &[f64]) -> Result<()> {
        self.soln_vort = vort.to_vec();
        Ok(())
    }

    fn solve_to(&mut self, time: f64, _num_substeps: u32, _time_order: u32, _re: f64) -> Result<()> {
        self.solved_to = time;
        Ok(())
    }

    fn get_all_vorts(&self) -> Vec<f64> {
        self.soln_vort.iter().map(|v| v + self.vort_offset).collect()
    }
}
