//! Eulerian exchange mesh for the hybrid solver.
//!
//! An `HOVolumes` collection describes the quadrilateral mesh handed to the
//! external high-order solver: node coordinates, cell connectivity, and the
//! wall/open partitions of the boundary nodes. After initialization it also
//! holds the sample coordinates the solver reports back (interior solution
//! points and open-boundary points) and a per-cell mask area used to damp
//! the vorticity correction next to walls.

use std::fmt;
use std::sync::Arc;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::types::{ElemType, MoveType, DIMENSIONS};

use super::base::ElementBase;
use super::points::Points;

/// Nodes per quadrilateral cell.
const NODES_PER_CELL: usize = 4;

/// Mesh description plus solver-reported sample points.
#[derive(Clone, Debug)]
pub struct HOVolumes {
    pub(crate) base: ElementBase,

    /// Cell connectivity, four node indices per cell.
    pub elem_idx: Vec<usize>,
    /// Boundary node indices lying on solid walls.
    pub wall_idx: Vec<usize>,
    /// Boundary node indices lying on the open (outer) boundary.
    pub open_idx: Vec<usize>,

    /// Interior solution-point coordinates, reported by the solver.
    soln_pts: Option<Points>,
    /// Open-boundary sample coordinates, reported by the solver.
    open_pts: Option<Points>,

    /// Per-cell area, damped to zero near walls. Valid after
    /// [`set_mask_area`](Self::set_mask_area).
    mask_area: Vec<f64>,
}

impl HOVolumes {
    /// Build the mesh description.
    ///
    /// `x` is packed `(x, y)` per node; `elem_idx` holds four node indices
    /// per cell; `wall_idx` and `open_idx` partition the boundary nodes.
    pub fn new(
        x: &[f64],
        elem_idx: &[usize],
        wall_idx: &[usize],
        open_idx: &[usize],
        body: Option<Arc<Body>>,
    ) -> Result<Self> {
        if x.len() % DIMENSIONS != 0 {
            return Err(Error::Shape {
                what: "volume node array",
                len: x.len(),
                stride: DIMENSIONS,
            });
        }
        if elem_idx.len() % NODES_PER_CELL != 0 {
            return Err(Error::Shape {
                what: "volume connectivity array",
                len: elem_idx.len(),
                stride: NODES_PER_CELL,
            });
        }
        let nnodes = x.len() / DIMENSIONS;
        for set in [elem_idx, wall_idx, open_idx] {
            for &i in set {
                if i >= nnodes {
                    return Err(Error::invariant(format!(
                        "volume node index {} exceeds node count {}",
                        i, nnodes
                    )));
                }
            }
        }

        let move_type = if body.is_some() {
            MoveType::BodyBound
        } else {
            MoveType::Fixed
        };
        let mut base = ElementBase::new(ElemType::Inert, move_type, body);
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

        Ok(Self {
            base,
            elem_idx: elem_idx.to_vec(),
            wall_idx: wall_idx.to_vec(),
            open_idx: open_idx.to_vec(),
            soln_pts: None,
            open_pts: None,
            mask_area: Vec::new(),
        })
    }

    pub fn get_n(&self) -> usize {
        self.base.get_n()
    }

    pub fn n_cells(&self) -> usize {
        self.elem_idx.len() / NODES_PER_CELL
    }

    pub fn base(&self) -> &ElementBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    /// Node coordinates packed `(x, y)` per node, the layout the external
    /// solver expects.
    pub fn get_node_pos(&self) -> Vec<f64> {
        let n = self.base.get_n();
        let mut out = Vec::with_capacity(DIMENSIONS * n);
        for i in 0..n {
            out.push(self.base.x[0][i]);
            out.push(self.base.x[1][i]);
        }
        out
    }

    /// Store the solver-reported interior solution points.
    pub fn set_soln_pts(&mut self, packed: &[f64]) -> Result<()> {
        self.soln_pts = Some(Points::new(packed, ElemType::Inert, MoveType::Fixed, None)?);
        Ok(())
    }

    /// Store the solver-reported open-boundary sample points.
    pub fn set_open_pts(&mut self, packed: &[f64]) -> Result<()> {
        self.open_pts = Some(Points::new(packed, ElemType::Inert, MoveType::Fixed, None)?);
        Ok(())
    }

    /// Inert points at the interior solution coordinates.
    pub fn get_vol_nodes(&self) -> Option<&Points> {
        self.soln_pts.as_ref()
    }

    /// Inert points at the open-boundary sample coordinates.
    pub fn get_bc_nodes(&self) -> Option<&Points> {
        self.open_pts.as_ref()
    }

    /// Move the mesh over `dt` (body-bound meshes re-transform; fixed
    /// meshes stay put). Solver sample points are solver-owned and are not
    /// touched here.
    pub fn move_t(&mut self, t: f64, dt: f64) {
        self.base.move_t(t, dt);
    }

    /// Area of cell `c` by the shoelace formula.
    pub fn cell_area(&self, c: usize) -> f64 {
        let k = NODES_PER_CELL * c;
        let mut sum = 0.0;
        for e in 0..NODES_PER_CELL {
            let i = self.elem_idx[k + e];
            let j = self.elem_idx[k + (e + 1) % NODES_PER_CELL];
            sum += self.base.x[0][i] * self.base.x[1][j] - self.base.x[0][j] * self.base.x[1][i];
        }
        0.5 * sum.abs()
    }

    /// Centroid of cell `c`.
    pub fn cell_center(&self, c: usize) -> [f64; DIMENSIONS] {
        let k = NODES_PER_CELL * c;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for e in 0..NODES_PER_CELL {
            let i = self.elem_idx[k + e];
            cx += self.base.x[0][i];
            cy += self.base.x[1][i];
        }
        [cx / NODES_PER_CELL as f64, cy / NODES_PER_CELL as f64]
    }

    /// Recompute the per-cell mask areas.
    ///
    /// Cells within one core radius of a wall node get zero weight, cells
    /// beyond two core radii get their full area, with a linear ramp in
    /// between. A mesh without wall nodes keeps full areas everywhere.
    pub fn set_mask_area(&mut self, vdelta: f64) {
        let n_cells = self.n_cells();
        self.mask_area.resize(n_cells, 0.0);
        for c in 0..n_cells {
            let area = self.cell_area(c);
            let factor = if self.wall_idx.is_empty() {
                1.0
            } else {
                let ctr = self.cell_center(c);
                let mut d2min = f64::INFINITY;
                for &w in &self.wall_idx {
                    let dx = ctr[0] - self.base.x[0][w];
                    let dy = ctr[1] - self.base.x[1][w];
                    d2min = d2min.min(dx * dx + dy * dy);
                }
                (d2min.sqrt() / vdelta - 1.0).clamp(0.0, 1.0)
            };
            self.mask_area[c] = factor * area;
        }
    }

    /// Mask areas from the last [`set_mask_area`](Self::set_mask_area).
    pub fn get_mask_area(&self) -> &[f64] {
        &self.mask_area
    }

    /// One particle per solution point carrying that cell's circulation
    /// deficit, packed `(x, y, s)`; pair with a radius of `vdelta` when
    /// inserting.
    pub fn get_equivalent_particles(&self, deficit: &[f64], _vdelta: f64) -> Result<Vec<f64>> {
        let soln = self.soln_pts.as_ref().ok_or_else(|| {
            Error::invariant("solution points have not been set".to_string())
        })?;
        if deficit.len() != soln.get_n() {
            return Err(Error::Shape {
                what: "vorticity deficit array",
                len: deficit.len(),
                stride: soln.get_n(),
            });
        }
        let mut out = Vec::with_capacity(3 * deficit.len());
        for (i, &d) in deficit.iter().enumerate() {
            out.push(soln.base().x[0][i]);
            out.push(soln.base().x[1][i]);
            out.push(d);
        }
        Ok(out)
    }
}

impl fmt::Display for HOVolumes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cells over {} nodes ({} wall, {} open)",
            self.n_cells(),
            self.get_n(),
            self.wall_idx.len(),
            self.open_idx.len()
        )
    }
}

/// Uniform rectangular exchange mesh of `nx` by `ny` cells, with the west
/// edge marked as wall and the remaining boundary open. A convenient shape
/// for tests and simple hybrid runs.
pub fn uniform_rectangle(
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    nx: usize,
    ny: usize,
) -> (Vec<f64>, Vec<usize>, Vec<usize>, Vec<usize>) {
    assert!(nx > 0 && ny > 0, "need at least one cell in each direction");
    assert!(x1 > x0 && y1 > y0, "invalid mesh bounds");

    let dx = (x1 - x0) / nx as f64;
    let dy = (y1 - y0) / ny as f64;

    let mut x = Vec::with_capacity(2 * (nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            x.push(x0 + i as f64 * dx);
            x.push(y0 + j as f64 * dy);
        }
    }

    let node = |i: usize, j: usize| j * (nx + 1) + i;

    let mut elem_idx = Vec::with_capacity(4 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            elem_idx.push(node(i, j));
            elem_idx.push(node(i + 1, j));
            elem_idx.push(node(i + 1, j + 1));
            elem_idx.push(node(i, j + 1));
        }
    }

    let mut wall_idx = Vec::new();
    let mut open_idx = Vec::new();
    for j in 0..=ny {
        wall_idx.push(node(0, j));
    }
    for j in 0..=ny {
        open_idx.push(node(nx, j));
    }
    for i in 1..nx {
        open_idx.push(node(i, 0));
        open_idx.push(node(i, ny));
    }

    (x, elem_idx, wall_idx, open_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_rectangle_counts() {
        let (x, elem_idx, wall_idx, open_idx) = uniform_rectangle(0.0, 2.0, 0.0, 1.0, 4, 2);
        let vol = HOVolumes::new(&x, &elem_idx, &wall_idx, &open_idx, None).unwrap();
        assert_eq!(vol.get_n(), 15);
        assert_eq!(vol.n_cells(), 8);
        assert!((vol.cell_area(0) - 0.25).abs() < 1e-14);
    }

    #[test]
    fn test_mask_area_damps_near_wall() {
        let (x, elem_idx, wall_idx, open_idx) = uniform_rectangle(0.0, 4.0, 0.0, 1.0, 8, 2);
        let mut vol = HOVolumes::new(&x, &elem_idx, &wall_idx, &open_idx, None).unwrap();
        // Cell size is 0.5; with vdelta = 0.4 the first column's centers
        // sit inside one radius of the nearest wall node at x = 0.
        vol.set_mask_area(0.4);
        let mask = vol.get_mask_area();
        assert_eq!(mask.len(), 16);
        assert!(mask[0] < 1e-12, "wall-adjacent cell must be masked out");
        // Far cells keep their full area.
        assert!((mask[7] - vol.cell_area(7)).abs() < 1e-12);
    }

    #[test]
    fn test_equivalent_particles_length_check() {
        let (x, elem_idx, wall_idx, open_idx) = uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2);
        let mut vol = HOVolumes::new(&x, &elem_idx, &wall_idx, &open_idx, None).unwrap();
        vol.set_soln_pts(&[0.25, 0.25, 0.75, 0.25, 0.25, 0.75, 0.75, 0.75]).unwrap();

        assert!(vol.get_equivalent_particles(&[1.0; 3], 0.1).is_err());
        let parts = vol.get_equivalent_particles(&[0.1, 0.2, 0.3, 0.4], 0.1).unwrap();
        assert_eq!(parts.len(), 12);
        assert!((parts[2] - 0.1).abs() < 1e-15);
        assert!((parts[11] - 0.4).abs() < 1e-15);
    }
}
