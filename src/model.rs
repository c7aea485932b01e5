//! One-shot solve pipeline.
//!
//! Runs the strict sequential stages: node placement, group validation,
//! operator assembly, linear solve, strain recovery. Each stage's output is
//! a hard dependency of the next; nothing is retried or persisted across
//! solves.

use crate::assembly::{assemble, AssemblyWarning};
use crate::error::Result;
use crate::geometry::{place_nodes, BoundaryGroup, Polygon};
use crate::groups::NodeGroups;
use crate::solver::Solver;
use crate::strain::{self, StrainField};
use crate::types::{LameParameters, Point2};

/// A complete problem description. All configuration is supplied in memory
/// at invocation time.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Domain polygon (CCW).
    pub domain: Polygon,
    /// Boundary segments with fixed (zero-displacement) conditions.
    pub fixed_segments: Vec<usize>,
    /// Boundary segments with free-surface (zero-traction) conditions.
    pub free_segments: Vec<usize>,
    /// Requested node budget before ghosts are added.
    pub node_count: usize,
    /// Neighbors per RBF-FD stencil.
    pub stencil_size: usize,
    /// Material parameters.
    pub lame: LameParameters,
    /// Uniform body-force magnitude applied to the y-equations.
    pub body_force: f64,
}

/// Solved displacement and strain fields over the full node set.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Node coordinates, ghosts included.
    pub points: Vec<Point2>,
    /// x-displacement per node.
    pub u_x: Vec<f64>,
    /// y-displacement per node.
    pub u_y: Vec<f64>,
    /// Strain components and second invariant per node.
    pub strain: StrainField,
    /// The group partition used for the solve.
    pub groups: NodeGroups,
    /// Solvability warnings surfaced during assembly; a non-empty list
    /// means the fields may be meaningless.
    pub warnings: Vec<AssemblyWarning>,
}

/// Ghost-free arrays aligned by the `interior + boundary` index order, the
/// form a renderer consumes.
#[derive(Debug, Clone)]
pub struct PresentationView {
    pub points: Vec<Point2>,
    pub u_x: Vec<f64>,
    pub u_y: Vec<f64>,
    pub second_invariant: Vec<f64>,
}

impl Solution {
    /// Total node count, ghosts included.
    pub fn n_nodes(&self) -> usize {
        self.points.len()
    }

    /// Filter the solution down to the real nodes for rendering.
    pub fn presentation(&self) -> PresentationView {
        let order = self.groups.interior_boundary();
        PresentationView {
            points: order.iter().map(|&i| self.points[i]).collect(),
            u_x: order.iter().map(|&i| self.u_x[i]).collect(),
            u_y: order.iter().map(|&i| self.u_y[i]).collect(),
            second_invariant: order
                .iter()
                .map(|&i| self.strain.second_invariant[i])
                .collect(),
        }
    }
}

impl Problem {
    /// Run the full pipeline with the given linear solver.
    ///
    /// # Errors
    ///
    /// Propagates configuration, dimension, stencil, and solver errors from
    /// the individual stages; `SingularMatrix` if the assembled operator
    /// cannot be factorized.
    pub fn solve(&self, solver: &dyn Solver) -> Result<Solution> {
        let boundary = [
            BoundaryGroup::new("fixed", self.fixed_segments.clone()),
            BoundaryGroup::with_ghosts("free", self.free_segments.clone()),
        ];
        let set = place_nodes(&self.domain, &boundary, self.node_count)?;
        // Ghosts were appended, so the working node count comes from the
        // returned set, never from the requested budget.
        let n = set.n_nodes();
        log::info!("placed {} nodes for a budget of {}", n, self.node_count);

        let groups = NodeGroups::new(
            n,
            set.group("interior")?.to_vec(),
            set.group("fixed")?.to_vec(),
            set.group("free")?.to_vec(),
            set.group("free_ghosts")?.to_vec(),
        )?;

        let system = assemble(
            &set.points,
            &groups,
            set.normals("free")?,
            self.lame,
            self.body_force,
            self.stencil_size,
        )?;
        let warnings = system.warnings;

        log::info!("solving {} dofs with {}", system.n_dofs, solver.name());
        let u = solver.solve(&system.matrix, &system.rhs)?;
        let (u_x, u_y) = u.split_at(n);

        let strain = strain::compute(&set.points, u_x, u_y, self.stencil_size)?;

        Ok(Solution {
            u_x: u_x.to_vec(),
            u_y: u_y.to_vec(),
            points: set.points,
            strain,
            groups,
            warnings,
        })
    }
}
