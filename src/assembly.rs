//! Global operator assembly.
//!
//! Builds the coupled 2N×2N sparse system that encodes, row by row:
//!
//! - the elasticity equilibrium PDE, evaluated at `interior + free` nodes
//!   and written into the `interior + free_ghosts` rows (ghost rows absorb
//!   the PDE equation belonging to their free node, which frees that node's
//!   own row for the traction condition);
//! - identity (Dirichlet) rows at the `fixed` boundary;
//! - zero-traction rows at the `free` boundary, weighted by the outward
//!   normals.
//!
//! Every row of every block carries a single condition kind. A second
//! assignment with a different kind is a configuration error; assignment
//! replaces a row wholesale, it never accumulates.

use crate::error::{Error, Result};
use crate::groups::NodeGroups;
use crate::sparse::{CsrMatrix, TripletBuilder};
use crate::stencil::weight_matrix;
use crate::types::{DiffOp, LameParameters, Point2, Vec2};
use thiserror::Error;

/// Condition kind carried by one operator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Equilibrium PDE row.
    Pde,
    /// Fixed-displacement identity row.
    Dirichlet,
    /// Zero-traction row.
    Traction,
}

/// Non-fatal conditions surfaced alongside the assembled system.
///
/// The solve may still proceed, but callers must treat its result as
/// potentially meaningless.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyWarning {
    /// Missing Dirichlet constraints leave the system under-determined.
    #[error("singular configuration: {0}")]
    SingularConfiguration(String),
}

/// One N×N displacement-coupling block, built row by row with condition
/// tags. Rows never written stay structurally zero.
struct OperatorBlock {
    n: usize,
    rows: Vec<Option<(RowKind, Vec<(usize, f64)>)>>,
}

impl OperatorBlock {
    fn new(n: usize) -> Self {
        Self {
            n,
            rows: vec![None; n],
        }
    }

    /// Scatter the rows of `weights` into the global rows named by
    /// `targets`, tagging each with `kind`.
    fn assign_rows(
        &mut self,
        kind: RowKind,
        weights: &CsrMatrix,
        targets: &[usize],
        label: &str,
    ) -> Result<()> {
        if weights.nrows() != targets.len() {
            return Err(Error::DimensionMismatch(format!(
                "operator for '{}' produced {} rows for {} target rows",
                label,
                weights.nrows(),
                targets.len()
            )));
        }
        if weights.ncols() != self.n {
            return Err(Error::DimensionMismatch(format!(
                "operator for '{}' has {} columns for {} nodes",
                label,
                weights.ncols(),
                self.n
            )));
        }

        let offsets = weights.row_offsets();
        let cols = weights.col_indices();
        let values = weights.values();

        for (local, &target) in targets.iter().enumerate() {
            let entries: Vec<(usize, f64)> = (offsets[local]..offsets[local + 1])
                .map(|k| (cols[k], values[k]))
                .collect();
            self.assign_row(kind, target, entries, label)?;
        }
        Ok(())
    }

    /// Tag each target row with `kind` and give it a single unit diagonal
    /// entry.
    fn assign_identity(&mut self, kind: RowKind, targets: &[usize], label: &str) -> Result<()> {
        for &target in targets {
            self.assign_row(kind, target, vec![(target, 1.0)], label)?;
        }
        Ok(())
    }

    fn assign_row(
        &mut self,
        kind: RowKind,
        target: usize,
        entries: Vec<(usize, f64)>,
        label: &str,
    ) -> Result<()> {
        if let Some((existing, _)) = &self.rows[target] {
            if *existing != kind {
                return Err(Error::Config(format!(
                    "row {} for '{}' is already assigned as {:?}, cannot reassign as {:?}",
                    target, label, existing, kind
                )));
            }
        }
        self.rows[target] = Some((kind, entries));
        Ok(())
    }
}

/// The four displacement-coupling blocks (xx, xy, yx, yy) as one 2×2
/// matrix of matrices.
struct BlockSystem {
    n: usize,
    blocks: [[OperatorBlock; 2]; 2],
}

impl BlockSystem {
    fn new(n: usize) -> Self {
        Self {
            n,
            blocks: [
                [OperatorBlock::new(n), OperatorBlock::new(n)],
                [OperatorBlock::new(n), OperatorBlock::new(n)],
            ],
        }
    }

    fn block_mut(&mut self, comp_row: usize, comp_col: usize) -> &mut OperatorBlock {
        &mut self.blocks[comp_row][comp_col]
    }

    /// Stack the blocks into the global 2N×2N matrix.
    fn compose(self, nnz_estimate: usize) -> CsrMatrix {
        let n = self.n;
        let mut builder = TripletBuilder::with_capacity(2 * n, 2 * n, nnz_estimate);
        for (comp_row, block_row) in self.blocks.into_iter().enumerate() {
            for (comp_col, block) in block_row.into_iter().enumerate() {
                for (row, assigned) in block.rows.into_iter().enumerate() {
                    if let Some((_, entries)) = assigned {
                        for (col, value) in entries {
                            builder.push(comp_row * n + row, comp_col * n + col, value);
                        }
                    }
                }
            }
        }
        builder.compress()
    }
}

/// Assembled global system, handed off to a solver.
#[derive(Debug)]
pub struct AssembledSystem {
    /// Global 2N×2N operator; rows 0..N are x-equations, N..2N y-equations.
    pub matrix: CsrMatrix,
    /// Right-hand side of length 2N.
    pub rhs: Vec<f64>,
    /// Total degrees of freedom (2N).
    pub n_dofs: usize,
    /// Non-fatal solvability warnings.
    pub warnings: Vec<AssemblyWarning>,
}

/// Assemble the global elasticity operator and right-hand side.
///
/// Assignment order is deterministic: PDE rows first, Dirichlet second,
/// traction third. With a valid group partition the three target sets are
/// disjoint, and any overlap is rejected rather than silently overwritten.
///
/// # Arguments
///
/// * `nodes` - Full node set, ghosts included
/// * `groups` - Validated node-group partition
/// * `free_normals` - Outward unit normals aligned with `groups.free()`
/// * `lame` - Material parameters
/// * `body_force` - Uniform body-force magnitude applied to the y-equations
/// * `stencil_size` - Neighbors per RBF-FD stencil
///
/// # Errors
///
/// - `DimensionMismatch` if node, group, or normal counts disagree;
/// - `Config` if two condition kinds claim the same row;
/// - `Stencil` if weight computation fails.
pub fn assemble(
    nodes: &[Point2],
    groups: &NodeGroups,
    free_normals: &[Vec2],
    lame: LameParameters,
    body_force: f64,
    stencil_size: usize,
) -> Result<AssembledSystem> {
    if groups.n_nodes() != nodes.len() {
        return Err(Error::DimensionMismatch(format!(
            "groups cover {} nodes but {} were supplied",
            groups.n_nodes(),
            nodes.len()
        )));
    }
    if free_normals.len() != groups.free().len() {
        return Err(Error::DimensionMismatch(format!(
            "{} normals supplied for {} free-boundary nodes",
            free_normals.len(),
            groups.free().len()
        )));
    }

    let n = nodes.len();
    let LameParameters { lambda, mu } = lame;
    let mut system = BlockSystem::new(n);

    let mut warnings = Vec::new();
    if groups.fixed().is_empty() {
        log::warn!("no fixed boundary nodes; the assembled system is under-determined");
        warnings.push(AssemblyWarning::SingularConfiguration(
            "group 'fixed' is empty, no Dirichlet constraints anchor the system".into(),
        ));
    }

    // Equilibrium PDE, evaluated at interior+free, written into the
    // aligned interior+ghosts rows.
    let pde_eval: Vec<Point2> = groups.interior_free().iter().map(|&i| nodes[i]).collect();
    let pde_rows = groups.interior_ghosts();
    let pde_ops: [(usize, usize, DiffOp); 4] = [
        // x-force from x-displacement
        (0, 0, DiffOp::new().term((2, 0), lambda + 2.0 * mu).term((0, 2), mu)),
        // x-force from y-displacement
        (0, 1, DiffOp::new().term((1, 1), lambda).term((1, 1), mu)),
        // y-force from x-displacement
        (1, 0, DiffOp::new().term((1, 1), mu).term((1, 1), lambda)),
        // y-force from y-displacement
        (1, 1, DiffOp::new().term((0, 2), lambda + 2.0 * mu).term((2, 0), mu)),
    ];
    for (comp_row, comp_col, op) in pde_ops {
        let weights = weight_matrix(&pde_eval, nodes, &op, stencil_size)?;
        system
            .block_mut(comp_row, comp_col)
            .assign_rows(RowKind::Pde, &weights, &pde_rows, "interior+ghosts")?;
    }
    log::debug!("assigned {} PDE rows per block", pde_rows.len());

    // Fixed boundary: u_x = u_y = 0. The weight matrices for a (0, 0)
    // operator evaluated at the nodes themselves reduce to identity rows,
    // so they are constructed directly and stay exact.
    system
        .block_mut(0, 0)
        .assign_identity(RowKind::Dirichlet, groups.fixed(), "fixed")?;
    system
        .block_mut(1, 1)
        .assign_identity(RowKind::Dirichlet, groups.fixed(), "fixed")?;

    // Free surface: stress projected on the outward normal vanishes.
    let free_eval: Vec<Point2> = groups.free().iter().map(|&i| nodes[i]).collect();
    let nx: Vec<f64> = free_normals.iter().map(|v| v.x).collect();
    let ny: Vec<f64> = free_normals.iter().map(|v| v.y).collect();
    let scaled = |values: &[f64], c: f64| values.iter().map(|v| v * c).collect::<Vec<f64>>();
    let traction_ops: [(usize, usize, DiffOp); 4] = [
        // x-traction from x-displacement
        (
            0,
            0,
            DiffOp::new()
                .term_per_point((1, 0), scaled(&nx, lambda + 2.0 * mu))
                .term_per_point((0, 1), scaled(&ny, mu)),
        ),
        // x-traction from y-displacement
        (
            0,
            1,
            DiffOp::new()
                .term_per_point((0, 1), scaled(&nx, lambda))
                .term_per_point((1, 0), scaled(&ny, mu)),
        ),
        // y-traction from x-displacement
        (
            1,
            0,
            DiffOp::new()
                .term_per_point((0, 1), scaled(&nx, mu))
                .term_per_point((1, 0), scaled(&ny, lambda)),
        ),
        // y-traction from y-displacement
        (
            1,
            1,
            DiffOp::new()
                .term_per_point((0, 1), scaled(&ny, lambda + 2.0 * mu))
                .term_per_point((1, 0), scaled(&nx, mu)),
        ),
    ];
    for (comp_row, comp_col, op) in traction_ops {
        let weights = weight_matrix(&free_eval, nodes, &op, stencil_size)?;
        system
            .block_mut(comp_row, comp_col)
            .assign_rows(RowKind::Traction, &weights, groups.free(), "free")?;
    }

    // Uniform body force drives the y-equations of the PDE rows; all fixed
    // and free rows stay zero-forced on both components.
    let mut rhs = vec![0.0; 2 * n];
    for &row in &pde_rows {
        rhs[n + row] = body_force;
    }

    let nnz_estimate = 4 * stencil_size * (pde_rows.len() + groups.free().len());
    let matrix = system.compose(nnz_estimate);
    log::info!(
        "assembled {}x{} system with {} non-zeros",
        2 * n,
        2 * n,
        matrix.nnz()
    );

    Ok(AssembledSystem {
        matrix,
        rhs,
        n_dofs: 2 * n,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{place_nodes, BoundaryGroup, NodeSet, Polygon};
    use approx::assert_relative_eq;

    const STENCIL: usize = 10;

    fn demo_node_set() -> NodeSet {
        let rect = Polygon::rectangle(2.0, 1.0);
        let groups = vec![
            BoundaryGroup::new("fixed", vec![3]),
            BoundaryGroup::with_ghosts("free", vec![0, 1, 2]),
        ];
        place_nodes(&rect, &groups, 50).unwrap()
    }

    fn node_groups(set: &NodeSet) -> NodeGroups {
        NodeGroups::new(
            set.n_nodes(),
            set.group("interior").unwrap().to_vec(),
            set.group("fixed").unwrap().to_vec(),
            set.group("free").unwrap().to_vec(),
            set.group("free_ghosts").unwrap().to_vec(),
        )
        .unwrap()
    }

    fn demo_assembly(body_force: f64) -> (NodeSet, NodeGroups, AssembledSystem) {
        let set = demo_node_set();
        let groups = node_groups(&set);
        let normals = set.normals("free").unwrap().to_vec();
        let system = assemble(
            &set.points,
            &groups,
            &normals,
            LameParameters::new(1.0, 1.0),
            body_force,
            STENCIL,
        )
        .unwrap();
        (set, groups, system)
    }

    #[test]
    fn test_dirichlet_rows_are_exact_identity() {
        let (_, groups, system) = demo_assembly(1.0);
        let n = groups.n_nodes();
        let dense = nalgebra::DMatrix::from(&system.matrix);

        for &f in groups.fixed() {
            for comp in 0..2 {
                let row = comp * n + f;
                for col in 0..2 * n {
                    let expected = if col == comp * n + f { 1.0 } else { 0.0 };
                    assert_relative_eq!(dense[(row, col)], expected);
                }
                assert_relative_eq!(system.rhs[row], 0.0);
            }
        }
    }

    #[test]
    fn test_rhs_sum_matches_body_force_times_pde_rows() {
        let body_force = 2.5;
        let (_, groups, system) = demo_assembly(body_force);
        let n = groups.n_nodes();

        let y_sum: f64 = system.rhs[n..].iter().sum();
        let expected = body_force * groups.interior_ghosts().len() as f64;
        assert_relative_eq!(y_sum, expected, epsilon = 1e-12);

        // x-component rows are zero everywhere.
        assert!(system.rhs[..n].iter().all(|&v| v == 0.0));
        // Fixed and free rows are zero-forced on both components.
        for &i in groups.fixed().iter().chain(groups.free()) {
            assert_relative_eq!(system.rhs[i], 0.0);
            assert_relative_eq!(system.rhs[n + i], 0.0);
        }
    }

    #[test]
    fn test_empty_fixed_group_warns_but_assembles() {
        let set = demo_node_set();
        // Reclassify the fixed nodes as interior so 'fixed' is empty.
        let mut interior = set.group("interior").unwrap().to_vec();
        interior.extend_from_slice(set.group("fixed").unwrap());
        let groups = NodeGroups::new(
            set.n_nodes(),
            interior,
            vec![],
            set.group("free").unwrap().to_vec(),
            set.group("free_ghosts").unwrap().to_vec(),
        )
        .unwrap();
        let normals = set.normals("free").unwrap().to_vec();

        let system = assemble(
            &set.points,
            &groups,
            &normals,
            LameParameters::new(1.0, 1.0),
            1.0,
            STENCIL,
        )
        .unwrap();
        assert!(matches!(
            system.warnings[..],
            [AssemblyWarning::SingularConfiguration(_)]
        ));
    }

    #[test]
    fn test_normal_count_mismatch_is_rejected() {
        let set = demo_node_set();
        let groups = node_groups(&set);
        let mut normals = set.normals("free").unwrap().to_vec();
        normals.pop();

        let err = assemble(
            &set.points,
            &groups,
            &normals,
            LameParameters::new(1.0, 1.0),
            1.0,
            STENCIL,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn test_perturbing_normals_only_changes_free_rows() {
        let set = demo_node_set();
        let groups = node_groups(&set);
        let normals = set.normals("free").unwrap().to_vec();
        let flipped: Vec<Vec2> = normals.iter().map(|v| -v).collect();
        let lame = LameParameters::new(1.0, 1.0);

        let a = assemble(&set.points, &groups, &normals, lame, 1.0, STENCIL).unwrap();
        let b = assemble(&set.points, &groups, &flipped, lame, 1.0, STENCIL).unwrap();

        let n = groups.n_nodes();
        let dense_a = nalgebra::DMatrix::from(&a.matrix);
        let dense_b = nalgebra::DMatrix::from(&b.matrix);
        let free = groups.free();

        for row in 0..n {
            if free.contains(&row) {
                continue;
            }
            for comp in 0..2 {
                for col in 0..2 * n {
                    assert_relative_eq!(
                        dense_a[(comp * n + row, col)],
                        dense_b[(comp * n + row, col)]
                    );
                }
            }
        }
    }

    #[test]
    fn test_row_conflict_between_kinds_is_rejected() {
        let mut block = OperatorBlock::new(4);
        block
            .assign_row(RowKind::Pde, 2, vec![(0, 1.0)], "pde")
            .unwrap();
        let err = block
            .assign_row(RowKind::Dirichlet, 2, vec![(2, 1.0)], "fixed")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_same_kind_reassignment_replaces_not_accumulates() {
        let mut block = OperatorBlock::new(3);
        block
            .assign_row(RowKind::Pde, 1, vec![(0, 2.0), (1, 2.0)], "pde")
            .unwrap();
        block
            .assign_row(RowKind::Pde, 1, vec![(0, 5.0)], "pde")
            .unwrap();

        let (_, entries) = block.rows[1].clone().unwrap();
        assert_eq!(entries, vec![(0, 5.0)]);
    }

    #[test]
    fn test_unwritten_rows_stay_structurally_zero() {
        let mut system = BlockSystem::new(3);
        system
            .block_mut(0, 0)
            .assign_row(RowKind::Dirichlet, 0, vec![(0, 1.0)], "fixed")
            .unwrap();
        let matrix = system.compose(4);
        assert_eq!(matrix.nnz(), 1);
        assert_eq!(matrix.nrows(), 6);
    }
}
