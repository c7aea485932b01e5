//! Linear system solvers.
//!
//! Direct solvers for the assembled system G u = d. The global operator
//! mixes PDE, Dirichlet, and traction rows, so it is neither symmetric nor
//! positive definite; both backends factorize with LU.
//!
//! # Solver Backends
//!
//! - [`FaerLuSolver`]: sparse LU via the faer library, the production
//!   choice.
//! - [`DenseLuSolver`]: nalgebra dense LU for small systems and tests.

use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::{SparseColMat, SymbolicSparseColMat};

/// Linear solver interface.
pub trait Solver {
    /// Solve G x = d, returning the solution vector.
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

fn check_shape(matrix: &CsrMatrix, rhs: &[f64]) -> Result<usize> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(Error::Solver(format!(
            "matrix must be square, got {}x{}",
            n,
            matrix.ncols()
        )));
    }
    if n != rhs.len() {
        return Err(Error::Solver(format!(
            "RHS has {} entries for a {}-row matrix",
            rhs.len(),
            n
        )));
    }
    Ok(n)
}

/// Dense LU solver backed by nalgebra.
///
/// Materializes the operator densely, so only suitable for small systems.
#[derive(Debug, Default)]
pub struct DenseLuSolver;

impl DenseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLuSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        let n = check_shape(matrix, rhs)?;
        if n == 0 {
            return Ok(vec![]);
        }

        DMatrix::from(matrix)
            .lu()
            .solve(&DVector::from_column_slice(rhs))
            .map(|u| u.as_slice().to_vec())
            .ok_or_else(|| Error::SingularMatrix("dense LU factorization failed".into()))
    }

    fn name(&self) -> &str {
        "nalgebra dense LU"
    }
}

/// Reindex a nalgebra-sparse CSR matrix into a faer CSC matrix.
fn to_faer_csc(matrix: &CsrMatrix) -> SparseColMat<usize, f64> {
    let (nrows, ncols) = (matrix.nrows(), matrix.ncols());

    // Gather the entries column-major. CSR iteration is row-major with
    // sorted columns, so an entry keyed (col, row) sorts into CSC order.
    let mut cells: Vec<(usize, usize, f64)> = matrix
        .triplet_iter()
        .map(|(row, col, &value)| (col, row, value))
        .collect();
    cells.sort_unstable_by_key(|&(col, row, _)| (col, row));

    let mut col_ptr = vec![0usize; ncols + 1];
    for &(col, _, _) in &cells {
        col_ptr[col + 1] += 1;
    }
    for col in 0..ncols {
        col_ptr[col + 1] += col_ptr[col];
    }
    let row_idx: Vec<usize> = cells.iter().map(|&(_, row, _)| row).collect();
    let values: Vec<f64> = cells.iter().map(|&(_, _, value)| value).collect();

    // SAFETY: col_ptr is a cumulative count over in-range sorted entries,
    // and row indices are strictly increasing within each column.
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_ptr, None, row_idx),
            values,
        )
    }
}

/// Sparse LU solver backed by faer.
///
/// # Example
///
/// ```ignore
/// let solver = FaerLuSolver::new();
/// let displacements = solver.solve(&system.matrix, &system.rhs)?;
/// ```
#[derive(Debug, Default)]
pub struct FaerLuSolver;

impl FaerLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerLuSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        let n = check_shape(matrix, rhs)?;
        if n == 0 {
            return Ok(vec![]);
        }

        let csc = to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        // Symbolic analysis, then numeric factorization. A factorization
        // failure on a validated square system means the operator is
        // structurally or numerically singular.
        let symbolic = SymbolicLu::try_new(csc_ref.symbolic())
            .map_err(|e| Error::Solver(format!("symbolic LU analysis failed: {:?}", e)))?;
        let lu = Lu::try_new_with_symbolic(symbolic, csc_ref).map_err(|e| {
            Error::SingularMatrix(format!("sparse LU factorization failed: {:?}", e))
        })?;

        let mut sol = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
        lu.solve_in_place(sol.as_mut());
        Ok((0..n).map(|i| sol[(i, 0)]).collect())
    }

    fn name(&self) -> &str {
        "faer sparse LU"
    }
}
