//! Sparse matrix plumbing.
//!
//! Weight matrices and the global operator are accumulated as COO entries
//! and compressed to CSR once complete. CSR is what the block composer,
//! the strain recovery, and the solver conversion all consume.

use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix over f64.
pub type CsrMatrix = NalgebraCsr<f64>;

/// COO accumulator for one sparse operator.
///
/// Entries pushed for the same position are summed during compression.
pub struct TripletBuilder {
    shape: (usize, usize),
    entries: Vec<(usize, usize, f64)>,
}

impl TripletBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            shape: (n_rows, n_cols),
            entries: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Record a value at (row, col). Near-zero values are dropped so the
    /// compressed pattern stays tight.
    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.shape.0 && col < self.shape.1);
        if value.abs() > f64::EPSILON {
            self.entries.push((row, col, value));
        }
    }

    /// Number of recorded entries, duplicates counted separately.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compress to CSR, summing duplicate positions.
    pub fn compress(self) -> CsrMatrix {
        let mut coo = CooMatrix::new(self.shape.0, self.shape.1);
        for (row, col, value) in self.entries {
            coo.push(row, col, value);
        }
        CsrMatrix::from(&coo)
    }
}

/// Sparse matrix-vector product `matrix * x`.
pub fn spmv(matrix: &CsrMatrix, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(matrix.ncols(), x.len());
    matrix
        .row_iter()
        .map(|row| {
            row.col_indices()
                .iter()
                .zip(row.values())
                .map(|(&j, v)| v * x[j])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_shape_and_pattern() {
        let mut builder = TripletBuilder::new(3, 4);
        builder.push(0, 0, 1.5);
        builder.push(2, 3, -2.0);
        builder.push(1, 2, 0.25);

        let csr = builder.compress();
        assert_eq!(csr.nrows(), 3);
        assert_eq!(csr.ncols(), 4);
        assert_eq!(csr.nnz(), 3);
    }

    #[test]
    fn test_push_drops_zeros() {
        let mut builder = TripletBuilder::new(2, 2);
        builder.push(0, 0, 1.0);
        builder.push(0, 1, 0.0);
        builder.push(1, 1, -2.0);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_duplicate_positions_are_summed() {
        let mut builder = TripletBuilder::new(2, 2);
        builder.push(1, 1, 1.0);
        builder.push(1, 1, 2.5);
        builder.push(1, 1, -0.5);

        let dense = nalgebra::DMatrix::from(&builder.compress());
        assert!((dense[(1, 1)] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_spmv() {
        // [1 2; 0 3] * [1; 2] = [5; 6]
        let mut builder = TripletBuilder::new(2, 2);
        builder.push(0, 0, 1.0);
        builder.push(0, 1, 2.0);
        builder.push(1, 1, 3.0);

        let result = spmv(&builder.compress(), &[1.0, 2.0]);
        assert!((result[0] - 5.0).abs() < 1e-12);
        assert!((result[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_spmv_skips_empty_rows() {
        let mut builder = TripletBuilder::new(3, 3);
        builder.push(0, 0, 2.0);
        builder.push(2, 1, 4.0);

        let result = spmv(&builder.compress(), &[1.0, 1.0, 1.0]);
        assert_eq!(result, vec![2.0, 0.0, 4.0]);
    }
}
