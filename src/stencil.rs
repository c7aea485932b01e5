//! RBF-FD stencil weight computation.
//!
//! For each evaluation point, finds the nearest `stencil_size` nodes and
//! computes the weights that approximate a requested differential operator
//! as a linear combination of field values at those nodes. The weights come
//! from a cubic polyharmonic spline (PHS3) interpolant augmented with the
//! full set of quadratic monomials, which makes the resulting operators
//! exact on polynomials of total degree <= 2.
//!
//! Local stencil coordinates are shifted to the evaluation point and scaled
//! by the stencil radius before the weight system is formed; the scaling is
//! undone through the per-term derivative orders on the right-hand side.

use crate::error::{Error, Result};
use crate::sparse::{CsrMatrix, TripletBuilder};
use crate::types::{Coefficient, DiffOp, DiffOrder, Point2, Vec2};
use nalgebra::{DMatrix, DVector};

/// Monomial exponents of the polynomial augmentation (total degree <= 2).
const POLY: [DiffOrder; 6] = [(0, 0), (1, 0), (0, 1), (2, 0), (1, 1), (0, 2)];

/// Highest supported total derivative order.
const MAX_ORDER: usize = 2;

/// Build the sparse operator mapping the full node field to the requested
/// derivative combination at each evaluation point.
///
/// # Arguments
///
/// * `eval_points` - Points where the operator is evaluated (rows)
/// * `nodes` - Full node set (columns)
/// * `op` - Differential operator specification
/// * `stencil_size` - Neighbors used per evaluation point
///
/// # Returns
///
/// A CSR matrix of shape (eval_points.len(), nodes.len()).
///
/// # Errors
///
/// - `Stencil` if `stencil_size` does not fit the node set or the polynomial
///   augmentation, if a derivative order is unsupported, or if a local
///   weight system is singular (e.g. coincident nodes);
/// - `DimensionMismatch` if a per-point coefficient array does not match the
///   evaluation-point count.
pub fn weight_matrix(
    eval_points: &[Point2],
    nodes: &[Point2],
    op: &DiffOp,
    stencil_size: usize,
) -> Result<CsrMatrix> {
    if stencil_size <= POLY.len() {
        return Err(Error::Stencil(format!(
            "stencil size {} must exceed the {} polynomial augmentation terms",
            stencil_size,
            POLY.len()
        )));
    }
    if stencil_size > nodes.len() {
        return Err(Error::Stencil(format!(
            "stencil size {} exceeds the {} available nodes",
            stencil_size,
            nodes.len()
        )));
    }
    for term in op.terms() {
        let (dx, dy) = term.orders;
        if dx + dy > MAX_ORDER {
            return Err(Error::Stencil(format!(
                "derivative order ({}, {}) exceeds the supported total order {}",
                dx, dy, MAX_ORDER
            )));
        }
        if let Coefficient::PerPoint(values) = &term.coefficient {
            if values.len() != eval_points.len() {
                return Err(Error::DimensionMismatch(format!(
                    "per-point coefficient has {} values for {} evaluation points",
                    values.len(),
                    eval_points.len()
                )));
            }
        }
    }

    let n = stencil_size;
    let m = n + POLY.len();
    let mut builder =
        TripletBuilder::with_capacity(eval_points.len(), nodes.len(), eval_points.len() * n);

    for (k, eval) in eval_points.iter().enumerate() {
        let neighbors = nearest_neighbors(eval, nodes, n);

        // Shift to the evaluation point and scale by the stencil radius so
        // the local system stays well conditioned.
        let scale = neighbors
            .iter()
            .map(|&j| (nodes[j] - eval).norm())
            .fold(0.0, f64::max);
        if scale <= 0.0 {
            return Err(Error::Stencil(format!(
                "stencil around evaluation point {} has zero radius",
                k
            )));
        }
        let local: Vec<Vec2> = neighbors.iter().map(|&j| (nodes[j] - eval) / scale).collect();

        // Saddle-point system: PHS3 collocation block bordered by the
        // monomial constraint rows.
        let mut a = DMatrix::zeros(m, m);
        for i in 0..n {
            for j in 0..n {
                a[(i, j)] = phs3((local[i] - local[j]).norm());
            }
            for (q, &orders) in POLY.iter().enumerate() {
                let p = monomial(local[i], orders);
                a[(i, n + q)] = p;
                a[(n + q, i)] = p;
            }
        }

        // Apply the operator to each basis function at the evaluation point
        // (the local origin). The radius scaling is undone per term through
        // its total derivative order.
        let mut rhs = DVector::zeros(m);
        for term in op.terms() {
            let (dx, dy) = term.orders;
            let factor = term.coefficient.at(k) * scale.powi(-((dx + dy) as i32));
            for (j, x) in local.iter().enumerate() {
                rhs[j] += factor * phs3_deriv(term.orders, -x);
            }
            for (q, &orders) in POLY.iter().enumerate() {
                rhs[n + q] += factor * monomial_deriv_at_origin(orders, term.orders);
            }
        }

        let weights = a.lu().solve(&rhs).ok_or_else(|| {
            Error::Stencil(format!(
                "singular weight system at evaluation point {} (coincident or \
                 degenerate stencil nodes)",
                k
            ))
        })?;

        for (j, &node) in neighbors.iter().enumerate() {
            builder.push(k, node, weights[j]);
        }
    }

    Ok(builder.compress())
}

/// Indices of the `n` nodes nearest to `target`.
fn nearest_neighbors(target: &Point2, nodes: &[Point2], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..nodes.len()).collect();
    indices.sort_unstable_by(|&a, &b| {
        let da = (nodes[a] - target).norm_squared();
        let db = (nodes[b] - target).norm_squared();
        da.total_cmp(&db)
    });
    indices.truncate(n);
    indices
}

/// Cubic polyharmonic spline kernel.
fn phs3(r: f64) -> f64 {
    r * r * r
}

/// Partial derivative of the PHS3 kernel centred at the origin, evaluated
/// at `p`. The second derivatives extend continuously to zero at r = 0.
fn phs3_deriv(orders: DiffOrder, p: Vec2) -> f64 {
    let (x, y) = (p.x, p.y);
    let r = (x * x + y * y).sqrt();
    match orders {
        (0, 0) => r * r * r,
        (1, 0) => 3.0 * x * r,
        (0, 1) => 3.0 * y * r,
        (2, 0) => {
            if r == 0.0 {
                0.0
            } else {
                3.0 * r + 3.0 * x * x / r
            }
        }
        (0, 2) => {
            if r == 0.0 {
                0.0
            } else {
                3.0 * r + 3.0 * y * y / r
            }
        }
        (1, 1) => {
            if r == 0.0 {
                0.0
            } else {
                3.0 * x * y / r
            }
        }
        // Orders are validated against MAX_ORDER before any evaluation.
        _ => unreachable!("unsupported derivative order"),
    }
}

/// Monomial x^i y^j at `p`.
fn monomial(p: Vec2, (i, j): DiffOrder) -> f64 {
    p.x.powi(i as i32) * p.y.powi(j as i32)
}

/// Derivative of order `d` of monomial `m`, evaluated at the origin.
///
/// Nonzero only when the orders match exactly, where it equals dx!·dy!.
fn monomial_deriv_at_origin(m: DiffOrder, d: DiffOrder) -> f64 {
    if m == d {
        (factorial(d.0) * factorial(d.1)) as f64
    } else {
        0.0
    }
}

fn factorial(n: usize) -> usize {
    (1..=n).product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::spmv;
    use approx::assert_relative_eq;

    /// Scattered but deterministic layout: a 7x5 grid on [0,2]x[0,1] with a
    /// small index-based jitter.
    fn test_nodes() -> Vec<Point2> {
        let mut nodes = Vec::new();
        for i in 0..7 {
            for j in 0..5 {
                let jitter = 0.013 * ((i * 5 + j) % 3) as f64;
                nodes.push(Point2::new(
                    i as f64 / 3.0 + jitter,
                    j as f64 / 4.0 - jitter,
                ));
            }
        }
        nodes
    }

    fn interior_eval_points(nodes: &[Point2]) -> Vec<Point2> {
        nodes
            .iter()
            .filter(|p| p.x > 0.4 && p.x < 1.6 && p.y > 0.2 && p.y < 0.8)
            .copied()
            .collect()
    }

    fn apply(op: DiffOp, field: impl Fn(&Point2) -> f64) -> (Vec<f64>, Vec<Point2>) {
        let nodes = test_nodes();
        let eval = interior_eval_points(&nodes);
        let matrix = weight_matrix(&eval, &nodes, &op, 12).unwrap();
        let values: Vec<f64> = nodes.iter().map(&field).collect();
        (spmv(&matrix, &values), eval)
    }

    #[test]
    fn test_interpolation_reproduces_field() {
        let (result, eval) = apply(DiffOp::single((0, 0)), |p| 1.0 + 2.0 * p.x - p.y);
        for (r, e) in result.iter().zip(&eval) {
            assert_relative_eq!(*r, 1.0 + 2.0 * e.x - e.y, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_first_derivative_of_linear_field() {
        let (result, _) = apply(DiffOp::single((1, 0)), |p| 2.0 * p.x + 3.0 * p.y);
        for r in result {
            assert_relative_eq!(r, 2.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_second_derivative_of_quadratic_field() {
        let (result, _) = apply(DiffOp::single((2, 0)), |p| p.x * p.x);
        for r in result {
            assert_relative_eq!(r, 2.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_mixed_derivative() {
        let (result, _) = apply(DiffOp::single((1, 1)), |p| p.x * p.y);
        for r in result {
            assert_relative_eq!(r, 1.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_laplacian_combination() {
        let op = DiffOp::new().term((2, 0), 1.0).term((0, 2), 1.0);
        let (result, _) = apply(op, |p| p.x * p.x + p.y * p.y);
        for r in result {
            assert_relative_eq!(r, 4.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_per_point_coefficients_scale_rows() {
        let nodes = test_nodes();
        let eval = interior_eval_points(&nodes);
        let coeffs: Vec<f64> = (0..eval.len()).map(|i| 1.0 + i as f64).collect();

        let op = DiffOp::new().term_per_point((1, 0), coeffs.clone());
        let matrix = weight_matrix(&eval, &nodes, &op, 12).unwrap();
        let values: Vec<f64> = nodes.iter().map(|p| p.x).collect();
        let result = spmv(&matrix, &values);

        for (r, c) in result.iter().zip(&coeffs) {
            assert_relative_eq!(*r, *c, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_matrix_shape() {
        let nodes = test_nodes();
        let eval = interior_eval_points(&nodes);
        let matrix = weight_matrix(&eval, &nodes, &DiffOp::single((0, 1)), 10).unwrap();
        assert_eq!(matrix.nrows(), eval.len());
        assert_eq!(matrix.ncols(), nodes.len());
    }

    #[test]
    fn test_rejects_small_stencil() {
        let nodes = test_nodes();
        let err = weight_matrix(&nodes, &nodes, &DiffOp::single((1, 0)), 6).unwrap_err();
        assert!(matches!(err, Error::Stencil(_)));
    }

    #[test]
    fn test_rejects_stencil_larger_than_node_set() {
        let nodes = test_nodes();
        let count = nodes.len();
        let err = weight_matrix(&nodes, &nodes, &DiffOp::single((1, 0)), count + 1).unwrap_err();
        assert!(matches!(err, Error::Stencil(_)));
    }

    #[test]
    fn test_rejects_unsupported_order() {
        let nodes = test_nodes();
        let err = weight_matrix(&nodes, &nodes, &DiffOp::single((3, 0)), 10).unwrap_err();
        assert!(matches!(err, Error::Stencil(_)));
    }

    #[test]
    fn test_rejects_per_point_length_mismatch() {
        let nodes = test_nodes();
        let op = DiffOp::new().term_per_point((1, 0), vec![1.0; 3]);
        let err = weight_matrix(&nodes, &nodes, &op, 10).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }
}
