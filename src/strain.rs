//! Strain recovery from the displacement solution.
//!
//! Differentiates the solved displacement field with the same RBF-FD
//! stencils used for assembly, evaluated over the full node set.

use crate::error::Result;
use crate::sparse::spmv;
use crate::stencil::weight_matrix;
use crate::types::{DiffOp, Point2};

/// Strain components and the second strain invariant, one value per node.
#[derive(Debug, Clone)]
pub struct StrainField {
    /// Normal strain e_xx = ∂u_x/∂x.
    pub e_xx: Vec<f64>,
    /// Normal strain e_yy = ∂u_y/∂y.
    pub e_yy: Vec<f64>,
    /// Shear strain e_xy = ½(∂u_x/∂y + ∂u_y/∂x).
    pub e_xy: Vec<f64>,
    /// Second strain invariant sqrt(e_xx² + e_yy² + 2·e_xy²), non-negative.
    pub second_invariant: Vec<f64>,
}

/// Compute the strain field from the displacement components.
///
/// Builds the global ∂/∂x and ∂/∂y operators once and applies them to both
/// components. Pure numeric transform; fails only if stencil construction
/// fails.
pub fn compute(
    nodes: &[Point2],
    u_x: &[f64],
    u_y: &[f64],
    stencil_size: usize,
) -> Result<StrainField> {
    let d_x = weight_matrix(nodes, nodes, &DiffOp::single((1, 0)), stencil_size)?;
    let d_y = weight_matrix(nodes, nodes, &DiffOp::single((0, 1)), stencil_size)?;

    let e_xx = spmv(&d_x, u_x);
    let e_yy = spmv(&d_y, u_y);

    let dux_dy = spmv(&d_y, u_x);
    let duy_dx = spmv(&d_x, u_y);
    let e_xy: Vec<f64> = dux_dy
        .iter()
        .zip(&duy_dx)
        .map(|(a, b)| 0.5 * (a + b))
        .collect();

    let second_invariant = e_xx
        .iter()
        .zip(&e_yy)
        .zip(&e_xy)
        .map(|((xx, yy), xy)| (xx * xx + yy * yy + 2.0 * xy * xy).sqrt())
        .collect();

    Ok(StrainField {
        e_xx,
        e_yy,
        e_xy,
        second_invariant,
    })
}
