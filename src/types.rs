//! Core data types for the meshfree elasticity pipeline.
//!
//! This module defines:
//! - Geometric primitives (2-D points and vectors)
//! - Material parameters (Lamé form)
//! - Differential-operator specifications consumed by the stencil builder

use crate::error::{Error, Result};
use nalgebra::Vector2;

/// A point in 2-D space.
pub type Point2 = Vector2<f64>;

/// A 2-D vector (displacement, normal, etc.).
pub type Vec2 = Vector2<f64>;

/// Lamé parameters of an isotropic linear-elastic material.
///
/// No positivity is enforced here: degenerate parameters produce a singular
/// system, which the solver reports as such.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LameParameters {
    /// Lamé's first parameter λ.
    pub lambda: f64,
    /// Shear modulus μ.
    pub mu: f64,
}

impl LameParameters {
    /// Create Lamé parameters directly.
    pub fn new(lambda: f64, mu: f64) -> Self {
        Self { lambda, mu }
    }

    /// Convert from Young's modulus E and Poisson's ratio ν.
    ///
    /// λ = Eν / ((1+ν)(1−2ν)), μ = E / (2(1+ν)).
    ///
    /// # Errors
    ///
    /// Returns an error if the properties are physically invalid.
    pub fn from_youngs(youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        if youngs_modulus <= 0.0 {
            return Err(Error::Config("Young's modulus must be positive".into()));
        }
        if poissons_ratio <= -1.0 || poissons_ratio >= 0.5 {
            return Err(Error::Config(
                "Poisson's ratio must be in range (-1, 0.5)".into(),
            ));
        }
        let e = youngs_modulus;
        let nu = poissons_ratio;
        Ok(Self {
            lambda: e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu)),
            mu: e / (2.0 * (1.0 + nu)),
        })
    }
}

/// Partial-derivative order pair (order in x, order in y).
pub type DiffOrder = (usize, usize);

/// A coefficient attached to one derivative term.
///
/// `PerPoint` values are aligned with the evaluation-point order passed to
/// the stencil builder (e.g. an outward-normal component per boundary node).
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    /// The same scalar at every evaluation point.
    Constant(f64),
    /// One value per evaluation point.
    PerPoint(Vec<f64>),
}

impl Coefficient {
    /// Coefficient value at evaluation point `i`.
    ///
    /// Lengths are validated by the stencil builder before this is called.
    pub(crate) fn at(&self, i: usize) -> f64 {
        match self {
            Coefficient::Constant(c) => *c,
            Coefficient::PerPoint(values) => values[i],
        }
    }
}

/// One term of a differential operator: a derivative order pair and its
/// coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffTerm {
    pub orders: DiffOrder,
    pub coefficient: Coefficient,
}

/// A linear combination of partial derivatives, e.g. (λ+2μ)·∂²/∂x² + μ·∂²/∂y².
///
/// Built with the chainable `term`/`term_per_point` methods:
///
/// ```
/// use mfree::types::DiffOp;
///
/// let laplacian = DiffOp::new().term((2, 0), 1.0).term((0, 2), 1.0);
/// assert_eq!(laplacian.terms().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffOp {
    terms: Vec<DiffTerm>,
}

impl DiffOp {
    /// An empty operator; add terms with [`DiffOp::term`].
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// A single derivative with unit coefficient.
    pub fn single(orders: DiffOrder) -> Self {
        Self::new().term(orders, 1.0)
    }

    /// Add a term with a scalar coefficient.
    pub fn term(mut self, orders: DiffOrder, coefficient: f64) -> Self {
        self.terms.push(DiffTerm {
            orders,
            coefficient: Coefficient::Constant(coefficient),
        });
        self
    }

    /// Add a term with one coefficient per evaluation point.
    pub fn term_per_point(mut self, orders: DiffOrder, coefficients: Vec<f64>) -> Self {
        self.terms.push(DiffTerm {
            orders,
            coefficient: Coefficient::PerPoint(coefficients),
        });
        self
    }

    /// The terms of this operator.
    pub fn terms(&self) -> &[DiffTerm] {
        &self.terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lame_from_youngs() {
        // E = 1, ν = 0.25: λ = μ = 0.4
        let lame = LameParameters::from_youngs(1.0, 0.25).unwrap();
        assert_relative_eq!(lame.lambda, 0.4, epsilon = 1e-12);
        assert_relative_eq!(lame.mu, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_lame_rejects_invalid_properties() {
        assert!(LameParameters::from_youngs(1.0, 0.5).is_err());
        assert!(LameParameters::from_youngs(1.0, -1.0).is_err());
        assert!(LameParameters::from_youngs(-1.0, 0.3).is_err());
    }

    #[test]
    fn test_diff_op_builder() {
        let op = DiffOp::new()
            .term((2, 0), 3.0)
            .term_per_point((0, 1), vec![1.0, 2.0]);
        assert_eq!(op.terms().len(), 2);
        assert_eq!(op.terms()[0].orders, (2, 0));
        assert_relative_eq!(op.terms()[0].coefficient.at(0), 3.0);
        assert_relative_eq!(op.terms()[1].coefficient.at(1), 2.0);
    }
}
