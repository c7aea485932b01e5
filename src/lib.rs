//! mfree - Meshfree RBF-FD solver for 2-D static linear elasticity
//!
//! Computes the static deformation of a 2-D elastic body under a uniform
//! body force, with one fixed (Dirichlet) boundary and free-surface
//! (zero-traction) conditions on the remaining boundary, enforced through
//! ghost nodes placed just outside the free surface.
//!
//! # Architecture
//!
//! The solve is a one-shot sequential pipeline built from these pieces:
//!
//! - [`geometry`]: domain polygon, scattered node placement, ghost nodes,
//!   outward normals
//! - [`groups`]: validated node-index groups and their derived unions
//! - [`stencil`]: RBF-FD weight matrices for arbitrary first/second-order
//!   differential operators (PHS3 kernel, quadratic augmentation)
//! - [`assembly`]: the coupled 2N×2N block operator and right-hand side
//! - [`solver`]: sparse (faer LU) and dense direct solvers
//! - [`strain`]: strain components and the second strain invariant
//! - [`model`]: the [`Problem`] -> [`Solution`] pipeline tying it together
//!
//! # Example
//!
//! ```no_run
//! use mfree::{FaerLuSolver, LameParameters, Polygon, Problem};
//!
//! let problem = Problem {
//!     domain: Polygon::rectangle(2.0, 1.0),
//!     fixed_segments: vec![3],
//!     free_segments: vec![0, 1, 2],
//!     node_count: 1000,
//!     stencil_size: 20,
//!     lame: LameParameters::new(1.0, 1.0),
//!     body_force: 1.0,
//! };
//! let solution = problem.solve(&FaerLuSolver::new())?;
//! let view = solution.presentation();
//! # Ok::<(), mfree::Error>(())
//! ```

pub mod assembly;
pub mod error;
pub mod geometry;
pub mod groups;
pub mod model;
pub mod solver;
pub mod sparse;
pub mod stencil;
pub mod strain;
pub mod types;

pub use assembly::{assemble, AssembledSystem, AssemblyWarning};
pub use error::{Error, Result};
pub use geometry::{place_nodes, BoundaryGroup, NodeSet, Polygon};
pub use groups::NodeGroups;
pub use model::{PresentationView, Problem, Solution};
pub use solver::{DenseLuSolver, FaerLuSolver, Solver};
pub use sparse::CsrMatrix;
pub use stencil::weight_matrix;
pub use strain::StrainField;
pub use types::{DiffOp, LameParameters, Point2};
