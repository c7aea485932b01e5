//! Error types for mfree operations.

use thiserror::Error;

/// Result type alias using the mfree Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or solving a problem.
///
/// Configuration and dimension errors are unrecoverable: the run aborts
/// immediately with the offending group or shape named in the message.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent node-group definitions.
    #[error("configuration error: {0}")]
    Config(String),

    /// A component's output shape disagrees with its declared index-set size.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// RBF-FD stencil construction errors.
    #[error("stencil error: {0}")]
    Stencil(String),

    /// Linear solver errors other than singularity.
    #[error("solver error: {0}")]
    Solver(String),

    /// The assembled system is structurally or numerically singular.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),
}
