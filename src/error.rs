use thiserror::Error;

/// Error types for the lmfit-core library.
#[derive(Error, Debug)]
pub enum LmError {
    /// Error indicating a mismatch in matrix or vector dimensions.
    #[error("Matrix dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The symmetric solver rejected the matrix as not positive definite
    /// or too badly conditioned to factor.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Linear algebra error that no fallback can recover from.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Error during model evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Invalid input data or configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LmError {
    /// Returns true if the error can be handled by falling back to a more
    /// general linear solver.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LmError::SingularMatrix)
    }
}

/// Result type alias for lmfit-core operations.
pub type Result<T> = std::result::Result<T, LmError>;
