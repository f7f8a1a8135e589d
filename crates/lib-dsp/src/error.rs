//! Error types for analysis operations.

use thiserror::Error;

/// Errors that can occur during analysis operations.
#[derive(Debug, Error)]
pub enum DspError {
    /// Input length mismatch.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A user expression failed to parse or evaluate.
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),
}

/// Result type for analysis operations.
pub type DspResult<T> = Result<T, DspError>;

/// Errors from the arithmetic expression evaluator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExprError {
    /// The text is not a valid expression.
    #[error("Syntax error at '{0}'")]
    Syntax(String),

    /// The expression references a name that is not bound.
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
}
