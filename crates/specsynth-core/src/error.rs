//! Error types for specification loading, validation, and evaluation

use thiserror::Error;

/// Errors produced while building or evaluating a specification
#[derive(Debug, Error)]
pub enum SpecError {
    /// Malformed specification document
    #[error("Failed to parse specification at {path}: {message}")]
    Parse { path: String, message: String },

    /// Variable declared with a type tag outside the supported set
    #[error("Unsupported domain type '{found}' at {path}")]
    UnsupportedDomainType { path: String, found: String },

    /// Constraint references a variable that was never declared
    #[error("Reference to undeclared variable '{0}'")]
    UnresolvedVariable(String),

    /// Two variable declarations share a name
    #[error("Duplicate variable declaration '{0}'")]
    DuplicateVariable(String),

    /// Constraint node typed inconsistently with its children
    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Declared bounds are not satisfiable (e.g. min > max, empty enumeration)
    #[error("Invalid bounds for variable '{name}': {message}")]
    InvalidBounds { name: String, message: String },

    /// Match predicate carries a pattern the regex engine rejects
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Evaluation was asked for a variable with no assigned value
    #[error("No value assigned to variable '{0}' during evaluation")]
    MissingValue(String),

    /// Division or modulo by zero during direct evaluation
    #[error("Division by zero while evaluating {0}")]
    DivisionByZero(String),
}

/// Result type for specification operations
pub type SpecResult<T> = Result<T, SpecError>;
