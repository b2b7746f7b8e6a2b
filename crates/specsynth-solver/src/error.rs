//! Error types for encoding, solving, and synthesis

use specsynth_core::SpecError;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the solver layer
#[derive(Debug, Error)]
pub enum SolverError {
    /// No usable solver binary on this machine
    #[error("Solver unavailable: {0}")]
    Unavailable(String),

    /// Pop requested with no open scope
    #[error("Scope underflow: pop with no matching push")]
    ScopeUnderflow,

    /// Model requested without a preceding satisfiable check
    #[error("No model available: last check did not return sat")]
    ModelUnavailable,

    /// Solver replied with something outside its documented protocol
    #[error("Solver protocol error: {0}")]
    Protocol(String),

    /// I/O failure talking to the solver process
    #[error("Solver I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model assigned a variable a value outside its declared type
    #[error("Model value for '{variable}' has type {actual}, expected {expected}")]
    ModelTypeMismatch {
        variable: String,
        expected: String,
        actual: String,
    },

    /// An approximated predicate does not actually hold on the extracted values
    #[error("Approximated predicate {predicate} fails on extracted value: {value}")]
    ApproximationViolation { predicate: usize, value: String },

    /// Constraint construct with no SMT-LIB2 rendering
    #[error("Unsupported construct for SMT encoding: {0}")]
    UnsupportedConstruct(String),

    /// Specification-level failure surfaced during solving
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Result type for solver operations
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors produced by the synthesis engine
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The specification admits no satisfying assignment at all
    #[error("Specification '{0}' is unsatisfiable")]
    UnsatisfiableSpecification(String),

    /// The solver could not decide within its budget
    #[error("Solver inconclusive after {budget:?}{}", if *.timed_out { " (timeout)" } else { "" })]
    Inconclusive {
        /// True when the check actually ran out the budget, false when the
        /// backend answered unknown on its own
        timed_out: bool,
        /// The per-check budget in effect
        budget: Duration,
    },

    /// Boundary synthesis asked for a constraint index that does not exist
    #[error("No constraint at index {0}")]
    NoSuchPredicate(usize),

    /// Underlying solver failure
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;
