//! Incremental solver session
//!
//! A [`SolverSession`] wraps a [`SolverBackend`] and tracks the scope stack
//! and the result of the last satisfiability check, so callers get a typed
//! error instead of a wedged protocol when they pop past the base scope or
//! ask for a model after an unsat answer.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::model::SolverModel;

/// Outcome of a satisfiability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    /// A satisfying assignment exists
    Sat,
    /// No satisfying assignment exists
    Unsat,
    /// The solver could not decide within its budget
    Unknown,
}

impl SatResult {
    /// True only for [`SatResult::Sat`]
    #[must_use]
    pub fn is_sat(self) -> bool {
        matches!(self, SatResult::Sat)
    }
}

/// Low-level solver operations, implemented per solver process
///
/// Implementations map each operation onto one or more SMT-LIB2 commands.
/// A timed-out check reports [`SatResult::Unknown`] rather than an error;
/// errors are reserved for protocol and I/O failures.
#[async_trait]
pub trait SolverBackend: Send {
    /// Send a declaration or other setup command
    async fn declare(&mut self, command: &str) -> SolverResult<()>;

    /// Assert a term
    async fn assert(&mut self, term: &str) -> SolverResult<()>;

    /// Open a backtracking scope
    async fn push(&mut self) -> SolverResult<()>;

    /// Discard the innermost scope and everything asserted in it
    async fn pop(&mut self) -> SolverResult<()>;

    /// Check satisfiability of the current assertion set
    async fn check_sat(&mut self, timeout: Duration) -> SolverResult<SatResult>;

    /// Fetch the model for the last sat answer
    async fn get_model(&mut self) -> SolverResult<SolverModel>;
}

/// Scope-tracking wrapper over a backend
pub struct SolverSession<B> {
    backend: B,
    depth: usize,
    last_check: Option<SatResult>,
}

impl<B: SolverBackend> SolverSession<B> {
    /// Wrap a backend at scope depth zero
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            depth: 0,
            last_check: None,
        }
    }

    /// Current scope depth (0 is the base scope)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Result of the most recent check, if any
    #[must_use]
    pub fn last_check(&self) -> Option<SatResult> {
        self.last_check
    }

    /// Send a declaration to the solver
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn declare(&mut self, command: &str) -> SolverResult<()> {
        self.backend.declare(command).await
    }

    /// Assert a term in the current scope
    ///
    /// Any previous check result is stale once the assertion set changes.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn assert(&mut self, term: &str) -> SolverResult<()> {
        self.last_check = None;
        self.backend.assert(term).await
    }

    /// Open a scope
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn push(&mut self) -> SolverResult<()> {
        self.backend.push().await?;
        self.depth += 1;
        Ok(())
    }

    /// Close the innermost scope
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ScopeUnderflow`] at the base scope.
    pub async fn pop(&mut self) -> SolverResult<()> {
        if self.depth == 0 {
            return Err(SolverError::ScopeUnderflow);
        }
        self.backend.pop().await?;
        self.depth -= 1;
        self.last_check = None;
        Ok(())
    }

    /// Check satisfiability with a per-check budget
    ///
    /// # Errors
    ///
    /// Propagates backend failures; a timeout is [`SatResult::Unknown`],
    /// not an error.
    pub async fn check_sat(&mut self, timeout: Duration) -> SolverResult<SatResult> {
        let result = self.backend.check_sat(timeout).await?;
        debug!(depth = self.depth, ?result, "check-sat");
        self.last_check = Some(result);
        Ok(result)
    }

    /// Fetch the model for the last check
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ModelUnavailable`] unless the last check on
    /// the current assertion set answered sat.
    pub async fn model(&mut self) -> SolverResult<SolverModel> {
        if self.last_check != Some(SatResult::Sat) {
            return Err(SolverError::ModelUnavailable);
        }
        self.backend.get_model().await
    }
}
