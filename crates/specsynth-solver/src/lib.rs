//! SMT-based instance synthesis for constraint specifications
//!
//! This crate turns a validated [`Specification`] into concrete test
//! instances by way of an external SMT solver:
//!
//! - **Encoding**: deterministic SMT-LIB2 text; simple regular-expression
//!   patterns encode natively as solver regex terms, the rest weaken to
//!   length bounds and are re-checked exactly after solving
//! - **Sessions**: an incremental [`SolverSession`] over a [`SolverBackend`]
//!   trait, with scope tracking and typed protocol errors
//! - **Z3 backend**: a long-lived `z3 -in -smt2` process driven over pipes
//!   with explicit success acknowledgements
//! - **Synthesis**: fully satisfying instances, plus per-constraint
//!   violating instances pinned to adjacent boundary values where the
//!   constraint shape allows it
//!
//! # Example
//!
//! ```rust,no_run
//! use specsynth_core::load_str;
//! use specsynth_solver::{Synthesizer, SynthesisConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = load_str(
//!     r#"{
//!         "name": "age-check",
//!         "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
//!         "constraints": [{"ge": [{"var": "age"}, 18]}]
//!     }"#,
//! )?;
//!
//! let mut engine = Synthesizer::with_z3(spec, SynthesisConfig::default()).await?;
//! let instance = engine.satisfying().await?;
//! assert!(engine.spec().satisfies(&instance.values)?);
//!
//! let boundaries = engine.boundary_coverage().await?;
//! # let _ = boundaries;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod model;
pub mod session;
pub mod smtlib;
pub mod synthesize;
pub mod z3;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types
pub use error::{SolverError, SolverResult, SynthesisError, SynthesisResult};
pub use extract::{extract, InstanceLabel, SynthesizedInstance};
pub use model::{SolverModel, SolverValue};
pub use session::{SatResult, SolverBackend, SolverSession};
pub use smtlib::{
    compile_simple_regex, encode, min_match_length, EncodedPredicate, EncodedSpec, SymbolKind,
    SymbolTable,
};
pub use synthesize::{BoundaryOutcome, SynthesisConfig, Synthesizer};
pub use z3::{Z3Config, Z3Process};

use specsynth_core::Specification;

/// Encode and print the full base script for a specification
///
/// Debug aid: the declarations, bounds, and constraint assertions in the
/// order a session would send them.
///
/// # Errors
///
/// Propagates encoding failures.
pub fn render_script(spec: &Specification) -> SolverResult<String> {
    let encoded = encode(spec)?;
    let mut script = String::new();
    for declaration in &encoded.declarations {
        script.push_str(declaration);
        script.push('\n');
    }
    for bound in &encoded.bounds {
        script.push_str(&format!("(assert {bound})\n"));
    }
    for predicate in &encoded.predicates {
        script.push_str(&format!("(assert {})\n", predicate.term));
    }
    script.push_str("(check-sat)\n");
    Ok(script)
}
