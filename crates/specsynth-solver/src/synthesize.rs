//! Instance synthesis engine
//!
//! Drives an incremental solver session to produce concrete instances from
//! a specification: fully satisfying assignments, and for each constraint a
//! counterexample that violates just that constraint. Declarations and
//! domain bounds live at the session's base scope; every query runs inside
//! its own push/pop scope, so queries never contaminate each other.
//!
//! For an integer comparison against a constant, violating instances are
//! additionally pinned to the extremal value adjacent to the constraint's
//! threshold (`age >= 18` yields `age = 17`) and labelled
//! [`InstanceLabel::Boundary`]. When no pin applies, or the pinned query is
//! unsatisfiable alongside the other constraints, the unpinned violating
//! model is used instead.

use std::time::{Duration, Instant};
use tracing::debug;

use specsynth_core::{evaluate, CompareOp, DomainType, Expr, Specification};

use crate::error::{SolverError, SynthesisError, SynthesisResult};
use crate::extract::{extract, InstanceLabel, SynthesizedInstance};
use crate::session::{SatResult, SolverBackend, SolverSession};
use crate::smtlib::{encode, int_literal, EncodedSpec, SymbolTable};
use crate::z3::{Z3Config, Z3Process};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Budget for each satisfiability check
    pub check_timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of boundary synthesis for one constraint
#[derive(Debug)]
pub enum BoundaryOutcome {
    /// A violating (or boundary) instance was found
    Instance(SynthesizedInstance),
    /// The constraint cannot be violated while the others hold
    NotIndependentlyViolable { predicate: usize },
    /// The constraint was encoded approximately and its weakened negation
    /// is unsatisfiable, which says nothing about the exact predicate
    Undecided { predicate: usize },
}

/// Incremental synthesis over one specification
pub struct Synthesizer<B> {
    session: SolverSession<B>,
    spec: Specification,
    encoded: EncodedSpec,
    config: SynthesisConfig,
}

impl Synthesizer<Z3Process> {
    /// Spawn a Z3 process and prepare it for this specification
    ///
    /// # Errors
    ///
    /// Propagates solver spawn and setup failures.
    pub async fn with_z3(
        spec: Specification,
        config: SynthesisConfig,
    ) -> SynthesisResult<Self> {
        let backend = Z3Process::spawn_with(&Z3Config::default()).await?;
        Self::new(backend, spec, config).await
    }
}

impl<B: SolverBackend> Synthesizer<B> {
    /// Encode the specification and load declarations and domain bounds
    /// into the backend's base scope
    ///
    /// # Errors
    ///
    /// Propagates encoding and backend failures.
    pub async fn new(
        backend: B,
        spec: Specification,
        config: SynthesisConfig,
    ) -> SynthesisResult<Self> {
        let encoded = encode(&spec)?;
        let mut session = SolverSession::new(backend);
        for declaration in &encoded.declarations {
            session.declare(declaration).await.map_err(SynthesisError::from)?;
        }
        for bound in &encoded.bounds {
            session.assert(bound).await.map_err(SynthesisError::from)?;
        }
        debug!(spec = spec.name(), "synthesizer ready");
        Ok(Self {
            session,
            spec,
            encoded,
            config,
        })
    }

    /// The specification this engine was built for
    #[must_use]
    pub fn spec(&self) -> &Specification {
        &self.spec
    }

    /// Synthesize an instance satisfying every constraint
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::UnsatisfiableSpecification`] when the
    /// constraints admit no assignment, [`SynthesisError::Inconclusive`]
    /// when the solver cannot decide, and solver failures otherwise.
    pub async fn satisfying(&mut self) -> SynthesisResult<SynthesizedInstance> {
        self.session.push().await.map_err(SynthesisError::from)?;
        let result = self.satisfying_scoped().await;
        self.finish_scope(result).await
    }

    async fn satisfying_scoped(&mut self) -> SynthesisResult<SynthesizedInstance> {
        for predicate in &self.encoded.predicates {
            self.session
                .assert(&predicate.term)
                .await
                .map_err(SynthesisError::from)?;
        }
        let started = Instant::now();
        match self
            .session
            .check_sat(self.config.check_timeout)
            .await
            .map_err(SynthesisError::from)?
        {
            SatResult::Sat => {
                let model = self.session.model().await.map_err(SynthesisError::from)?;
                let instance = extract(
                    &model,
                    &self.spec,
                    &self.encoded,
                    InstanceLabel::Satisfying,
                    None,
                )?;
                Ok(instance)
            }
            SatResult::Unsat => Err(SynthesisError::UnsatisfiableSpecification(
                self.spec.name().to_string(),
            )),
            SatResult::Unknown => Err(self.inconclusive(started)),
        }
    }

    fn inconclusive(&self, started: Instant) -> SynthesisError {
        SynthesisError::Inconclusive {
            timed_out: started.elapsed() >= self.config.check_timeout,
            budget: self.config.check_timeout,
        }
    }

    /// Synthesize an instance violating exactly the constraint at `target`
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::NoSuchPredicate`] for an out-of-range
    /// index, [`SynthesisError::Inconclusive`] when the solver cannot
    /// decide, and solver failures otherwise.
    pub async fn boundary(&mut self, target: usize) -> SynthesisResult<BoundaryOutcome> {
        if target >= self.encoded.predicates.len() {
            return Err(SynthesisError::NoSuchPredicate(target));
        }
        self.session.push().await.map_err(SynthesisError::from)?;
        let result = self.boundary_scoped(target).await;
        self.finish_scope(result).await
    }

    async fn boundary_scoped(&mut self, target: usize) -> SynthesisResult<BoundaryOutcome> {
        for predicate in &self.encoded.predicates {
            let term = if predicate.index == target {
                format!("(not {})", predicate.term)
            } else {
                predicate.term.clone()
            };
            self.session.assert(&term).await.map_err(SynthesisError::from)?;
        }
        let started = Instant::now();
        match self
            .session
            .check_sat(self.config.check_timeout)
            .await
            .map_err(SynthesisError::from)?
        {
            SatResult::Unsat => {
                // An unsat negation of a weakened term proves nothing about
                // the exact predicate, so it must not be reported as a
                // redundant constraint.
                if self.encoded.predicates[target].approximated {
                    debug!(target, "approximated target, unsat negation is undecided");
                    Ok(BoundaryOutcome::Undecided { predicate: target })
                } else {
                    debug!(target, "constraint not independently violable");
                    Ok(BoundaryOutcome::NotIndependentlyViolable { predicate: target })
                }
            }
            SatResult::Unknown => Err(self.inconclusive(started)),
            SatResult::Sat => {
                // The outer model must be fetched before any further check
                // invalidates it.
                let outer = self.session.model().await.map_err(SynthesisError::from)?;
                let pin =
                    boundary_pin(&self.spec, &self.encoded.symbols, self.target_expr(target));
                let instance = match pin {
                    Some((symbol, value)) => {
                        match self.pinned_model(&symbol, value).await? {
                            Some(model) => extract(
                                &model,
                                &self.spec,
                                &self.encoded,
                                InstanceLabel::Boundary,
                                Some(target),
                            )?,
                            None => extract(
                                &outer,
                                &self.spec,
                                &self.encoded,
                                InstanceLabel::Violating,
                                Some(target),
                            )?,
                        }
                    }
                    None => extract(
                        &outer,
                        &self.spec,
                        &self.encoded,
                        InstanceLabel::Violating,
                        Some(target),
                    )?,
                };
                self.confirm_violation(target, &instance)?;
                Ok(BoundaryOutcome::Instance(instance))
            }
        }
    }

    /// Check satisfiability with the target variable pinned to the
    /// adjacent extremal value
    async fn pinned_model(
        &mut self,
        symbol: &str,
        value: i64,
    ) -> SynthesisResult<Option<crate::model::SolverModel>> {
        self.session.push().await.map_err(SynthesisError::from)?;
        let result = self.pinned_model_scoped(symbol, value).await;
        self.finish_scope(result).await
    }

    async fn pinned_model_scoped(
        &mut self,
        symbol: &str,
        value: i64,
    ) -> SynthesisResult<Option<crate::model::SolverModel>> {
        self.session
            .assert(&format!("(= {symbol} {})", int_literal(value)))
            .await
            .map_err(SynthesisError::from)?;
        match self
            .session
            .check_sat(self.config.check_timeout)
            .await
            .map_err(SynthesisError::from)?
        {
            SatResult::Sat => {
                let model = self.session.model().await.map_err(SynthesisError::from)?;
                Ok(Some(model))
            }
            SatResult::Unsat | SatResult::Unknown => Ok(None),
        }
    }

    /// Synthesize a violating or boundary instance for every constraint
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Synthesizer::boundary`], for the first
    /// constraint that fails.
    pub async fn boundary_coverage(
        &mut self,
    ) -> SynthesisResult<Vec<(usize, BoundaryOutcome)>> {
        let mut outcomes = Vec::with_capacity(self.encoded.predicates.len());
        for target in 0..self.encoded.predicates.len() {
            let outcome = self.boundary(target).await?;
            outcomes.push((target, outcome));
        }
        Ok(outcomes)
    }

    fn target_expr(&self, target: usize) -> &Expr {
        &self.spec.constraints()[target]
    }

    /// When the target was encoded approximately, confirm the exact
    /// predicate really is false on the produced instance
    fn confirm_violation(
        &self,
        target: usize,
        instance: &SynthesizedInstance,
    ) -> SynthesisResult<()> {
        if !self.encoded.predicates[target].approximated {
            return Ok(());
        }
        let holds = evaluate(self.target_expr(target), &instance.values)
            .map_err(SolverError::from)?
            .as_bool()
            .unwrap_or(false);
        if holds {
            return Err(SynthesisError::Solver(SolverError::ApproximationViolation {
                predicate: target,
                value: format!("{:?}", instance.values),
            }));
        }
        Ok(())
    }

    /// Pop the query scope and merge any pop failure into the result
    async fn finish_scope<T>(&mut self, result: SynthesisResult<T>) -> SynthesisResult<T> {
        let popped = self.session.pop().await;
        let value = result?;
        popped.map_err(SynthesisError::from)?;
        Ok(value)
    }
}

/// Pin for an integer comparison against a constant: the value adjacent to
/// the threshold on the violating side
fn boundary_pin(
    spec: &Specification,
    symbols: &SymbolTable,
    target: &Expr,
) -> Option<(String, i64)> {
    let (name, op, constant) = match target {
        Expr::Compare(left, op, right) => match (left.as_ref(), right.as_ref()) {
            (Expr::Var(name), Expr::Int(c)) => (name, *op, *c),
            (Expr::Int(c), Expr::Var(name)) => (name, flip(*op), *c),
            _ => return None,
        },
        _ => return None,
    };
    let variable = spec.variable(name)?;
    let &DomainType::Integer { min, max } = &variable.domain else {
        return None;
    };
    let pinned = match op {
        CompareOp::Ge => constant.checked_sub(1)?,
        CompareOp::Gt | CompareOp::Lt | CompareOp::Ne => constant,
        CompareOp::Le | CompareOp::Eq => constant.checked_add(1)?,
    };
    if min.is_some_and(|m| pinned < m) || max.is_some_and(|m| pinned > m) {
        return None;
    }
    Some((symbols.symbol(name)?.to_string(), pinned))
}

/// Mirror a comparison so the variable reads on the left
fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        CompareOp::Eq | CompareOp::Ne => op,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsynth_core::{load_str, Variable};

    fn age_spec() -> Specification {
        load_str(
            r#"{
                "name": "age-check",
                "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
                "constraints": [{"ge": [{"var": "age"}, 18]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn pin_targets_adjacent_value() {
        let spec = age_spec();
        let encoded = encode(&spec).unwrap();
        let pin = boundary_pin(&spec, &encoded.symbols, &spec.constraints()[0]);
        assert_eq!(pin, Some(("age".to_string(), 17)));
    }

    #[test]
    fn pin_flips_literal_on_the_left() {
        // 18 <= age is the same constraint as age >= 18.
        let spec = load_str(
            r#"{
                "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
                "constraints": [{"le": [18, {"var": "age"}]}]
            }"#,
        )
        .unwrap();
        let encoded = encode(&spec).unwrap();
        let pin = boundary_pin(&spec, &encoded.symbols, &spec.constraints()[0]);
        assert_eq!(pin, Some(("age".to_string(), 17)));
    }

    #[test]
    fn pin_respects_domain_bounds() {
        // Violating age >= 0 would need age = -1, outside the domain.
        let spec = load_str(
            r#"{
                "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
                "constraints": [{"ge": [{"var": "age"}, 0]}]
            }"#,
        )
        .unwrap();
        let encoded = encode(&spec).unwrap();
        assert_eq!(
            boundary_pin(&spec, &encoded.symbols, &spec.constraints()[0]),
            None
        );
    }

    #[test]
    fn pin_covers_every_operator() {
        let spec = Specification::new(
            "s",
            vec![Variable::new(
                "x",
                DomainType::Integer {
                    min: None,
                    max: None,
                },
            )],
            vec![],
        )
        .unwrap();
        let encoded = encode(&spec).unwrap();
        let cases = [
            (CompareOp::Ge, 9),
            (CompareOp::Gt, 10),
            (CompareOp::Le, 11),
            (CompareOp::Lt, 10),
            (CompareOp::Eq, 11),
            (CompareOp::Ne, 10),
        ];
        for (op, expected) in cases {
            let target = Expr::compare(Expr::var("x"), op, Expr::Int(10));
            let pin = boundary_pin(&spec, &encoded.symbols, &target);
            assert_eq!(pin, Some(("x".to_string(), expected)), "{op:?}");
        }
    }

    #[test]
    fn pin_overflow_is_none() {
        let spec = Specification::new(
            "s",
            vec![Variable::new(
                "x",
                DomainType::Integer {
                    min: None,
                    max: None,
                },
            )],
            vec![],
        )
        .unwrap();
        let encoded = encode(&spec).unwrap();
        let target = Expr::compare(Expr::var("x"), CompareOp::Le, Expr::Int(i64::MAX));
        assert_eq!(boundary_pin(&spec, &encoded.symbols, &target), None);
    }

    #[test]
    fn pin_skips_non_integer_targets() {
        let spec = load_str(
            r#"{
                "variables": [{"name": "r", "type": "real", "min": 0.0, "max": 1.0}],
                "constraints": [{"ge": [{"var": "r"}, 0.5]}]
            }"#,
        )
        .unwrap();
        let encoded = encode(&spec).unwrap();
        assert_eq!(
            boundary_pin(&spec, &encoded.symbols, &spec.constraints()[0]),
            None
        );
    }
}
