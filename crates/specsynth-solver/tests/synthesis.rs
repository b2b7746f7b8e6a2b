//! End-to-end synthesis tests over a scripted backend
//!
//! These drive the full pipeline (load, encode, solve, extract) against a
//! fake solver that replays canned answers, so they run without a z3
//! binary installed.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use specsynth_core::{load_str, DomainValue};
use specsynth_solver::{
    BoundaryOutcome, InstanceLabel, SatResult, SolverBackend, SolverError, SolverModel,
    SolverResult, SynthesisConfig, SynthesisError, Synthesizer,
};

/// Command log shared with the test body after the engine takes the backend
type Log = Arc<Mutex<Vec<String>>>;

struct FakeBackend {
    log: Log,
    checks: VecDeque<SatResult>,
    models: VecDeque<String>,
}

impl FakeBackend {
    fn new(checks: Vec<SatResult>, models: Vec<&str>) -> (Self, Log) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backend = Self {
            log: Arc::clone(&log),
            checks: checks.into(),
            models: models.into_iter().map(str::to_string).collect(),
        };
        (backend, log)
    }

    fn record(&self, command: String) {
        self.log.lock().unwrap().push(command);
    }
}

#[async_trait]
impl SolverBackend for FakeBackend {
    async fn declare(&mut self, command: &str) -> SolverResult<()> {
        self.record(command.to_string());
        Ok(())
    }

    async fn assert(&mut self, term: &str) -> SolverResult<()> {
        self.record(format!("(assert {term})"));
        Ok(())
    }

    async fn push(&mut self) -> SolverResult<()> {
        self.record("(push 1)".to_string());
        Ok(())
    }

    async fn pop(&mut self) -> SolverResult<()> {
        self.record("(pop 1)".to_string());
        Ok(())
    }

    async fn check_sat(&mut self, _timeout: Duration) -> SolverResult<SatResult> {
        self.record("(check-sat)".to_string());
        Ok(self.checks.pop_front().unwrap_or(SatResult::Unknown))
    }

    async fn get_model(&mut self) -> SolverResult<SolverModel> {
        self.record("(get-model)".to_string());
        match self.models.pop_front() {
            Some(text) => SolverModel::parse(&text),
            None => Ok(SolverModel::default()),
        }
    }
}

fn age_spec() -> specsynth_core::Specification {
    load_str(
        r#"{
            "name": "age-check",
            "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
            "constraints": [{"ge": [{"var": "age"}, 18]}]
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn satisfying_instance_round_trips_through_the_evaluator() {
    let (backend, _log) = FakeBackend::new(
        vec![SatResult::Sat],
        vec!["((define-fun age () Int 21))"],
    );
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();

    let instance = engine.satisfying().await.unwrap();
    assert_eq!(instance.label, InstanceLabel::Satisfying);
    assert_eq!(instance.value("age"), Some(&DomainValue::Int(21)));
    assert!(engine.spec().satisfies(&instance.values).unwrap());
}

#[tokio::test]
async fn mutually_exclusive_predicates_are_an_unsatisfiable_specification() {
    let spec = load_str(
        r#"{
            "name": "impossible",
            "variables": [{"name": "x", "type": "integer"}],
            "constraints": [
                {"gt": [{"var": "x"}, 10]},
                {"lt": [{"var": "x"}, 5]}
            ]
        }"#,
    )
    .unwrap();
    let (backend, _log) = FakeBackend::new(vec![SatResult::Unsat], vec![]);
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    let err = engine.satisfying().await.unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::UnsatisfiableSpecification(name) if name == "impossible"
    ));
}

#[tokio::test]
async fn unknown_answer_is_inconclusive_not_a_crash() {
    let (backend, _log) = FakeBackend::new(vec![SatResult::Unknown], vec![]);
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();

    // The backend answered immediately, so this unknown is not a timeout,
    // and the reported budget is the configured one.
    assert!(matches!(
        engine.satisfying().await.unwrap_err(),
        SynthesisError::Inconclusive { timed_out: false, budget }
            if budget == SynthesisConfig::default().check_timeout
    ));
}

#[tokio::test]
async fn boundary_pins_the_adjacent_value() {
    // Outer check finds some violating model, the pinned check then lands
    // exactly one below the threshold.
    let (backend, log) = FakeBackend::new(
        vec![SatResult::Sat, SatResult::Sat],
        vec![
            "((define-fun age () Int 3))",
            "((define-fun age () Int 17))",
        ],
    );
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();

    let outcome = engine.boundary(0).await.unwrap();
    let BoundaryOutcome::Instance(instance) = outcome else {
        panic!("expected an instance");
    };
    assert_eq!(instance.label, InstanceLabel::Boundary);
    assert_eq!(instance.value("age"), Some(&DomainValue::Int(17)));
    // Exactly the targeted constraint fails on the produced values.
    assert_eq!(
        engine.spec().check_each(&instance.values).unwrap(),
        vec![false]
    );

    let log = log.lock().unwrap();
    assert!(log.contains(&"(assert (not (>= age 18)))".to_string()));
    assert!(log.contains(&"(assert (= age 17))".to_string()));
}

#[tokio::test]
async fn boundary_falls_back_to_the_unpinned_model() {
    // The pinned check fails, so the outer model is used and the instance
    // is only labelled violating.
    let (backend, _log) = FakeBackend::new(
        vec![SatResult::Sat, SatResult::Unsat],
        vec!["((define-fun age () Int 3))"],
    );
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();

    let outcome = engine.boundary(0).await.unwrap();
    let BoundaryOutcome::Instance(instance) = outcome else {
        panic!("expected an instance");
    };
    assert_eq!(instance.label, InstanceLabel::Violating);
    assert_eq!(instance.value("age"), Some(&DomainValue::Int(3)));
}

#[tokio::test]
async fn entailed_constraint_is_not_independently_violable() {
    // age >= 10 cannot fail while age >= 18 still holds.
    let spec = load_str(
        r#"{
            "name": "entailed",
            "variables": [{"name": "age", "type": "integer", "min": 0, "max": 150}],
            "constraints": [
                {"ge": [{"var": "age"}, 18]},
                {"ge": [{"var": "age"}, 10]}
            ]
        }"#,
    )
    .unwrap();
    let (backend, _log) = FakeBackend::new(vec![SatResult::Unsat], vec![]);
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        engine.boundary(1).await.unwrap(),
        BoundaryOutcome::NotIndependentlyViolable { predicate: 1 }
    ));
}

#[tokio::test]
async fn boundary_index_out_of_range() {
    let (backend, _log) = FakeBackend::new(vec![], vec![]);
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();
    assert!(matches!(
        engine.boundary(5).await.unwrap_err(),
        SynthesisError::NoSuchPredicate(5)
    ));
}

#[tokio::test]
async fn approximated_match_is_rechecked_after_solving() {
    // Alternation pushes the pattern outside the native regex subset.
    let spec = load_str(
        r#"{
            "name": "email-check",
            "variables": [{"name": "email", "type": "string", "max_length": 64}],
            "constraints": [{"matches": [{"var": "email"}, "[a-z]+@[a-z]+\\.(com|org)"]}]
        }"#,
    )
    .unwrap();
    // The solver only saw a length bound, so it may hand back a string
    // that is long enough but matches nothing.
    let (backend, _log) = FakeBackend::new(
        vec![SatResult::Sat],
        vec!["((define-fun email () String \"zzzzzzzz\"))"],
    );
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    let err = engine.satisfying().await.unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::Solver(SolverError::ApproximationViolation { predicate: 0, .. })
    ));
}

#[tokio::test]
async fn simple_pattern_constraints_solve_without_a_recheck_failure() {
    // A pattern inside the native subset reaches the solver exactly, so a
    // conforming model extracts cleanly.
    let spec = load_str(
        r#"{
            "name": "email-check",
            "variables": [{"name": "email", "type": "string", "max_length": 64}],
            "constraints": [{"matches": [{"var": "email"}, "[a-z]+@[a-z]+\\.[a-z]+"]}]
        }"#,
    )
    .unwrap();
    let (backend, log) = FakeBackend::new(
        vec![SatResult::Sat],
        vec!["((define-fun email () String \"ab@cd.ef\"))"],
    );
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    let instance = engine.satisfying().await.unwrap();
    assert_eq!(
        instance.value("email"),
        Some(&DomainValue::Str("ab@cd.ef".to_string()))
    );
    assert!(engine.spec().satisfies(&instance.values).unwrap());
    let log = log.lock().unwrap();
    assert!(log.iter().any(|c| c.contains("str.in_re")));
}

#[tokio::test]
async fn unsat_negation_of_an_approximated_target_is_undecided() {
    // "cat|dog" falls back to a trivial length bound; its negation is
    // unsatisfiable, which must not be read as a redundant constraint.
    let spec = load_str(
        r#"{
            "name": "pet-check",
            "variables": [{"name": "pet", "type": "string", "max_length": 16}],
            "constraints": [{"matches": [{"var": "pet"}, "cat|dog"]}]
        }"#,
    )
    .unwrap();
    let (backend, _log) = FakeBackend::new(vec![SatResult::Unsat], vec![]);
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        engine.boundary(0).await.unwrap(),
        BoundaryOutcome::Undecided { predicate: 0 }
    ));
}

#[tokio::test]
async fn queries_are_scoped_and_base_state_is_asserted_once() {
    let (backend, log) = FakeBackend::new(
        vec![SatResult::Sat, SatResult::Sat, SatResult::Sat],
        vec![
            "((define-fun age () Int 21))",
            "((define-fun age () Int 3))",
            "((define-fun age () Int 17))",
        ],
    );
    let mut engine = Synthesizer::new(backend, age_spec(), SynthesisConfig::default())
        .await
        .unwrap();
    engine.satisfying().await.unwrap();
    engine.boundary(0).await.unwrap();

    let log = log.lock().unwrap();
    // Base scope: declaration plus domain bounds, before any push.
    assert_eq!(log[0], "(declare-const age Int)");
    assert_eq!(log[1], "(assert (>= age 0))");
    assert_eq!(log[2], "(assert (<= age 150))");
    assert_eq!(log[3], "(push 1)");
    // Every push is matched by a pop.
    let pushes = log.iter().filter(|c| c.as_str() == "(push 1)").count();
    let pops = log.iter().filter(|c| c.as_str() == "(pop 1)").count();
    assert_eq!(pushes, pops);
    assert_eq!(log.last().map(String::as_str), Some("(pop 1)"));
}

#[tokio::test]
async fn boundary_coverage_visits_every_constraint() {
    let spec = load_str(
        r#"{
            "name": "two-sided",
            "variables": [{"name": "n", "type": "integer"}],
            "constraints": [
                {"ge": [{"var": "n"}, 0]},
                {"le": [{"var": "n"}, 100]}
            ]
        }"#,
    )
    .unwrap();
    let (backend, _log) = FakeBackend::new(
        vec![
            SatResult::Sat,
            SatResult::Sat,
            SatResult::Sat,
            SatResult::Sat,
        ],
        vec![
            "((define-fun n () Int (- 5)))",
            "((define-fun n () Int (- 1)))",
            "((define-fun n () Int 200))",
            "((define-fun n () Int 101))",
        ],
    );
    let mut engine = Synthesizer::new(backend, spec, SynthesisConfig::default())
        .await
        .unwrap();

    let outcomes = engine.boundary_coverage().await.unwrap();
    assert_eq!(outcomes.len(), 2);
    let BoundaryOutcome::Instance(first) = &outcomes[0].1 else {
        panic!("expected an instance");
    };
    assert_eq!(first.value("n"), Some(&DomainValue::Int(-1)));
    assert_eq!(first.label, InstanceLabel::Boundary);
    let BoundaryOutcome::Instance(second) = &outcomes[1].1 else {
        panic!("expected an instance");
    };
    assert_eq!(second.value("n"), Some(&DomainValue::Int(101)));
    assert_eq!(second.label, InstanceLabel::Boundary);
}
