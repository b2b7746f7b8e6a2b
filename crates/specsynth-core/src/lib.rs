//! Constraint specification model for SMT-based test-value synthesis
//!
//! This crate defines the typed constraint language shared by the synthesis
//! pipeline: variable declarations with bounded domains, a constraint
//! expression tree, a JSON document loader, and a direct evaluator that
//! checks concrete value assignments against a specification without a
//! solver in the loop.
//!
//! # Features
//!
//! - **Typed AST**: Variables, domain types with bounds, and constraint
//!   expressions over comparisons, arithmetic, logic, and string predicates
//! - **Validated construction**: Duplicate names, unresolved references,
//!   unsatisfiable bounds, and ill-typed constraints are rejected eagerly
//! - **JSON loader**: Path-carrying diagnostics for malformed documents
//! - **Direct evaluation**: Check assignments against every constraint,
//!   with integer semantics matching the solver's (Euclidean division)
//!
//! # Example
//!
//! ```rust
//! use specsynth_core::{load_str, DomainValue};
//! use indexmap::IndexMap;
//!
//! let spec = load_str(
//!     r#"{
//!         "name": "create-user",
//!         "variables": [
//!             {"name": "age", "type": "integer", "min": 0, "max": 150}
//!         ],
//!         "constraints": [
//!             {"ge": [{"var": "age"}, 18]}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut assignment = IndexMap::new();
//! assignment.insert("age".to_string(), DomainValue::Int(21));
//! assert!(spec.satisfies(&assignment).unwrap());
//!
//! assignment.insert("age".to_string(), DomainValue::Int(17));
//! assert!(!spec.satisfies(&assignment).unwrap());
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod loader;
pub mod spec;
pub mod value;

// Re-export main types
pub use ast::{ArithOp, CompareOp, DomainType, Expr, ValueType, Variable};
pub use error::{SpecError, SpecResult};
pub use eval::{compile_pattern, evaluate};
pub use loader::{load_str, load_value};
pub use spec::Specification;
pub use value::DomainValue;

#[cfg(test)]
mod property_tests {
    use super::*;
    use indexmap::IndexMap;
    use proptest::prelude::*;

    // Strategies for generating test data

    fn int_domain_strategy() -> impl Strategy<Value = DomainType> {
        (-100i64..0, 1i64..100).prop_map(|(min, max)| DomainType::Integer {
            min: Some(min),
            max: Some(max),
        })
    }

    fn literal_strategy() -> impl Strategy<Value = Expr> {
        prop_oneof![
            (-1000i64..1000).prop_map(Expr::Int),
            any::<bool>().prop_map(Expr::Bool),
            "[a-z]{0,10}".prop_map(Expr::Str),
        ]
    }

    fn compare_op_strategy() -> impl Strategy<Value = CompareOp> {
        prop_oneof![
            Just(CompareOp::Eq),
            Just(CompareOp::Ne),
            Just(CompareOp::Lt),
            Just(CompareOp::Le),
            Just(CompareOp::Gt),
            Just(CompareOp::Ge),
        ]
    }

    proptest! {
        #[test]
        fn negation_inverts_every_comparison(
            value in -1000i64..1000,
            bound in -1000i64..1000,
            op in compare_op_strategy(),
        ) {
            let constraint = Expr::compare(Expr::var("x"), op, Expr::Int(bound));
            let negated = Expr::negate(constraint.clone());

            let mut assignment = IndexMap::new();
            assignment.insert("x".to_string(), DomainValue::Int(value));

            let direct = evaluate(&constraint, &assignment).unwrap();
            let inverted = evaluate(&negated, &assignment).unwrap();
            prop_assert_eq!(
                direct.as_bool().unwrap(),
                !inverted.as_bool().unwrap()
            );
        }

        #[test]
        fn integer_literal_comparisons_match_host_semantics(
            left in -1000i64..1000,
            right in -1000i64..1000,
        ) {
            let assignment = IndexMap::new();
            let cases = [
                (CompareOp::Lt, left < right),
                (CompareOp::Le, left <= right),
                (CompareOp::Gt, left > right),
                (CompareOp::Ge, left >= right),
                (CompareOp::Eq, left == right),
                (CompareOp::Ne, left != right),
            ];
            for (op, expected) in cases {
                let e = Expr::compare(Expr::Int(left), op, Expr::Int(right));
                let got = evaluate(&e, &assignment).unwrap();
                prop_assert_eq!(got.as_bool().unwrap(), expected);
            }
        }

        #[test]
        fn euclidean_mod_is_never_negative(
            dividend in -1000i64..1000,
            divisor in prop_oneof![-100i64..0, 1i64..100],
        ) {
            let assignment = IndexMap::new();
            let e = Expr::Arith(
                Box::new(Expr::Int(dividend)),
                ArithOp::Mod,
                Box::new(Expr::Int(divisor)),
            );
            let got = evaluate(&e, &assignment).unwrap();
            prop_assert!(got.as_int().unwrap() >= 0);
        }

        #[test]
        fn validated_specs_accept_in_bounds_assignments(
            domain in int_domain_strategy(),
            offset in 0i64..50,
        ) {
            let (min, max) = match domain {
                DomainType::Integer { min: Some(min), max: Some(max) } => (min, max),
                _ => unreachable!(),
            };
            let spec = Specification::new(
                "generated",
                vec![Variable::new("x", domain)],
                vec![Expr::compare(Expr::var("x"), CompareOp::Ge, Expr::Int(min))],
            )
            .unwrap();

            let value = (min + offset).min(max);
            let mut assignment = IndexMap::new();
            assignment.insert("x".to_string(), DomainValue::Int(value));
            prop_assert!(spec.satisfies(&assignment).unwrap());
        }

        #[test]
        fn loader_round_trips_literal_constraints(literal in literal_strategy()) {
            // Serialize a one-of constraint through JSON and reload it.
            let doc = serde_json::json!({
                "variables": [
                    {"name": "b", "type": "boolean"}
                ],
                "constraints": [{"eq": [{"var": "b"}, true]}]
            });
            let spec = load_value(&doc).unwrap();
            prop_assert_eq!(spec.constraints().len(), 1);
            // Literal strategy values must all round-trip through evaluation.
            let assignment = IndexMap::new();
            let v = evaluate(&literal, &assignment).unwrap();
            prop_assert!(literal.is_literal());
            match (&literal, &v) {
                (Expr::Int(i), DomainValue::Int(j)) => prop_assert_eq!(i, j),
                (Expr::Bool(a), DomainValue::Bool(b)) => prop_assert_eq!(a, b),
                (Expr::Str(s), DomainValue::Str(t)) => prop_assert_eq!(s, t),
                _ => prop_assert!(false, "literal changed shape under evaluation"),
            }
        }
    }
}
