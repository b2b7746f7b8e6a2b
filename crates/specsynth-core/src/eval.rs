//! Direct, solver-free evaluation of constraint trees
//!
//! Evaluates an [`Expr`] against concrete values with the exact semantics the
//! SMT encoding targets: Euclidean integer division and modulo, character
//! (code point) string lengths, and full-string pattern matching. The
//! extractor uses this to re-validate predicates the encoder could only
//! approximate, and tests use it as an independent oracle for synthesized
//! instances.

use indexmap::IndexMap;
use regex::Regex;

use crate::ast::{ArithOp, CompareOp, Expr};
use crate::error::{SpecError, SpecResult};
use crate::spec::Specification;
use crate::value::DomainValue;

/// Compile a match pattern with full-string anchoring
///
/// # Errors
///
/// Returns [`SpecError::InvalidPattern`] when the regex engine rejects the
/// pattern.
pub fn compile_pattern(pattern: &str) -> SpecResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| SpecError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Evaluate an expression against concrete variable values
///
/// # Errors
///
/// Returns [`SpecError::MissingValue`] for unassigned variables,
/// [`SpecError::DivisionByZero`] for zero divisors, and
/// [`SpecError::TypeMismatch`] when a value does not fit the operator; a
/// well-typed tree evaluated against schema-conformant values only fails on
/// division by zero.
pub fn evaluate(expr: &Expr, values: &IndexMap<String, DomainValue>) -> SpecResult<DomainValue> {
    match expr {
        Expr::Int(n) => Ok(DomainValue::Int(*n)),
        Expr::Real(f) => Ok(DomainValue::Real(*f)),
        Expr::Bool(b) => Ok(DomainValue::Bool(*b)),
        Expr::Str(s) => Ok(DomainValue::Str(s.clone())),
        Expr::Var(name) => values
            .get(name)
            .cloned()
            .ok_or_else(|| SpecError::MissingValue(name.clone())),
        Expr::Compare(left, op, right) => {
            let lv = evaluate(left, values)?;
            let rv = evaluate(right, values)?;
            Ok(DomainValue::Bool(compare(&lv, *op, &rv)?))
        }
        Expr::And(children) => {
            for child in children {
                if !truth(child, values)? {
                    return Ok(DomainValue::Bool(false));
                }
            }
            Ok(DomainValue::Bool(true))
        }
        Expr::Or(children) => {
            for child in children {
                if truth(child, values)? {
                    return Ok(DomainValue::Bool(true));
                }
            }
            Ok(DomainValue::Bool(false))
        }
        Expr::Not(inner) => Ok(DomainValue::Bool(!truth(inner, values)?)),
        Expr::Arith(left, op, right) => {
            let lv = evaluate(left, values)?;
            let rv = evaluate(right, values)?;
            arith(&lv, *op, &rv)
        }
        Expr::Neg(inner) => match evaluate(inner, values)? {
            DomainValue::Int(n) => Ok(DomainValue::Int(-n)),
            DomainValue::Real(f) => Ok(DomainValue::Real(-f)),
            other => Err(type_error("negation", "numeric value", &other)),
        },
        Expr::Length(inner) => match evaluate(inner, values)? {
            #[allow(clippy::cast_possible_wrap)]
            DomainValue::Str(s) => Ok(DomainValue::Int(s.chars().count() as i64)),
            #[allow(clippy::cast_possible_wrap)]
            DomainValue::Array(items) => Ok(DomainValue::Int(items.len() as i64)),
            other => Err(type_error("length", "string or array", &other)),
        },
        Expr::Contains(haystack, needle) => {
            let hv = evaluate(haystack, values)?;
            let nv = evaluate(needle, values)?;
            match (&hv, &nv) {
                (DomainValue::Str(h), DomainValue::Str(n)) => {
                    Ok(DomainValue::Bool(h.contains(n.as_str())))
                }
                _ => Err(type_error("contains", "string operands", &hv)),
            }
        }
        Expr::Matches(subject, pattern) => {
            let sv = evaluate(subject, values)?;
            match &sv {
                DomainValue::Str(s) => {
                    let re = compile_pattern(pattern)?;
                    Ok(DomainValue::Bool(re.is_match(s)))
                }
                _ => Err(type_error("matches", "string subject", &sv)),
            }
        }
        Expr::OneOf(subject, options) => {
            let sv = evaluate(subject, values)?;
            for option in options {
                let ov = evaluate(option, values)?;
                if compare(&sv, CompareOp::Eq, &ov)? {
                    return Ok(DomainValue::Bool(true));
                }
            }
            Ok(DomainValue::Bool(false))
        }
    }
}

/// Evaluate a boolean expression to its truth value
///
/// # Errors
///
/// Same as [`evaluate`], plus [`SpecError::TypeMismatch`] if the expression
/// does not evaluate to a boolean.
pub fn truth(expr: &Expr, values: &IndexMap<String, DomainValue>) -> SpecResult<bool> {
    match evaluate(expr, values)? {
        DomainValue::Bool(b) => Ok(b),
        other => Err(type_error(expr.describe(), "boolean result", &other)),
    }
}

impl Specification {
    /// Check every top-level constraint against concrete values
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`].
    pub fn satisfies(&self, values: &IndexMap<String, DomainValue>) -> SpecResult<bool> {
        for constraint in self.constraints() {
            if !truth(constraint, values)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Per-constraint verdicts, in document order
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`].
    pub fn check_each(&self, values: &IndexMap<String, DomainValue>) -> SpecResult<Vec<bool>> {
        self.constraints()
            .iter()
            .map(|c| truth(c, values))
            .collect()
    }
}

fn compare(left: &DomainValue, op: CompareOp, right: &DomainValue) -> SpecResult<bool> {
    if op.is_ordering() {
        // Integer pairs compare exactly; promotion to f64 is only for
        // mixed operands and loses precision past 2^53.
        if let (DomainValue::Int(l), DomainValue::Int(r)) = (left, right) {
            return Ok(match op {
                CompareOp::Lt => l < r,
                CompareOp::Le => l <= r,
                CompareOp::Gt => l > r,
                CompareOp::Ge => l >= r,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            });
        }
        let (Some(l), Some(r)) = (left.as_real(), right.as_real()) else {
            return Err(type_error("comparison", "numeric operands", left));
        };
        return Ok(match op {
            CompareOp::Lt => l < r,
            CompareOp::Le => l <= r,
            CompareOp::Gt => l > r,
            CompareOp::Ge => l >= r,
            CompareOp::Eq | CompareOp::Ne => unreachable!(),
        });
    }

    let equal = match (left, right) {
        (DomainValue::Str(a), DomainValue::Str(b)) => a == b,
        (DomainValue::Bool(a), DomainValue::Bool(b)) => a == b,
        (DomainValue::Int(a), DomainValue::Int(b)) => a == b,
        _ if left.is_numeric() && right.is_numeric() => {
            // as_real is Some for both numeric variants
            left.as_real() == right.as_real()
        }
        _ => {
            return Err(type_error(
                "comparison",
                "operands of one type",
                right,
            ))
        }
    };
    Ok(match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        _ => unreachable!(),
    })
}

fn arith(left: &DomainValue, op: ArithOp, right: &DomainValue) -> SpecResult<DomainValue> {
    if let (DomainValue::Int(l), DomainValue::Int(r)) = (left, right) {
        return match op {
            ArithOp::Add => Ok(DomainValue::Int(l.wrapping_add(*r))),
            ArithOp::Sub => Ok(DomainValue::Int(l.wrapping_sub(*r))),
            ArithOp::Mul => Ok(DomainValue::Int(l.wrapping_mul(*r))),
            // Euclidean semantics, matching SMT-LIB div/mod
            ArithOp::Div => {
                if *r == 0 {
                    Err(SpecError::DivisionByZero(format!("{l} div {r}")))
                } else {
                    Ok(DomainValue::Int(l.div_euclid(*r)))
                }
            }
            ArithOp::Mod => {
                if *r == 0 {
                    Err(SpecError::DivisionByZero(format!("{l} mod {r}")))
                } else {
                    Ok(DomainValue::Int(l.rem_euclid(*r)))
                }
            }
        };
    }

    let (Some(l), Some(r)) = (left.as_real(), right.as_real()) else {
        return Err(type_error("arithmetic", "numeric operands", left));
    };
    match op {
        ArithOp::Add => Ok(DomainValue::Real(l + r)),
        ArithOp::Sub => Ok(DomainValue::Real(l - r)),
        ArithOp::Mul => Ok(DomainValue::Real(l * r)),
        ArithOp::Div => {
            if r == 0.0 {
                Err(SpecError::DivisionByZero(format!("{l} / {r}")))
            } else {
                Ok(DomainValue::Real(l / r))
            }
        }
        ArithOp::Mod => Err(type_error("arithmetic 'mod'", "integer operands", left)),
    }
}

fn type_error(context: &str, expected: &str, actual: &DomainValue) -> SpecError {
    SpecError::TypeMismatch {
        context: context.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}
