//! Specification: declared variables plus validated top-level constraints
//!
//! A [`Specification`] is built once per synthesis request and is read-only
//! afterwards. Construction validates the whole constraint tree eagerly:
//! unresolved references, duplicate declarations, unsatisfiable bounds, and
//! type errors all fail here, never at solving time.

use indexmap::IndexMap;

use crate::ast::{ArithOp, CompareOp, DomainType, Expr, ValueType, Variable};
use crate::error::{SpecError, SpecResult};

/// A validated specification
///
/// The top-level constraints form an implicit conjunction.
#[derive(Debug, Clone)]
pub struct Specification {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Expr>,
}

impl Specification {
    /// Build and validate a specification
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::DuplicateVariable`], [`SpecError::InvalidBounds`],
    /// [`SpecError::UnresolvedVariable`], [`SpecError::TypeMismatch`], or
    /// [`SpecError::InvalidPattern`] when the declarations or the constraint
    /// tree are inconsistent.
    pub fn new(
        name: impl Into<String>,
        variables: Vec<Variable>,
        constraints: Vec<Expr>,
    ) -> SpecResult<Self> {
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for var in &variables {
            if seen.insert(var.name.as_str(), ()).is_some() {
                return Err(SpecError::DuplicateVariable(var.name.clone()));
            }
            validate_domain(var)?;
        }

        let spec = Self {
            name: name.into(),
            variables,
            constraints,
        };

        for constraint in &spec.constraints {
            let ty = spec.type_of(constraint)?;
            if ty != ValueType::Bool {
                return Err(SpecError::TypeMismatch {
                    context: format!("top-level {}", constraint.describe()),
                    expected: ValueType::Bool.to_string(),
                    actual: ty.to_string(),
                });
            }
        }

        Ok(spec)
    }

    /// Specification name (used in diagnostics)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variable declarations in declaration order
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Top-level conjuncts in document order
    #[must_use]
    pub fn constraints(&self) -> &[Expr] {
        &self.constraints
    }

    /// Look up a declaration by name
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Static type of an expression within this specification's scope
    ///
    /// # Errors
    ///
    /// Returns the same construction-time errors as [`Specification::new`]
    /// for trees that do not type-check against the declarations.
    pub fn type_of(&self, expr: &Expr) -> SpecResult<ValueType> {
        match expr {
            Expr::Int(_) => Ok(ValueType::Int),
            Expr::Real(_) => Ok(ValueType::Real),
            Expr::Bool(_) => Ok(ValueType::Bool),
            Expr::Str(_) => Ok(ValueType::Str),
            Expr::Var(name) => self
                .variable(name)
                .map(|v| v.domain.value_type())
                .ok_or_else(|| SpecError::UnresolvedVariable(name.clone())),
            Expr::Compare(left, op, right) => {
                let lt = self.type_of(left)?;
                let rt = self.type_of(right)?;
                let compatible = if op.is_ordering() {
                    lt.is_numeric() && rt.is_numeric()
                } else {
                    (lt.is_numeric() && rt.is_numeric()) || lt == rt
                };
                if !compatible || matches!(lt, ValueType::Array(_)) {
                    return Err(SpecError::TypeMismatch {
                        context: format!("comparison '{}'", op.keyword()),
                        expected: if op.is_ordering() {
                            "numeric operands".to_string()
                        } else {
                            format!("operands of one type, left is {lt}")
                        },
                        actual: rt.to_string(),
                    });
                }
                Ok(ValueType::Bool)
            }
            Expr::And(children) | Expr::Or(children) => {
                if children.is_empty() {
                    return Err(SpecError::TypeMismatch {
                        context: expr.describe().to_string(),
                        expected: "at least one operand".to_string(),
                        actual: "none".to_string(),
                    });
                }
                for child in children {
                    self.expect_type(child, &ValueType::Bool, expr.describe())?;
                }
                Ok(ValueType::Bool)
            }
            Expr::Not(inner) => {
                self.expect_type(inner, &ValueType::Bool, "not")?;
                Ok(ValueType::Bool)
            }
            Expr::Arith(left, op, right) => {
                let lt = self.numeric_type(left, op.keyword())?;
                let rt = self.numeric_type(right, op.keyword())?;
                match op {
                    ArithOp::Mod => {
                        if lt != ValueType::Int || rt != ValueType::Int {
                            return Err(SpecError::TypeMismatch {
                                context: "arithmetic 'mod'".to_string(),
                                expected: ValueType::Int.to_string(),
                                actual: if lt == ValueType::Int { rt } else { lt }.to_string(),
                            });
                        }
                        Ok(ValueType::Int)
                    }
                    _ => {
                        if lt == ValueType::Int && rt == ValueType::Int {
                            Ok(ValueType::Int)
                        } else {
                            Ok(ValueType::Real)
                        }
                    }
                }
            }
            Expr::Neg(inner) => self.numeric_type(inner, "negation"),
            Expr::Length(inner) => {
                let ty = self.type_of(inner)?;
                match ty {
                    ValueType::Str | ValueType::Array(_) => Ok(ValueType::Int),
                    other => Err(SpecError::TypeMismatch {
                        context: "length".to_string(),
                        expected: "string or array".to_string(),
                        actual: other.to_string(),
                    }),
                }
            }
            Expr::Contains(haystack, needle) => {
                self.expect_type(haystack, &ValueType::Str, "contains")?;
                self.expect_type(needle, &ValueType::Str, "contains")?;
                Ok(ValueType::Bool)
            }
            Expr::Matches(subject, pattern) => {
                self.expect_type(subject, &ValueType::Str, "matches")?;
                crate::eval::compile_pattern(pattern)?;
                Ok(ValueType::Bool)
            }
            Expr::OneOf(subject, options) => {
                let st = self.type_of(subject)?;
                if options.is_empty() {
                    return Err(SpecError::TypeMismatch {
                        context: "one-of".to_string(),
                        expected: "at least one option".to_string(),
                        actual: "none".to_string(),
                    });
                }
                for option in options {
                    if !option.is_literal() {
                        return Err(SpecError::TypeMismatch {
                            context: "one-of".to_string(),
                            expected: "literal option".to_string(),
                            actual: option.describe().to_string(),
                        });
                    }
                    let ot = self.type_of(option)?;
                    let compatible = (st.is_numeric() && ot.is_numeric()) || st == ot;
                    if !compatible {
                        return Err(SpecError::TypeMismatch {
                            context: "one-of".to_string(),
                            expected: st.to_string(),
                            actual: ot.to_string(),
                        });
                    }
                }
                Ok(ValueType::Bool)
            }
        }
    }

    fn expect_type(&self, expr: &Expr, expected: &ValueType, context: &str) -> SpecResult<()> {
        let actual = self.type_of(expr)?;
        if &actual == expected {
            Ok(())
        } else {
            Err(SpecError::TypeMismatch {
                context: context.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    fn numeric_type(&self, expr: &Expr, context: &str) -> SpecResult<ValueType> {
        let ty = self.type_of(expr)?;
        if ty.is_numeric() {
            Ok(ty)
        } else {
            Err(SpecError::TypeMismatch {
                context: context.to_string(),
                expected: "numeric operand".to_string(),
                actual: ty.to_string(),
            })
        }
    }
}

fn validate_domain(var: &Variable) -> SpecResult<()> {
    match &var.domain {
        DomainType::Integer {
            min: Some(min),
            max: Some(max),
        } if min > max => Err(SpecError::InvalidBounds {
            name: var.name.clone(),
            message: format!("min {min} exceeds max {max}"),
        }),
        DomainType::Real {
            min: Some(min),
            max: Some(max),
        } if min > max => Err(SpecError::InvalidBounds {
            name: var.name.clone(),
            message: format!("min {min} exceeds max {max}"),
        }),
        DomainType::Real { min, max } => {
            for bound in [min, max].into_iter().flatten() {
                if !bound.is_finite() {
                    return Err(SpecError::InvalidBounds {
                        name: var.name.clone(),
                        message: "bounds must be finite".to_string(),
                    });
                }
            }
            Ok(())
        }
        DomainType::Enumeration { values } if values.is_empty() => Err(SpecError::InvalidBounds {
            name: var.name.clone(),
            message: "enumeration has no members".to_string(),
        }),
        DomainType::Array { element, .. } => validate_domain(&Variable::new(
            format!("{}[]", var.name),
            element.as_ref().clone(),
        )),
        _ => Ok(()),
    }
}
