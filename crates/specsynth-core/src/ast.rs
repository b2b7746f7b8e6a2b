//! Typed constraint AST
//!
//! Variables, domain types, and the constraint node tree. Trees are built
//! bottom-up from owned children, so cycles are unrepresentable; all other
//! structural invariants (reference resolution, node typing) are enforced
//! eagerly by [`Specification::new`](crate::spec::Specification::new).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain type of a declared variable, including its static bounds
///
/// This is a closed set: the loader rejects unknown type tags instead of
/// falling back to a catch-all type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DomainType {
    /// Integer with optional inclusive range
    Integer {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    /// Real with optional inclusive range
    Real {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Boolean
    Boolean,
    /// String with optional maximum length (in characters)
    String {
        #[serde(default)]
        max_length: Option<u32>,
    },
    /// One of a fixed set of string members
    Enumeration { values: Vec<String> },
    /// Array of a fixed element type with optional maximum length
    Array {
        element: Box<DomainType>,
        #[serde(default)]
        max_length: Option<u32>,
    },
}

impl DomainType {
    /// The static type a variable of this domain carries in expressions
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            DomainType::Integer { .. } => ValueType::Int,
            DomainType::Real { .. } => ValueType::Real,
            DomainType::Boolean => ValueType::Bool,
            DomainType::String { .. } | DomainType::Enumeration { .. } => ValueType::Str,
            DomainType::Array { element, .. } => ValueType::Array(Box::new(element.value_type())),
        }
    }

    /// Short tag for diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DomainType::Integer { .. } => "integer",
            DomainType::Real { .. } => "real",
            DomainType::Boolean => "boolean",
            DomainType::String { .. } => "string",
            DomainType::Enumeration { .. } => "enumeration",
            DomainType::Array { .. } => "array",
        }
    }
}

/// Static type of an expression node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Real,
    Bool,
    Str,
    Array(Box<ValueType>),
}

impl ValueType {
    /// True for `Int` and `Real`
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Real)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "integer"),
            ValueType::Real => write!(f, "real"),
            ValueType::Bool => write!(f, "boolean"),
            ValueType::Str => write!(f, "string"),
            ValueType::Array(elem) => write!(f, "array of {elem}"),
        }
    }
}

/// A declared variable: unique name plus domain type, immutable once declared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(flatten)]
    pub domain: DomainType,
}

impl Variable {
    /// Create a variable declaration
    #[must_use]
    pub fn new(name: impl Into<String>, domain: DomainType) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// True for operators that require numeric operands
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge
        )
    }

    /// Loader keyword for this operator
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
        }
    }
}

/// Arithmetic operator over numeric subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    /// Loader keyword for this operator
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

/// A constraint node
///
/// Forms a tree over literals, variable references, logical combinators,
/// comparisons, arithmetic, and string predicates. `Matches` holds its
/// pattern as a literal because the SMT encoding has to inspect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Real literal
    Real(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// Reference to a declared variable
    Var(String),
    /// Binary comparison
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    /// Conjunction over one or more children
    And(Vec<Expr>),
    /// Disjunction over one or more children
    Or(Vec<Expr>),
    /// Negation
    Not(Box<Expr>),
    /// Binary arithmetic
    Arith(Box<Expr>, ArithOp, Box<Expr>),
    /// Unary numeric negation
    Neg(Box<Expr>),
    /// Length of a string (characters) or an array (elements)
    Length(Box<Expr>),
    /// Substring containment
    Contains(Box<Expr>, Box<Expr>),
    /// Full-string regular expression match
    Matches(Box<Expr>, String),
    /// Membership in a fixed set of literal options
    OneOf(Box<Expr>, Vec<Expr>),
}

impl Expr {
    /// Variable reference
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Binary comparison, boxing both operands
    #[must_use]
    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Expr::Compare(Box::new(left), op, Box::new(right))
    }

    /// Negation, boxing the operand
    #[must_use]
    pub fn negate(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    /// Short operator name used in diagnostics
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Int(_) => "integer literal",
            Expr::Real(_) => "real literal",
            Expr::Bool(_) => "boolean literal",
            Expr::Str(_) => "string literal",
            Expr::Var(_) => "variable reference",
            Expr::Compare(..) => "comparison",
            Expr::And(_) => "and",
            Expr::Or(_) => "or",
            Expr::Not(_) => "not",
            Expr::Arith(..) => "arithmetic",
            Expr::Neg(_) => "negation",
            Expr::Length(_) => "length",
            Expr::Contains(..) => "contains",
            Expr::Matches(..) => "matches",
            Expr::OneOf(..) => "one-of",
        }
    }

    /// True for plain literal nodes
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Int(_) | Expr::Real(_) | Expr::Bool(_) | Expr::Str(_)
        )
    }
}
