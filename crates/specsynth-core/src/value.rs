//! Concrete domain values
//!
//! A [`DomainValue`] is what synthesis ultimately produces for each declared
//! variable, and what the direct evaluator consumes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete value for a declared variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real value
    Real(f64),
    /// String value (also used for enumeration members)
    Str(String),
    /// Array of element values
    Array(Vec<DomainValue>),
}

impl DomainValue {
    /// Short type tag for diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DomainValue::Bool(_) => "boolean",
            DomainValue::Int(_) => "integer",
            DomainValue::Real(_) => "real",
            DomainValue::Str(_) => "string",
            DomainValue::Array(_) => "array",
        }
    }

    /// Get as boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DomainValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DomainValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a real, promoting integers
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            DomainValue::Real(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            DomainValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomainValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array slice
    #[must_use]
    pub fn as_array(&self) -> Option<&[DomainValue]> {
        match self {
            DomainValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// True for `Int` and `Real`
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DomainValue::Int(_) | DomainValue::Real(_))
    }
}

impl fmt::Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainValue::Bool(b) => write!(f, "{b}"),
            DomainValue::Int(i) => write!(f, "{i}"),
            DomainValue::Real(r) => write!(f, "{r}"),
            DomainValue::Str(s) => write!(f, "\"{s}\""),
            DomainValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}
