//! Instance extraction
//!
//! Maps a parsed solver model back onto the specification's variables,
//! producing a complete concrete assignment. Variables the model leaves
//! unconstrained get deterministic defaults derived from their domain, so
//! the same model always yields the same instance. Predicates that were
//! encoded approximately are re-checked exactly against the extracted
//! values with the direct evaluator.

use indexmap::IndexMap;
use serde::Serialize;
use specsynth_core::{evaluate, DomainType, DomainValue, Specification};
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::model::{SolverModel, SolverValue};
use crate::smtlib::EncodedSpec;

/// How a synthesized instance relates to the specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceLabel {
    /// Satisfies every constraint
    Satisfying,
    /// Violates exactly one constraint at an adjacent extremal value
    Boundary,
    /// Violates exactly one constraint
    Violating,
}

/// A concrete assignment for every declared variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedInstance {
    /// Values in declaration order
    pub values: IndexMap<String, DomainValue>,
    pub label: InstanceLabel,
}

impl SynthesizedInstance {
    /// Value for a variable, if declared
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&DomainValue> {
        self.values.get(name)
    }
}

/// Build an instance from a model
///
/// `skip_revalidation` names the predicate the caller asserted negated (if
/// any); its approximation check is the caller's responsibility since the
/// exact predicate is expected to be false on this instance.
///
/// # Errors
///
/// Returns [`SolverError::ModelTypeMismatch`] when a model value does not
/// fit its variable's domain, and [`SolverError::ApproximationViolation`]
/// when an approximately-encoded predicate fails its exact re-check.
pub fn extract(
    model: &SolverModel,
    spec: &Specification,
    encoded: &EncodedSpec,
    label: InstanceLabel,
    skip_revalidation: Option<usize>,
) -> SolverResult<SynthesizedInstance> {
    let mut values = IndexMap::with_capacity(spec.variables().len());
    for var in spec.variables() {
        let value = extract_variable(model, encoded, &var.name, &var.domain)?;
        values.insert(var.name.clone(), value);
    }

    for index in encoded.approximated_indices() {
        if skip_revalidation == Some(index) {
            continue;
        }
        let holds = evaluate(&spec.constraints()[index], &values)?
            .as_bool()
            .unwrap_or(false);
        if !holds {
            return Err(SolverError::ApproximationViolation {
                predicate: index,
                value: render_assignment(&values),
            });
        }
    }

    debug!(
        spec = spec.name(),
        ?label,
        variables = values.len(),
        "extracted instance"
    );

    Ok(SynthesizedInstance { values, label })
}

fn extract_variable(
    model: &SolverModel,
    encoded: &EncodedSpec,
    name: &str,
    domain: &DomainType,
) -> SolverResult<DomainValue> {
    if let DomainType::Array { element, .. } = domain {
        let len = match encoded
            .symbols
            .length_symbol(name)
            .and_then(|sym| model.value(sym))
        {
            Some(SolverValue::Int(n)) if *n >= 0 => usize::try_from(*n).unwrap_or(0),
            Some(other) => {
                return Err(mismatch(name, "non-negative integer length", other));
            }
            None => 0,
        };
        let element_default = default_value(element);
        return Ok(DomainValue::Array(vec![element_default; len]));
    }

    let solved = encoded
        .symbols
        .symbol(name)
        .and_then(|sym| model.value(sym));
    let Some(solved) = solved else {
        return Ok(default_value(domain));
    };

    match (domain, solved) {
        (DomainType::Integer { .. }, SolverValue::Int(n)) => Ok(DomainValue::Int(*n)),
        (DomainType::Real { .. }, SolverValue::Real(r)) => Ok(DomainValue::Real(*r)),
        #[allow(clippy::cast_precision_loss)]
        (DomainType::Real { .. }, SolverValue::Int(n)) => Ok(DomainValue::Real(*n as f64)),
        (DomainType::Boolean, SolverValue::Bool(b)) => Ok(DomainValue::Bool(*b)),
        (
            DomainType::String { .. } | DomainType::Enumeration { .. },
            SolverValue::Str(s),
        ) => Ok(DomainValue::Str(s.clone())),
        (_, other) => Err(mismatch(name, domain.type_name(), other)),
    }
}

fn mismatch(name: &str, expected: &str, actual: &SolverValue) -> SolverError {
    SolverError::ModelTypeMismatch {
        variable: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Deterministic default for a variable the model leaves open
fn default_value(domain: &DomainType) -> DomainValue {
    match domain {
        DomainType::Integer { min, max } => {
            DomainValue::Int(clamp_int(0, *min, *max))
        }
        DomainType::Real { min, max } => {
            let mut v = 0.0f64;
            if let Some(min) = min {
                v = v.max(*min);
            }
            if let Some(max) = max {
                v = v.min(*max);
            }
            DomainValue::Real(v)
        }
        DomainType::Boolean => DomainValue::Bool(false),
        DomainType::String { .. } => DomainValue::Str(String::new()),
        DomainType::Enumeration { values } => {
            DomainValue::Str(values.first().cloned().unwrap_or_default())
        }
        DomainType::Array { .. } => DomainValue::Array(Vec::new()),
    }
}

fn clamp_int(v: i64, min: Option<i64>, max: Option<i64>) -> i64 {
    let v = match min {
        Some(min) => v.max(min),
        None => v,
    };
    match max {
        Some(max) => v.min(max),
        None => v,
    }
}

fn render_assignment(values: &IndexMap<String, DomainValue>) -> String {
    let parts: Vec<String> = values.iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.join(", ")
}
