//! Specification document loader
//!
//! Parses a JSON specification document into a validated
//! [`Specification`]. Variable declarations are resolved before any
//! constraint expression is parsed, since expressions reference variables by
//! name. Every parse diagnostic carries the document path of the offending
//! node (e.g. `constraints[2].left`).
//!
//! # Document format
//!
//! ```json
//! {
//!   "name": "create-user",
//!   "variables": [
//!     {"name": "age", "type": "integer", "min": 0, "max": 150},
//!     {"name": "role", "type": "enumeration", "values": ["user", "admin"]}
//!   ],
//!   "constraints": [
//!     {"ge": [{"var": "age"}, 18]},
//!     {"in": [{"var": "role"}, ["user", "admin"]]}
//!   ]
//! }
//! ```
//!
//! An expression is a JSON literal (number, string, or boolean), a
//! `{"var": name}` reference, or an object with exactly one operator key:
//!
//! - `and` / `or` — array of boolean children (at least one)
//! - `not`, `neg`, `len` — single child
//! - `eq`, `ne`, `lt`, `le`, `gt`, `ge` — pair `[left, right]`
//! - `add`, `sub`, `mul`, `div`, `mod` — pair `[left, right]`
//! - `contains` — pair `[haystack, needle]`
//! - `matches` — pair `[subject, "pattern"]` with a literal pattern
//! - `in` — pair `[subject, [literal, ...]]`
//!
//! Numbers with a fractional part load as reals, all others as integers.
//! Unknown top-level document keys are ignored for forward compatibility;
//! unknown variable `type` tags are rejected.

use serde_json::Value;
use tracing::debug;

use crate::ast::{ArithOp, CompareOp, DomainType, Expr, Variable};
use crate::error::{SpecError, SpecResult};
use crate::spec::Specification;

/// Load a specification from JSON text
///
/// # Errors
///
/// Returns [`SpecError::Parse`] for malformed documents,
/// [`SpecError::UnsupportedDomainType`] for unknown variable types, and any
/// validation error from [`Specification::new`].
pub fn load_str(document: &str) -> SpecResult<Specification> {
    let value: Value = serde_json::from_str(document).map_err(|e| SpecError::Parse {
        path: "$".to_string(),
        message: e.to_string(),
    })?;
    load_value(&value)
}

/// Load a specification from an already-parsed JSON value
///
/// # Errors
///
/// Same as [`load_str`].
pub fn load_value(document: &Value) -> SpecResult<Specification> {
    let root = document
        .as_object()
        .ok_or_else(|| parse_error("$", "document must be an object"))?;

    let name = match root.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(parse_error("name", "must be a string")),
        None => "unnamed".to_string(),
    };

    let variables = match root.get("variables") {
        Some(Value::Array(entries)) => {
            let mut vars = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                vars.push(parse_variable(entry, &format!("variables[{i}]"))?);
            }
            vars
        }
        Some(_) => return Err(parse_error("variables", "must be an array")),
        None => Vec::new(),
    };

    let constraints = match root.get("constraints") {
        Some(Value::Array(entries)) => {
            let mut exprs = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                exprs.push(parse_expr(entry, &format!("constraints[{i}]"))?);
            }
            exprs
        }
        Some(_) => return Err(parse_error("constraints", "must be an array")),
        None => Vec::new(),
    };

    debug!(
        name = %name,
        variables = variables.len(),
        constraints = constraints.len(),
        "loaded specification document"
    );

    Specification::new(name, variables, constraints)
}

fn parse_variable(entry: &Value, path: &str) -> SpecResult<Variable> {
    let obj = entry
        .as_object()
        .ok_or_else(|| parse_error(path, "variable must be an object"))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error(&format!("{path}.name"), "missing or non-string"))?;

    let domain = parse_domain(entry, &format!("{path}.type"))?;
    Ok(Variable::new(name, domain))
}

fn parse_domain(entry: &Value, type_path: &str) -> SpecResult<DomainType> {
    let tag = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error(type_path, "missing or non-string"))?;

    match tag {
        "integer" => Ok(DomainType::Integer {
            min: opt_i64(entry, "min", type_path)?,
            max: opt_i64(entry, "max", type_path)?,
        }),
        "real" => Ok(DomainType::Real {
            min: opt_f64(entry, "min", type_path)?,
            max: opt_f64(entry, "max", type_path)?,
        }),
        "boolean" => Ok(DomainType::Boolean),
        "string" => Ok(DomainType::String {
            max_length: opt_u32(entry, "max_length", type_path)?,
        }),
        "enumeration" => {
            let values = entry
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| parse_error(type_path, "enumeration requires a 'values' array"))?;
            let mut members = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                let s = v.as_str().ok_or_else(|| {
                    parse_error(&format!("{type_path}.values[{i}]"), "must be a string")
                })?;
                members.push(s.to_string());
            }
            Ok(DomainType::Enumeration { values: members })
        }
        "array" => {
            let element = entry
                .get("element")
                .ok_or_else(|| parse_error(type_path, "array requires an 'element' object"))?;
            let element = parse_domain(element, &format!("{type_path}.element"))?;
            Ok(DomainType::Array {
                element: Box::new(element),
                max_length: opt_u32(entry, "max_length", type_path)?,
            })
        }
        other => Err(SpecError::UnsupportedDomainType {
            path: type_path.to_string(),
            found: other.to_string(),
        }),
    }
}

fn parse_expr(value: &Value, path: &str) -> SpecResult<Expr> {
    match value {
        Value::Bool(b) => Ok(Expr::Bool(*b)),
        Value::String(s) => Ok(Expr::Str(s.clone())),
        Value::Number(_) => parse_number(value, path),
        Value::Object(obj) => {
            if obj.len() != 1 {
                return Err(parse_error(
                    path,
                    "expression object must have exactly one operator key",
                ));
            }
            // len == 1 checked above
            let (key, arg) = obj.iter().next().ok_or_else(|| {
                parse_error(path, "expression object must have exactly one operator key")
            })?;
            parse_operator(key, arg, path)
        }
        _ => Err(parse_error(
            path,
            "expected literal, variable reference, or operator object",
        )),
    }
}

fn parse_operator(key: &str, arg: &Value, path: &str) -> SpecResult<Expr> {
    let arg_path = format!("{path}.{key}");
    match key {
        "var" => {
            let name = arg
                .as_str()
                .ok_or_else(|| parse_error(&arg_path, "variable name must be a string"))?;
            Ok(Expr::Var(name.to_string()))
        }
        "and" | "or" => {
            let children = expr_list(arg, &arg_path)?;
            if children.is_empty() {
                return Err(parse_error(&arg_path, "requires at least one child"));
            }
            if key == "and" {
                Ok(Expr::And(children))
            } else {
                Ok(Expr::Or(children))
            }
        }
        "not" => Ok(Expr::Not(Box::new(parse_expr(arg, &arg_path)?))),
        "neg" => Ok(Expr::Neg(Box::new(parse_expr(arg, &arg_path)?))),
        "len" => Ok(Expr::Length(Box::new(parse_expr(arg, &arg_path)?))),
        "eq" | "ne" | "lt" | "le" | "gt" | "ge" => {
            let (left, right) = expr_pair(arg, &arg_path)?;
            let op = match key {
                "eq" => CompareOp::Eq,
                "ne" => CompareOp::Ne,
                "lt" => CompareOp::Lt,
                "le" => CompareOp::Le,
                "gt" => CompareOp::Gt,
                _ => CompareOp::Ge,
            };
            Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
        }
        "add" | "sub" | "mul" | "div" | "mod" => {
            let (left, right) = expr_pair(arg, &arg_path)?;
            let op = match key {
                "add" => ArithOp::Add,
                "sub" => ArithOp::Sub,
                "mul" => ArithOp::Mul,
                "div" => ArithOp::Div,
                _ => ArithOp::Mod,
            };
            Ok(Expr::Arith(Box::new(left), op, Box::new(right)))
        }
        "contains" => {
            let (haystack, needle) = expr_pair(arg, &arg_path)?;
            Ok(Expr::Contains(Box::new(haystack), Box::new(needle)))
        }
        "matches" => {
            let items = arg
                .as_array()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| parse_error(&arg_path, "requires [subject, pattern]"))?;
            let subject = parse_expr(&items[0], &format!("{arg_path}[0]"))?;
            let pattern = items[1]
                .as_str()
                .ok_or_else(|| parse_error(&format!("{arg_path}[1]"), "pattern must be a string"))?;
            Ok(Expr::Matches(Box::new(subject), pattern.to_string()))
        }
        "in" => {
            let items = arg
                .as_array()
                .filter(|a| a.len() == 2)
                .ok_or_else(|| parse_error(&arg_path, "requires [subject, options]"))?;
            let subject = parse_expr(&items[0], &format!("{arg_path}[0]"))?;
            let options = items[1].as_array().ok_or_else(|| {
                parse_error(&format!("{arg_path}[1]"), "options must be an array")
            })?;
            let mut literals = Vec::with_capacity(options.len());
            for (i, option) in options.iter().enumerate() {
                let option_path = format!("{arg_path}[1][{i}]");
                let literal = parse_expr(option, &option_path)?;
                if !literal.is_literal() {
                    return Err(parse_error(&option_path, "options must be literals"));
                }
                literals.push(literal);
            }
            Ok(Expr::OneOf(Box::new(subject), literals))
        }
        other => Err(parse_error(path, &format!("unknown operator '{other}'"))),
    }
}

fn parse_number(value: &Value, path: &str) -> SpecResult<Expr> {
    if let Some(n) = value.as_i64() {
        return Ok(Expr::Int(n));
    }
    value
        .as_f64()
        .map(Expr::Real)
        .ok_or_else(|| parse_error(path, "number out of range"))
}

fn expr_list(arg: &Value, path: &str) -> SpecResult<Vec<Expr>> {
    let items = arg
        .as_array()
        .ok_or_else(|| parse_error(path, "expected an array of expressions"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_expr(item, &format!("{path}[{i}]")))
        .collect()
}

fn expr_pair(arg: &Value, path: &str) -> SpecResult<(Expr, Expr)> {
    let items = arg
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| parse_error(path, "expected [left, right]"))?;
    Ok((
        parse_expr(&items[0], &format!("{path}[0]"))?,
        parse_expr(&items[1], &format!("{path}[1]"))?,
    ))
}

fn parse_error(path: &str, message: &str) -> SpecError {
    SpecError::Parse {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn opt_i64(entry: &Value, key: &str, path: &str) -> SpecResult<Option<i64>> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| parse_error(&format!("{path}.{key}"), "must be an integer")),
    }
}

fn opt_f64(entry: &Value, key: &str, path: &str) -> SpecResult<Option<f64>> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| parse_error(&format!("{path}.{key}"), "must be a number")),
    }
}

fn opt_u32(entry: &Value, key: &str, path: &str) -> SpecResult<Option<u32>> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| parse_error(&format!("{path}.{key}"), "must be a non-negative integer")),
    }
}
