//! Solver model parsing
//!
//! Parses the s-expression block a solver prints for `(get-model)` into a
//! name-to-value map. Values keep their solver-level classification here;
//! mapping them onto declared variable domains (including rejecting a
//! rational assigned to an integer variable) happens in the extractor.

use indexmap::IndexMap;
use std::fmt;

use crate::error::{SolverError, SolverResult};

/// A value as printed by the solver
#[derive(Debug, Clone, PartialEq)]
pub enum SolverValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// Anything this parser does not classify (datatypes, arrays, ...)
    Other(String),
}

impl fmt::Display for SolverValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverValue::Bool(b) => write!(f, "{b}"),
            SolverValue::Int(i) => write!(f, "{i}"),
            SolverValue::Real(r) => write!(f, "{r}"),
            SolverValue::Str(s) => write!(f, "\"{s}\""),
            SolverValue::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Parsed `(get-model)` output
#[derive(Debug, Clone, Default)]
pub struct SolverModel {
    values: IndexMap<String, SolverValue>,
}

impl SolverModel {
    /// Parse the model block printed by the solver
    ///
    /// Accepts both the bare `((define-fun ...) ...)` form and the older
    /// `(model (define-fun ...) ...)` wrapper. Definitions with arguments
    /// are skipped; constant models never have any.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Protocol`] for truncated definitions.
    pub fn parse(text: &str) -> SolverResult<Self> {
        let mut values = IndexMap::new();
        let mut rest = text;
        while let Some(idx) = rest.find("define-fun") {
            let after = &rest[idx + "define-fun".len()..];
            let (definition, consumed) = parse_definition(after)?;
            if let Some((name, value)) = definition {
                values.insert(name, value);
            }
            rest = &after[consumed..];
        }
        Ok(Self { values })
    }

    /// Value assigned to a symbol, if the model defines it
    #[must_use]
    pub fn value(&self, symbol: &str) -> Option<&SolverValue> {
        self.values.get(symbol)
    }

    /// All definitions in model order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SolverValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the model defines nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Definition = Option<(String, SolverValue)>;

/// Parse one definition body: `name (args) Sort value`
///
/// Returns the definition (or `None` for non-constant definitions) and the
/// number of bytes consumed.
fn parse_definition(text: &str) -> SolverResult<(Definition, usize)> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let name = cursor.read_atom()?;
    cursor.skip_whitespace();
    let args = cursor.read_term()?;
    cursor.skip_whitespace();
    cursor.read_term()?; // sort
    cursor.skip_whitespace();
    let raw = cursor.read_term()?;

    if args.trim_start_matches('(').trim_end_matches(')').trim().is_empty() {
        Ok((Some((name, classify(&raw))), cursor.pos))
    } else {
        Ok((None, cursor.pos))
    }
}

/// Classify a solver value term syntactically
fn classify(raw: &str) -> SolverValue {
    let raw = raw.trim();
    match raw {
        "true" => return SolverValue::Bool(true),
        "false" => return SolverValue::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return SolverValue::Int(n);
    }
    if raw.contains('.') {
        if let Ok(r) = raw.parse::<f64>() {
            return SolverValue::Real(r);
        }
    }
    if let Some(stripped) = strip_application(raw, '-') {
        return match classify(stripped) {
            SolverValue::Int(n) => SolverValue::Int(-n),
            SolverValue::Real(r) => SolverValue::Real(-r),
            _ => SolverValue::Other(raw.to_string()),
        };
    }
    if let Some(stripped) = strip_application(raw, '/') {
        if let Some(r) = parse_rational(stripped) {
            return SolverValue::Real(r);
        }
    }
    if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return SolverValue::Str(inner.replace("\"\"", "\""));
    }
    SolverValue::Other(raw.to_string())
}

/// Strip `(op inner)` when `raw` is an application of the one-char operator
fn strip_application(raw: &str, op: char) -> Option<&str> {
    let inner = raw.strip_prefix('(')?.strip_suffix(')')?.trim();
    let rest = inner.strip_prefix(op)?;
    // Require a delimiter so "(/ ...)" does not match a symbol like "/="
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn parse_rational(body: &str) -> Option<f64> {
    let mut parts = body.split_whitespace();
    let numerator = classify_signed(parts.next()?)?;
    let denominator = classify_signed(parts.next()?)?;
    if parts.next().is_some() || denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

fn classify_signed(token: &str) -> Option<f64> {
    match classify(token) {
        #[allow(clippy::cast_precision_loss)]
        SolverValue::Int(n) => Some(n as f64),
        SolverValue::Real(r) => Some(r),
        _ => None,
    }
}

/// Byte cursor over a definition body
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn read_atom(&mut self) -> SolverResult<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '(' && c != ')')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(SolverError::Protocol(
                "expected symbol in model definition".to_string(),
            ));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    /// Read one term: a parenthesized s-expression, a string literal, or
    /// an atom
    fn read_term(&mut self) -> SolverResult<String> {
        match self.peek() {
            Some('(') => self.read_sexpr(),
            Some('"') => self.read_string(),
            Some(_) => self.read_atom(),
            None => Err(SolverError::Protocol(
                "truncated model definition".to_string(),
            )),
        }
    }

    fn read_sexpr(&mut self) -> SolverResult<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.text[start..self.pos].to_string());
                    }
                }
                '"' => {
                    self.pos -= 1;
                    self.read_string()?;
                }
                _ => {}
            }
        }
        Err(SolverError::Protocol(
            "unbalanced parentheses in model".to_string(),
        ))
    }

    fn read_string(&mut self) -> SolverResult<String> {
        let start = self.pos;
        self.bump(); // opening quote
        while let Some(c) = self.bump() {
            if c == '"' {
                // Doubled quote is an escaped quote, keep reading
                if self.peek() == Some('"') {
                    self.bump();
                } else {
                    return Ok(self.text[start..self.pos].to_string());
                }
            }
        }
        Err(SolverError::Protocol(
            "unterminated string in model".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_constant_definitions() {
        let model = SolverModel::parse(
            "((define-fun age () Int 21)\n (define-fun active () Bool true)\n (define-fun name () String \"alice\"))",
        )
        .unwrap();
        assert_eq!(model.len(), 3);
        assert_eq!(model.value("age"), Some(&SolverValue::Int(21)));
        assert_eq!(model.value("active"), Some(&SolverValue::Bool(true)));
        assert_eq!(
            model.value("name"),
            Some(&SolverValue::Str("alice".to_string()))
        );
    }

    #[test]
    fn accepts_model_keyword_wrapper() {
        let model =
            SolverModel::parse("(model (define-fun x () Int 3))").unwrap();
        assert_eq!(model.value("x"), Some(&SolverValue::Int(3)));
    }

    #[test]
    fn negative_integers() {
        let model = SolverModel::parse("((define-fun x () Int (- 42)))").unwrap();
        assert_eq!(model.value("x"), Some(&SolverValue::Int(-42)));
    }

    #[test]
    fn rationals_become_reals() {
        let model = SolverModel::parse("((define-fun r () Real (/ 1.0 2.0)))").unwrap();
        assert_eq!(model.value("r"), Some(&SolverValue::Real(0.5)));
        let model = SolverModel::parse("((define-fun r () Real (- (/ 3.0 4.0))))").unwrap();
        assert_eq!(model.value("r"), Some(&SolverValue::Real(-0.75)));
    }

    #[test]
    fn decimal_reals() {
        let model = SolverModel::parse("((define-fun r () Real 2.5))").unwrap();
        assert_eq!(model.value("r"), Some(&SolverValue::Real(2.5)));
    }

    #[test]
    fn doubled_quotes_unescape() {
        let model =
            SolverModel::parse("((define-fun s () String \"say \"\"hi\"\"\"))").unwrap();
        assert_eq!(
            model.value("s"),
            Some(&SolverValue::Str("say \"hi\"".to_string()))
        );
    }

    #[test]
    fn string_value_containing_parens() {
        let model = SolverModel::parse("((define-fun s () String \"(not a term)\"))").unwrap();
        assert_eq!(
            model.value("s"),
            Some(&SolverValue::Str("(not a term)".to_string()))
        );
    }

    #[test]
    fn unclassified_terms_kept_raw() {
        let model =
            SolverModel::parse("((define-fun a () (Array Int Int) ((as const (Array Int Int)) 0)))")
                .unwrap();
        assert!(matches!(
            model.value("a"),
            Some(SolverValue::Other(raw)) if raw.contains("as const")
        ));
    }

    #[test]
    fn non_constant_definitions_skipped() {
        let model = SolverModel::parse(
            "((define-fun f ((x Int)) Int (+ x 1)) (define-fun y () Int 2))",
        )
        .unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.value("y"), Some(&SolverValue::Int(2)));
    }

    #[test]
    fn truncated_definition_is_protocol_error() {
        assert!(matches!(
            SolverModel::parse("((define-fun x () Int"),
            Err(SolverError::Protocol(_))
        ));
    }

    #[test]
    fn empty_model() {
        let model = SolverModel::parse("()").unwrap();
        assert!(model.is_empty());
    }
}
