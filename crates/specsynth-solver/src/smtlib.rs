//! SMT-LIB2 encoding of specifications
//!
//! Translates a validated [`Specification`] into SMT-LIB2 text: one
//! `declare-const` per variable, bound assertions derived from the domain
//! declarations, and one encoded term per top-level constraint. Encoding is
//! deterministic: the same specification always produces byte-identical
//! output, in declaration order.
//!
//! `matches` patterns from a simple subset (literal characters, escapes,
//! `\d`, `.`, character classes, and `*`/`+`/`?` on single units) encode
//! natively as `str.in_re` terms. Everything else is encoded as a weaker
//! approximation, with the predicate index recorded so extraction can
//! re-validate it exactly:
//!
//! - `matches` outside the subset becomes a minimum-length bound on the
//!   subject
//! - arrays are represented only by a companion integer length variable
//!   (`{symbol}__len`), so array-valued constraints beyond `len` are rejected

use indexmap::IndexMap;
use specsynth_core::{ArithOp, CompareOp, DomainType, Expr, Specification, ValueType};
use tracing::debug;

use crate::error::{SolverError, SolverResult};

/// What a declared SMT constant stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// The variable's own value
    Value,
    /// The element count of an array variable
    ArrayLength,
}

/// Bijection between specification variables and SMT symbols
///
/// Symbols are sanitized to the SMT-LIB2 simple-symbol alphabet and
/// uniquified, so hostile variable names cannot collide or break the
/// wire syntax.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    values: IndexMap<String, String>,
    lengths: IndexMap<String, String>,
    origins: IndexMap<String, (String, SymbolKind)>,
}

impl SymbolTable {
    /// SMT symbol holding the variable's value, if one was declared
    #[must_use]
    pub fn symbol(&self, variable: &str) -> Option<&str> {
        self.values.get(variable).map(String::as_str)
    }

    /// SMT symbol holding an array variable's length
    #[must_use]
    pub fn length_symbol(&self, variable: &str) -> Option<&str> {
        self.lengths.get(variable).map(String::as_str)
    }

    /// Resolve a model symbol back to its variable and role
    #[must_use]
    pub fn origin(&self, symbol: &str) -> Option<(&str, SymbolKind)> {
        self.origins
            .get(symbol)
            .map(|(name, kind)| (name.as_str(), *kind))
    }

    fn intern(&mut self, variable: &str, kind: SymbolKind) -> String {
        let base = sanitize(variable);
        let base = if kind == SymbolKind::ArrayLength {
            format!("{base}__len")
        } else {
            base
        };
        let mut symbol = base.clone();
        let mut suffix = 1;
        while self.origins.contains_key(&symbol) {
            symbol = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.origins
            .insert(symbol.clone(), (variable.to_string(), kind));
        match kind {
            SymbolKind::Value => self.values.insert(variable.to_string(), symbol.clone()),
            SymbolKind::ArrayLength => self.lengths.insert(variable.to_string(), symbol.clone()),
        };
        symbol
    }
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'v');
    }
    out
}

/// One encoded top-level constraint
#[derive(Debug, Clone)]
pub struct EncodedPredicate {
    /// Index into [`Specification::constraints`]
    pub index: usize,
    /// SMT-LIB2 term, ready to wrap in `(assert ...)`
    pub term: String,
    /// True when the term is a weaker approximation of the constraint
    pub approximated: bool,
}

/// Full SMT encoding of a specification
#[derive(Debug, Clone)]
pub struct EncodedSpec {
    /// `declare-const` commands, one per declared SMT symbol
    pub declarations: Vec<String>,
    /// Terms for the domain bounds, asserted once at the base scope
    pub bounds: Vec<String>,
    /// Encoded top-level constraints in document order
    pub predicates: Vec<EncodedPredicate>,
    /// Symbol bijection for model extraction
    pub symbols: SymbolTable,
}

impl EncodedSpec {
    /// Indices of predicates whose encoding is approximate
    #[must_use]
    pub fn approximated_indices(&self) -> Vec<usize> {
        self.predicates
            .iter()
            .filter(|p| p.approximated)
            .map(|p| p.index)
            .collect()
    }
}

/// Encode a specification as SMT-LIB2
///
/// # Errors
///
/// Returns [`SolverError::UnsupportedConstruct`] for array-valued
/// expressions outside `len`, and propagates type resolution failures
/// from the specification (which validated construction already rules
/// out for its own constraint trees).
pub fn encode(spec: &Specification) -> SolverResult<EncodedSpec> {
    let mut symbols = SymbolTable::default();
    let mut declarations = Vec::new();
    let mut bounds = Vec::new();

    for var in spec.variables() {
        declare_variable(var.name.as_str(), &var.domain, &mut symbols, &mut declarations, &mut bounds);
    }

    let mut predicates = Vec::with_capacity(spec.constraints().len());
    for (index, constraint) in spec.constraints().iter().enumerate() {
        let mut approximated = false;
        let term = encode_expr(spec, &symbols, constraint, &mut approximated)?;
        predicates.push(EncodedPredicate {
            index,
            term,
            approximated,
        });
    }

    debug!(
        spec = spec.name(),
        declarations = declarations.len(),
        predicates = predicates.len(),
        approximated = predicates.iter().filter(|p| p.approximated).count(),
        "encoded specification"
    );

    Ok(EncodedSpec {
        declarations,
        bounds,
        predicates,
        symbols,
    })
}

fn declare_variable(
    name: &str,
    domain: &DomainType,
    symbols: &mut SymbolTable,
    declarations: &mut Vec<String>,
    bounds: &mut Vec<String>,
) {
    match domain {
        DomainType::Integer { min, max } => {
            let sym = symbols.intern(name, SymbolKind::Value);
            declarations.push(format!("(declare-const {sym} Int)"));
            if let Some(min) = min {
                bounds.push(format!("(>= {sym} {})", int_literal(*min)));
            }
            if let Some(max) = max {
                bounds.push(format!("(<= {sym} {})", int_literal(*max)));
            }
        }
        DomainType::Real { min, max } => {
            let sym = symbols.intern(name, SymbolKind::Value);
            declarations.push(format!("(declare-const {sym} Real)"));
            if let Some(min) = min {
                bounds.push(format!("(>= {sym} {})", real_literal(*min)));
            }
            if let Some(max) = max {
                bounds.push(format!("(<= {sym} {})", real_literal(*max)));
            }
        }
        DomainType::Boolean => {
            let sym = symbols.intern(name, SymbolKind::Value);
            declarations.push(format!("(declare-const {sym} Bool)"));
        }
        DomainType::String { max_length } => {
            let sym = symbols.intern(name, SymbolKind::Value);
            declarations.push(format!("(declare-const {sym} String)"));
            if let Some(max) = max_length {
                bounds.push(format!("(<= (str.len {sym}) {max})"));
            }
        }
        DomainType::Enumeration { values } => {
            let sym = symbols.intern(name, SymbolKind::Value);
            declarations.push(format!("(declare-const {sym} String)"));
            let members: Vec<String> = values
                .iter()
                .map(|v| format!("(= {sym} {})", string_literal(v)))
                .collect();
            bounds.push(disjunction(&members));
        }
        DomainType::Array { max_length, .. } => {
            // Arrays are abstracted to their length; the extractor
            // materializes elements from the element domain's defaults.
            let sym = symbols.intern(name, SymbolKind::ArrayLength);
            declarations.push(format!("(declare-const {sym} Int)"));
            bounds.push(format!("(>= {sym} 0)"));
            if let Some(max) = max_length {
                bounds.push(format!("(<= {sym} {max})"));
            }
        }
    }
}

fn encode_expr(
    spec: &Specification,
    symbols: &SymbolTable,
    expr: &Expr,
    approximated: &mut bool,
) -> SolverResult<String> {
    match expr {
        Expr::Int(n) => Ok(int_literal(*n)),
        Expr::Real(r) => Ok(real_literal(*r)),
        Expr::Bool(b) => Ok(b.to_string()),
        Expr::Str(s) => Ok(string_literal(s)),
        Expr::Var(name) => symbols
            .symbol(name)
            .map(str::to_string)
            .ok_or_else(|| {
                SolverError::UnsupportedConstruct(format!(
                    "array variable '{name}' used outside 'len'"
                ))
            }),
        Expr::Compare(left, op, right) => {
            let (l, r) = encode_numeric_pair(spec, symbols, left, right, approximated)?;
            Ok(match op {
                CompareOp::Eq => format!("(= {l} {r})"),
                CompareOp::Ne => format!("(not (= {l} {r}))"),
                CompareOp::Lt => format!("(< {l} {r})"),
                CompareOp::Le => format!("(<= {l} {r})"),
                CompareOp::Gt => format!("(> {l} {r})"),
                CompareOp::Ge => format!("(>= {l} {r})"),
            })
        }
        Expr::And(children) => {
            let parts = encode_all(spec, symbols, children, approximated)?;
            Ok(if parts.len() == 1 {
                parts.into_iter().next().unwrap_or_default()
            } else {
                format!("(and {})", parts.join(" "))
            })
        }
        Expr::Or(children) => {
            let parts = encode_all(spec, symbols, children, approximated)?;
            Ok(disjunction(&parts))
        }
        Expr::Not(inner) => {
            let e = encode_expr(spec, symbols, inner, approximated)?;
            Ok(format!("(not {e})"))
        }
        Expr::Arith(left, op, right) => {
            let int_args = spec.type_of(left)? == ValueType::Int
                && spec.type_of(right)? == ValueType::Int;
            let (l, r) = encode_numeric_pair(spec, symbols, left, right, approximated)?;
            let keyword = match op {
                ArithOp::Add => "+",
                ArithOp::Sub => "-",
                ArithOp::Mul => "*",
                ArithOp::Div if int_args => "div",
                ArithOp::Div => "/",
                ArithOp::Mod => "mod",
            };
            Ok(format!("({keyword} {l} {r})"))
        }
        Expr::Neg(inner) => {
            let e = encode_expr(spec, symbols, inner, approximated)?;
            Ok(format!("(- {e})"))
        }
        Expr::Length(inner) => match spec.type_of(inner)? {
            ValueType::Str => {
                let e = encode_expr(spec, symbols, inner, approximated)?;
                Ok(format!("(str.len {e})"))
            }
            ValueType::Array(_) => match inner.as_ref() {
                Expr::Var(name) => symbols
                    .length_symbol(name)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        SolverError::UnsupportedConstruct(format!(
                            "no length symbol for array variable '{name}'"
                        ))
                    }),
                other => Err(SolverError::UnsupportedConstruct(format!(
                    "length of non-variable array expression ({})",
                    other.describe()
                ))),
            },
            other => Err(SolverError::UnsupportedConstruct(format!(
                "length of {other}"
            ))),
        },
        Expr::Contains(haystack, needle) => {
            let h = encode_expr(spec, symbols, haystack, approximated)?;
            let n = encode_expr(spec, symbols, needle, approximated)?;
            Ok(format!("(str.contains {h} {n})"))
        }
        Expr::Matches(subject, pattern) => {
            let e = encode_expr(spec, symbols, subject, approximated)?;
            if let Some(re) = compile_simple_regex(pattern) {
                Ok(format!("(str.in_re {e} {re})"))
            } else {
                // Outside the native subset: weakened to a minimum-length
                // bound, re-checked exactly against the produced value at
                // extraction.
                *approximated = true;
                Ok(format!(
                    "(>= (str.len {e}) {})",
                    min_match_length(pattern)
                ))
            }
        }
        Expr::OneOf(subject, options) => {
            let subject_ty = spec.type_of(subject)?;
            let s = encode_expr(spec, symbols, subject, approximated)?;
            let mut members = Vec::with_capacity(options.len());
            for option in options {
                let mut o = encode_expr(spec, symbols, option, approximated)?;
                if subject_ty == ValueType::Real && spec.type_of(option)? == ValueType::Int {
                    o = format!("(to_real {o})");
                }
                members.push(format!("(= {s} {o})"));
            }
            Ok(disjunction(&members))
        }
    }
}

fn encode_all(
    spec: &Specification,
    symbols: &SymbolTable,
    children: &[Expr],
    approximated: &mut bool,
) -> SolverResult<Vec<String>> {
    children
        .iter()
        .map(|c| encode_expr(spec, symbols, c, approximated))
        .collect()
}

/// Encode a binary operand pair, coercing Int to Real when mixed
fn encode_numeric_pair(
    spec: &Specification,
    symbols: &SymbolTable,
    left: &Expr,
    right: &Expr,
    approximated: &mut bool,
) -> SolverResult<(String, String)> {
    let lt = spec.type_of(left)?;
    let rt = spec.type_of(right)?;
    let mut l = encode_expr(spec, symbols, left, approximated)?;
    let mut r = encode_expr(spec, symbols, right, approximated)?;
    if lt == ValueType::Int && rt == ValueType::Real {
        l = format!("(to_real {l})");
    } else if lt == ValueType::Real && rt == ValueType::Int {
        r = format!("(to_real {r})");
    }
    Ok((l, r))
}

fn disjunction(parts: &[String]) -> String {
    if parts.len() == 1 {
        parts[0].clone()
    } else {
        format!("(or {})", parts.join(" "))
    }
}

pub(crate) fn int_literal(n: i64) -> String {
    if n < 0 {
        format!("(- {})", n.unsigned_abs())
    } else {
        n.to_string()
    }
}

fn real_literal(r: f64) -> String {
    let magnitude = r.abs();
    let body = if magnitude.fract() == 0.0 {
        format!("{magnitude:.1}")
    } else {
        format!("{magnitude}")
    };
    if r.is_sign_negative() {
        format!("(- {body})")
    } else {
        body
    }
}

fn string_literal(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Compile a pattern from the simple subset into an SMT-LIB2 regex term
///
/// The subset is sequences of single-character units — literal characters,
/// `\`-escaped metacharacters, `\d`, `.`, and non-negated character classes
/// with ranges — each optionally followed by `*`, `+`, or `?`. Alternation,
/// groups, counted repetition, anchors, and everything else return `None`
/// and take the length-bound fallback instead.
#[must_use]
pub fn compile_simple_regex(pattern: &str) -> Option<String> {
    let mut chars = pattern.chars().peekable();
    let mut units: Vec<String> = Vec::new();
    while let Some(c) = chars.next() {
        let atom = match c {
            '|' | '(' | ')' | '{' | '}' | ']' | '^' | '$' | '*' | '+' | '?' => return None,
            '.' => "re.allchar".to_string(),
            '[' => compile_class(&mut chars)?,
            '\\' => match chars.next()? {
                'd' => "(re.range \"0\" \"9\")".to_string(),
                e @ ('.' | '\\' | '[' | ']' | '(' | ')' | '{' | '}' | '*' | '+' | '?' | '|'
                | '^' | '$' | '-' | '/') => literal_atom(e),
                _ => return None,
            },
            other => literal_atom(other),
        };
        units.push(match chars.peek() {
            Some('*') => {
                chars.next();
                format!("(re.* {atom})")
            }
            Some('+') => {
                chars.next();
                format!("(re.+ {atom})")
            }
            Some('?') => {
                chars.next();
                format!("(re.opt {atom})")
            }
            _ => atom,
        });
    }
    Some(match units.len() {
        0 => "(str.to_re \"\")".to_string(),
        1 => units.remove(0),
        _ => format!("(re.++ {})", units.join(" ")),
    })
}

fn literal_atom(c: char) -> String {
    format!("(str.to_re {})", string_literal(&c.to_string()))
}

/// Compile a character class body (after `[`, through the closing `]`)
fn compile_class(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    if chars.peek() == Some(&'^') {
        return None;
    }
    let mut members: Vec<String> = Vec::new();
    loop {
        let c = chars.next()?;
        if c == ']' {
            break;
        }
        if c == '\\' || c == '[' {
            return None;
        }
        if chars.peek() == Some(&'-') {
            chars.next();
            let hi = chars.next()?;
            // A trailing literal '-' is out of the subset
            if hi == ']' {
                return None;
            }
            members.push(format!(
                "(re.range {} {})",
                string_literal(&c.to_string()),
                string_literal(&hi.to_string())
            ));
        } else {
            members.push(literal_atom(c));
        }
    }
    match members.len() {
        0 => None,
        1 => Some(members.remove(0)),
        _ => Some(format!("(re.union {})", members.join(" "))),
    }
}

/// Shortest string any match of `pattern` can have
///
/// Conservative: returns 0 whenever the pattern uses alternation, groups,
/// counted repetition, or class escapes this scanner does not model, so the
/// approximation only ever under-constrains.
#[must_use]
pub fn min_match_length(pattern: &str) -> usize {
    if pattern.contains('|')
        || pattern.contains('(')
        || pattern.contains('{')
        || pattern.contains("\\]")
    {
        return 0;
    }
    let mut chars = pattern.chars().peekable();
    let mut count = 0usize;
    while let Some(c) = chars.next() {
        let unit = match c {
            '\\' => {
                chars.next();
                true
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
                true
            }
            '^' | '$' | '*' | '?' | '+' => false,
            _ => true,
        };
        if unit {
            match chars.peek() {
                Some('*' | '?') => {
                    chars.next();
                }
                Some('+') => {
                    chars.next();
                    count += 1;
                }
                _ => count += 1,
            }
        }
    }
    count
}

#[cfg(kani)]
mod verification {
    use super::*;

    #[kani::proof]
    fn sanitize_never_empty() {
        let c: char = kani::any();
        kani::assume(c.is_ascii());
        let name = String::from(c);
        let sym = sanitize(&name);
        assert!(!sym.is_empty());
        assert!(!sym.chars().next().unwrap().is_ascii_digit());
    }

    #[kani::proof]
    fn int_literal_never_bare_minus() {
        let n: i64 = kani::any();
        let rendered = int_literal(n);
        assert!(!rendered.starts_with('-'));
    }
}
