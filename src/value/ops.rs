//! Comparison, arithmetic and three-valued logic over [`Value`]
//!
//! Rules:
//! - Null propagates through arithmetic and comparison
//! - Int op Int stays Int and wraps on overflow
//! - Int op Float promotes the Int to Float for arithmetic
//! - Int compared with Float is exact, never rounded
//! - Division or remainder by zero yields Null
//! - Comparing incompatible tags is incomparable, which yields Null
//! - AND/OR follow Kleene logic

use std::cmp::Ordering;

use regex::Regex;

use super::types::Value;
use crate::errors::{QueryError, QueryResult};

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Arithmetic {
    pub fn symbol(&self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Sub => "-",
            Arithmetic::Mul => "*",
            Arithmetic::Div => "/",
            Arithmetic::Rem => "%",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "!=",
            Comparison::Lt => "<",
            Comparison::LtEq => "<=",
            Comparison::Gt => ">",
            Comparison::GtEq => ">=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::NotEq => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::LtEq => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::GtEq => ordering != Ordering::Less,
        }
    }
}

impl Value {
    /// Orders two non-null values of compatible tags.
    ///
    /// Returns `None` when either side is Null, the tags are incompatible,
    /// or a float comparison involves NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => compare_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Applies a comparison operator, yielding `Bool` or `Null`
    pub fn compare_op(&self, op: Comparison, other: &Value) -> Value {
        match self.compare(other) {
            Some(ordering) => Value::Bool(op.holds(ordering)),
            None => Value::Null,
        }
    }

    pub fn eq_value(&self, other: &Value) -> Value {
        self.compare_op(Comparison::Eq, other)
    }

    /// Applies an arithmetic operator
    pub fn arithmetic(&self, op: Arithmetic, rhs: &Value) -> QueryResult<Value> {
        match (self, rhs) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(a), Value::Int(b)) => Ok(int_arithmetic(op, *a, *b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                match (self.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => Ok(float_arithmetic(op, a, b)),
                    _ => Ok(Value::Null),
                }
            }
            (Value::String(a), Value::String(b)) if op == Arithmetic::Add => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            _ => Err(QueryError::incompatible_types(
                op.symbol(),
                self.type_name(),
                rhs.type_name(),
            )),
        }
    }

    pub fn add(&self, rhs: &Value) -> QueryResult<Value> {
        self.arithmetic(Arithmetic::Add, rhs)
    }

    /// Arithmetic negation
    pub fn negate(&self) -> QueryResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(QueryError::type_mismatch(
                "-",
                format!("Cannot negate a value of type {}.", other.type_name()),
            )),
        }
    }

    /// Logical NOT with Null propagation
    pub fn not(&self) -> QueryResult<Value> {
        match self.to_bool("NOT operand")? {
            Some(b) => Ok(Value::Bool(!b)),
            None => Ok(Value::Null),
        }
    }

    /// Text rendering used by `||` and CONCAT; `None` for Null
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
        }
    }

    /// String concatenation (`||`), Null-propagating
    pub fn concat(&self, rhs: &Value) -> Value {
        match (self.to_text(), rhs.to_text()) {
            (Some(a), Some(b)) => Value::String(a + &b),
            _ => Value::Null,
        }
    }

    /// SQL LIKE with `%` and `_` wildcards
    pub fn like(&self, pattern: &Value) -> QueryResult<Value> {
        match (self, pattern) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (_, Value::String(p)) => LikePattern::compile(p)?.matches(self),
            _ => Err(QueryError::incompatible_types(
                "like",
                self.type_name(),
                pattern.type_name(),
            )),
        }
    }
}

/// Exact ordering of an integer against a float.
///
/// Integers are not rounded to f64 first, so equality stays transitive
/// across Int and Float (`2^53 + 1` differs from `2^53` and from `2^53.0`).
fn compare_int_float(i: i64, f: f64) -> Option<Ordering> {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return None;
    }
    if f >= LIMIT {
        return Some(Ordering::Less);
    }
    if f < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&f),
        ordering => Some(ordering),
    }
}

/// A compiled LIKE pattern with `%` and `_` wildcards
#[derive(Debug, Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a LIKE pattern into an anchored regex
    pub fn compile(pattern: &str) -> QueryResult<Self> {
        Ok(Self {
            source: pattern.to_string(),
            regex: like_regex(pattern)?,
        })
    }

    /// The pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches a value: Null yields Null, non-strings are a type error
    pub fn matches(&self, value: &Value) -> QueryResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::Bool(self.regex.is_match(s))),
            other => Err(QueryError::incompatible_types("like", other.type_name(), "str")),
        }
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn int_arithmetic(op: Arithmetic, a: i64, b: i64) -> Value {
    match op {
        Arithmetic::Add => Value::Int(a.wrapping_add(b)),
        Arithmetic::Sub => Value::Int(a.wrapping_sub(b)),
        Arithmetic::Mul => Value::Int(a.wrapping_mul(b)),
        Arithmetic::Div if b == 0 => Value::Null,
        Arithmetic::Div => Value::Int(a.wrapping_div(b)),
        Arithmetic::Rem if b == 0 => Value::Null,
        Arithmetic::Rem => Value::Int(a.wrapping_rem(b)),
    }
}

fn float_arithmetic(op: Arithmetic, a: f64, b: f64) -> Value {
    match op {
        Arithmetic::Add => Value::Float(a + b),
        Arithmetic::Sub => Value::Float(a - b),
        Arithmetic::Mul => Value::Float(a * b),
        Arithmetic::Div | Arithmetic::Rem if b == 0.0 => Value::Null,
        Arithmetic::Div => Value::Float(a / b),
        Arithmetic::Rem => Value::Float(a % b),
    }
}

/// Kleene conjunction over `Some(bool)` / `None` (unknown)
pub fn kleene_and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// Kleene disjunction over `Some(bool)` / `None` (unknown)
pub fn kleene_or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Translates a LIKE pattern into an anchored regex
fn like_regex(pattern: &str) -> QueryResult<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if c == '%' { ".*" } else { "." });
            }
            c => literal.push(c),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    Regex::new(&source).map_err(|e| {
        QueryError::type_mismatch("like", format!("Invalid LIKE pattern '{}': {}", pattern, e))
    })
}
