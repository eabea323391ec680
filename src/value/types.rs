//! Scalar value and data type definitions
//!
//! Supported types:
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - str: UTF-8 string
//! - bool: Boolean
//!
//! Any value may be Null.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{QueryError, QueryResult};

/// Declared column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// UTF-8 string
    Str,
    /// Boolean
    Bool,
}

impl DataType {
    /// Returns the wire name of the type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Str => "str",
            DataType::Bool => "bool",
        }
    }

    /// Parses a wire type name, accepting common aliases
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(DataType::Int),
            "float" | "double" | "real" => Some(DataType::Float),
            "str" | "string" | "text" => Some(DataType::Str),
            "bool" | "boolean" => Some(DataType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A tagged scalar value.
///
/// The set of tags is closed: every operator matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Returns true if the value is Null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type of a non-null value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::String(_) => Some(DataType::Str),
        }
    }

    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self.data_type() {
            Some(t) => t.name(),
            None => "null",
        }
    }

    /// Truthiness for predicate contexts: `Some(b)` for booleans, `None` for Null.
    ///
    /// Any other tag is a type mismatch; predicates never coerce.
    pub fn to_bool(&self, context: &str) -> QueryResult<Option<bool>> {
        match self {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            other => Err(QueryError::type_mismatch(
                context,
                format!(
                    "{} must evaluate to bool, got {}.",
                    context,
                    other.type_name()
                ),
            )),
        }
    }

    /// Returns true only for `Bool(true)`
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Numeric view used for promotion to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality used for grouping and DISTINCT.
    ///
    /// Unlike comparison, `Null` equals `Null` and NaN equals NaN here.
    /// Int and Float compare exactly, so this is an equivalence relation.
    pub fn group_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Float(a), Value::Float(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.compare(other) == Some(std::cmp::Ordering::Equal),
        }
    }

    /// Hash consistent with [`Value::group_eq`].
    ///
    /// Numbers hash through their f64 image so that `1` and `1.0` collide.
    pub fn hash_group<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(_) | Value::Float(_) => {
                2u8.hash(state);
                let f = self.as_f64().unwrap_or(0.0);
                let bits = if f.is_nan() {
                    f64::NAN.to_bits()
                } else if f == 0.0 {
                    0.0f64.to_bits()
                } else {
                    f.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Ordered key of values with grouping equality (`Null = Null`).
#[derive(Debug, Clone)]
pub struct GroupKey(pub Vec<Value>);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.group_eq(b))
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for v in &self.0 {
            v.hash_group(state);
        }
    }
}
