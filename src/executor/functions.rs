//! Built-in scalar functions
//!
//! The set is fixed; names outside it are rejected when the query is
//! planned. Every function returns Null for a Null argument except
//! COALESCE, CONCAT and NULLIF, whose whole purpose is handling Null.

use crate::errors::{QueryError, QueryResult};
use crate::value::{DataType, Value};

/// Scalar functions callable from expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    Upper,
    Lower,
    Length,
    Trim,
    Abs,
    Round,
    Coalesce,
    Concat,
    Substr,
    Nullif,
}

impl ScalarFunction {
    /// Looks up a function by case-insensitive name
    pub fn parse(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "upper" => ScalarFunction::Upper,
            "lower" => ScalarFunction::Lower,
            "length" | "len" => ScalarFunction::Length,
            "trim" => ScalarFunction::Trim,
            "abs" => ScalarFunction::Abs,
            "round" => ScalarFunction::Round,
            "coalesce" => ScalarFunction::Coalesce,
            "concat" => ScalarFunction::Concat,
            "substr" | "substring" => ScalarFunction::Substr,
            "nullif" => ScalarFunction::Nullif,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Upper => "UPPER",
            ScalarFunction::Lower => "LOWER",
            ScalarFunction::Length => "LENGTH",
            ScalarFunction::Trim => "TRIM",
            ScalarFunction::Abs => "ABS",
            ScalarFunction::Round => "ROUND",
            ScalarFunction::Coalesce => "COALESCE",
            ScalarFunction::Concat => "CONCAT",
            ScalarFunction::Substr => "SUBSTR",
            ScalarFunction::Nullif => "NULLIF",
        }
    }

    /// Accepted argument count as (min, max); `None` max is variadic
    fn arity(&self) -> (usize, Option<usize>) {
        match self {
            ScalarFunction::Upper
            | ScalarFunction::Lower
            | ScalarFunction::Length
            | ScalarFunction::Trim
            | ScalarFunction::Abs => (1, Some(1)),
            ScalarFunction::Round => (1, Some(2)),
            ScalarFunction::Coalesce | ScalarFunction::Concat => (1, None),
            ScalarFunction::Substr => (2, Some(3)),
            ScalarFunction::Nullif => (2, Some(2)),
        }
    }

    /// Validates the number of arguments at plan time
    pub fn check_arity(&self, count: usize) -> QueryResult<()> {
        let (min, max) = self.arity();
        let ok = count >= min && max.map_or(true, |m| count <= m);
        if ok {
            return Ok(());
        }

        let expected = match max {
            Some(m) if m == min => format!("{}", min),
            Some(m) => format!("{} to {}", min, m),
            None => format!("at least {}", min),
        };
        Err(QueryError::type_mismatch(
            self.name(),
            format!(
                "Function {} expects {} argument(s), got {}.",
                self.name(),
                expected,
                count
            ),
        ))
    }

    /// Statically known result type, if any
    pub fn return_type(&self, args: &[Option<DataType>]) -> Option<DataType> {
        match self {
            ScalarFunction::Upper
            | ScalarFunction::Lower
            | ScalarFunction::Trim
            | ScalarFunction::Concat
            | ScalarFunction::Substr => Some(DataType::Str),
            ScalarFunction::Length => Some(DataType::Int),
            ScalarFunction::Abs | ScalarFunction::Round | ScalarFunction::Nullif => {
                args.first().copied().flatten()
            }
            ScalarFunction::Coalesce => args.iter().copied().flatten().next(),
        }
    }

    /// Applies the function to already-evaluated arguments
    pub fn invoke(&self, args: &[Value]) -> QueryResult<Value> {
        self.check_arity(args.len())?;

        match self {
            ScalarFunction::Upper => self.map_string(&args[0], |s| s.to_uppercase()),
            ScalarFunction::Lower => self.map_string(&args[0], |s| s.to_lowercase()),
            ScalarFunction::Trim => self.map_string(&args[0], |s| s.trim().to_string()),
            ScalarFunction::Length => match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(self.bad_argument(other)),
            },
            ScalarFunction::Abs => match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(self.bad_argument(other)),
            },
            ScalarFunction::Round => self.round(&args[0], args.get(1)),
            ScalarFunction::Coalesce => Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null)),
            ScalarFunction::Concat => Ok(Value::String(
                args.iter().filter_map(Value::to_text).collect(),
            )),
            ScalarFunction::Substr => self.substr(&args[0], &args[1], args.get(2)),
            ScalarFunction::Nullif => {
                if args[0].eq_value(&args[1]).is_true() {
                    Ok(Value::Null)
                } else {
                    Ok(args[0].clone())
                }
            }
        }
    }

    fn map_string(&self, value: &Value, f: impl Fn(&str) -> String) -> QueryResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(f(s))),
            other => Err(self.bad_argument(other)),
        }
    }

    fn round(&self, value: &Value, digits: Option<&Value>) -> QueryResult<Value> {
        let digits = match digits {
            None => 0,
            Some(Value::Null) => return Ok(Value::Null),
            Some(Value::Int(d)) => *d,
            Some(other) => return Err(self.bad_argument(other)),
        };
        let digits = digits.clamp(-18, 18) as i32;

        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(i) if digits >= 0 => Ok(Value::Int(*i)),
            Value::Int(i) => {
                let factor = 10f64.powi(-digits);
                Ok(Value::Int(((*i as f64 / factor).round() * factor) as i64))
            }
            Value::Float(f) => {
                let factor = 10f64.powi(digits);
                Ok(Value::Float((f * factor).round() / factor))
            }
            other => Err(self.bad_argument(other)),
        }
    }

    fn substr(&self, value: &Value, start: &Value, length: Option<&Value>) -> QueryResult<Value> {
        let s = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s,
            other => return Err(self.bad_argument(other)),
        };
        let start = match start {
            Value::Null => return Ok(Value::Null),
            Value::Int(i) => *i,
            other => return Err(self.bad_argument(other)),
        };
        let end = match length {
            None => None,
            Some(Value::Null) => return Ok(Value::Null),
            Some(Value::Int(l)) if *l < 0 => {
                return Err(QueryError::type_mismatch(
                    self.name(),
                    "Negative substring length not allowed.",
                ))
            }
            Some(Value::Int(l)) => Some(start.saturating_add(*l)),
            Some(other) => return Err(self.bad_argument(other)),
        };

        // Positions are 1-based; `end` is exclusive.
        let result: String = s
            .chars()
            .enumerate()
            .filter(|(i, _)| {
                let pos = *i as i64 + 1;
                pos >= start && end.map_or(true, |e| pos < e)
            })
            .map(|(_, c)| c)
            .collect();
        Ok(Value::String(result))
    }

    fn bad_argument(&self, value: &Value) -> QueryError {
        QueryError::type_mismatch(
            self.name(),
            format!(
                "Function {} does not accept an argument of type {}.",
                self.name(),
                value.type_name()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(ScalarFunction::parse("UPPER"), Some(ScalarFunction::Upper));
        assert_eq!(ScalarFunction::parse("substring"), Some(ScalarFunction::Substr));
        assert_eq!(ScalarFunction::parse("frobnicate"), None);
    }

    #[test]
    fn test_string_functions() {
        let s = Value::from("  Hello ");
        assert_eq!(ScalarFunction::Trim.invoke(&[s.clone()]).unwrap(), Value::from("Hello"));
        assert_eq!(ScalarFunction::Upper.invoke(&[s]).unwrap(), Value::from("  HELLO "));
        assert_eq!(
            ScalarFunction::Length.invoke(&[Value::from("héllo")]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(ScalarFunction::Lower.invoke(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_string_function_rejects_numbers() {
        let err = ScalarFunction::Upper.invoke(&[Value::Int(1)]).unwrap_err();
        assert!(err.message().contains("UPPER"));
    }

    #[test]
    fn test_round() {
        assert_eq!(
            ScalarFunction::Round.invoke(&[Value::Float(2.345), Value::Int(2)]).unwrap(),
            Value::Float(2.35)
        );
        assert_eq!(ScalarFunction::Round.invoke(&[Value::Float(2.5)]).unwrap(), Value::Float(3.0));
        assert_eq!(
            ScalarFunction::Round.invoke(&[Value::Int(1234), Value::Int(-2)]).unwrap(),
            Value::Int(1200)
        );
    }

    #[test]
    fn test_null_handling_functions() {
        assert_eq!(
            ScalarFunction::Coalesce
                .invoke(&[Value::Null, Value::Int(2), Value::Int(3)])
                .unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            ScalarFunction::Concat
                .invoke(&[Value::from("a"), Value::Null, Value::Int(1)])
                .unwrap(),
            Value::from("a1")
        );
        assert_eq!(
            ScalarFunction::Nullif.invoke(&[Value::Int(1), Value::Int(1)]).unwrap(),
            Value::Null
        );
        assert_eq!(
            ScalarFunction::Nullif.invoke(&[Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_substr_is_one_based() {
        let s = Value::from("abcdef");
        assert_eq!(
            ScalarFunction::Substr.invoke(&[s.clone(), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::from("bcd")
        );
        assert_eq!(
            ScalarFunction::Substr.invoke(&[s.clone(), Value::Int(4)]).unwrap(),
            Value::from("def")
        );
        assert_eq!(
            ScalarFunction::Substr.invoke(&[s, Value::Int(0), Value::Int(2)]).unwrap(),
            Value::from("a")
        );
    }

    #[test]
    fn test_arity_checked() {
        assert!(ScalarFunction::Abs.check_arity(2).is_err());
        assert!(ScalarFunction::Coalesce.check_arity(0).is_err());
        assert!(ScalarFunction::Coalesce.check_arity(5).is_ok());
        assert!(ScalarFunction::Round.check_arity(2).is_ok());
    }
}
