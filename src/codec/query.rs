//! Query document codec
//!
//! The top-level shape of a query document is fixed and decoded with
//! serde. Expressions are recursive and keyed by their first recognised
//! field, so they are walked by hand.

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::planner::{
    AggregateFunction, BinaryOperator, Expr, OrderItem, Query, SelectItem, SortDirection, TableRef,
    UnaryOperator,
};

use super::errors::{DocumentError, DocumentResult};
use super::table::decode_scalar;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    select: Vec<JsonValue>,
    from: Vec<RawSource>,
    #[serde(default, rename = "where")]
    filter: Option<JsonValue>,
    #[serde(default)]
    group_by: Vec<JsonValue>,
    #[serde(default)]
    having: Option<JsonValue>,
    #[serde(default)]
    order_by: Vec<JsonValue>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSource {
    Name(String),
    Entry {
        #[serde(alias = "table")]
        source: String,
        #[serde(default, rename = "as")]
        alias: Option<String>,
        #[serde(default)]
        on: Option<JsonValue>,
    },
}

/// Decodes a query document
pub fn decode_query(bytes: &[u8]) -> DocumentResult<Query> {
    let raw: RawQuery =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::query(e.to_string()))?;

    let from = raw
        .from
        .into_iter()
        .map(|source| match source {
            RawSource::Name(name) => Ok(TableRef::new(name)),
            RawSource::Entry { source, alias, on } => Ok(TableRef {
                source,
                alias,
                on: on.as_ref().map(decode_expr).transpose()?,
            }),
        })
        .collect::<DocumentResult<Vec<_>>>()?;

    Ok(Query {
        select: raw
            .select
            .iter()
            .map(decode_select_item)
            .collect::<DocumentResult<_>>()?,
        from,
        filter: raw.filter.as_ref().map(decode_clause).transpose()?,
        group_by: raw
            .group_by
            .iter()
            .map(decode_expr)
            .collect::<DocumentResult<_>>()?,
        having: raw.having.as_ref().map(decode_clause).transpose()?,
        order_by: raw
            .order_by
            .iter()
            .map(decode_order_item)
            .collect::<DocumentResult<_>>()?,
        limit: raw.limit,
        offset: raw.offset,
    })
}

/// A clause is one expression or a list whose members are ANDed
fn decode_clause(json: &JsonValue) -> DocumentResult<Expr> {
    match json {
        JsonValue::Array(clauses) => {
            let mut clauses = clauses.iter().map(decode_expr);
            let first = clauses
                .next()
                .unwrap_or_else(|| Ok(Expr::lit(true)))?;
            clauses.try_fold(first, |acc, clause| Ok(Expr::and(acc, clause?)))
        }
        other => decode_expr(other),
    }
}

fn decode_select_item(json: &JsonValue) -> DocumentResult<SelectItem> {
    let object = as_object(json, "select item")?;

    if object.get("star").and_then(JsonValue::as_bool) == Some(true) {
        return Ok(SelectItem::Star {
            table: optional_string(object, "table")?,
        });
    }
    match object.get("column") {
        Some(JsonValue::String(name)) if name == "*" => return Ok(SelectItem::star()),
        Some(JsonValue::Object(column))
            if column.get("name").and_then(JsonValue::as_str) == Some("*") =>
        {
            return Ok(SelectItem::Star {
                table: optional_string(column, "table")?,
            });
        }
        _ => {}
    }

    Ok(SelectItem::Expr {
        expr: decode_expr(json)?,
        alias: optional_string(object, "as")?,
    })
}

fn decode_order_item(json: &JsonValue) -> DocumentResult<OrderItem> {
    let object = as_object(json, "order item")?;
    let direction = match optional_string(object, "direction")? {
        None => SortDirection::Asc,
        Some(d) => match d.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(DocumentError::query(format!("unknown sort direction \"{}\"", d))),
        },
    };
    Ok(OrderItem {
        expr: decode_expr(json)?,
        direction,
    })
}

fn decode_expr(json: &JsonValue) -> DocumentResult<Expr> {
    let object = as_object(json, "expression")?;

    if let Some(literal) = object.get("literal") {
        return decode_scalar(literal)
            .map(Expr::Literal)
            .ok_or_else(|| DocumentError::query(format!("literal must be a scalar, got {}", literal)));
    }
    if let Some(column) = object.get("column") {
        return decode_column(column);
    }
    if let Some(op) = object.get("op") {
        return decode_operator(op, object);
    }
    if let Some(function) = object.get("function") {
        return decode_function(as_object(function, "function")?);
    }
    if let Some(aggregate) = object.get("aggregate") {
        return decode_aggregate(as_object(aggregate, "aggregate")?);
    }

    Err(DocumentError::query(format!("unrecognised expression {}", json)))
}

fn decode_column(json: &JsonValue) -> DocumentResult<Expr> {
    match json {
        JsonValue::String(name) => Ok(Expr::col(name.as_str())),
        JsonValue::Object(column) => {
            let name = required_string(column, "name", "column")?;
            Ok(match optional_string(column, "table")? {
                Some(table) => Expr::qcol(table, name),
                None => Expr::col(name),
            })
        }
        other => Err(DocumentError::query(format!("invalid column reference {}", other))),
    }
}

fn decode_operator(op: &JsonValue, object: &Map<String, JsonValue>) -> DocumentResult<Expr> {
    let op = op
        .as_str()
        .ok_or_else(|| DocumentError::query(format!("operator must be a string, got {}", op)))?;

    if let Some(operand) = object.get("operand") {
        let unary = UnaryOperator::parse(op)
            .ok_or_else(|| DocumentError::query(format!("unknown unary operator \"{}\"", op)))?;
        return Ok(Expr::unary(unary, decode_expr(operand)?));
    }

    let binary = BinaryOperator::parse(op)
        .ok_or_else(|| DocumentError::query(format!("unknown operator \"{}\"", op)))?;
    let operand = |key: &str| {
        object
            .get(key)
            .ok_or_else(|| DocumentError::query(format!("operator \"{}\" is missing \"{}\"", op, key)))
            .and_then(decode_expr)
    };
    Ok(Expr::binary(binary, operand("left")?, operand("right")?))
}

fn decode_function(function: &Map<String, JsonValue>) -> DocumentResult<Expr> {
    let name = required_string(function, "name", "function")?;
    let args = match function.get("args") {
        None => Vec::new(),
        Some(JsonValue::Array(args)) => args.iter().collect(),
        Some(other) => {
            return Err(DocumentError::query(format!(
                "function arguments must be an array, got {}",
                other
            )))
        }
    };

    let Some(aggregate) = AggregateFunction::parse(&name) else {
        return Ok(Expr::Function {
            name,
            args: args.into_iter().map(decode_expr).collect::<DocumentResult<_>>()?,
        });
    };

    let arg = match args.as_slice() {
        [] => None,
        [arg] => Some(*arg),
        _ => {
            return Err(DocumentError::query(format!(
                "aggregate {} takes one argument, got {}",
                aggregate.name(),
                args.len()
            )))
        }
    };
    build_aggregate(aggregate, arg, distinct_flag(function)?)
}

fn decode_aggregate(aggregate: &Map<String, JsonValue>) -> DocumentResult<Expr> {
    let name = required_string(aggregate, "function", "aggregate")?;
    let function = AggregateFunction::parse(&name)
        .ok_or_else(|| DocumentError::query(format!("unknown aggregate \"{}\"", name)))?;
    build_aggregate(function, aggregate.get("arg"), distinct_flag(aggregate)?)
}

fn build_aggregate(
    function: AggregateFunction,
    arg: Option<&JsonValue>,
    distinct: bool,
) -> DocumentResult<Expr> {
    let arg = match arg {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) if s == "*" => None,
        Some(JsonValue::Object(o)) if o.get("star").and_then(JsonValue::as_bool) == Some(true) => {
            None
        }
        Some(arg) => Some(Box::new(decode_expr(arg)?)),
    };
    Ok(Expr::Aggregate {
        function,
        arg,
        distinct,
    })
}

fn distinct_flag(object: &Map<String, JsonValue>) -> DocumentResult<bool> {
    match object.get("distinct") {
        None | Some(JsonValue::Null) => Ok(false),
        Some(JsonValue::Bool(b)) => Ok(*b),
        Some(other) => Err(DocumentError::query(format!(
            "\"distinct\" must be a boolean, got {}",
            other
        ))),
    }
}

fn as_object<'a>(json: &'a JsonValue, what: &str) -> DocumentResult<&'a Map<String, JsonValue>> {
    json.as_object()
        .ok_or_else(|| DocumentError::query(format!("{} must be an object, got {}", what, json)))
}

fn optional_string(object: &Map<String, JsonValue>, key: &str) -> DocumentResult<Option<String>> {
    match object.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DocumentError::query(format!(
            "\"{}\" must be a string, got {}",
            key, other
        ))),
    }
}

fn required_string(object: &Map<String, JsonValue>, key: &str, what: &str) -> DocumentResult<String> {
    optional_string(object, key)?
        .ok_or_else(|| DocumentError::query(format!("{} is missing \"{}\"", what, key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Comparison, Value};
    use serde_json::json;

    fn decode(document: JsonValue) -> DocumentResult<Query> {
        decode_query(document.to_string().as_bytes())
    }

    #[test]
    fn test_decode_sum_query() {
        let query = decode(json!({
            "select": [{"function": {"name": "sum", "args": [{"column": {"name": "amount"}}]}, "as": "total"}],
            "from": [{"source": "orders"}],
            "where": [{"op": ">", "left": {"column": {"name": "amount"}}, "right": {"literal": 5}}]
        }))
        .unwrap();

        assert_eq!(
            query.select,
            vec![SelectItem::aliased(
                Expr::aggregate(AggregateFunction::Sum, Expr::col("amount")),
                "total"
            )]
        );
        assert_eq!(query.filter, Some(Expr::gt(Expr::col("amount"), Expr::lit(5))));
        assert!(query.is_aggregate());
    }

    #[test]
    fn test_where_list_is_conjunction() {
        let query = decode(json!({
            "select": [{"star": true}],
            "from": ["t"],
            "where": [
                {"op": "=", "left": {"column": "a"}, "right": {"literal": 1}},
                {"op": "is_not_null", "operand": {"column": "b"}}
            ]
        }))
        .unwrap();

        match query.filter {
            Some(Expr::Binary { op: BinaryOperator::And, left, right }) => {
                assert_eq!(*left, Expr::compare(Comparison::Eq, Expr::col("a"), Expr::lit(1)));
                assert_eq!(*right, Expr::unary(UnaryOperator::IsNotNull, Expr::col("b")));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_sources_and_stars() {
        let query = decode(json!({
            "select": [{"column": {"table": "u", "name": "*"}}, {"star": true}],
            "from": [
                {"source": "orders", "as": "o"},
                {"source": "users", "as": "u", "on": {"op": "=",
                    "left": {"column": {"table": "o", "name": "user_id"}},
                    "right": {"column": {"table": "u", "name": "id"}}}}
            ]
        }))
        .unwrap();

        assert_eq!(query.select[0], SelectItem::Star { table: Some("u".into()) });
        assert_eq!(query.select[1], SelectItem::star());
        assert_eq!(query.from[1].qualifier(), "u");
        assert_eq!(
            query.from[1].on,
            Some(Expr::equals(Expr::qcol("o", "user_id"), Expr::qcol("u", "id")))
        );
    }

    #[test]
    fn test_aggregate_forms() {
        let query = decode(json!({
            "select": [
                {"aggregate": {"function": "count", "arg": "*"}},
                {"aggregate": {"function": "count", "arg": {"column": "k"}, "distinct": true}},
                {"function": {"name": "COUNT", "args": []}}
            ],
            "from": ["t"]
        }))
        .unwrap();

        assert_eq!(query.select[0], SelectItem::expr(Expr::count_star()));
        assert_eq!(
            query.select[1],
            SelectItem::expr(Expr::Aggregate {
                function: AggregateFunction::Count,
                arg: Some(Box::new(Expr::col("k"))),
                distinct: true,
            })
        );
        assert_eq!(query.select[2], SelectItem::expr(Expr::count_star()));
    }

    #[test]
    fn test_order_limit_offset() {
        let query = decode(json!({
            "select": [{"column": "id"}],
            "from": ["t"],
            "order_by": [{"literal": 1, "direction": "DESC"}, {"column": "id"}],
            "limit": 2,
            "offset": 3
        }))
        .unwrap();

        assert_eq!(query.order_by[0], OrderItem::desc(Expr::Literal(Value::Int(1))));
        assert_eq!(query.order_by[1], OrderItem::asc(Expr::col("id")));
        assert_eq!(query.limit, Some(2));
        assert_eq!(query.offset, Some(3));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(decode(json!({"select": []})).is_err());
        assert!(decode(json!({"select": [{"column": "a"}], "from": ["t"], "frm": 1})).is_err());
        assert!(decode(json!({"select": [{"literal": [1]}], "from": ["t"]})).is_err());
        assert!(decode(json!({"select": [{"op": "??", "left": {"literal": 1}, "right": {"literal": 1}}], "from": ["t"]})).is_err());
        assert!(decode(json!({"select": [{"bogus": 1}], "from": ["t"]})).is_err());
        assert!(decode(json!({"select": [{"column": "a"}], "from": ["t"], "order_by": [{"column": "a", "direction": "up"}]})).is_err());
        assert!(decode_query(b"{").is_err());
    }
}
