//! Table document codec
//!
//! A table document is either the compact array form, whose first element
//! is the column header and the rest are rows:
//!
//! ```text
//! [ [["id","int"],["amount","int"]], [1,10], [2,20], [3,null] ]
//! ```
//!
//! or the object form `{"columns": [...], "rows": [[...], ...]}`.
//! Results are always written in the array form, one row per line.

use serde_json::{Number, Value as JsonValue};

use crate::schema::{Column, Row, Table};
use crate::value::{DataType, Value};

use super::errors::{DocumentError, DocumentResult};

/// Decodes a table document
pub fn decode_table(bytes: &[u8]) -> DocumentResult<Table> {
    let document: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::table(e.to_string()))?;

    let (header, rows) = match document {
        JsonValue::Array(mut items) => {
            if items.is_empty() {
                return Err(DocumentError::table("missing column header"));
            }
            let header = items.remove(0);
            (header, items)
        }
        JsonValue::Object(mut object) => {
            let header = object
                .remove("columns")
                .ok_or_else(|| DocumentError::table("missing \"columns\""))?;
            let rows = match object.remove("rows") {
                Some(JsonValue::Array(rows)) => rows,
                Some(_) => return Err(DocumentError::table("\"rows\" must be an array")),
                None => Vec::new(),
            };
            (header, rows)
        }
        _ => return Err(DocumentError::table("expected an array or an object")),
    };

    let columns = decode_header(header)?;
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| decode_row(i, row, &columns))
        .collect::<DocumentResult<Vec<Row>>>()?;

    Table::new(columns, rows).map_err(|e| DocumentError::table(e.message()))
}

fn decode_header(header: JsonValue) -> DocumentResult<Vec<Column>> {
    match header {
        JsonValue::Array(entries) => entries.into_iter().map(decode_column).collect(),
        _ => Err(DocumentError::table("column header must be an array")),
    }
}

fn decode_column(entry: JsonValue) -> DocumentResult<Column> {
    let (name, type_name) = match entry {
        JsonValue::String(name) => (name, JsonValue::Null),
        JsonValue::Array(parts) => {
            let mut parts = parts.into_iter();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(JsonValue::String(name)), type_name, None) => {
                    (name, type_name.unwrap_or(JsonValue::Null))
                }
                _ => return Err(DocumentError::table("column entry must be [name, type]")),
            }
        }
        JsonValue::Object(mut fields) => match fields.remove("name") {
            Some(JsonValue::String(name)) => {
                (name, fields.remove("type").unwrap_or(JsonValue::Null))
            }
            _ => return Err(DocumentError::table("column entry is missing \"name\"")),
        },
        other => {
            return Err(DocumentError::table(format!(
                "invalid column entry {}",
                other
            )))
        }
    };

    match type_name {
        JsonValue::Null => Ok(Column::untyped(name)),
        JsonValue::String(t) => DataType::parse(&t)
            .map(|data_type| Column::new(name.as_str(), data_type))
            .ok_or_else(|| {
                DocumentError::table(format!("unknown type \"{}\" for column \"{}\"", t, name))
            }),
        other => Err(DocumentError::table(format!(
            "invalid type {} for column \"{}\"",
            other, name
        ))),
    }
}

fn decode_row(index: usize, row: JsonValue, columns: &[Column]) -> DocumentResult<Row> {
    let JsonValue::Array(cells) = row else {
        return Err(DocumentError::table(format!("row {} is not an array", index)));
    };
    if cells.len() != columns.len() {
        return Err(DocumentError::table(format!(
            "row {} has {} values, expected {}",
            index,
            cells.len(),
            columns.len()
        )));
    }

    cells
        .into_iter()
        .zip(columns)
        .map(|(cell, column)| decode_cell(cell, column))
        .collect()
}

fn decode_cell(cell: JsonValue, column: &Column) -> DocumentResult<Value> {
    let value = decode_scalar(&cell).ok_or_else(|| {
        DocumentError::table(format!(
            "column \"{}\" holds a non-scalar value {}",
            column.name, cell
        ))
    })?;

    match (column.data_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (None, value) => Ok(value),
        (Some(DataType::Float), Value::Int(i)) => Ok(Value::Float(i as f64)),
        (Some(expected), value) if value.data_type() == Some(expected) => Ok(value),
        (Some(expected), value) => Err(DocumentError::table(format!(
            "column \"{}\" is {} but holds {} value {}",
            column.name,
            expected,
            value.type_name(),
            cell
        ))),
    }
}

/// Converts a JSON scalar to a value; arrays and objects yield `None`
pub(crate) fn decode_scalar(json: &JsonValue) -> Option<Value> {
    match json {
        JsonValue::Null => Some(Value::Null),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        JsonValue::String(s) => Some(Value::String(s.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn encode_scalar(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number((*i).into()),
        // Non-finite floats have no JSON form
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

/// Encodes a table in the array form, one row per line
pub fn encode_table(table: &Table) -> String {
    let header: Vec<JsonValue> = table
        .columns()
        .iter()
        .map(|column| {
            let type_name = column
                .data_type
                .map_or(JsonValue::Null, |t| JsonValue::String(t.name().to_string()));
            JsonValue::Array(vec![JsonValue::String(column.name.clone()), type_name])
        })
        .collect();

    let mut lines = vec![JsonValue::Array(header).to_string()];
    lines.extend(table.rows().iter().map(|row| {
        JsonValue::Array(row.iter().map(encode_scalar).collect()).to_string()
    }));

    let mut out = String::from("[\n");
    out.push_str(
        &lines
            .iter()
            .map(|line| format!("    {}", line))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    out.push_str("\n]\n");
    out
}
