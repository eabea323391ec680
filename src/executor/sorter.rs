//! Result sorting and limiting
//!
//! Sorts projected rows by their ORDER BY keys, stably and
//! deterministically, then applies OFFSET and LIMIT.

use std::cmp::Ordering;

use crate::planner::{SortDirection, SortKey};
use crate::value::Value;

use super::projector::ProjectedRow;

/// Sorts projected rows
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows by `keys`, first key most significant.
    ///
    /// Sort is stable: rows with equal keys keep their prior order.
    pub fn sort(rows: &mut [ProjectedRow], keys: &[SortKey]) {
        if keys.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for (i, key) in keys.iter().enumerate() {
                let ordering = Self::compare_values(&a.sort_keys[i], &b.sort_keys[i]);
                let ordering = match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Drops `offset` rows, then keeps at most `limit`
    pub fn limit<T>(rows: Vec<T>, limit: Option<usize>, offset: usize) -> Vec<T> {
        let rows = rows.into_iter().skip(offset);
        match limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }

    /// Total order over values for sorting.
    ///
    /// Ordering rules:
    /// - null < bool < number < string, so Null sorts first ascending
    ///   and last descending
    /// - same types use natural ordering; ints and floats compare
    ///   numerically and NaN sorts after every other number
    fn compare_values(a: &Value, b: &Value) -> Ordering {
        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::String(_) => 3,
            }
        };

        let a_type = type_order(a);
        let b_type = type_order(b);
        if a_type != b_type {
            return a_type.cmp(&b_type);
        }

        if let Some(ordering) = a.compare(b) {
            return ordering;
        }

        let is_nan = |v: &Value| matches!(v, Value::Float(f) if f.is_nan());
        match (is_nan(a), is_nan(b)) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        }
    }
}
