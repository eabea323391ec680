//! Join execution
//!
//! The working relation is the outer input and the new source the inner
//! one. Output rows are ordered by outer row, then inner row, whatever
//! strategy the plan picked, so the hash path and the nested loop always
//! produce identical tables.

use std::collections::HashMap;

use crate::errors::QueryResult;
use crate::planner::{JoinPlan, JoinStrategy};
use crate::schema::{Row, Table};
use crate::value::{GroupKey, Value};

use super::eval::{evaluate_predicate, RowContext};

/// Combines the working relation with the next source
pub struct JoinExecutor;

impl JoinExecutor {
    /// Joins `left` with `right` according to `plan`.
    ///
    /// The result schema is the concatenation of both schemas.
    pub fn join(left: Table, right: &Table, plan: &JoinPlan) -> QueryResult<Table> {
        let (mut columns, left_rows) = left.into_parts();
        let left_width = columns.len();
        columns.extend(right.columns().iter().cloned());

        let rows = match (plan.strategy, &plan.condition) {
            (JoinStrategy::HashEquality { left, right: r }, _) => {
                Self::hash_join(&left_rows, right.rows(), left, r - left_width)
            }
            (JoinStrategy::NestedLoop, Some(condition)) => {
                let mut rows = Vec::new();
                for l in &left_rows {
                    for r in right.rows() {
                        let row = concat(l, r);
                        if evaluate_predicate(condition, &RowContext::new(&row), "JOIN condition")? {
                            rows.push(row);
                        }
                    }
                }
                rows
            }
            (JoinStrategy::Cross, _) | (JoinStrategy::NestedLoop, None) => {
                let mut rows = Vec::with_capacity(left_rows.len() * right.len());
                for l in &left_rows {
                    for r in right.rows() {
                        rows.push(concat(l, r));
                    }
                }
                rows
            }
        };

        Ok(Table::from_parts(columns, rows))
    }

    /// Equality join through a hash table over the inner rows.
    ///
    /// Bucket keys use the same exact Int/Float equality as `=`, so every
    /// matching pair shares a bucket. Buckets hold inner row positions in
    /// ascending order and every candidate is re-checked with `=`, so Null
    /// and NaN keys never match.
    fn hash_join(left: &[Row], right: &[Row], left_col: usize, right_col: usize) -> Vec<Row> {
        let mut buckets: HashMap<GroupKey, Vec<usize>> = HashMap::new();
        for (i, r) in right.iter().enumerate() {
            let key = &r[right_col];
            if key.is_null() {
                continue;
            }
            buckets
                .entry(GroupKey(vec![key.clone()]))
                .or_default()
                .push(i);
        }

        let mut rows = Vec::new();
        for l in left {
            let key = &l[left_col];
            if key.is_null() {
                continue;
            }
            let Some(candidates) = buckets.get(&GroupKey(vec![key.clone()])) else {
                continue;
            };
            for &i in candidates {
                let r = &right[i];
                if key.eq_value(&r[right_col]).is_true() {
                    rows.push(concat(l, r));
                }
            }
        }
        rows
    }
}

fn concat(left: &[Value], right: &[Value]) -> Row {
    let mut row = Vec::with_capacity(left.len() + right.len());
    row.extend_from_slice(left);
    row.extend_from_slice(right);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{BinaryOperator, BoundExpr};
    use crate::schema::Column;
    use crate::value::Comparison;

    fn table(names: &[&str], rows: Vec<Row>) -> Table {
        Table::new(names.iter().map(|n| Column::untyped(*n)).collect(), rows).unwrap()
    }

    fn orders() -> Table {
        table(
            &["id", "user_id"],
            vec![
                vec![Value::Int(1), Value::Int(2)],
                vec![Value::Int(2), Value::Null],
                vec![Value::Int(3), Value::Int(1)],
                vec![Value::Int(4), Value::Float(2.0)],
                vec![Value::Int(5), Value::Float(f64::NAN)],
            ],
        )
    }

    fn users() -> Table {
        table(
            &["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("ann")],
                vec![Value::Int(2), Value::from("bob")],
                vec![Value::Null, Value::from("nil")],
                vec![Value::Int(2), Value::from("bea")],
                vec![Value::Float(f64::NAN), Value::from("nan")],
            ],
        )
    }

    fn equality(left: usize, right: usize) -> BoundExpr {
        BoundExpr::Binary {
            op: BinaryOperator::Compare(Comparison::Eq),
            left: Box::new(BoundExpr::Column(left)),
            right: Box::new(BoundExpr::Column(right)),
        }
    }

    #[test]
    fn test_cross_join_cardinality() {
        let plan = JoinPlan {
            strategy: JoinStrategy::Cross,
            condition: None,
        };
        let joined = JoinExecutor::join(orders(), &users(), &plan).unwrap();
        assert_eq!(joined.len(), 25);
        assert_eq!(joined.width(), 4);
        assert_eq!(joined.rows()[1][3], Value::from("bob"));
    }

    #[test]
    fn test_nested_loop_order() {
        let plan = JoinPlan {
            strategy: JoinStrategy::NestedLoop,
            condition: Some(equality(1, 2)),
        };
        let joined = JoinExecutor::join(orders(), &users(), &plan).unwrap();

        let pairs: Vec<(Value, Value)> = joined
            .rows()
            .iter()
            .map(|r| (r[0].clone(), r[3].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Value::Int(1), Value::from("bob")),
                (Value::Int(1), Value::from("bea")),
                (Value::Int(3), Value::from("ann")),
                (Value::Int(4), Value::from("bob")),
                (Value::Int(4), Value::from("bea")),
            ]
        );
    }

    #[test]
    fn test_hash_join_matches_nested_loop() {
        let nested = JoinPlan {
            strategy: JoinStrategy::NestedLoop,
            condition: Some(equality(1, 2)),
        };
        let hashed = JoinPlan {
            strategy: JoinStrategy::HashEquality { left: 1, right: 2 },
            condition: Some(equality(1, 2)),
        };

        let a = JoinExecutor::join(orders(), &users(), &nested).unwrap();
        let b = JoinExecutor::join(orders(), &users(), &hashed).unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let plan = JoinPlan {
            strategy: JoinStrategy::NestedLoop,
            condition: Some(BoundExpr::Column(0)),
        };
        assert!(JoinExecutor::join(orders(), &users(), &plan).is_err());
    }

    #[test]
    fn test_hash_join_matches_nested_loop_on_large_mixed_keys() {
        let big = 1i64 << 53;
        let outer = table(
            &["k"],
            vec![
                vec![Value::Int(big + 1)],
                vec![Value::Int(big)],
                vec![Value::Float(big as f64)],
            ],
        );
        let inner = table(
            &["j"],
            vec![
                vec![Value::Int(big)],
                vec![Value::Float(big as f64)],
                vec![Value::Int(big + 1)],
            ],
        );
        let nested = JoinPlan {
            strategy: JoinStrategy::NestedLoop,
            condition: Some(equality(0, 1)),
        };
        let hashed = JoinPlan {
            strategy: JoinStrategy::HashEquality { left: 0, right: 1 },
            condition: Some(equality(0, 1)),
        };

        let a = JoinExecutor::join(outer.clone(), &inner, &nested).unwrap();
        let b = JoinExecutor::join(outer, &inner, &hashed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.rows()[0], vec![Value::Int(big + 1), Value::Int(big + 1)]);
    }
}
