//! Grouping and aggregate accumulation
//!
//! Rows with equal keys join one group; groups come out in the order
//! their first row was seen. For grouping, Null equals Null.

use std::collections::{HashMap, HashSet};

use crate::errors::{QueryError, QueryResult};
use crate::planner::{AggregateFunction, AggregationPlan, BoundExpr};
use crate::schema::Row;
use crate::value::{GroupKey, Value};

use super::eval::{evaluate, evaluate_predicate, GroupContext, RowContext};

/// Rows sharing one grouping key
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Key values, aligned with the GROUP BY expressions
    pub key: Vec<Value>,
    pub rows: Vec<Row>,
}

/// Partitions rows into groups and applies HAVING
pub struct Aggregator;

impl Aggregator {
    /// Groups `rows` by the plan's keys and keeps groups passing HAVING.
    ///
    /// Without GROUP BY there is exactly one group, even for empty input.
    pub fn group(rows: Vec<Row>, plan: &AggregationPlan) -> QueryResult<Vec<Group>> {
        let groups = if plan.group_by.is_empty() {
            vec![Group {
                key: Vec::new(),
                rows,
            }]
        } else {
            Self::partition(rows, &plan.group_by)?
        };

        let Some(having) = &plan.having else {
            return Ok(groups);
        };

        let mut kept = Vec::with_capacity(groups.len());
        for group in groups {
            let ctx = GroupContext::new(&plan.group_by, &group.key, &group.rows);
            if evaluate_predicate(having, &ctx, "HAVING clause")? {
                kept.push(group);
            }
        }
        Ok(kept)
    }

    fn partition(rows: Vec<Row>, keys: &[BoundExpr]) -> QueryResult<Vec<Group>> {
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        for row in rows {
            let key = keys
                .iter()
                .map(|k| evaluate(k, &RowContext::new(&row)))
                .collect::<QueryResult<Vec<_>>>()?;

            let key = GroupKey(key);
            match index.get(&key) {
                Some(&i) => groups[i].rows.push(row),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(Group {
                        key: key.0,
                        rows: vec![row],
                    });
                }
            }
        }

        Ok(groups)
    }
}

/// Running state of one aggregate over one group
#[derive(Debug)]
pub struct Accumulator {
    function: AggregateFunction,
    /// Seen values for DISTINCT; `None` when not distinct
    seen: Option<HashSet<GroupKey>>,
    count: i64,
    state: Value,
    float_sum: f64,
}

impl Accumulator {
    pub fn new(function: AggregateFunction, distinct: bool) -> Self {
        Self {
            function,
            seen: distinct.then(HashSet::new),
            count: 0,
            state: Value::Null,
            float_sum: 0.0,
        }
    }

    /// Counts a row for `COUNT(*)`
    pub fn count_row(&mut self) {
        self.count += 1;
    }

    /// Feeds one argument value; Nulls are ignored
    pub fn update(&mut self, value: Value) -> QueryResult<()> {
        if value.is_null() {
            return Ok(());
        }
        if let Some(seen) = &mut self.seen {
            if !seen.insert(GroupKey(vec![value.clone()])) {
                return Ok(());
            }
        }

        match self.function {
            AggregateFunction::Count => {}
            AggregateFunction::Sum => {
                self.require_numeric(&value)?;
                self.state = if self.state.is_null() {
                    value
                } else {
                    self.state.add(&value)?
                };
            }
            AggregateFunction::Avg => {
                self.require_numeric(&value)?;
                self.float_sum += value.as_f64().unwrap_or(0.0);
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                self.update_extreme(value)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Final value: COUNT of nothing is 0, everything else is Null
    pub fn finish(self) -> Value {
        match self.function {
            AggregateFunction::Count => Value::Int(self.count),
            AggregateFunction::Avg if self.count == 0 => Value::Null,
            AggregateFunction::Avg => Value::Float(self.float_sum / self.count as f64),
            AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => self.state,
        }
    }

    fn update_extreme(&mut self, value: Value) -> QueryResult<()> {
        if self.state.is_null() {
            self.state = value;
            return Ok(());
        }

        match value.compare(&self.state) {
            Some(ordering) => {
                let replace = match self.function {
                    AggregateFunction::Min => ordering.is_lt(),
                    _ => ordering.is_gt(),
                };
                if replace {
                    self.state = value;
                }
                Ok(())
            }
            // NaN never replaces the current extreme.
            None if value.as_f64().is_some() && self.state.as_f64().is_some() => Ok(()),
            None => Err(QueryError::incompatible_types(
                self.function.name(),
                self.state.type_name(),
                value.type_name(),
            )),
        }
    }

    fn require_numeric(&self, value: &Value) -> QueryResult<()> {
        if value.as_f64().is_some() {
            return Ok(());
        }
        Err(QueryError::type_mismatch(
            self.function.name(),
            format!(
                "{} requires numeric values, got {}.",
                self.function.name(),
                value.type_name()
            ),
        ))
    }
}
