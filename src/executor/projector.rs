//! Projection and output assembly
//!
//! Evaluates the SELECT list once per row (or per group) together with the
//! ORDER BY keys, which may read the values just projected. Assembly turns
//! the surviving projected rows into the result table.

use crate::errors::QueryResult;
use crate::planner::{AggregationPlan, QueryPlan};
use crate::schema::{Column, Row, Table};
use crate::value::Value;

use super::aggregate::Group;
use super::eval::{evaluate, EvalContext, GroupContext, RowContext};

/// One output row plus the values it sorts by
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub values: Vec<Value>,
    pub sort_keys: Vec<Value>,
}

/// Evaluates SELECT expressions and sort keys
pub struct Projector;

impl Projector {
    /// Projects plain rows
    pub fn project_rows(rows: &[Row], plan: &QueryPlan) -> QueryResult<Vec<ProjectedRow>> {
        rows.iter()
            .map(|row| {
                let values = Self::values(plan, &RowContext::new(row))?;
                let sort_keys = Self::sort_keys(plan, &RowContext::with_outputs(row, &values))?;
                Ok(ProjectedRow { values, sort_keys })
            })
            .collect()
    }

    /// Projects one output row per group
    pub fn project_groups(
        groups: &[Group],
        aggregation: &AggregationPlan,
        plan: &QueryPlan,
    ) -> QueryResult<Vec<ProjectedRow>> {
        groups
            .iter()
            .map(|group| {
                let ctx = GroupContext::new(&aggregation.group_by, &group.key, &group.rows);
                let values = Self::values(plan, &ctx)?;
                let sort_keys = Self::sort_keys(plan, &ctx.with_outputs(&values))?;
                Ok(ProjectedRow { values, sort_keys })
            })
            .collect()
    }

    /// Builds the result table.
    ///
    /// A column's type is its planned type, else the type of its first
    /// non-null value, else unknown.
    pub fn assemble(plan: &QueryPlan, rows: Vec<ProjectedRow>) -> Table {
        let rows: Vec<Row> = rows.into_iter().map(|r| r.values).collect();

        let columns = plan
            .projection
            .iter()
            .enumerate()
            .map(|(i, column)| Column {
                name: column.name.clone(),
                data_type: column.data_type.or_else(|| {
                    rows.iter().find_map(|r| r.get(i).and_then(Value::data_type))
                }),
            })
            .collect();

        Table::from_parts(columns, rows)
    }

    fn values<C: EvalContext>(plan: &QueryPlan, ctx: &C) -> QueryResult<Vec<Value>> {
        plan.projection
            .iter()
            .map(|column| evaluate(&column.expr, ctx))
            .collect()
    }

    fn sort_keys<C: EvalContext>(plan: &QueryPlan, ctx: &C) -> QueryResult<Vec<Value>> {
        plan.order_by
            .iter()
            .map(|key| evaluate(&key.expr, ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{AggregateFunction, Expr, OrderItem, Query, QueryPlanner, SelectItem};
    use crate::value::DataType;

    fn people() -> Table {
        Table::new(
            vec![Column::untyped("name"), Column::untyped("age")],
            vec![
                vec![Value::from("ann"), Value::Null],
                vec![Value::from("bob"), Value::Int(41)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_projection_with_sort_keys() {
        let query = Query::from_table("people")
            .select(SelectItem::aliased(Expr::col("age"), "years"))
            .order_by(OrderItem::desc(Expr::col("name")));
        let plan = QueryPlanner::new().plan(&query, &[people()]).unwrap();

        let projected = Projector::project_rows(people().rows(), &plan).unwrap();
        assert_eq!(projected[1].values, vec![Value::Int(41)]);
        assert_eq!(projected[1].sort_keys, vec![Value::from("bob")]);
    }

    #[test]
    fn test_assembled_type_inferred_from_first_non_null() {
        let query = Query::from_table("people").select(SelectItem::expr(Expr::col("age")));
        let plan = QueryPlanner::new().plan(&query, &[people()]).unwrap();

        let projected = Projector::project_rows(people().rows(), &plan).unwrap();
        let table = Projector::assemble(&plan, projected);
        assert_eq!(table.columns()[0].data_type, Some(DataType::Int));
        assert_eq!(table.columns()[0].name, "age");

        let table = Projector::assemble(&plan, Vec::new());
        assert_eq!(table.columns()[0].data_type, None);
    }

    #[test]
    fn test_group_projection() {
        let query = Query::from_table("people")
            .select(SelectItem::aliased(
                Expr::aggregate(AggregateFunction::Max, Expr::col("age")),
                "oldest",
            ))
            .order_by(OrderItem::asc(Expr::col("oldest")));
        let plan = QueryPlanner::new().plan(&query, &[people()]).unwrap();
        let aggregation = plan.aggregation.clone().unwrap();

        let groups = vec![Group {
            key: Vec::new(),
            rows: people().rows().to_vec(),
        }];
        let projected = Projector::project_groups(&groups, &aggregation, &plan).unwrap();
        assert_eq!(projected[0].values, vec![Value::Int(41)]);
        assert_eq!(projected[0].sort_keys, vec![Value::Int(41)]);
    }
}
