//! Query planner
//!
//! Binds a parsed [`Query`] against the tables it reads and produces an
//! immutable [`QueryPlan`]. Every name-resolution and shape error is
//! reported here, before any row is touched:
//!
//! 1. FROM sources are added to the scope in load order; each ON
//!    condition sees only the sources bound so far
//! 2. WHERE is bound against the full scope
//! 3. The SELECT list is expanded and its output names checked
//! 4. In aggregate mode every plain column must be covered by a group key
//! 5. ORDER BY keys resolve output positions and aliases before sources
//! 6. LIMIT and OFFSET must be non-negative
//!
//! Planning is deterministic: same query and tables, same plan.

use std::collections::HashSet;

use crate::errors::{QueryError, QueryResult};
use crate::executor::ScalarFunction;
use crate::schema::{Column, Scope, Table};
use crate::value::{Comparison, DataType, LikePattern, Value};

use super::ast::{AggregateFunction, BinaryOperator, Expr, Query, SelectItem, SortDirection};
use super::bound::BoundExpr;

/// How a source is combined with the relation built so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// No condition: cartesian product
    Cross,
    /// Condition evaluated for every pair of rows
    NestedLoop,
    /// Pure column equality, matched through a hash table on the new source.
    /// Both positions index the joined row.
    HashEquality { left: usize, right: usize },
}

impl JoinStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinStrategy::Cross => "CROSS",
            JoinStrategy::NestedLoop => "NESTED_LOOP",
            JoinStrategy::HashEquality { .. } => "HASH_EQ",
        }
    }
}

/// Join step for every source after the first
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub strategy: JoinStrategy,
    pub condition: Option<BoundExpr>,
}

/// One FROM source
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlan {
    /// Table name passed to the loader
    pub table: String,
    /// Alias, or table name when unaliased
    pub qualifier: String,
    /// `None` for the first source
    pub join: Option<JoinPlan>,
}

/// Grouping stage
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPlan {
    /// Empty when aggregates are used without GROUP BY
    pub group_by: Vec<BoundExpr>,
    pub having: Option<BoundExpr>,
}

/// One column of the result
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionColumn {
    pub name: String,
    pub expr: BoundExpr,
    /// Type known at plan time; `None` means inferred from values
    pub data_type: Option<DataType>,
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: BoundExpr,
    pub direction: SortDirection,
}

/// Immutable query plan (no runtime state)
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Sources in load order
    pub sources: Vec<SourcePlan>,
    /// Scope of the fully joined row
    pub scope: Scope,
    /// Columns of the fully joined row
    pub columns: Vec<Column>,
    pub filter: Option<BoundExpr>,
    pub aggregation: Option<AggregationPlan>,
    pub projection: Vec<ProjectionColumn>,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl QueryPlan {
    /// Output column names in order
    pub fn output_names(&self) -> Vec<&str> {
        self.projection.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregation.is_some()
    }
}

/// Query planner that produces deterministic plans
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    hash_join: bool,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryPlanner {
    /// Creates a planner with the hash join fast path enabled
    pub fn new() -> Self {
        Self { hash_join: true }
    }

    /// Enables or disables the hash join fast path
    pub fn with_hash_join(mut self, enabled: bool) -> Self {
        self.hash_join = enabled;
        self
    }

    /// Plans a query over `tables`, which must align with `query.from`.
    pub fn plan(&self, query: &Query, tables: &[Table]) -> QueryResult<QueryPlan> {
        if query.from.is_empty() {
            return Err(QueryError::parse_error(
                "Query must read from at least one table.",
            ));
        }
        if query.from.len() != tables.len() {
            return Err(QueryError::parse_error(format!(
                "Expected {} tables, got {}.",
                query.from.len(),
                tables.len()
            )));
        }
        if query.select.is_empty() {
            return Err(QueryError::parse_error("SELECT list is empty."));
        }

        // 1. Sources and join conditions, in load order
        let (sources, scope) = self.plan_sources(query, tables)?;
        let columns: Vec<Column> = tables
            .iter()
            .flat_map(|t| t.columns().iter().cloned())
            .collect();

        // 2. WHERE
        let binder = Binder::new(&scope);
        let filter = match &query.filter {
            Some(expr) => {
                reject_aggregates(expr)?;
                Some(binder.bind(expr)?)
            }
            None => None,
        };

        // 3. SELECT list
        let projection = self.plan_projection(query, &scope, &columns)?;

        // 4. Grouping
        let aggregation = if query.is_aggregate() {
            let mut group_by = Vec::with_capacity(query.group_by.len());
            for expr in &query.group_by {
                reject_aggregates(expr)?;
                group_by.push(binder.bind(expr)?);
            }
            let having = query.having.as_ref().map(|h| binder.bind(h)).transpose()?;

            for column in &projection {
                check_grouped(&column.expr, &group_by, &scope)?;
            }
            if let Some(having) = &having {
                check_grouped(having, &group_by, &scope)?;
            }
            Some(AggregationPlan { group_by, having })
        } else {
            None
        };

        // 5. ORDER BY
        let names: Vec<String> = projection.iter().map(|c| c.name.clone()).collect();
        let order_binder = Binder::with_outputs(&scope, &names);
        let mut order_by = Vec::with_capacity(query.order_by.len());
        for item in &query.order_by {
            let expr = match &item.expr {
                Expr::Literal(Value::Int(position)) => {
                    if *position < 1 || *position as usize > names.len() {
                        return Err(QueryError::unknown_position(*position, names.len()));
                    }
                    BoundExpr::OutputColumn(*position as usize - 1)
                }
                other => order_binder.bind(other)?,
            };
            if let Some(aggregation) = &aggregation {
                check_grouped(&expr, &aggregation.group_by, &scope)?;
            }
            order_by.push(SortKey {
                expr,
                direction: item.direction,
            });
        }

        // 6. LIMIT / OFFSET
        let limit = match query.limit {
            Some(l) if l < 0 => return Err(QueryError::invalid_limit("LIMIT", l)),
            Some(l) => Some(l as usize),
            None => None,
        };
        let offset = match query.offset {
            Some(o) if o < 0 => return Err(QueryError::invalid_limit("OFFSET", o)),
            Some(o) => o as usize,
            None => 0,
        };

        Ok(QueryPlan {
            sources,
            scope,
            columns,
            filter,
            aggregation,
            projection,
            order_by,
            limit,
            offset,
        })
    }

    fn plan_sources(&self, query: &Query, tables: &[Table]) -> QueryResult<(Vec<SourcePlan>, Scope)> {
        let mut scope = Scope::new();
        let mut sources = Vec::with_capacity(query.from.len());

        for (i, (source, table)) in query.from.iter().zip(tables).enumerate() {
            let left_width = scope.width();
            scope = scope.with_source(source.qualifier(), table);

            let join = if i == 0 {
                if source.on.is_some() {
                    return Err(QueryError::parse_error(format!(
                        "Join condition on first table \"{}\" has nothing to join with.",
                        source.source
                    )));
                }
                None
            } else {
                let condition = match &source.on {
                    Some(on) => {
                        reject_aggregates(on)?;
                        Some(Binder::new(&scope).bind(on)?)
                    }
                    None => None,
                };
                let strategy = match &condition {
                    None => JoinStrategy::Cross,
                    Some(c) => match equi_join_columns(c, left_width) {
                        Some((left, right)) if self.hash_join => {
                            JoinStrategy::HashEquality { left, right }
                        }
                        _ => JoinStrategy::NestedLoop,
                    },
                };
                Some(JoinPlan {
                    strategy,
                    condition,
                })
            };

            sources.push(SourcePlan {
                table: source.source.clone(),
                qualifier: source.qualifier().to_string(),
                join,
            });
        }

        Ok((sources, scope))
    }

    fn plan_projection(
        &self,
        query: &Query,
        scope: &Scope,
        columns: &[Column],
    ) -> QueryResult<Vec<ProjectionColumn>> {
        let binder = Binder::new(scope);
        let mut projection = Vec::new();

        for item in &query.select {
            match item {
                SelectItem::Star { table } => {
                    let mut matched = false;
                    for source in scope.sources() {
                        if table.as_deref().map_or(false, |t| t != source.qualifier) {
                            continue;
                        }
                        matched = true;
                        for (pos, name) in source.columns.iter().enumerate() {
                            let index = source.offset + pos;
                            let name = if scope.sources_with_column(name) > 1 {
                                format!("{}.{}", source.qualifier, name)
                            } else {
                                name.clone()
                            };
                            projection.push(ProjectionColumn {
                                name,
                                expr: BoundExpr::Column(index),
                                data_type: columns.get(index).and_then(|c| c.data_type),
                            });
                        }
                        // A repeated qualifier expands only its leftmost source.
                        if table.is_some() {
                            break;
                        }
                    }
                    if let (Some(t), false) = (table, matched) {
                        return Err(QueryError::unknown_table(t));
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let bound = binder.bind(expr)?;
                    let name = match (alias, expr) {
                        (Some(alias), _) => alias.clone(),
                        (None, Expr::Column { name, .. }) => name.clone(),
                        (None, other) => other.to_string(),
                    };
                    let data_type = bound.static_type(columns);
                    projection.push(ProjectionColumn {
                        name,
                        expr: bound,
                        data_type,
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for column in &projection {
            if !seen.insert(column.name.as_str()) {
                return Err(QueryError::duplicate_output_column(&column.name));
            }
        }

        Ok(projection)
    }
}

/// Resolves names in an [`Expr`] against a scope
struct Binder<'a> {
    scope: &'a Scope,
    /// Output names visible to ORDER BY; empty elsewhere
    outputs: &'a [String],
}

impl<'a> Binder<'a> {
    fn new(scope: &'a Scope) -> Self {
        Self { scope, outputs: &[] }
    }

    fn with_outputs(scope: &'a Scope, outputs: &'a [String]) -> Self {
        Self { scope, outputs }
    }

    fn bind(&self, expr: &Expr) -> QueryResult<BoundExpr> {
        match expr {
            Expr::Literal(v) => Ok(BoundExpr::Literal(v.clone())),
            Expr::Column { table: None, name } if self.outputs.contains(name) => {
                let position = self.outputs.iter().position(|o| o == name).unwrap_or(0);
                Ok(BoundExpr::OutputColumn(position))
            }
            Expr::Column { table, name } => Ok(BoundExpr::Column(
                self.scope.resolve(table.as_deref(), name)?,
            )),
            Expr::Unary { op, operand } => Ok(BoundExpr::Unary {
                op: *op,
                operand: Box::new(self.bind(operand)?),
            }),
            Expr::Binary {
                op: BinaryOperator::Like,
                left,
                right,
            } => {
                let operand = Box::new(self.bind(left)?);
                match right.as_ref() {
                    Expr::Literal(Value::String(pattern)) => Ok(BoundExpr::Like {
                        operand,
                        pattern: LikePattern::compile(pattern)?,
                    }),
                    _ => Ok(BoundExpr::Binary {
                        op: BinaryOperator::Like,
                        left: operand,
                        right: Box::new(self.bind(right)?),
                    }),
                }
            }
            Expr::Binary { op, left, right } => Ok(BoundExpr::Binary {
                op: *op,
                left: Box::new(self.bind(left)?),
                right: Box::new(self.bind(right)?),
            }),
            Expr::Function { name, args } => {
                if let (Some(function), [arg]) = (AggregateFunction::parse(name), args.as_slice()) {
                    return self.bind_aggregate(expr, function, Some(arg), false);
                }
                let function =
                    ScalarFunction::parse(name).ok_or_else(|| QueryError::unknown_function(name))?;
                function.check_arity(args.len())?;
                let args = args
                    .iter()
                    .map(|a| self.bind(a))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(BoundExpr::Function { function, args })
            }
            Expr::Aggregate {
                function,
                arg,
                distinct,
            } => self.bind_aggregate(expr, *function, arg.as_deref(), *distinct),
        }
    }

    fn bind_aggregate(
        &self,
        expr: &Expr,
        function: AggregateFunction,
        arg: Option<&Expr>,
        distinct: bool,
    ) -> QueryResult<BoundExpr> {
        let arg = match arg {
            Some(arg) if arg.contains_aggregate() => {
                return Err(QueryError::aggregate_outside_group(expr.to_string()));
            }
            Some(arg) => Some(Box::new(self.bind(arg)?)),
            None if function == AggregateFunction::Count => None,
            None => {
                return Err(QueryError::parse_error(format!(
                    "{}(*) is not supported; only COUNT accepts *.",
                    function.name()
                )));
            }
        };
        Ok(BoundExpr::Aggregate {
            function,
            arg,
            distinct,
        })
    }
}

/// Aggregates are only meaningful once rows are grouped
fn reject_aggregates(expr: &Expr) -> QueryResult<()> {
    if expr.contains_aggregate() {
        return Err(QueryError::aggregate_outside_group(expr.to_string()));
    }
    Ok(())
}

/// Checks that every plain column outside an aggregate is a group key
fn check_grouped(expr: &BoundExpr, keys: &[BoundExpr], scope: &Scope) -> QueryResult<()> {
    if keys.contains(expr) {
        return Ok(());
    }
    match expr {
        BoundExpr::Literal(_) | BoundExpr::OutputColumn(_) | BoundExpr::Aggregate { .. } => Ok(()),
        BoundExpr::Column(index) => Err(QueryError::non_aggregated_column(scope.describe(*index))),
        BoundExpr::Unary { operand, .. } | BoundExpr::Like { operand, .. } => {
            check_grouped(operand, keys, scope)
        }
        BoundExpr::Binary { left, right, .. } => {
            check_grouped(left, keys, scope)?;
            check_grouped(right, keys, scope)
        }
        BoundExpr::Function { args, .. } => args
            .iter()
            .try_for_each(|arg| check_grouped(arg, keys, scope)),
    }
}

/// Detects `left_col = right_col` with one side on each input of the join
fn equi_join_columns(condition: &BoundExpr, left_width: usize) -> Option<(usize, usize)> {
    match condition {
        BoundExpr::Binary {
            op: BinaryOperator::Compare(Comparison::Eq),
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (BoundExpr::Column(a), BoundExpr::Column(b)) if *a < left_width && *b >= left_width => {
                Some((*a, *b))
            }
            (BoundExpr::Column(a), BoundExpr::Column(b)) if *b < left_width && *a >= left_width => {
                Some((*b, *a))
            }
            _ => None,
        },
        _ => None,
    }
}
