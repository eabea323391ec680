//! Expression evaluation
//!
//! Expressions are evaluated against an [`EvalContext`]. A plain row
//! context serves WHERE, ON and non-aggregate projections; a group context
//! serves HAVING and projections of aggregate queries. Only the group
//! context can compute aggregates.
//!
//! Operands are evaluated left to right. AND and OR short-circuit under
//! Kleene logic: `false AND x` and `true OR x` never evaluate `x`.

use crate::errors::{QueryError, QueryResult};
use crate::planner::{AggregateFunction, BinaryOperator, BoundExpr, UnaryOperator};
use crate::schema::Row;
use crate::value::{kleene_and, kleene_or, Value};

use super::aggregate::Accumulator;

/// Source of values for column references and aggregates
pub trait EvalContext {
    /// Value of the joined-row column at `index`
    fn column(&self, index: usize) -> QueryResult<Value>;

    /// Value of the already projected output column at `index`
    fn output(&self, index: usize) -> QueryResult<Value>;

    /// Computes an aggregate over the context's rows
    fn aggregate(
        &self,
        function: AggregateFunction,
        arg: Option<&BoundExpr>,
        distinct: bool,
    ) -> QueryResult<Value>;

    /// Value of `expr` when it is one of the group keys
    fn group_key(&self, _expr: &BoundExpr) -> Option<Value> {
        None
    }
}

/// Evaluation over a single joined row
pub struct RowContext<'a> {
    row: &'a [Value],
    outputs: &'a [Value],
}

impl<'a> RowContext<'a> {
    pub fn new(row: &'a [Value]) -> Self {
        Self { row, outputs: &[] }
    }

    /// Row context that can also read projected output values
    pub fn with_outputs(row: &'a [Value], outputs: &'a [Value]) -> Self {
        Self { row, outputs }
    }
}

impl EvalContext for RowContext<'_> {
    fn column(&self, index: usize) -> QueryResult<Value> {
        self.row
            .get(index)
            .cloned()
            .ok_or_else(|| QueryError::unknown_column(format!("#{}", index)))
    }

    fn output(&self, index: usize) -> QueryResult<Value> {
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| QueryError::unknown_position(index as i64 + 1, self.outputs.len()))
    }

    fn aggregate(
        &self,
        function: AggregateFunction,
        _arg: Option<&BoundExpr>,
        _distinct: bool,
    ) -> QueryResult<Value> {
        Err(QueryError::aggregate_outside_group(function.name()))
    }
}

/// Evaluation over one group of rows
pub struct GroupContext<'a> {
    keys: &'a [BoundExpr],
    key_values: &'a [Value],
    rows: &'a [Row],
    outputs: &'a [Value],
}

impl<'a> GroupContext<'a> {
    pub fn new(keys: &'a [BoundExpr], key_values: &'a [Value], rows: &'a [Row]) -> Self {
        Self {
            keys,
            key_values,
            rows,
            outputs: &[],
        }
    }

    /// Group context that can also read projected output values
    pub fn with_outputs(self, outputs: &'a [Value]) -> Self {
        Self { outputs, ..self }
    }
}

impl EvalContext for GroupContext<'_> {
    fn column(&self, index: usize) -> QueryResult<Value> {
        Err(QueryError::non_aggregated_column(format!("#{}", index)))
    }

    fn output(&self, index: usize) -> QueryResult<Value> {
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| QueryError::unknown_position(index as i64 + 1, self.outputs.len()))
    }

    fn aggregate(
        &self,
        function: AggregateFunction,
        arg: Option<&BoundExpr>,
        distinct: bool,
    ) -> QueryResult<Value> {
        let mut acc = Accumulator::new(function, distinct);
        for row in self.rows {
            match arg {
                None => acc.count_row(),
                Some(arg) => acc.update(evaluate(arg, &RowContext::new(row))?)?,
            }
        }
        Ok(acc.finish())
    }

    fn group_key(&self, expr: &BoundExpr) -> Option<Value> {
        self.keys
            .iter()
            .position(|k| k == expr)
            .and_then(|i| self.key_values.get(i).cloned())
    }
}

/// Evaluates a bound expression in the given context
pub fn evaluate<C: EvalContext>(expr: &BoundExpr, ctx: &C) -> QueryResult<Value> {
    if let Some(value) = ctx.group_key(expr) {
        return Ok(value);
    }

    match expr {
        BoundExpr::Literal(v) => Ok(v.clone()),
        BoundExpr::Column(index) => ctx.column(*index),
        BoundExpr::OutputColumn(index) => ctx.output(*index),
        BoundExpr::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOperator::Not => value.not(),
                UnaryOperator::Negate => value.negate(),
                UnaryOperator::IsNull => Ok(Value::Bool(value.is_null())),
                UnaryOperator::IsNotNull => Ok(Value::Bool(!value.is_null())),
            }
        }
        BoundExpr::Binary {
            op: BinaryOperator::And,
            left,
            right,
        } => {
            let l = evaluate(left, ctx)?.to_bool("AND")?;
            if l == Some(false) {
                return Ok(Value::Bool(false));
            }
            let r = evaluate(right, ctx)?.to_bool("AND")?;
            Ok(from_kleene(kleene_and(l, r)))
        }
        BoundExpr::Binary {
            op: BinaryOperator::Or,
            left,
            right,
        } => {
            let l = evaluate(left, ctx)?.to_bool("OR")?;
            if l == Some(true) {
                return Ok(Value::Bool(true));
            }
            let r = evaluate(right, ctx)?.to_bool("OR")?;
            Ok(from_kleene(kleene_or(l, r)))
        }
        BoundExpr::Binary { op, left, right } => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            apply_binary(*op, &l, &r)
        }
        BoundExpr::Like { operand, pattern } => pattern.matches(&evaluate(operand, ctx)?),
        BoundExpr::Function { function, args } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, ctx))
                .collect::<QueryResult<Vec<_>>>()?;
            function.invoke(&values)
        }
        BoundExpr::Aggregate {
            function,
            arg,
            distinct,
        } => ctx.aggregate(*function, arg.as_deref(), *distinct),
    }
}

/// Evaluates a predicate, requiring a Bool or Null result
pub fn evaluate_predicate<C: EvalContext>(
    expr: &BoundExpr,
    ctx: &C,
    clause: &str,
) -> QueryResult<bool> {
    Ok(evaluate(expr, ctx)?.to_bool(clause)? == Some(true))
}

/// Applies a binary operator to evaluated operands
fn apply_binary(op: BinaryOperator, l: &Value, r: &Value) -> QueryResult<Value> {
    match op {
        BinaryOperator::Compare(c) => Ok(l.compare_op(c, r)),
        BinaryOperator::Arithmetic(a) => l.arithmetic(a, r),
        BinaryOperator::Concat => Ok(l.concat(r)),
        BinaryOperator::Like => l.like(r),
        BinaryOperator::And => Ok(from_kleene(kleene_and(l.to_bool("AND")?, r.to_bool("AND")?))),
        BinaryOperator::Or => Ok(from_kleene(kleene_or(l.to_bool("OR")?, r.to_bool("OR")?))),
    }
}

fn from_kleene(value: Option<bool>) -> Value {
    value.map_or(Value::Null, Value::Bool)
}
