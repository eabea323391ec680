//! Bound expressions
//!
//! A [`BoundExpr`] is an [`Expr`](super::ast::Expr) whose column
//! references have been resolved to positions in the joined row and whose
//! function names have been resolved to built-ins. Evaluation never looks
//! names up again.

use crate::executor::ScalarFunction;
use crate::schema::{Column, Scope};
use crate::value::{Arithmetic, DataType, LikePattern, Value};

use super::ast::{AggregateFunction, BinaryOperator, UnaryOperator};

/// Expression with resolved references
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Literal(Value),
    /// Position in the joined source row
    Column(usize),
    /// Position in the projected output row (ORDER BY only)
    OutputColumn(usize),
    Unary {
        op: UnaryOperator,
        operand: Box<BoundExpr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    /// `LIKE` against a literal pattern, compiled once at bind time
    Like {
        operand: Box<BoundExpr>,
        pattern: LikePattern,
    },
    Function {
        function: ScalarFunction,
        args: Vec<BoundExpr>,
    },
    Aggregate {
        function: AggregateFunction,
        /// `None` for `COUNT(*)`
        arg: Option<Box<BoundExpr>>,
        distinct: bool,
    },
}

impl BoundExpr {
    /// Returns true if an aggregate appears anywhere in the tree
    pub fn contains_aggregate(&self) -> bool {
        match self {
            BoundExpr::Literal(_) | BoundExpr::Column(_) | BoundExpr::OutputColumn(_) => false,
            BoundExpr::Unary { operand, .. } | BoundExpr::Like { operand, .. } => {
                operand.contains_aggregate()
            }
            BoundExpr::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            BoundExpr::Function { args, .. } => args.iter().any(BoundExpr::contains_aggregate),
            BoundExpr::Aggregate { .. } => true,
        }
    }

    /// Result type known before evaluation, if any.
    ///
    /// `columns` describes the joined source row.
    pub fn static_type(&self, columns: &[Column]) -> Option<DataType> {
        match self {
            BoundExpr::Literal(v) => v.data_type(),
            BoundExpr::Column(i) => columns.get(*i).and_then(|c| c.data_type),
            BoundExpr::OutputColumn(_) => None,
            BoundExpr::Unary { op, operand } => match op {
                UnaryOperator::Negate => operand.static_type(columns),
                UnaryOperator::Not | UnaryOperator::IsNull | UnaryOperator::IsNotNull => {
                    Some(DataType::Bool)
                }
            },
            BoundExpr::Binary { op, left, right } => {
                if op.is_predicate() {
                    return Some(DataType::Bool);
                }
                match op {
                    BinaryOperator::Concat => Some(DataType::Str),
                    BinaryOperator::Arithmetic(a) => {
                        arithmetic_type(*a, left.static_type(columns), right.static_type(columns))
                    }
                    _ => None,
                }
            }
            BoundExpr::Like { .. } => Some(DataType::Bool),
            BoundExpr::Function { function, args } => {
                let types: Vec<Option<DataType>> =
                    args.iter().map(|a| a.static_type(columns)).collect();
                function.return_type(&types)
            }
            BoundExpr::Aggregate { function, arg, .. } => match function {
                AggregateFunction::Count => Some(DataType::Int),
                AggregateFunction::Avg => Some(DataType::Float),
                AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => {
                    arg.as_ref().and_then(|a| a.static_type(columns))
                }
            },
        }
    }

    /// Renders the expression with column positions shown as `q.name`
    /// and output positions as `#n` (1-based)
    pub fn render(&self, scope: &Scope) -> String {
        match self {
            BoundExpr::Literal(v) => v.to_string(),
            BoundExpr::Column(i) => scope.describe(*i),
            BoundExpr::OutputColumn(i) => format!("#{}", i + 1),
            BoundExpr::Unary { op, operand } => {
                let inner = operand.render_operand(scope);
                match op {
                    UnaryOperator::Not => format!("NOT {}", inner),
                    UnaryOperator::Negate => format!("-{}", inner),
                    UnaryOperator::IsNull => format!("{} IS NULL", inner),
                    UnaryOperator::IsNotNull => format!("{} IS NOT NULL", inner),
                }
            }
            BoundExpr::Binary { op, left, right } => format!(
                "{} {} {}",
                left.render_operand(scope),
                op.symbol(),
                right.render_operand(scope)
            ),
            BoundExpr::Like { operand, pattern } => format!(
                "{} LIKE {}",
                operand.render_operand(scope),
                Value::from(pattern.as_str())
            ),
            BoundExpr::Function { function, args } => {
                let args: Vec<String> = args.iter().map(|a| a.render(scope)).collect();
                format!("{}({})", function.name(), args.join(", "))
            }
            BoundExpr::Aggregate {
                function,
                arg,
                distinct,
            } => {
                let arg = arg.as_ref().map_or_else(|| "*".to_string(), |a| a.render(scope));
                let distinct = if *distinct { "DISTINCT " } else { "" };
                format!("{}({}{})", function.name(), distinct, arg)
            }
        }
    }

    fn render_operand(&self, scope: &Scope) -> String {
        match self {
            BoundExpr::Binary { .. } | BoundExpr::Like { .. } => {
                format!("({})", self.render(scope))
            }
            _ => self.render(scope),
        }
    }
}

fn arithmetic_type(
    op: Arithmetic,
    left: Option<DataType>,
    right: Option<DataType>,
) -> Option<DataType> {
    match (left?, right?) {
        (DataType::Int, DataType::Int) => Some(DataType::Int),
        (DataType::Int | DataType::Float, DataType::Int | DataType::Float) => {
            Some(DataType::Float)
        }
        (DataType::Str, DataType::Str) if op == Arithmetic::Add => Some(DataType::Str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Comparison;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::Int),
            Column::new("price", DataType::Float),
            Column::untyped("note"),
        ]
    }

    #[test]
    fn test_arithmetic_promotion_type() {
        let expr = BoundExpr::Binary {
            op: BinaryOperator::Arithmetic(Arithmetic::Mul),
            left: Box::new(BoundExpr::Column(0)),
            right: Box::new(BoundExpr::Column(1)),
        };
        assert_eq!(expr.static_type(&columns()), Some(DataType::Float));
    }

    #[test]
    fn test_predicate_type_is_bool() {
        let expr = BoundExpr::Binary {
            op: BinaryOperator::Compare(Comparison::Eq),
            left: Box::new(BoundExpr::Column(2)),
            right: Box::new(BoundExpr::Literal(Value::Null)),
        };
        assert_eq!(expr.static_type(&columns()), Some(DataType::Bool));
    }

    #[test]
    fn test_untyped_column_has_no_static_type() {
        assert_eq!(BoundExpr::Column(2).static_type(&columns()), None);
        let count = BoundExpr::Aggregate {
            function: AggregateFunction::Count,
            arg: Some(Box::new(BoundExpr::Column(2))),
            distinct: false,
        };
        assert_eq!(count.static_type(&columns()), Some(DataType::Int));
        assert!(count.contains_aggregate());
    }

    #[test]
    fn test_render_uses_qualified_names() {
        let table = crate::schema::Table::empty(columns());
        let scope = Scope::new().with_source("p", &table);
        let expr = BoundExpr::Binary {
            op: BinaryOperator::Compare(Comparison::Gt),
            left: Box::new(BoundExpr::Binary {
                op: BinaryOperator::Arithmetic(Arithmetic::Add),
                left: Box::new(BoundExpr::Column(1)),
                right: Box::new(BoundExpr::Literal(Value::Int(1))),
            }),
            right: Box::new(BoundExpr::OutputColumn(0)),
        };
        assert_eq!(expr.render(&scope), "(p.price + 1) > #1");
    }
}
