//! Query AST structures
//!
//! Defines the parsed, unresolved query representation produced by the
//! codec and consumed by the planner. Column references are still names
//! here; the planner binds them to row positions.

use std::fmt;

use crate::value::{Arithmetic, Comparison, Value};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Logical NOT
    Not,
    /// Arithmetic negation
    Negate,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl UnaryOperator {
    /// Parses a wire operator name
    pub fn parse(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "not" | "!" => Some(UnaryOperator::Not),
            "neg" | "-" => Some(UnaryOperator::Negate),
            "is_null" | "is null" => Some(UnaryOperator::IsNull),
            "is_not_null" | "is not null" => Some(UnaryOperator::IsNotNull),
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Compare(Comparison),
    Arithmetic(Arithmetic),
    /// String concatenation `||`
    Concat,
    And,
    Or,
    Like,
}

impl BinaryOperator {
    /// Parses a wire operator symbol or keyword
    pub fn parse(op: &str) -> Option<Self> {
        let op = match op.to_ascii_lowercase().as_str() {
            "=" | "==" => BinaryOperator::Compare(Comparison::Eq),
            "!=" | "<>" => BinaryOperator::Compare(Comparison::NotEq),
            "<" => BinaryOperator::Compare(Comparison::Lt),
            "<=" => BinaryOperator::Compare(Comparison::LtEq),
            ">" => BinaryOperator::Compare(Comparison::Gt),
            ">=" => BinaryOperator::Compare(Comparison::GtEq),
            "+" => BinaryOperator::Arithmetic(Arithmetic::Add),
            "-" => BinaryOperator::Arithmetic(Arithmetic::Sub),
            "*" => BinaryOperator::Arithmetic(Arithmetic::Mul),
            "/" => BinaryOperator::Arithmetic(Arithmetic::Div),
            "%" => BinaryOperator::Arithmetic(Arithmetic::Rem),
            "||" => BinaryOperator::Concat,
            "and" => BinaryOperator::And,
            "or" => BinaryOperator::Or,
            "like" => BinaryOperator::Like,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Compare(c) => c.symbol(),
            BinaryOperator::Arithmetic(a) => a.symbol(),
            BinaryOperator::Concat => "||",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Like => "LIKE",
        }
    }

    /// True for operators whose result is always Bool or Null
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Compare(_)
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Like
        )
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// Unresolved expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column {
        table: Option<String>,
        name: String,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// `arg: None` is `COUNT(*)`
    Aggregate {
        function: AggregateFunction,
        arg: Option<Box<Expr>>,
        distinct: bool,
    },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn null() -> Self {
        Expr::Literal(Value::Null)
    }

    /// Unqualified column reference
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Qualified column reference (`table.name`)
    pub fn qcol(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(op: Comparison, left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Compare(op), left, right)
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Self::compare(Comparison::Eq, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::compare(Comparison::Gt, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Or, left, right)
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn aggregate(function: AggregateFunction, arg: Expr) -> Self {
        Expr::Aggregate {
            function,
            arg: Some(Box::new(arg)),
            distinct: false,
        }
    }

    pub fn count_star() -> Self {
        Expr::Aggregate {
            function: AggregateFunction::Count,
            arg: None,
            distinct: false,
        }
    }

    /// Returns true if an aggregate appears anywhere in the tree
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Column { .. } => false,
            Expr::Unary { operand, .. } => operand.contains_aggregate(),
            Expr::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::Function { args, .. } => args.iter().any(Expr::contains_aggregate),
            Expr::Aggregate { .. } => true,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { .. } => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Column {
                table: Some(t),
                name,
            } => write!(f, "{}.{}", t, name),
            Expr::Column { table: None, name } => write!(f, "{}", name),
            Expr::Unary { op, operand } => match op {
                UnaryOperator::Not => {
                    write!(f, "NOT ")?;
                    operand.fmt_operand(f)
                }
                UnaryOperator::Negate => {
                    write!(f, "-")?;
                    operand.fmt_operand(f)
                }
                UnaryOperator::IsNull => {
                    operand.fmt_operand(f)?;
                    write!(f, " IS NULL")
                }
                UnaryOperator::IsNotNull => {
                    operand.fmt_operand(f)?;
                    write!(f, " IS NOT NULL")
                }
            },
            Expr::Binary { op, left, right } => {
                left.fmt_operand(f)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f)
            }
            Expr::Function { name, args } => {
                write!(f, "{}(", name.to_ascii_uppercase())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Aggregate {
                function,
                arg,
                distinct,
            } => {
                write!(f, "{}(", function.name())?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                match arg {
                    Some(arg) => write!(f, "{})", arg),
                    None => write!(f, "*)"),
                }
            }
        }
    }
}

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// Expression with optional alias
    Expr { expr: Expr, alias: Option<String> },
    /// `*` or `table.*`
    Star { table: Option<String> },
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn star() -> Self {
        SelectItem::Star { table: None }
    }
}

/// One FROM source
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Logical table name handed to the loader
    pub source: String,
    /// Optional alias
    pub alias: Option<String>,
    /// Join condition relative to the sources before it
    pub on: Option<Expr>,
}

impl TableRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: None,
            on: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_on(mut self, on: Expr) -> Self {
        self.on = Some(on);
        self
    }

    /// Name that qualifies this source's columns
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

impl OrderItem {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: SortDirection::Desc,
        }
    }
}

/// Parsed query. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub select: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Query {
    /// Starts a query over a single source
    pub fn from_table(source: impl Into<String>) -> Self {
        Self {
            from: vec![TableRef::new(source)],
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: TableRef) -> Self {
        self.from.push(source);
        self
    }

    pub fn select(mut self, item: SelectItem) -> Self {
        self.select.push(item);
        self
    }

    pub fn select_all(self) -> Self {
        self.select(SelectItem::star())
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn with_having(mut self, having: Expr) -> Self {
        self.having = Some(having);
        self
    }

    pub fn order_by(mut self, item: OrderItem) -> Self {
        self.order_by.push(item);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True when the query groups rows, explicitly or through aggregates
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self.having.is_some()
            || self.select.iter().any(|item| match item {
                SelectItem::Expr { expr, .. } => expr.contains_aggregate(),
                SelectItem::Star { .. } => false,
            })
            || self.order_by.iter().any(|o| o.expr.contains_aggregate())
    }
}
