//! Explain plan output
//!
//! Produces deterministic, human-readable explain output, plus a JSON
//! rendering for tooling.

use std::fmt;

use serde_json::{json, Value as JsonValue};

use crate::errors::QueryError;

use super::planner::QueryPlan;

/// Explain plan output
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// One line per source: table, qualifier, join strategy and condition
    pub sources: Vec<String>,
    /// WHERE predicate
    pub filter: Option<String>,
    /// GROUP BY keys (empty for whole-input aggregation)
    pub group_by: Vec<String>,
    /// Whether rows are aggregated
    pub aggregate: bool,
    /// HAVING predicate
    pub having: Option<String>,
    /// Output columns as `name := expression`
    pub projection: Vec<String>,
    /// Sort keys with direction
    pub order_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let scope = &plan.scope;

        let sources = plan
            .sources
            .iter()
            .map(|s| {
                let mut line = if s.qualifier == s.table {
                    s.table.clone()
                } else {
                    format!("{} AS {}", s.table, s.qualifier)
                };
                match &s.join {
                    None => line.push_str(" [SCAN]"),
                    Some(join) => {
                        line.push_str(&format!(" [{}]", join.strategy.as_str()));
                        if let Some(condition) = &join.condition {
                            line.push_str(&format!(" ON {}", condition.render(scope)));
                        }
                    }
                }
                line
            })
            .collect();

        let (aggregate, group_by, having) = match &plan.aggregation {
            Some(agg) => (
                true,
                agg.group_by.iter().map(|k| k.render(scope)).collect(),
                agg.having.as_ref().map(|h| h.render(scope)),
            ),
            None => (false, Vec::new(), None),
        };

        Self {
            accepted: true,
            sources,
            filter: plan.filter.as_ref().map(|f| f.render(scope)),
            group_by,
            aggregate,
            having,
            projection: plan
                .projection
                .iter()
                .map(|c| format!("{} := {}", c.name, c.expr.render(scope)))
                .collect(),
            order_by: plan
                .order_by
                .iter()
                .map(|k| format!("{} {}", k.expr.render(scope), k.direction.as_str()))
                .collect(),
            limit: plan.limit,
            offset: plan.offset,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            accepted: false,
            sources: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            aggregate: false,
            having: None,
            projection: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }

    /// JSON rendering of the same information
    pub fn to_json(&self) -> JsonValue {
        if !self.accepted {
            return json!({
                "status": "REJECTED",
                "code": self.rejection_code,
                "reason": self.rejection_reason,
            });
        }
        json!({
            "status": "ACCEPTED",
            "sources": self.sources,
            "filter": self.filter,
            "aggregate": self.aggregate,
            "group_by": self.group_by,
            "having": self.having,
            "projection": self.projection,
            "order_by": self.order_by,
            "limit": self.limit,
            "offset": self.offset,
        })
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        writeln!(f, "Sources:")?;
        for source in &self.sources {
            writeln!(f, "  - {}", source)?;
        }
        if let Some(filter) = &self.filter {
            writeln!(f, "Filter: {}", filter)?;
        }
        if self.aggregate {
            if self.group_by.is_empty() {
                writeln!(f, "Group By: (all rows)")?;
            } else {
                writeln!(f, "Group By: {}", self.group_by.join(", "))?;
            }
        }
        if let Some(having) = &self.having {
            writeln!(f, "Having: {}", having)?;
        }
        writeln!(f, "Projection:")?;
        for column in &self.projection {
            writeln!(f, "  - {}", column)?;
        }
        if !self.order_by.is_empty() {
            writeln!(f, "Order By: {}", self.order_by.join(", "))?;
        }
        if let Some(limit) = self.limit {
            writeln!(f, "Limit: {}", limit)?;
        }
        if self.offset > 0 {
            writeln!(f, "Offset: {}", self.offset)?;
        }

        Ok(())
    }
}
