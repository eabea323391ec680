//! Query executor
//!
//! Executes query plans over loaded tables, producing deterministic results.
//!
//! Execution flow (strict order):
//! 1. Load every FROM table before evaluation begins
//! 2. Plan: bind names, validate shape, pick join strategies
//! 3. Join sources left to right
//! 4. Filter with WHERE
//! 5. Group and apply HAVING (aggregate queries only)
//! 6. Project SELECT values and ORDER BY keys
//! 7. Sort, then apply OFFSET and LIMIT
//! 8. Assemble the result table
//!
//! Every stage consumes a fully materialized relation and produces a new
//! one. Any error aborts the whole query.

use std::collections::HashMap;

use crate::errors::QueryResult;
use crate::loader::TableLoader;
use crate::observability::{Logger, ObservationScope};
use crate::planner::{Query, QueryPlan, QueryPlanner};
use crate::schema::Table;

use super::aggregate::Aggregator;
use super::filters::PredicateFilter;
use super::join::JoinExecutor;
use super::projector::Projector;
use super::result::{ExecutionResult, ExecutionStats};
use super::sorter::ResultSorter;

/// Query executor that loads tables and evaluates queries over them
pub struct QueryExecutor<'a, L: TableLoader> {
    loader: &'a L,
    planner: QueryPlanner,
}

impl<'a, L: TableLoader> QueryExecutor<'a, L> {
    /// Creates a new executor
    pub fn new(loader: &'a L) -> Self {
        Self {
            loader,
            planner: QueryPlanner::new(),
        }
    }

    /// Enables or disables the hash join fast path
    pub fn with_hash_join(mut self, enabled: bool) -> Self {
        self.planner = self.planner.with_hash_join(enabled);
        self
    }

    /// Loads the tables named in FROM, in order.
    ///
    /// A table read by several sources is loaded once.
    pub fn load_tables(&self, query: &Query) -> QueryResult<Vec<Table>> {
        let mut cache: HashMap<&str, Table> = HashMap::new();
        let mut tables = Vec::with_capacity(query.from.len());

        for source in &query.from {
            let table = match cache.get(source.source.as_str()) {
                Some(table) => table.clone(),
                None => {
                    let table = self.loader.load(&source.source)?;
                    Logger::trace(
                        "TABLE_LOADED",
                        &[
                            ("table", source.source.as_str()),
                            ("rows", &table.len().to_string()),
                        ],
                    );
                    cache.insert(source.source.as_str(), table.clone());
                    table
                }
            };
            tables.push(table);
        }

        Ok(tables)
    }

    /// Loads tables and plans the query without evaluating it
    pub fn plan(&self, query: &Query) -> QueryResult<(QueryPlan, Vec<Table>)> {
        let tables = self.load_tables(query)?;
        let plan = self.planner.plan(query, &tables)?;
        Ok((plan, tables))
    }

    /// Executes a query and returns results.
    ///
    /// This method is deterministic: same query + same tables = same results.
    pub fn execute(&self, query: &Query) -> QueryResult<ExecutionResult> {
        let sources = query.from.len().to_string();
        let scope = ObservationScope::with_fields("QUERY", &[("sources", sources.as_str())]);

        let outcome = self
            .plan(query)
            .and_then(|(plan, tables)| Self::execute_plan(&plan, tables));

        match &outcome {
            Ok(result) => scope.complete_with_fields(&[
                ("rows", &result.stats.output_rows.to_string()),
                ("joined_rows", &result.stats.joined_rows.to_string()),
            ]),
            Err(err) => scope.fail(err.code().code(), err.message()),
        }
        outcome
    }

    /// Executes a plan over tables aligned with its sources
    pub fn execute_plan(plan: &QueryPlan, tables: Vec<Table>) -> QueryResult<ExecutionResult> {
        let mut stats = ExecutionStats::default();
        let mut tables = tables.into_iter();

        // Step 3: Join sources left to right
        let mut relation = match tables.next() {
            Some(first) => first,
            None => Table::empty(Vec::new()),
        };
        for (source, table) in plan.sources.iter().skip(1).zip(tables) {
            let Some(join) = &source.join else {
                continue;
            };
            relation = JoinExecutor::join(relation, &table, join)?;
            Logger::trace(
                "JOIN_COMPLETE",
                &[
                    ("table", source.table.as_str()),
                    ("strategy", join.strategy.as_str()),
                    ("rows", &relation.len().to_string()),
                ],
            );
        }
        stats.joined_rows = relation.len();

        // Step 4: Filter with WHERE
        if let Some(filter) = &plan.filter {
            relation = PredicateFilter::apply(relation, filter)?;
        }
        stats.filtered_rows = relation.len();
        Logger::trace("FILTER_COMPLETE", &[("rows", &stats.filtered_rows.to_string())]);

        // Steps 5-6: Group, then project values and sort keys
        let mut projected = match &plan.aggregation {
            Some(aggregation) => {
                let (_, rows) = relation.into_parts();
                let groups = Aggregator::group(rows, aggregation)?;
                stats.groups = groups.len();
                Logger::trace("GROUP_COMPLETE", &[("groups", &stats.groups.to_string())]);
                Projector::project_groups(&groups, aggregation, plan)?
            }
            None => Projector::project_rows(relation.rows(), plan)?,
        };

        // Step 7: Sort, then OFFSET and LIMIT
        ResultSorter::sort(&mut projected, &plan.order_by);
        let projected = ResultSorter::limit(projected, plan.limit, plan.offset);

        // Step 8: Assemble
        let table = Projector::assemble(plan, projected);
        stats.output_rows = table.len();
        Logger::trace("PROJECT_COMPLETE", &[("rows", &stats.output_rows.to_string())]);

        Ok(ExecutionResult { table, stats })
    }
}
