//! End-to-end query evaluation tests
//!
//! Queries and tables are written as JSON documents, decoded with the
//! public codec and evaluated against in-memory tables.

use sqleval::{
    decode_query, decode_table, encode_table, MemoryTableLoader, QueryError, QueryErrorCode,
    QueryExecutor, Table, TableLoader, Value,
};
use serde_json::{json, Value as JsonValue};

// =============================================================================
// Test Utilities
// =============================================================================

fn table(document: JsonValue) -> Table {
    decode_table(document.to_string().as_bytes()).unwrap()
}

fn loader() -> MemoryTableLoader {
    let mut loader = MemoryTableLoader::new();
    loader.insert(
        "orders",
        table(json!([[["id", "int"], ["amount", "int"]], [1, 10], [2, 20], [3, null]])),
    );
    loader.insert(
        "numbers",
        table(json!([[["n", "int"], ["k", "str"]], [1, "a"], [2, "b"], [3, "a"], [4, "c"], [5, "a"]])),
    );
    loader.insert(
        "users",
        table(json!([[["id", "int"], ["name", "str"]], [1, "ann"], [2, "bob"], [4, "cy"]])),
    );
    loader
}

fn run(query: JsonValue) -> Result<Table, QueryError> {
    let loader = loader();
    let query = decode_query(query.to_string().as_bytes()).unwrap();
    QueryExecutor::new(&loader)
        .execute(&query)
        .map(|result| result.into_table())
}

fn col(name: &str) -> JsonValue {
    json!({"column": {"name": name}})
}

fn lit(value: JsonValue) -> JsonValue {
    json!({"literal": value})
}

fn op(op: &str, left: JsonValue, right: JsonValue) -> JsonValue {
    json!({"op": op, "left": left, "right": right})
}

fn error_code(query: JsonValue) -> QueryErrorCode {
    run(query).unwrap_err().code()
}

// =============================================================================
// Relational properties
// =============================================================================

#[test]
fn test_select_star_is_identity() {
    let result = run(json!({"select": [{"star": true}], "from": ["orders"]})).unwrap();
    let orders = loader().load("orders").unwrap();
    assert_eq!(result.column_names(), orders.column_names());
    assert_eq!(result.rows(), orders.rows());
}

#[test]
fn test_cross_join_cardinality() {
    let result = run(json!({
        "select": [{"star": true}],
        "from": ["orders", "numbers"]
    }))
    .unwrap();
    assert_eq!(result.len(), 3 * 5);
    assert_eq!(result.width(), 4);
}

#[test]
fn test_sum_with_filter_encodes_expected_document() {
    let result = run(json!({
        "select": [{"function": {"name": "sum", "args": [col("amount")]}, "as": "total"}],
        "from": [{"source": "orders"}],
        "where": [op(">", col("amount"), lit(json!(5)))]
    }))
    .unwrap();

    assert_eq!(encode_table(&result), "[\n    [[\"total\",\"int\"]],\n    [30]\n]\n");
}

#[test]
fn test_limit_offset_after_sort() {
    let result = run(json!({
        "select": [col("n")],
        "from": ["numbers"],
        "order_by": [{"column": "n", "direction": "asc"}],
        "limit": 2,
        "offset": 3
    }))
    .unwrap();
    assert_eq!(result.rows(), &[vec![Value::Int(4)], vec![Value::Int(5)]]);
}

#[test]
fn test_group_counts_sum_to_filtered_rows() {
    let result = run(json!({
        "select": [col("k"), {"aggregate": {"function": "count", "arg": "*"}, "as": "c"}],
        "from": ["numbers"],
        "where": op(">", col("n"), lit(json!(1))),
        "group_by": [col("k")],
        "order_by": [{"column": "k"}]
    }))
    .unwrap();

    let total: i64 = result
        .rows()
        .iter()
        .map(|row| match row[1] {
            Value::Int(c) => c,
            ref other => panic!("unexpected count {:?}", other),
        })
        .sum();
    assert_eq!(total, 4);
    assert_eq!(result.rows()[0], vec![Value::from("a"), Value::Int(2)]);
}

#[test]
fn test_sort_is_stable() {
    let mut loader = MemoryTableLoader::new();
    loader.insert(
        "t",
        table(json!([[["x", "int"], ["y", "str"]], [1, "b"], [1, "a"], [2, "c"]])),
    );
    let query = decode_query(
        json!({"select": [{"star": true}], "from": ["t"], "order_by": [col("x")]})
            .to_string()
            .as_bytes(),
    )
    .unwrap();

    let result = QueryExecutor::new(&loader).execute(&query).unwrap();
    assert_eq!(
        result.table.rows(),
        &[
            vec![Value::Int(1), Value::from("b")],
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Int(2), Value::from("c")],
        ]
    );
}

#[test]
fn test_having_filters_groups() {
    let result = run(json!({
        "select": [col("k")],
        "from": ["numbers"],
        "group_by": [col("k")],
        "having": [op(
            ">",
            json!({"aggregate": {"function": "sum", "arg": col("n")}}),
            lit(json!(3))
        )]
    }))
    .unwrap();
    assert_eq!(result.rows(), &[vec![Value::from("a")], vec![Value::from("c")]]);
}

// =============================================================================
// Null semantics
// =============================================================================

#[test]
fn test_kleene_logic_and_null_propagation() {
    let result = run(json!({
        "select": [
            {"op": "and", "left": lit(json!(null)), "right": lit(json!(false)), "as": "a"},
            {"op": "or", "left": lit(json!(null)), "right": lit(json!(true)), "as": "b"},
            {"op": "+", "left": lit(json!(null)), "right": lit(json!(1)), "as": "c"},
            {"op": "=", "left": lit(json!(null)), "right": lit(json!(null)), "as": "d"},
            {"op": "/", "left": lit(json!(1)), "right": lit(json!(0)), "as": "e"}
        ],
        "from": ["orders"],
        "limit": 1
    }))
    .unwrap();

    assert_eq!(
        result.rows(),
        &[vec![Value::Bool(false), Value::Bool(true), Value::Null, Value::Null, Value::Null]]
    );
}

#[test]
fn test_aggregate_over_empty_input() {
    let ungrouped = run(json!({
        "select": [
            {"aggregate": {"function": "count"}, "as": "n"},
            {"aggregate": {"function": "sum", "arg": col("amount")}, "as": "s"}
        ],
        "from": ["orders"],
        "where": op(">", col("amount"), lit(json!(100)))
    }))
    .unwrap();
    assert_eq!(ungrouped.rows(), &[vec![Value::Int(0), Value::Null]]);

    let grouped = run(json!({
        "select": [{"aggregate": {"function": "count"}, "as": "n"}],
        "from": ["orders"],
        "where": op(">", col("amount"), lit(json!(100))),
        "group_by": [col("id")]
    }))
    .unwrap();
    assert!(grouped.is_empty());
}

// =============================================================================
// Joins
// =============================================================================

#[test]
fn test_hash_join_matches_nested_loop() {
    let loader = loader();
    let query = decode_query(
        json!({
            "select": [{"star": true}],
            "from": [
                {"source": "numbers", "as": "x"},
                {"source": "users", "as": "u", "on": op("=",
                    json!({"column": {"table": "x", "name": "n"}}),
                    json!({"column": {"table": "u", "name": "id"}}))}
            ]
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap();

    let hashed = QueryExecutor::new(&loader).with_hash_join(true).execute(&query).unwrap();
    let nested = QueryExecutor::new(&loader).with_hash_join(false).execute(&query).unwrap();
    assert_eq!(hashed.table, nested.table);
    assert_eq!(hashed.len(), 3);
    assert_eq!(hashed.table.column_names(), vec!["n", "k", "id", "name"]);
}

#[test]
fn test_hash_join_matches_nested_loop_on_large_keys() {
    let mut loader = MemoryTableLoader::new();
    loader.insert("a", table(json!([["k"], [9007199254740993_i64], [9007199254740992_i64]])));
    loader.insert(
        "b",
        table(json!([["j"], [9007199254740992_i64], [9007199254740992.0], [9007199254740993_i64]])),
    );
    let query = decode_query(
        json!({
            "select": [{"star": true}],
            "from": ["a", {"source": "b", "on": op("=", col("k"), col("j"))}]
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap();

    let hashed = QueryExecutor::new(&loader).with_hash_join(true).execute(&query).unwrap();
    let nested = QueryExecutor::new(&loader).with_hash_join(false).execute(&query).unwrap();
    assert_eq!(hashed.table, nested.table);
    assert_eq!(
        nested.table.rows(),
        &[
            vec![Value::Int(9007199254740993), Value::Int(9007199254740993)],
            vec![Value::Int(9007199254740992), Value::Int(9007199254740992)],
            vec![Value::Int(9007199254740992), Value::Float(9007199254740992.0)],
        ]
    );
}

#[test]
fn test_group_by_mixed_keys_independent_of_row_order() {
    let counts = |document: JsonValue| -> Vec<Value> {
        let mut loader = MemoryTableLoader::new();
        loader.insert("t", table(document));
        let query = decode_query(
            json!({
                "select": [{"aggregate": {"function": "count"}, "as": "c"}],
                "from": ["t"],
                "group_by": [col("k")],
                "order_by": [{"column": "c"}]
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();
        let result = QueryExecutor::new(&loader).execute(&query).unwrap();
        result.table.rows().iter().map(|r| r[0].clone()).collect()
    };

    let int_first = counts(json!([["k"], [9007199254740992_i64], [9007199254740992.0], [9007199254740993_i64]]));
    let float_first = counts(json!([["k"], [9007199254740992.0], [9007199254740992_i64], [9007199254740993_i64]]));
    assert_eq!(int_first, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(float_first, int_first);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_error_kinds() {
    assert_eq!(
        error_code(json!({"select": [col("nope")], "from": ["orders"]})),
        QueryErrorCode::UnknownColumn
    );
    assert_eq!(
        error_code(json!({"select": [col("id")], "from": ["orders", "users"]})),
        QueryErrorCode::AmbiguousColumn
    );
    assert_eq!(
        error_code(json!({"select": [col("id"), col("id")], "from": ["orders"]})),
        QueryErrorCode::DuplicateOutputColumn
    );
    assert_eq!(
        error_code(json!({"select": [{"function": {"name": "frob", "args": []}}], "from": ["orders"]})),
        QueryErrorCode::UnknownFunction
    );
    assert_eq!(
        error_code(json!({
            "select": [col("id"), {"aggregate": {"function": "count"}}],
            "from": ["orders"]
        })),
        QueryErrorCode::NonAggregatedColumnWithoutGroupBy
    );
    assert_eq!(
        error_code(json!({"select": [col("id")], "from": ["orders"], "limit": -1})),
        QueryErrorCode::InvalidLimit
    );
    assert_eq!(
        error_code(json!({
            "select": [col("id")],
            "from": ["orders"],
            "where": op(">", json!({"aggregate": {"function": "count"}}), lit(json!(1)))
        })),
        QueryErrorCode::AggregateOutsideGroupContext
    );
    assert_eq!(
        error_code(json!({"select": [{"star": true}], "from": ["absent"]})),
        QueryErrorCode::NotFound
    );
    assert_eq!(
        error_code(json!({"select": [{"star": true}], "from": ["orders"], "where": col("id")})),
        QueryErrorCode::TypeMismatch
    );
}

#[test]
fn test_unknown_column_message() {
    let err = run(json!({
        "select": [json!({"column": {"table": "orders", "name": "nope"}})],
        "from": ["orders"]
    }))
    .unwrap_err();
    assert_eq!(err.message(), "Unknown column \"nope\" in table \"orders\".");
}
