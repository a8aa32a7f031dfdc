use quarry_lang::{
    EvalConfig, MemoryStore, ParseConfig, QueryError, RecordId, ResolveError, UnboundPolicy, Value,
};
use quarry_lang::parser::SyntaxErrorKind;
use rust_decimal::Decimal;
use std::collections::HashMap;

fn run(query: &str) -> Vec<Value> {
    let mut store = MemoryStore::new();
    run_in(query, &mut store)
}

fn run_in(query: &str, store: &mut MemoryStore) -> Vec<Value> {
    quarry_lang::run(query, store)
        .unwrap_or_else(|e| panic!("query {query:?} failed: {e}"))
        .into_values()
}

fn single(query: &str) -> Value {
    let values = run(query);
    assert_eq!(values.len(), 1, "expected one value from {query:?}, got {values:?}");
    values.into_iter().next().unwrap_or(Value::Null)
}

fn object(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = HashMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn record(table: &str, key: &str) -> Value {
    Value::Record(RecordId::new(table, key))
}

// ============================================================================
// Arithmetic and values
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(single("1 + 2 * 3"), Value::Integer(7));
    assert_eq!(single("(1 + 2) * 3"), Value::Integer(9));
    assert_eq!(single("7 % 3"), Value::Integer(1));
    assert_eq!(single("-5 + 2"), Value::Integer(-3));
}

#[test]
fn test_division() {
    assert_eq!(single("6 / 3"), Value::Integer(2));
    assert_eq!(single("7 / 2"), Value::Float(3.5));
}

#[test]
fn test_mixed_arithmetic_keeps_whole_integers() {
    assert_eq!(single("1 + 1.0"), Value::Integer(2));
    assert_eq!(single("1 + 0.5"), Value::Float(1.5));
}

#[test]
fn test_decimal_arithmetic() {
    assert_eq!(single("10dec + 1"), Value::Decimal(Decimal::from(11)));
    assert_eq!(single("type_of(1.5dec * 2)"), string("decimal"));
}

#[test]
fn test_runtime_errors_are_failures() {
    assert!(single("1 / 0").is_failure());
    assert!(single("1 + \"a\"").is_failure());
    assert!(single("9223372036854775807 + 1").is_failure());
}

#[test]
fn test_failure_flows_through_operators() {
    assert!(single("(1 / 0) + 1").is_failure());
    assert!(single("(1 / 0) > 1").is_failure());
    assert_eq!(single("is_failure((1 / 0) * 2)"), Value::Boolean(true));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(single("\"quar\" + \"ry\""), string("quarry"));
}

#[test]
fn test_comparison_across_number_types() {
    assert_eq!(single("1 == 1.0"), Value::Boolean(true));
    assert_eq!(single("2 > 1.5dec"), Value::Boolean(true));
    assert_eq!(single("\"a\" < \"b\""), Value::Boolean(true));
}

#[test]
fn test_logic_short_circuits() {
    let mut store = MemoryStore::new();
    let values = run_in("false AND (CREATE r\"t:1\"); true OR (CREATE r\"t:2\")", &mut store);
    assert_eq!(values, vec![Value::Boolean(false), Value::Boolean(true)]);
    assert!(store.records("t").is_empty());
}

#[test]
fn test_null_coalescing() {
    assert_eq!(single("$missing ?? 5"), Value::Integer(5));
    assert_eq!(single("0 ?? 5"), Value::Integer(0));
}

#[test]
fn test_typed_strands_keep_their_kind() {
    assert_eq!(single("type_of(d\"2024-05-01\")"), string("datetime"));
    assert_eq!(single("type_of(\"2024-05-01\")"), string("string"));
    assert_eq!(single("type_of(r\"person:tobie\")"), string("record"));
    assert_eq!(
        single("type_of(u\"0190c9a8-5fd4-7c43-9e2f-0a1b2c3d4e5f\")"),
        string("uuid")
    );
}

#[test]
fn test_object_and_index_access() {
    assert_eq!(single("{\"a\": {\"b\": 1}}.a.b"), Value::Integer(1));
    assert_eq!(single("[1, 2, 3][-1]"), Value::Integer(3));
    assert_eq!(single("[1, 2, 3][10]"), Value::Null);
    assert_eq!(single("{\"k\": 2}[\"k\"]"), Value::Integer(2));
    assert_eq!(single("$missing.name"), Value::Null);
}

#[test]
fn test_knn() {
    assert_eq!(
        single("[[5, 5], [0, 1], [1, 1]] KNN<2> [0, 0]"),
        Value::Array(vec![
            Value::Array(vec![Value::Integer(0), Value::Integer(1)]),
            Value::Array(vec![Value::Integer(1), Value::Integer(1)]),
        ])
    );
    assert!(single("[\"a\"] KNN<1> [0, 0]").is_failure());
}

#[test]
fn test_functions() {
    assert_eq!(single("len([1, 2, 3])"), Value::Integer(3));
    assert_eq!(single("upper(\"abc\")"), string("ABC"));
    assert_eq!(single("keys({\"b\": 1, \"a\": 2})"), Value::Array(vec![string("a"), string("b")]));
    assert_eq!(single("matches(\"tobie@surreal.io\", \"^[a-z]+@\")"), Value::Boolean(true));
    assert_eq!(single("unwrap_or(fail(1), 2)"), Value::Integer(2));
    assert_eq!(single("type_of(uuid())"), string("uuid"));
}

#[test]
fn test_unknown_function_rejected_before_running() {
    let mut store = MemoryStore::new();
    let err = quarry_lang::run("CREATE r\"t:1\"; nope(1)", &mut store).unwrap_err();
    assert_eq!(err, QueryError::Resolve(ResolveError::UnknownFunction("nope".to_string())));
    assert!(store.records("t").is_empty());
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_let_binding() {
    assert_eq!(run("LET $x = 2; $x * 3"), vec![Value::Integer(6)]);
}

#[test]
fn test_unbound_reads_null() {
    assert_eq!(single("$nope"), Value::Null);
}

#[test]
fn test_unbound_failure_policy() {
    let mut store = MemoryStore::new();
    let config = EvalConfig {
        unbound: UnboundPolicy::Failure,
    };
    let result =
        quarry_lang::run_with_config("$nope", &mut store, ParseConfig::default(), config).unwrap();
    assert!(result.values()[0].is_failure());
}

#[test]
fn test_inner_block_shadows() {
    assert_eq!(
        run("LET $x = 1; { LET $x = 2; $x }; $x"),
        vec![Value::Integer(2), Value::Integer(1)]
    );
}

#[test]
fn test_inner_block_reads_outer() {
    assert_eq!(run("LET $x = 1; { $x + 1 }"), vec![Value::Integer(2)]);
}

#[test]
fn test_block_bindings_end_with_block() {
    assert_eq!(run("{ LET $y = 1; }; $y"), vec![Value::Null, Value::Null]);
}

// ============================================================================
// Block values
// ============================================================================

fn tail(query: &str) -> Value {
    let mut store = MemoryStore::new();
    quarry_lang::run(query, &mut store)
        .unwrap_or_else(|e| panic!("query {query:?} failed: {e}"))
        .tail()
        .clone()
}

#[test]
fn test_block_value_is_last_entry() {
    assert_eq!(single("{ 1; 2 }"), Value::Integer(2));
    assert_eq!(single("{ 1; }"), Value::Null);
    assert_eq!(single("{ LET $x = 1; }"), Value::Null);
    assert_eq!(single("{ LET $x = 1; $x }"), Value::Integer(1));
}

#[test]
fn test_return_ends_nearest_block() {
    assert_eq!(run("{ RETURN 1; 2 }"), vec![Value::Integer(1)]);
    assert_eq!(run("{ { RETURN 1; }; RETURN 2; }"), vec![Value::Integer(2)]);
    assert_eq!(run("{ IF true { RETURN 1; }; 2 }"), vec![Value::Integer(2)]);
    // A terminated RETURN still yields its value
    assert_eq!(run("{ 1; RETURN 3; }"), vec![Value::Integer(3)]);
}

#[test]
fn test_query_tail() {
    assert_eq!(tail("LET $x = 3; $x + 4"), Value::Integer(7));
    assert_eq!(tail("1; 2;"), Value::Null);
    assert_eq!(tail("LET $x = 1"), Value::Null);
    assert_eq!(tail("RETURN 5; 6"), Value::Integer(5));
}

#[test]
fn test_transaction_body_follows_block_rule() {
    assert_eq!(run("{ BEGIN; CREATE r\"t:1\"; COMMIT; 2 }"), vec![Value::Integer(2)]);
    assert_eq!(run("{ BEGIN; 2; COMMIT; }"), vec![Value::Null]);
    assert_eq!(run("{ BEGIN; 2; COMMIT }"), vec![Value::Null]);
    assert_eq!(tail("BEGIN; 1; COMMIT; 2"), Value::Integer(2));
    assert_eq!(tail("BEGIN; 1; COMMIT;"), Value::Null);
}

#[test]
fn test_long_operator_chain_is_rejected() {
    let query = format!("1{}", " + 1".repeat(20_000));
    let mut store = MemoryStore::new();
    match quarry_lang::run(&query, &mut store) {
        Err(QueryError::Syntax(e)) => assert_eq!(e.kind, SyntaxErrorKind::NestingTooDeep),
        other => panic!("expected a nesting error, got {other:?}"),
    }

    let query = format!("1{}", " + 1".repeat(99));
    assert_eq!(single(&query), Value::Integer(100));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_else() {
    assert_eq!(
        single("IF 1 > 2 { \"a\" } ELSE IF true { \"b\" } ELSE { \"c\" }"),
        string("b")
    );
    assert_eq!(single("IF false { 1 }"), Value::Null);
}

#[test]
fn test_for_runs_body_per_item() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "FOR $n IN [1, 2, 3] { CREATE number CONTENT {\"n\": $n}; }; len(SELECT * FROM number WHERE n > 1)",
        &mut store,
    );
    assert_eq!(values, vec![Value::Integer(2)]);
    assert_eq!(store.records("number").len(), 3);
}

#[test]
fn test_for_over_null_and_scalar() {
    let mut store = MemoryStore::new();
    run_in("FOR $n IN null { CREATE a }; FOR $n IN 7 { CREATE b }", &mut store);
    assert_eq!(store.records("a").len(), 0);
    assert_eq!(store.records("b").len(), 1);
}

#[test]
fn test_for_binding_is_per_iteration() {
    assert_eq!(run("FOR $n IN [1] { LET $seen = $n }; $n; $seen"), vec![Value::Null, Value::Null]);
}

#[test]
fn test_throw_ends_block_with_failure() {
    assert_eq!(
        single("{ THROW \"bad\"; 1 }"),
        Value::Failure(Box::new(string("bad")))
    );
    assert_eq!(single("unwrap_or({ THROW \"bad\" }, 0)"), Value::Integer(0));
}

#[test]
fn test_top_level_return_ends_query() {
    let mut store = MemoryStore::new();
    let values = run_in("1; RETURN 2; CREATE r\"t:1\"; 3", &mut store);
    assert_eq!(values, vec![Value::Integer(1), Value::Integer(2)]);
    assert!(store.records("t").is_empty());
}

// ============================================================================
// Storage
// ============================================================================

#[test]
fn test_create_returns_record() {
    assert_eq!(
        single("CREATE r\"person:tobie\" CONTENT {\"age\": 32}"),
        object(vec![("id", record("person", "tobie")), ("age", Value::Integer(32))])
    );
}

#[test]
fn test_create_on_table_generates_key() {
    let mut store = MemoryStore::new();
    let values = run_in("CREATE person; CREATE person", &mut store);
    let ids: Vec<_> = values.iter().filter_map(|v| v.record_id().cloned()).collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(store.records("person").len(), 2);
}

#[test]
fn test_duplicate_create_is_failure() {
    let values = run("CREATE r\"a:1\"; CREATE r\"a:1\"");
    assert!(!values[0].is_failure());
    assert!(values[1].is_failure());
}

#[test]
fn test_create_needs_object_content() {
    assert!(single("CREATE r\"a:1\" CONTENT 5").is_failure());
}

#[test]
fn test_select_where_uses_this() {
    let mut store = MemoryStore::new();
    store.insert(RecordId::new("person", "a"), object(vec![("age", Value::Integer(32))]));
    store.insert(RecordId::new("person", "b"), object(vec![("age", Value::Integer(17))]));

    let values = run_in("SELECT * FROM person WHERE age >= 18; SELECT * FROM person WHERE $this.age < 18", &mut store);
    assert_eq!(
        values,
        vec![
            Value::Array(vec![object(vec![("id", record("person", "a")), ("age", Value::Integer(32))])]),
            Value::Array(vec![object(vec![("id", record("person", "b")), ("age", Value::Integer(17))])]),
        ]
    );
}

#[test]
fn test_select_single_record() {
    let mut store = MemoryStore::new();
    store.insert(RecordId::new("person", "a"), object(vec![]));
    let values = run_in("len(SELECT * FROM r\"person:a\"); len(SELECT * FROM r\"person:z\")", &mut store);
    assert_eq!(values, vec![Value::Integer(1), Value::Integer(0)]);
}

#[test]
fn test_update_set() {
    let mut store = MemoryStore::new();
    store.insert(
        RecordId::new("person", "tobie"),
        object(vec![("age", Value::Integer(32))]),
    );

    let values = run_in(
        "UPDATE r\"person:tobie\" SET age = age + 1, address.city = \"London\"",
        &mut store,
    );
    let expected = object(vec![
        ("id", record("person", "tobie")),
        ("age", Value::Integer(33)),
        ("address", object(vec![("city", string("London"))])),
    ]);
    assert_eq!(values, vec![expected.clone()]);
    assert_eq!(store.get(&RecordId::new("person", "tobie")), Some(&expected));
}

#[test]
fn test_update_missing_record_is_null() {
    let mut store = MemoryStore::new();
    assert_eq!(run_in("UPDATE r\"person:nobody\" SET age = 1", &mut store), vec![Value::Null]);
    assert!(store.records("person").is_empty());
}

#[test]
fn test_update_table_content() {
    let mut store = MemoryStore::new();
    store.insert(RecordId::new("task", "1"), object(vec![("done", Value::Boolean(false))]));
    store.insert(RecordId::new("task", "2"), object(vec![("done", Value::Boolean(false))]));

    let values = run_in("UPDATE task CONTENT {\"done\": true}", &mut store);
    assert_eq!(
        values,
        vec![Value::Array(vec![
            object(vec![("id", record("task", "1")), ("done", Value::Boolean(true))]),
            object(vec![("id", record("task", "2")), ("done", Value::Boolean(true))]),
        ])]
    );
}

#[test]
fn test_update_bad_path_is_failure() {
    let mut store = MemoryStore::new();
    store.insert(RecordId::new("t", "1"), object(vec![("n", Value::Integer(1))]));
    assert!(run_in("UPDATE r\"t:1\" SET n.x = 2", &mut store)[0].is_failure());
}

#[test]
fn test_delete() {
    let mut store = MemoryStore::new();
    store.insert(RecordId::new("t", "1"), object(vec![]));
    store.insert(RecordId::new("t", "2"), object(vec![]));
    store.insert(RecordId::new("u", "1"), object(vec![]));

    let values = run_in("DELETE r\"t:1\"; len(SELECT * FROM t); DELETE u; len(SELECT * FROM u)", &mut store);
    assert_eq!(values, vec![Value::Null, Value::Integer(1), Value::Null, Value::Integer(0)]);
}

#[test]
fn test_param_targets() {
    let values = run(
        "LET $p = CREATE r\"person:x\"; UPDATE $p SET name = \"X\"; LET $t = \"person\"; len(SELECT * FROM $t)",
    );
    assert_eq!(
        values,
        vec![
            object(vec![("id", record("person", "x")), ("name", string("X"))]),
            Value::Integer(1),
        ]
    );
    assert!(single("DELETE $nope").is_failure());
}

#[test]
fn test_record_id_field_reads_record() {
    assert_eq!(
        run("CREATE r\"person:a\" CONTENT {\"name\": \"A\"}; r\"person:a\".name"),
        vec![
            object(vec![("id", record("person", "a")), ("name", string("A"))]),
            string("A"),
        ]
    );
}
