// tests/transaction_tests.rs

use quarry_lang::ast::TxnId;
use quarry_lang::{
    EvalError, MemoryStore, QueryError, ReadOp, RecordId, ResolveError, Storage, StorageError,
    Value, WriteHandle, WriteOp,
};

fn run_in(query: &str, store: &mut dyn Storage) -> Vec<Value> {
    quarry_lang::run(query, store)
        .unwrap_or_else(|e| panic!("query {query:?} failed: {e}"))
        .into_values()
}

fn resolve_error(query: &str) -> ResolveError {
    match quarry_lang::parse_query(query) {
        Err(QueryError::Resolve(e)) => e,
        other => panic!("expected a resolve error for {query:?}, got {other:?}"),
    }
}

fn exists(store: &MemoryStore, table: &str, key: &str) -> bool {
    store.get(&RecordId::new(table, key)).is_some()
}

/// Store that can be told to fail reads or applies.
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_applies: bool,
    fail_discards: bool,
}

impl Storage for FailingStore {
    fn write(&mut self, op: WriteOp, visible: &[WriteHandle]) -> Result<WriteHandle, StorageError> {
        self.inner.write(op, visible)
    }

    fn apply(&mut self, handle: WriteHandle) -> Result<(), StorageError> {
        if self.fail_applies {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.inner.apply(handle)
    }

    fn discard(&mut self, handle: WriteHandle) -> Result<(), StorageError> {
        if self.fail_discards {
            return Err(StorageError::Unavailable("read-only".to_string()));
        }
        self.inner.discard(handle)
    }

    fn read(&self, op: &ReadOp, visible: &[WriteHandle]) -> Result<Value, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable("offline".to_string()));
        }
        self.inner.read(op, visible)
    }
}

// ============================================================================
// Commit and cancel
// ============================================================================

#[test]
fn test_commit_applies_writes() {
    let mut store = MemoryStore::new();
    run_in("BEGIN; CREATE r\"t:1\"; CREATE r\"t:2\"; COMMIT;", &mut store);
    assert!(exists(&store, "t", "1"));
    assert!(exists(&store, "t", "2"));
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_writes_outside_transaction_auto_commit() {
    let mut store = MemoryStore::new();
    run_in("CREATE r\"t:1\"", &mut store);
    assert!(exists(&store, "t", "1"));
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_cancel_reverts_bindings_and_writes() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "LET $x = 1; BEGIN; LET $x = 2; CREATE r\"t:1\"; CANCEL; COMMIT; $x",
        &mut store,
    );
    assert_eq!(values.len(), 2);
    assert_eq!(values[1], Value::Integer(1));
    assert!(store.records("t").is_empty());
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_commit_after_cancel_keeps_prior_value() {
    let mut store = MemoryStore::new();
    assert_eq!(
        run_in("LET $x = 1; BEGIN; LET $x = 2; CANCEL; COMMIT; $x", &mut store),
        vec![Value::Integer(1)]
    );
}

#[test]
fn test_cancel_unbinds_new_variables() {
    let mut store = MemoryStore::new();
    assert_eq!(
        run_in("BEGIN; LET $y = 5; CANCEL; $y", &mut store),
        vec![Value::Null]
    );
}

#[test]
fn test_cancel_then_return_sees_no_phantom_record() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; LET $p = CREATE foo; CANCEL; RETURN $p; COMMIT;",
        &mut store,
    );
    assert_eq!(values, vec![Value::Null]);
    assert!(store.records("foo").is_empty());
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_nested_cancel_flags_the_transaction() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "LET $x = 1; BEGIN; LET $x = 2; CREATE r\"t:1\"; IF true { CANCEL }; COMMIT; $x; len(SELECT * FROM t)",
        &mut store,
    );
    assert_eq!(values.len(), 4);
    assert_eq!(values[1], Value::Null);
    assert_eq!(values[2], Value::Integer(1));
    assert_eq!(values[3], Value::Integer(0));
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_nested_cancel_not_taken() {
    let mut store = MemoryStore::new();
    run_in("BEGIN; CREATE r\"t:1\"; IF false { CANCEL }; COMMIT;", &mut store);
    assert!(exists(&store, "t", "1"));
}

#[test]
fn test_repeated_nested_cancel() {
    let mut store = MemoryStore::new();
    run_in("BEGIN; CREATE r\"t:1\"; { CANCEL }; { CANCEL }; COMMIT;", &mut store);
    assert!(store.records("t").is_empty());
}

// ============================================================================
// Nesting
// ============================================================================

#[test]
fn test_inner_commit_merges_into_outer() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; BEGIN; CREATE r\"t:1\"; COMMIT; len(SELECT * FROM t); CANCEL; len(SELECT * FROM t)",
        &mut store,
    );
    assert_eq!(values[1..], [Value::Integer(1), Value::Integer(0)]);
    assert!(store.records("t").is_empty());
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_inner_commit_in_block_discarded_by_outer_cancel() {
    let mut store = MemoryStore::new();
    run_in(
        "BEGIN; { BEGIN; CREATE r\"t:1\"; COMMIT; }; CANCEL;",
        &mut store,
    );
    assert!(store.records("t").is_empty());
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_inner_and_outer_commit() {
    let mut store = MemoryStore::new();
    run_in(
        "BEGIN; CREATE r\"t:1\"; { BEGIN; CREATE r\"t:2\"; COMMIT; }; COMMIT;",
        &mut store,
    );
    assert!(exists(&store, "t", "1"));
    assert!(exists(&store, "t", "2"));
}

#[test]
fn test_inner_cancel_leaves_outer_intact() {
    let mut store = MemoryStore::new();
    run_in(
        "BEGIN; CREATE r\"t:1\"; BEGIN; CREATE r\"t:2\"; CANCEL; COMMIT;",
        &mut store,
    );
    assert!(exists(&store, "t", "1"));
    assert!(!exists(&store, "t", "2"));
}

#[test]
fn test_nested_cancel_targets_innermost() {
    let mut store = MemoryStore::new();
    run_in(
        "BEGIN; CREATE r\"t:1\"; { BEGIN; CREATE r\"t:2\"; { CANCEL }; COMMIT; }; COMMIT;",
        &mut store,
    );
    assert!(exists(&store, "t", "1"));
    assert!(!exists(&store, "t", "2"));
}

#[test]
fn test_outer_rollback_restores_inner_bindings() {
    let mut store = MemoryStore::new();
    assert_eq!(
        run_in(
            "LET $x = 1; BEGIN; LET $x = 2; BEGIN; LET $x = 3; COMMIT; CANCEL; $x",
            &mut store
        ),
        vec![Value::Integer(1)]
    );
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn test_reads_see_own_pending_writes() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; CREATE r\"t:1\" CONTENT {\"n\": 1}; UPDATE r\"t:1\" SET n = 2; SELECT * FROM r\"t:1\"; COMMIT;",
        &mut store,
    );
    let selected = &values[2];
    match selected {
        Value::Array(rows) => assert_eq!(rows[0].get("n"), Some(&Value::Integer(2))),
        other => panic!("expected rows, got {other:?}"),
    }
    assert_eq!(store.get(&RecordId::new("t", "1")).and_then(|r| r.get("n")), Some(&Value::Integer(2)));
}

#[test]
fn test_canceled_writes_are_invisible() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; CREATE r\"t:1\"; CANCEL; len(SELECT * FROM t)",
        &mut store,
    );
    assert_eq!(values[1], Value::Integer(0));
}

#[test]
fn test_create_after_staged_delete() {
    let mut store = MemoryStore::new();
    run_in("CREATE r\"person:1\" CONTENT {\"v\": 1}", &mut store);

    let values = run_in(
        "BEGIN; DELETE r\"person:1\"; LET $c = CREATE r\"person:1\" CONTENT {\"v\": 2}; COMMIT; $c",
        &mut store,
    );
    assert!(!values[1].is_failure(), "create failed: {:?}", values[1]);
    assert_eq!(values[1].get("v"), Some(&Value::Integer(2)));
    assert_eq!(
        store.get(&RecordId::new("person", "1")).and_then(|r| r.get("v")),
        Some(&Value::Integer(2))
    );
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_create_delete_create_in_one_transaction() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; CREATE r\"t:1\" CONTENT {\"n\": 1}; DELETE r\"t:1\"; CREATE r\"t:1\" CONTENT {\"n\": 2}; COMMIT;",
        &mut store,
    );
    assert!(!values[2].is_failure(), "create failed: {:?}", values[2]);
    assert_eq!(
        store.get(&RecordId::new("t", "1")).and_then(|r| r.get("n")),
        Some(&Value::Integer(2))
    );
}

#[test]
fn test_create_of_staged_record_still_fails() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; CREATE r\"t:1\"; CREATE r\"t:1\"; COMMIT; len(SELECT * FROM t)",
        &mut store,
    );
    assert!(values[1].is_failure());
    assert_eq!(values[2], Value::Integer(1));
}

// ============================================================================
// Early return and faults
// ============================================================================

#[test]
fn test_early_return_rolls_back_open_transaction() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "LET $x = 1; { BEGIN; LET $x = 2; CREATE r\"t:1\"; RETURN $x; COMMIT; }; $x; len(SELECT * FROM t)",
        &mut store,
    );
    assert_eq!(values, vec![Value::Integer(2), Value::Integer(1), Value::Integer(0)]);
    assert_eq!(store.pending_len(), 0);
}

#[test]
fn test_throw_only_ends_nearest_block() {
    let mut store = MemoryStore::new();
    let values = run_in(
        "BEGIN; CREATE r\"t:1\"; IF true { THROW \"stop\" }; COMMIT; 1",
        &mut store,
    );
    assert!(values[1].is_failure());
    assert_eq!(values[2], Value::Integer(1));
    assert!(exists(&store, "t", "1"));
}

#[test]
fn test_fault_discards_pending_writes() {
    let mut store = FailingStore {
        fail_reads: true,
        ..Default::default()
    };
    let err = quarry_lang::run(
        "BEGIN; BEGIN; CREATE r\"t:1\"; COMMIT; CREATE r\"t:2\"; SELECT * FROM t; COMMIT;",
        &mut store,
    )
    .unwrap_err();

    assert_eq!(
        err,
        QueryError::Eval(EvalError::Storage(StorageError::Unavailable("offline".to_string())))
    );
    assert_eq!(store.inner.pending_len(), 0);
    assert!(store.inner.records("t").is_empty());
}

#[test]
fn test_failed_commit_discards_writes() {
    let mut store = FailingStore {
        fail_applies: true,
        ..Default::default()
    };
    assert!(quarry_lang::run("BEGIN; CREATE r\"t:1\"; CREATE r\"t:2\"; COMMIT;", &mut store).is_err());
    assert_eq!(store.inner.pending_len(), 0);

    assert!(quarry_lang::run("CREATE r\"t:3\"", &mut store).is_err());
    assert_eq!(store.inner.pending_len(), 0);
}

#[test]
fn test_failed_discard_keeps_commit_error() {
    let mut store = FailingStore {
        fail_applies: true,
        fail_discards: true,
        ..Default::default()
    };
    let disk_full = QueryError::Eval(EvalError::Storage(StorageError::Unavailable(
        "disk full".to_string(),
    )));
    assert_eq!(
        quarry_lang::run("BEGIN; CREATE r\"t:1\"; CREATE r\"t:2\"; COMMIT;", &mut store),
        Err(disk_full.clone())
    );
    assert_eq!(quarry_lang::run("CREATE r\"t:3\"", &mut store), Err(disk_full));
    assert!(store.inner.records("t").is_empty());
}

#[test]
fn test_invalid_query_writes_nothing() {
    let mut store = MemoryStore::new();
    for query in [
        "CREATE r\"t:1\"; 10abc",
        "CREATE r\"t:1\"; LET select = 1",
        "CREATE r\"t:1\"; { a: 1 }",
        "CREATE r\"t:1\"; COMMIT",
    ] {
        assert!(quarry_lang::run(query, &mut store).is_err(), "{query:?} should fail");
    }
    assert!(store.records("t").is_empty());
    assert_eq!(store.pending_len(), 0);
}

// ============================================================================
// Pairing
// ============================================================================

#[test]
fn test_commit_without_begin() {
    assert_eq!(resolve_error("COMMIT"), ResolveError::UnmatchedCommit);
}

#[test]
fn test_cancel_outside_transaction() {
    assert_eq!(resolve_error("CANCEL"), ResolveError::CancelOutsideTransaction);
    assert_eq!(resolve_error("{ CANCEL }"), ResolveError::CancelOutsideTransaction);
}

#[test]
fn test_unterminated_transaction() {
    assert_eq!(
        resolve_error("BEGIN; 1"),
        ResolveError::UnterminatedTransaction(TxnId(0))
    );
    // A BEGIN is closed only in its own sequence
    assert_eq!(
        resolve_error("{ BEGIN }; COMMIT"),
        ResolveError::UnterminatedTransaction(TxnId(0))
    );
}

#[test]
fn test_second_commit_after_cancel_is_unmatched() {
    assert_eq!(
        resolve_error("BEGIN; CANCEL; COMMIT; COMMIT"),
        ResolveError::UnmatchedCommit
    );
}

#[test]
fn test_arity_checked_before_running() {
    assert!(matches!(
        resolve_error("len(1, 2)"),
        ResolveError::ArityMismatch { found: 2, .. }
    ));
}
