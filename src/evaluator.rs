use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::ast::{
    BinOp, Block, Change, Expr, Literal, Statement, Strand, StrandKind, Target, TxnId, TxnRole, UnaryOp,
};
use crate::config::{EvalConfig, UnboundPolicy};
use crate::functions;
use crate::scope::{Scope, ScopedQuery};
use crate::storage::{ReadOp, Storage, StorageError, WriteHandle, WriteOp};
use crate::transaction::TransactionContext;
use crate::transform::{self, Path};
use crate::value::{RecordId, Value, type_name};

/// Faults that abort a query. Value-level problems (type mismatches,
/// division by zero, `THROW`) are [`Value::Failure`] values instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("transaction statement was not resolved before evaluation")]
    Unresolved,
}

/// Values produced by the top-level statements of a query, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSequence {
    values: Vec<Value>,
    tail: Value,
}

impl ResultSequence {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// The query's implicit return value: the last statement's value, or
    /// null when it is suppressed by a trailing `;`.
    pub fn tail(&self) -> &Value {
        &self.tail
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of one statement.
enum Flow {
    Value(Value),
    /// LET, FOR and transaction statements produce no value
    Silent,
    /// RETURN or THROW: ends the innermost statement sequence
    Return(Value),
}

enum TargetRef {
    Table(String),
    Record(RecordId),
}

/// The query evaluator.
///
/// Holds the frame chain and the stack of open transaction contexts for one
/// query run, and borrows the store for its duration.
pub struct Evaluator<'s> {
    storage: &'s mut dyn Storage,
    config: EvalConfig,
    scope: Scope,
    transactions: Vec<TransactionContext>,
}

impl<'s> Evaluator<'s> {
    pub fn new(storage: &'s mut dyn Storage, config: EvalConfig) -> Self {
        Evaluator {
            storage,
            config,
            scope: Scope::new(),
            transactions: Vec::new(),
        }
    }

    /// Evaluates a resolved query.
    ///
    /// A fault rolls back every open transaction context before the error
    /// is returned, so nothing staged by this query is left behind.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_lang::{EvalConfig, Evaluator, MemoryStore, Value};
    ///
    /// let scoped = quarry_lang::parse_query("LET $x = 1; $x + 1").unwrap();
    /// let mut store = MemoryStore::new();
    /// let result = Evaluator::new(&mut store, EvalConfig::default())
    ///     .evaluate(&scoped)
    ///     .unwrap();
    ///
    /// assert_eq!(result.values(), &[Value::Integer(2)]);
    /// ```
    #[instrument(name = "evaluator::evaluate", level = "debug", skip_all)]
    pub fn evaluate(&mut self, query: &ScopedQuery) -> Result<ResultSequence, EvalError> {
        let mut values = Vec::new();
        // Every BEGIN may be open at once at most
        self.transactions.reserve(query.transactions);
        match self.run_sequence(&query.query.body, Some(&mut values)) {
            Ok(tail) => Ok(ResultSequence { values, tail }),
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    /// Roll back every open context, innermost first.
    fn abort(&mut self) {
        while let Some(txn) = self.transactions.pop() {
            let id = txn.id;
            if let Err(e) = txn.rollback(&mut self.scope, &mut *self.storage) {
                warn!(txn = %id, error = %e, "rollback after fault failed");
            }
        }
    }

    /// Run a statement sequence in the current frame. Values of
    /// value-producing statements go to `sink` when given.
    fn run_sequence(
        &mut self,
        block: &Block,
        mut sink: Option<&mut Vec<Value>>,
    ) -> Result<Value, EvalError> {
        let mark = self.transactions.len();
        let mut last = Value::Null;
        let mut returned = false;

        for statement in &block.entries {
            match self.eval_statement(statement)? {
                Flow::Value(value) => {
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.push(value.clone());
                    }
                    last = value;
                }
                Flow::Silent => last = Value::Null,
                Flow::Return(value) => {
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.push(value.clone());
                    }
                    last = value;
                    returned = true;
                    break;
                }
            }
        }

        // Contexts this sequence opened and never reached COMMIT/CANCEL for
        while self.transactions.len() > mark {
            if let Some(txn) = self.transactions.pop() {
                debug!(txn = %txn.id, "context left open by early return");
                txn.rollback(&mut self.scope, &mut *self.storage)?;
            }
        }

        if block.terminated && !returned {
            Ok(Value::Null)
        } else {
            Ok(last)
        }
    }

    /// Evaluate a block in a fresh frame, optionally pre-binding one name.
    fn eval_block(&mut self, block: &Block, binding: Option<(&str, Value)>) -> Result<Value, EvalError> {
        self.scope.push();
        if let Some((name, value)) = binding {
            self.scope.bind(name, value);
        }
        let result = self.run_sequence(block, None);
        self.scope.pop();
        result
    }

    fn eval_statement(&mut self, statement: &Statement) -> Result<Flow, EvalError> {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expr(value)?;
                let (frame, prior) = self.scope.bind(name, value);
                if let Some(txn) = self.transactions.last_mut() {
                    txn.journal.record_binding(frame, name, prior);
                }
                Ok(Flow::Silent)
            }
            Statement::Expr(expr) => Ok(Flow::Value(self.eval_expr(expr)?)),
            Statement::Return(expr) => Ok(Flow::Return(self.eval_expr(expr)?)),
            Statement::Throw(expr) => {
                let value = match self.eval_expr(expr)? {
                    failure @ Value::Failure(_) => failure,
                    other => Value::Failure(Box::new(other)),
                };
                Ok(Flow::Return(value))
            }
            Statement::For {
                binding,
                iterable,
                body,
            } => {
                let items = match self.eval_expr(iterable)? {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                for item in items {
                    self.eval_block(body, Some((binding.as_str(), item)))?;
                }
                Ok(Flow::Silent)
            }
            Statement::Begin(TxnRole::Open(id)) => {
                debug!(txn = %id, depth = self.transactions.len() + 1, "begin");
                self.transactions.push(TransactionContext::new(*id));
                Ok(Flow::Silent)
            }
            Statement::Commit(TxnRole::Close(id)) => {
                let txn = self.close(*id)?;
                self.commit(txn)?;
                Ok(Flow::Silent)
            }
            Statement::Commit(TxnRole::AfterCancel(id)) => {
                debug!(txn = %id, "commit after cancel has no effect");
                Ok(Flow::Silent)
            }
            Statement::Cancel(TxnRole::Close(id)) => {
                let txn = self.close(*id)?;
                txn.rollback(&mut self.scope, &mut *self.storage)?;
                Ok(Flow::Silent)
            }
            Statement::Cancel(TxnRole::Nested) => {
                match self.transactions.last_mut() {
                    Some(txn) => {
                        debug!(txn = %txn.id, "cancel flag set");
                        txn.cancel();
                    }
                    None => debug!("nested cancel with no open context"),
                }
                Ok(Flow::Silent)
            }
            Statement::Begin(_) | Statement::Commit(_) | Statement::Cancel(_) => {
                Err(EvalError::Unresolved)
            }
        }
    }

    fn close(&mut self, id: TxnId) -> Result<TransactionContext, EvalError> {
        match self.transactions.pop() {
            Some(txn) if txn.id == id => Ok(txn),
            Some(txn) => {
                self.transactions.push(txn);
                Err(EvalError::Unresolved)
            }
            None => Err(EvalError::Unresolved),
        }
    }

    /// Finalize a context reached by its own COMMIT.
    fn commit(&mut self, txn: TransactionContext) -> Result<(), EvalError> {
        if txn.is_canceled() {
            txn.rollback(&mut self.scope, &mut *self.storage)?;
        } else if let Some(parent) = self.transactions.last_mut() {
            debug!(txn = %txn.id, into = %parent.id, "commit into enclosing context");
            parent.journal.absorb(txn.journal);
        } else {
            txn.apply(&mut *self.storage)?;
        }
        Ok(())
    }

    fn visible_writes(&self) -> Vec<WriteHandle> {
        self.transactions
            .iter()
            .flat_map(|txn| txn.journal.writes().iter().copied())
            .collect()
    }

    fn read(&self, op: ReadOp) -> Result<Value, EvalError> {
        let visible = self.visible_writes();
        Ok(self.storage.read(&op, &visible)?)
    }

    /// Stage a write in the innermost open context, or apply it at once
    /// when none is open. A create of an existing record is a failure value.
    fn write(&mut self, op: WriteOp) -> Result<Option<Value>, EvalError> {
        let visible = self.visible_writes();
        let handle = match self.storage.write(op, &visible) {
            Ok(handle) => handle,
            Err(StorageError::RecordExists(id)) => {
                return Ok(Some(Value::failure(format!("record {} already exists", id))));
            }
            Err(e) => return Err(e.into()),
        };
        match self.transactions.last_mut() {
            Some(txn) => txn.journal.record_write(handle),
            None => {
                debug!(%handle, "auto-commit");
                if let Err(e) = self.storage.apply(handle) {
                    if let Err(discard) = self.storage.discard(handle) {
                        warn!(%handle, error = %discard, "discard after failed auto-commit failed");
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(None)
    }

    fn lookup(&self, name: &str) -> Value {
        match self.scope.lookup(name) {
            Some(value) => value.clone(),
            None => match self.config.unbound {
                UnboundPolicy::Null => Value::Null,
                UnboundPolicy::Failure => Value::failure(format!("unbound variable ${}", name)),
            },
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(eval_literal(literal)),
            Expr::Param(name) => Ok(self.lookup(name)),
            Expr::Ident(ident) => Ok(self
                .scope
                .lookup("this")
                .and_then(|this| this.get(&ident.name))
                .cloned()
                .unwrap_or(Value::Null)),
            Expr::Array(items) => {
                let mut arr = Vec::with_capacity(items.len());
                for item in items {
                    arr.push(self.eval_expr(item)?);
                }
                Ok(Value::Array(arr))
            }
            Expr::Object(pairs) => {
                let mut map = HashMap::new();
                for (key, expr) in pairs {
                    let value = self.eval_expr(expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                Ok(apply_unary(*op, value))
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Field { object, name } => {
                let object = self.eval_expr(object)?;
                self.field(object, name)
            }
            Expr::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                Ok(apply_index(object, index))
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                Ok(functions::call(name, values))
            }
            Expr::Block(block) => self.eval_block(block, None),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.eval_expr(condition)?.is_truthy() {
                        return self.eval_block(body, None);
                    }
                }
                match otherwise {
                    Some(body) => self.eval_block(body, None),
                    None => Ok(Value::Null),
                }
            }
            Expr::Create { target, content } => self.eval_create(target, content.as_deref()),
            Expr::Update { target, change } => self.eval_update(target, change),
            Expr::Delete(target) => self.eval_delete(target),
            Expr::Select { from, condition } => self.eval_select(from, condition.as_deref()),
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let left = self.eval_expr(left)?;
        match op {
            BinOp::NullCoalesce => {
                if left.is_null() {
                    self.eval_expr(right)
                } else {
                    Ok(left)
                }
            }
            BinOp::And => {
                if !left.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval_expr(right)?.is_truthy()))
            }
            BinOp::Or => {
                if left.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval_expr(right)?.is_truthy()))
            }
            _ => {
                let right = self.eval_expr(right)?;
                Ok(apply_binop(op, left, right))
            }
        }
    }

    /// `.name` on objects; on a record id, the field of the stored record.
    fn field(&self, object: Value, name: &str) -> Result<Value, EvalError> {
        Ok(match object {
            Value::Object(mut map) => map.remove(name).unwrap_or(Value::Null),
            Value::Null => Value::Null,
            failure @ Value::Failure(_) => failure,
            Value::Record(id) => match self.read(ReadOp::Record(id))? {
                Value::Object(mut map) => map.remove(name).unwrap_or(Value::Null),
                _ => Value::Null,
            },
            other => Value::failure(format!("cannot access field '{}' on {}", name, type_name(&other))),
        })
    }

    fn target_ref(&self, target: &Target) -> Result<TargetRef, Value> {
        match target {
            Target::Table(ident) => Ok(TargetRef::Table(ident.name.clone())),
            Target::Record(strand) => RecordId::parse(&strand.text)
                .map(TargetRef::Record)
                .map_err(Value::failure),
            Target::Param(name) => match self.lookup(name) {
                Value::Record(id) => Ok(TargetRef::Record(id)),
                Value::String(table) => Ok(TargetRef::Table(table)),
                value @ Value::Object(_) => match value.record_id() {
                    Some(id) => Ok(TargetRef::Record(id.clone())),
                    None => Err(Value::failure(format!("${} has no record id", name))),
                },
                failure @ Value::Failure(_) => Err(failure),
                other => Err(Value::failure(format!(
                    "${} is {}, expected a record id or table name",
                    name,
                    type_name(&other)
                ))),
            },
        }
    }

    fn eval_create(&mut self, target: &Target, content: Option<&Expr>) -> Result<Value, EvalError> {
        let target = match self.target_ref(target) {
            Ok(target) => target,
            Err(failure) => return Ok(failure),
        };
        let mut fields = match content {
            Some(expr) => match self.eval_expr(expr)? {
                Value::Object(map) => map,
                failure @ Value::Failure(_) => return Ok(failure),
                other => {
                    return Ok(Value::failure(format!(
                        "CREATE content must be an object, found {}",
                        type_name(&other)
                    )));
                }
            },
            None => HashMap::new(),
        };

        let record = match target {
            TargetRef::Table(table) => RecordId::new(table, Uuid::new_v4().to_string()),
            TargetRef::Record(id) => id,
        };
        fields.insert("id".to_string(), Value::Record(record.clone()));
        let content = Value::Object(fields);

        if let Some(failure) = self.write(WriteOp::Create {
            record,
            content: content.clone(),
        })? {
            return Ok(failure);
        }
        Ok(content)
    }

    fn eval_update(&mut self, target: &Target, change: &Change) -> Result<Value, EvalError> {
        match self.target_ref(target) {
            Err(failure) => Ok(failure),
            Ok(TargetRef::Record(id)) => {
                let current = self.read(ReadOp::Record(id.clone()))?;
                if current.is_null() {
                    return Ok(Value::Null);
                }
                self.update_one(id, current, change)
            }
            Ok(TargetRef::Table(table)) => {
                let Value::Array(rows) = self.read(ReadOp::Table(table))? else {
                    return Ok(Value::Array(Vec::new()));
                };
                let mut updated = Vec::with_capacity(rows.len());
                for row in rows {
                    match row.record_id().cloned() {
                        Some(id) => updated.push(self.update_one(id, row, change)?),
                        None => updated.push(row),
                    }
                }
                Ok(Value::Array(updated))
            }
        }
    }

    fn update_one(&mut self, id: RecordId, current: Value, change: &Change) -> Result<Value, EvalError> {
        let content = match change {
            Change::Content(expr) => {
                self.scope.push();
                self.scope.bind("this", current);
                let result = self.eval_expr(expr);
                self.scope.pop();
                match result? {
                    Value::Object(mut map) => {
                        map.insert("id".to_string(), Value::Record(id.clone()));
                        Value::Object(map)
                    }
                    failure @ Value::Failure(_) => return Ok(failure),
                    other => {
                        return Ok(Value::failure(format!(
                            "UPDATE content must be an object, found {}",
                            type_name(&other)
                        )));
                    }
                }
            }
            Change::Set(assignments) => match self.apply_assignments(current, assignments)? {
                Ok(updated) => updated,
                Err(failure) => return Ok(failure),
            },
        };

        if let Some(failure) = self.write(WriteOp::Update {
            record: id,
            content: content.clone(),
        })? {
            return Ok(failure);
        }
        Ok(content)
    }

    /// Evaluate every `SET` value against the record as it was, then write
    /// them in order.
    fn apply_assignments(
        &mut self,
        current: Value,
        assignments: &[(Path, Expr)],
    ) -> Result<Result<Value, Value>, EvalError> {
        self.scope.push();
        self.scope.bind("this", current.clone());
        let mut values = Vec::with_capacity(assignments.len());
        for (_, expr) in assignments {
            match self.eval_expr(expr) {
                Ok(value) => values.push(value),
                Err(e) => {
                    self.scope.pop();
                    return Err(e);
                }
            }
        }
        self.scope.pop();

        let mut updated = current;
        for ((path, _), value) in assignments.iter().zip(values) {
            if value.is_failure() {
                return Ok(Err(value));
            }
            if let Err(e) = transform::set_at_path(&mut updated, path, value) {
                return Ok(Err(Value::failure(e.to_string())));
            }
        }
        Ok(Ok(updated))
    }

    fn eval_delete(&mut self, target: &Target) -> Result<Value, EvalError> {
        let records = match self.target_ref(target) {
            Err(failure) => return Ok(failure),
            Ok(TargetRef::Record(id)) => vec![id],
            Ok(TargetRef::Table(table)) => match self.read(ReadOp::Table(table))? {
                Value::Array(rows) => rows.iter().filter_map(|r| r.record_id().cloned()).collect(),
                _ => Vec::new(),
            },
        };
        for record in records {
            if let Some(failure) = self.write(WriteOp::Delete { record })? {
                return Ok(failure);
            }
        }
        Ok(Value::Null)
    }

    fn eval_select(&mut self, from: &Target, condition: Option<&Expr>) -> Result<Value, EvalError> {
        let rows = match self.target_ref(from) {
            Err(failure) => return Ok(failure),
            Ok(TargetRef::Table(table)) => match self.read(ReadOp::Table(table))? {
                Value::Array(rows) => rows,
                _ => Vec::new(),
            },
            Ok(TargetRef::Record(id)) => match self.read(ReadOp::Record(id))? {
                Value::Null => Vec::new(),
                row => vec![row],
            },
        };

        let Some(condition) = condition else {
            return Ok(Value::Array(rows));
        };

        let mut selected = Vec::new();
        for row in rows {
            self.scope.push();
            self.scope.bind("this", row.clone());
            let keep = self.eval_expr(condition);
            self.scope.pop();
            if keep?.is_truthy() {
                selected.push(row);
            }
        }
        Ok(Value::Array(selected))
    }
}

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(n) => Value::Integer(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
        Literal::Strand(strand) => eval_strand(strand),
    }
}

fn eval_strand(strand: &Strand) -> Value {
    match strand.kind {
        StrandKind::Plain => Value::String(strand.text.clone()),
        StrandKind::Datetime => Value::Datetime(strand.text.clone()),
        StrandKind::Uuid => Uuid::parse_str(&strand.text)
            .map(Value::Uuid)
            .unwrap_or_else(|e| Value::failure(e.to_string())),
        StrandKind::RecordId => RecordId::parse(&strand.text)
            .map(Value::Record)
            .unwrap_or_else(Value::failure),
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Value {
    match (op, value) {
        (_, failure @ Value::Failure(_)) => failure,
        (UnaryOp::Not, value) => Value::Boolean(!value.is_truthy()),
        (UnaryOp::Negate, Value::Integer(n)) => n
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or_else(|| Value::failure("integer overflow")),
        (UnaryOp::Negate, Value::Float(n)) => Value::Float(-n),
        (UnaryOp::Negate, Value::Decimal(d)) => Value::Decimal(-d),
        (UnaryOp::Negate, other) => Value::failure(format!("cannot negate {}", type_name(&other))),
    }
}

fn apply_index(object: Value, index: Value) -> Value {
    match (object, index) {
        (failure @ Value::Failure(_), _) | (_, failure @ Value::Failure(_)) => failure,
        (Value::Null, _) => Value::Null,
        (Value::Array(mut arr), Value::Integer(i)) => {
            let len = arr.len() as i64;
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                arr.swap_remove(i as usize)
            } else {
                Value::Null
            }
        }
        (Value::Object(mut map), Value::String(key)) => map.remove(&key).unwrap_or(Value::Null),
        (object, index) => Value::failure(format!(
            "cannot index {} with {}",
            type_name(&object),
            type_name(&index)
        )),
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Integer(_) | Value::Float(_) | Value::Decimal(_))
}

fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn verb(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Subtract => "subtract",
        BinOp::Multiply => "multiply",
        BinOp::Divide => "divide",
        BinOp::Modulo => "compute modulo of",
        _ => "combine",
    }
}

fn apply_binop(op: BinOp, left: Value, right: Value) -> Value {
    if left.is_failure() {
        return left;
    }
    if right.is_failure() {
        return right;
    }

    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
            arithmetic(op, left, right)
        }
        BinOp::Equal => Value::Boolean(values_equal(&left, &right)),
        BinOp::NotEqual => Value::Boolean(!values_equal(&left, &right)),
        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            match compare(&left, &right) {
                Some(ordering) => Value::Boolean(match op {
                    BinOp::LessThan => ordering == Ordering::Less,
                    BinOp::GreaterThan => ordering == Ordering::Greater,
                    BinOp::LessEqual => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }),
                None => Value::failure(format!(
                    "cannot compare {} {} {}",
                    type_name(&left),
                    op.symbol(),
                    type_name(&right)
                )),
            }
        }
        BinOp::Knn(k) => knn(k, left, right),
        // Short-circuit operators are handled before both sides are evaluated
        BinOp::And | BinOp::Or | BinOp::NullCoalesce => Value::Null,
    }
}

fn arithmetic(op: BinOp, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => float_op(op, *a, *b),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) if is_numeric(&left) && is_numeric(&right) => {
            match (to_decimal(&left), to_decimal(&right)) {
                (Some(a), Some(b)) => decimal_op(op, a, b).map_or_else(overflow_or_zero, Value::Decimal),
                _ => Value::failure("number cannot be represented as a decimal"),
            }
        }
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => mixed_op(op, &left, &right),
        (Value::String(a), Value::String(b)) if op == BinOp::Add => Value::String(format!("{}{}", a, b)),
        (Value::Array(a), Value::Array(b)) if op == BinOp::Add => {
            Value::Array(a.iter().chain(b.iter()).cloned().collect())
        }
        (a, b) => Value::failure(format!(
            "cannot {} {} and {}",
            verb(op),
            type_name(a),
            type_name(b)
        )),
    }
}

fn overflow_or_zero() -> Value {
    Value::failure("arithmetic overflow or division by zero")
}

fn integer_op(op: BinOp, a: i64, b: i64) -> Value {
    if matches!(op, BinOp::Divide | BinOp::Modulo) && b == 0 {
        return Value::failure("division by zero");
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        // Exact division stays integer
        BinOp::Divide => match (a.checked_div(b), a.checked_rem(b)) {
            (Some(quotient), Some(0)) => Some(quotient),
            (Some(_), _) => return Value::Float(a as f64 / b as f64),
            (None, _) => None,
        },
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    };
    result
        .map(Value::Integer)
        .unwrap_or_else(|| Value::failure("integer overflow"))
}

fn float_op(op: BinOp, a: f64, b: f64) -> Value {
    match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Subtract => Value::Float(a - b),
        BinOp::Multiply => Value::Float(a * b),
        BinOp::Divide | BinOp::Modulo if b == 0.0 => Value::failure("division by zero"),
        BinOp::Divide => Value::Float(a / b),
        BinOp::Modulo => Value::Float(a % b),
        _ => Value::failure(format!("cannot {} floats", verb(op))),
    }
}

fn decimal_op(op: BinOp, a: Decimal, b: Decimal) -> Option<Decimal> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    }
}

/// Integer with float: computed as decimals so `1 + 0.5 + 0.5` is exactly
/// `2`, and narrowed back to an integer when the result is whole.
fn mixed_op(op: BinOp, left: &Value, right: &Value) -> Value {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Value::failure("expected numbers");
    };
    if matches!(op, BinOp::Divide | BinOp::Modulo) && b == 0.0 {
        return Value::failure("division by zero");
    }
    if let (Some(ad), Some(bd)) = (to_decimal(left), to_decimal(right))
        && let Some(rd) = decimal_op(op, ad, bd)
    {
        if rd.is_integer()
            && let Some(r) = rd.to_i64()
        {
            return Value::Integer(r);
        } else if let Some(r) = rd.to_f64() {
            return Value::Float(r);
        }
    }
    float_op(op, a, b)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if is_numeric(left) && is_numeric(right) {
        return compare(left, right) == Some(Ordering::Equal);
    }
    left == right
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) if is_numeric(left) && is_numeric(right) => {
            Some(to_decimal(left)?.cmp(&to_decimal(right)?))
        }
        (a, b) if is_numeric(a) && is_numeric(b) => a.as_float()?.partial_cmp(&b.as_float()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn as_vector(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Array(items) => items.iter().map(Value::as_float).collect(),
        _ => None,
    }
}

/// The `k` elements of `candidates` nearest to `point` by Euclidean
/// distance, nearest first. Ties keep input order.
fn knn(k: u32, candidates: Value, point: Value) -> Value {
    let Some(point) = as_vector(&point) else {
        return Value::failure(format!("KNN<{}> needs a numeric vector on the right", k));
    };
    let Value::Array(candidates) = candidates else {
        return Value::failure(format!(
            "KNN<{}> needs an array of vectors on the left, found {}",
            k,
            type_name(&candidates)
        ));
    };

    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let vector = match as_vector(&candidate) {
            Some(v) if v.len() == point.len() => v,
            _ => {
                return Value::failure(format!(
                    "KNN<{}> candidates must be numeric vectors of length {}",
                    k,
                    point.len()
                ));
            }
        };
        let distance: f64 = vector
            .iter()
            .zip(&point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        scored.push((distance, candidate));
    }

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    Value::Array(
        scored
            .into_iter()
            .take(k as usize)
            .map(|(_, candidate)| candidate)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_arithmetic_narrows_to_integer() {
        assert_eq!(
            apply_binop(BinOp::Add, Value::Integer(1), Value::Float(1.0)),
            Value::Integer(2)
        );
        assert_eq!(
            apply_binop(BinOp::Multiply, Value::Integer(3), Value::Float(0.5)),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_division_by_zero_is_failure() {
        assert!(apply_binop(BinOp::Divide, Value::Integer(1), Value::Integer(0)).is_failure());
        assert!(apply_binop(BinOp::Modulo, Value::Float(1.0), Value::Integer(0)).is_failure());
    }

    #[test]
    fn test_overflow_is_failure() {
        assert!(apply_binop(BinOp::Add, Value::Integer(i64::MAX), Value::Integer(1)).is_failure());
        assert!(apply_unary(UnaryOp::Negate, Value::Integer(i64::MIN)).is_failure());
        assert_eq!(
            apply_binop(BinOp::Divide, Value::Integer(i64::MIN), Value::Integer(-1)),
            Value::failure("integer overflow")
        );
        assert!(apply_binop(BinOp::Modulo, Value::Integer(i64::MIN), Value::Integer(-1)).is_failure());
    }

    #[test]
    fn test_inexact_integer_division_is_float() {
        assert_eq!(
            apply_binop(BinOp::Divide, Value::Integer(7), Value::Integer(2)),
            Value::Float(3.5)
        );
        assert_eq!(
            apply_binop(BinOp::Divide, Value::Integer(-8), Value::Integer(2)),
            Value::Integer(-4)
        );
    }

    #[test]
    fn test_decimal_contaminates() {
        let d = Decimal::new(15, 1);
        assert_eq!(
            apply_binop(BinOp::Add, Value::Decimal(d), Value::Integer(1)),
            Value::Decimal(Decimal::new(25, 1))
        );
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert_eq!(
            apply_binop(BinOp::Equal, Value::Integer(1), Value::Float(1.0)),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_failure_propagates_through_comparison() {
        let failure = Value::failure("x");
        assert_eq!(
            apply_binop(BinOp::LessThan, failure.clone(), Value::Integer(1)),
            failure
        );
    }

    #[test]
    fn test_knn_orders_by_distance() {
        let vectors = Value::Array(vec![
            Value::Array(vec![Value::Integer(10), Value::Integer(10)]),
            Value::Array(vec![Value::Integer(1), Value::Integer(1)]),
            Value::Array(vec![Value::Integer(2), Value::Integer(2)]),
        ]);
        let point = Value::Array(vec![Value::Integer(0), Value::Integer(0)]);
        assert_eq!(
            knn(2, vectors, point),
            Value::Array(vec![
                Value::Array(vec![Value::Integer(1), Value::Integer(1)]),
                Value::Array(vec![Value::Integer(2), Value::Integer(2)]),
            ])
        );
    }

    #[test]
    fn test_index_negative_and_missing() {
        let arr = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(apply_index(arr.clone(), Value::Integer(-1)), Value::Integer(2));
        assert_eq!(apply_index(arr, Value::Integer(5)), Value::Null);
    }
}
