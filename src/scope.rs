//! Scope resolution and the runtime frame chain.
//!
//! [`resolve`] runs once between parsing and evaluation. It numbers every
//! block, records which names each block declares, checks function calls and
//! pairs `BEGIN`/`COMMIT`/`CANCEL` within each statement sequence. Variable
//! reads are not bound statically; [`Scope::lookup`] walks the frame chain
//! at run time.

use std::collections::HashMap;

use tracing::instrument;

use crate::ast::{Block, Change, Expr, Query, ScopeId, Statement, TxnId, TxnRole};
use crate::functions;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("COMMIT without a matching BEGIN in the same block")]
    UnmatchedCommit,

    #[error("CANCEL outside of any transaction")]
    CancelOutsideTransaction,

    #[error("transaction {0} opened by BEGIN is never committed or canceled in its block")]
    UnterminatedTransaction(TxnId),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },
}

/// What the resolver learned about one block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeInfo {
    pub parent: Option<ScopeId>,
    /// Names bound by `LET` or `FOR` directly in this block, in order
    pub declared: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeTable {
    scopes: Vec<ScopeInfo>,
}

impl ScopeTable {
    pub fn get(&self, id: ScopeId) -> Option<&ScopeInfo> {
        self.scopes.get(id.0)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).and_then(|info| info.parent)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn open(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ScopeInfo {
            parent,
            declared: Vec::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    fn declare(&mut self, id: ScopeId, name: &str) {
        if let Some(info) = self.scopes.get_mut(id.0)
            && !info.declared.iter().any(|n| n == name)
        {
            info.declared.push(name.to_string());
        }
    }
}

/// A query whose blocks and transaction statements have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedQuery {
    pub query: Query,
    pub scopes: ScopeTable,
    /// Number of `BEGIN` statements, i.e. of distinct transaction ids
    pub transactions: usize,
}

#[derive(Default)]
struct Resolver {
    table: ScopeTable,
    next_txn: usize,
    /// Contexts open in enclosing sequences at the current point
    enclosing_open: usize,
}

/// Resolve scopes and transaction pairing for a parsed query.
#[instrument(name = "scope::resolve", level = "debug", skip(query))]
pub fn resolve(mut query: Query) -> Result<ScopedQuery, ResolveError> {
    let mut resolver = Resolver::default();
    resolver.resolve_block(&mut query.body, None, None)?;
    Ok(ScopedQuery {
        query,
        scopes: resolver.table,
        transactions: resolver.next_txn,
    })
}

impl Resolver {
    fn resolve_block(
        &mut self,
        block: &mut Block,
        parent: Option<ScopeId>,
        binding: Option<&str>,
    ) -> Result<(), ResolveError> {
        let id = self.table.open(parent);
        block.scope = id;
        if let Some(name) = binding {
            self.table.declare(id, name);
        }

        let mut local: Vec<TxnId> = Vec::new();
        // Context of this sequence last closed by CANCEL and not yet
        // acknowledged by a COMMIT
        let mut canceled: Option<TxnId> = None;

        for statement in &mut block.entries {
            match statement {
                Statement::Let { name, value } => {
                    self.nested(local.len(), |r| r.resolve_expr(value, id))?;
                    self.table.declare(id, name);
                }
                Statement::Expr(expr) | Statement::Return(expr) | Statement::Throw(expr) => {
                    self.nested(local.len(), |r| r.resolve_expr(expr, id))?;
                }
                Statement::For {
                    binding,
                    iterable,
                    body,
                } => {
                    self.nested(local.len(), |r| {
                        r.resolve_expr(iterable, id)?;
                        r.resolve_block(body, Some(id), Some(binding.as_str()))
                    })?;
                }
                Statement::Begin(role) => {
                    let txn = TxnId(self.next_txn);
                    self.next_txn += 1;
                    local.push(txn);
                    *role = TxnRole::Open(txn);
                }
                Statement::Commit(role) => {
                    *role = if let Some(txn) = local.pop() {
                        canceled = None;
                        TxnRole::Close(txn)
                    } else if let Some(txn) = canceled.take() {
                        TxnRole::AfterCancel(txn)
                    } else {
                        return Err(ResolveError::UnmatchedCommit);
                    };
                }
                Statement::Cancel(role) => {
                    *role = if let Some(txn) = local.pop() {
                        canceled = Some(txn);
                        TxnRole::Close(txn)
                    } else if self.enclosing_open > 0 {
                        TxnRole::Nested
                    } else {
                        return Err(ResolveError::CancelOutsideTransaction);
                    };
                }
            }
        }

        match local.last() {
            Some(txn) => Err(ResolveError::UnterminatedTransaction(*txn)),
            None => Ok(()),
        }
    }

    /// Run `f` with `open` more contexts counted as enclosing, for the
    /// blocks nested in one statement.
    fn nested(
        &mut self,
        open: usize,
        f: impl FnOnce(&mut Self) -> Result<(), ResolveError>,
    ) -> Result<(), ResolveError> {
        self.enclosing_open += open;
        let result = f(self);
        self.enclosing_open -= open;
        result
    }

    fn resolve_expr(&mut self, expr: &mut Expr, scope: ScopeId) -> Result<(), ResolveError> {
        match expr {
            Expr::Literal(_) | Expr::Param(_) | Expr::Ident(_) => Ok(()),
            Expr::Array(items) => items.iter_mut().try_for_each(|e| self.resolve_expr(e, scope)),
            Expr::Object(pairs) => pairs
                .iter_mut()
                .try_for_each(|(_, e)| self.resolve_expr(e, scope)),
            Expr::Unary { operand, .. } => self.resolve_expr(operand, scope),
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left, scope)?;
                self.resolve_expr(right, scope)
            }
            Expr::Field { object, .. } => self.resolve_expr(object, scope),
            Expr::Index { object, index } => {
                self.resolve_expr(object, scope)?;
                self.resolve_expr(index, scope)
            }
            Expr::Call { name, args } => {
                functions::check_call(name, args.len())?;
                args.iter_mut().try_for_each(|e| self.resolve_expr(e, scope))
            }
            Expr::Block(block) => self.resolve_block(block, Some(scope), None),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches.iter_mut() {
                    self.resolve_expr(condition, scope)?;
                    self.resolve_block(body, Some(scope), None)?;
                }
                match otherwise {
                    Some(body) => self.resolve_block(body, Some(scope), None),
                    None => Ok(()),
                }
            }
            Expr::Create { content, .. } => match content {
                Some(content) => self.resolve_expr(content, scope),
                None => Ok(()),
            },
            Expr::Update { change, .. } => match change {
                Change::Content(content) => self.resolve_expr(content, scope),
                Change::Set(assignments) => assignments
                    .iter_mut()
                    .try_for_each(|(_, value)| self.resolve_expr(value, scope)),
            },
            Expr::Delete(_) => Ok(()),
            Expr::Select { condition, .. } => match condition {
                Some(condition) => self.resolve_expr(condition, scope),
                None => Ok(()),
            },
        }
    }
}

/// Runtime frame identifier, unique for the lifetime of a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Lives as long as the query
    Global,
    /// Entered and left with a block
    Block,
}

#[derive(Debug)]
struct Frame {
    id: FrameId,
    kind: FrameKind,
    bindings: HashMap<String, Value>,
}

/// The frame chain. The innermost frame is last; each frame's parent is the
/// one below it.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    next_id: u64,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            frames: vec![Frame {
                id: FrameId(0),
                kind: FrameKind::Global,
                bindings: HashMap::new(),
            }],
            next_id: 1,
        }
    }

    pub fn push(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.frames.push(Frame {
            id,
            kind: FrameKind::Block,
            bindings: HashMap::new(),
        });
        id
    }

    /// Leave the innermost block frame. The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.last().is_some_and(|f| f.kind == FrameKind::Block) {
            self.frames.pop();
        }
    }

    /// Bind `name` in the innermost frame, returning that frame and the
    /// value it held there before.
    pub fn bind(&mut self, name: &str, value: Value) -> (FrameId, Option<Value>) {
        match self.frames.last_mut() {
            Some(frame) => (frame.id, frame.bindings.insert(name.to_string(), value)),
            None => (FrameId(0), None),
        }
    }

    /// Walk outward from the innermost frame.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
    }

    /// Put back what `frame` held for `name`. Returns false when the frame
    /// no longer exists.
    pub fn restore(&mut self, frame: FrameId, name: &str, prior: Option<Value>) -> bool {
        let Some(target) = self.frames.iter_mut().find(|f| f.id == frame) else {
            return false;
        };
        match prior {
            Some(value) => target.bindings.insert(name.to_string(), value),
            None => target.bindings.remove(name),
        };
        true
    }
}
