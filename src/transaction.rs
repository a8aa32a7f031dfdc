//! Transaction contexts and their journals.
//!
//! A context is opened by `BEGIN` and owns everything needed to undo the
//! work done while it was the innermost open context: the prior value of
//! every binding it saw change, and the handles of every staged write.

use tracing::{debug, warn};

use crate::ast::TxnId;
use crate::scope::{FrameId, Scope};
use crate::storage::{Storage, StorageError, WriteHandle};
use crate::value::Value;

/// Value a binding held in `frame` before a `LET` inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRecord {
    pub frame: FrameId,
    pub name: String,
    /// `None` when the name was unbound in that frame
    pub prior: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Journal {
    bindings: Vec<BindingRecord>,
    writes: Vec<WriteHandle>,
}

impl Journal {
    pub fn record_binding(&mut self, frame: FrameId, name: &str, prior: Option<Value>) {
        self.bindings.push(BindingRecord {
            frame,
            name: name.to_string(),
            prior,
        });
    }

    pub fn record_write(&mut self, handle: WriteHandle) {
        self.writes.push(handle);
    }

    pub fn writes(&self) -> &[WriteHandle] {
        &self.writes
    }

    pub fn bindings(&self) -> &[BindingRecord] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.writes.is_empty()
    }

    /// Append a committed inner journal so the outer context can still undo it.
    pub fn absorb(&mut self, inner: Journal) {
        self.bindings.extend(inner.bindings);
        self.writes.extend(inner.writes);
    }
}

#[derive(Debug)]
pub struct TransactionContext {
    pub id: TxnId,
    pub journal: Journal,
    canceled: bool,
}

impl TransactionContext {
    pub fn new(id: TxnId) -> Self {
        TransactionContext {
            id,
            journal: Journal::default(),
            canceled: false,
        }
    }

    /// Set the cancel flag. Setting it again has no further effect.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Apply every staged write. If one fails, it and the writes after it
    /// are discarded and the error is returned.
    pub fn apply(self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        debug!(txn = %self.id, writes = self.journal.writes.len(), "commit");
        let writes = self.journal.writes;
        for (i, handle) in writes.iter().enumerate() {
            if let Err(e) = storage.apply(*handle) {
                warn!(txn = %self.id, error = %e, "commit failed, discarding remaining writes");
                for rest in &writes[i..] {
                    if let Err(discard) = storage.discard(*rest) {
                        warn!(txn = %self.id, handle = %rest, error = %discard, "discard failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Undo binding changes newest first and discard every staged write.
    ///
    /// Records whose frame has already been left are skipped. All writes are
    /// discarded even if one discard fails; the first error is returned.
    pub fn rollback(self, scope: &mut Scope, storage: &mut dyn Storage) -> Result<(), StorageError> {
        debug!(
            txn = %self.id,
            bindings = self.journal.bindings.len(),
            writes = self.journal.writes.len(),
            "rollback"
        );
        for record in self.journal.bindings.into_iter().rev() {
            scope.restore(record.frame, &record.name, record.prior);
        }

        let mut first_error = None;
        for handle in self.journal.writes.into_iter().rev() {
            if let Err(e) = storage.discard(handle) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
