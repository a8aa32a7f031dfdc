//! Storage collaborator.
//!
//! The evaluator never touches data directly. Every write is first staged
//! with [`Storage::write`], which returns a handle; the handle is later
//! either applied or discarded. Reads name the staged writes they may see.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::value::{RecordId, Value};

/// Handle of a staged write, unique within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteHandle(pub u64);

impl fmt::Display for WriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new record; fails if the id is taken
    Create { record: RecordId, content: Value },
    /// Replace the content of a record
    Update { record: RecordId, content: Value },
    Delete { record: RecordId },
}

impl WriteOp {
    pub fn record(&self) -> &RecordId {
        match self {
            WriteOp::Create { record, .. }
            | WriteOp::Update { record, .. }
            | WriteOp::Delete { record } => record,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOp {
    /// Every record of a table, ordered by key
    Table(String),
    /// One record, or null when absent
    Record(RecordId),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("record {0} already exists")]
    RecordExists(RecordId),

    #[error("unknown write handle {0}")]
    UnknownHandle(WriteHandle),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Interface between the evaluator and a storage engine.
pub trait Storage {
    /// Stage a write. Nothing is visible to other readers until applied.
    ///
    /// A create is checked against committed data overlaid with the staged
    /// writes in `visible`, the same view [`Storage::read`] gives.
    fn write(&mut self, op: WriteOp, visible: &[WriteHandle]) -> Result<WriteHandle, StorageError>;

    /// Make a staged write durable.
    fn apply(&mut self, handle: WriteHandle) -> Result<(), StorageError>;

    /// Drop a staged write without effect.
    fn discard(&mut self, handle: WriteHandle) -> Result<(), StorageError>;

    /// Read committed data overlaid with exactly the staged writes in
    /// `visible`, in handle order.
    fn read(&self, op: &ReadOp, visible: &[WriteHandle]) -> Result<Value, StorageError>;
}

/// In-memory store with ordered tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<String, Value>>,
    pending: BTreeMap<u64, WriteOp>,
    next_handle: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a committed record directly, bypassing staging. The record's
    /// `id` field is set to `table:key`.
    pub fn insert(&mut self, record: RecordId, content: Value) {
        let content = with_id(content, &record);
        self.tables
            .entry(record.table)
            .or_default()
            .insert(record.key, content);
    }

    /// Committed records of `table`, ordered by key.
    pub fn records(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Committed record, if present.
    pub fn get(&self, record: &RecordId) -> Option<&Value> {
        self.tables.get(&record.table)?.get(&record.key)
    }

    /// Number of staged writes neither applied nor discarded.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Rows of `table` as seen through the staged writes in `visible`,
    /// applied in handle order.
    fn overlaid(
        &self,
        table: &str,
        visible: &[WriteHandle],
    ) -> Result<BTreeMap<String, Value>, StorageError> {
        let mut rows = self.tables.get(table).cloned().unwrap_or_default();
        let mut handles: Vec<u64> = visible.iter().map(|h| h.0).collect();
        handles.sort_unstable();
        for handle in handles {
            let staged = self
                .pending
                .get(&handle)
                .ok_or(StorageError::UnknownHandle(WriteHandle(handle)))?;
            if staged.record().table == table {
                Self::apply_to_rows(&mut rows, staged);
            }
        }
        Ok(rows)
    }

    fn apply_to_rows(rows: &mut BTreeMap<String, Value>, op: &WriteOp) {
        match op {
            WriteOp::Create { record, content } | WriteOp::Update { record, content } => {
                rows.insert(record.key.clone(), with_id(content.clone(), record));
            }
            WriteOp::Delete { record } => {
                rows.remove(&record.key);
            }
        }
    }
}

/// Stamp `id` on object content.
fn with_id(content: Value, record: &RecordId) -> Value {
    match content {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::Record(record.clone()));
            Value::Object(map)
        }
        other => other,
    }
}

impl Storage for MemoryStore {
    fn write(&mut self, op: WriteOp, visible: &[WriteHandle]) -> Result<WriteHandle, StorageError> {
        if let WriteOp::Create { record, .. } = &op {
            // Created by a writer whose staged work this one cannot see
            let staged_elsewhere = self.pending.iter().any(|(handle, pending)| {
                !visible.contains(&WriteHandle(*handle))
                    && matches!(pending, WriteOp::Create { record: other, .. } if other == record)
            });
            if staged_elsewhere || self.overlaid(&record.table, visible)?.contains_key(&record.key) {
                return Err(StorageError::RecordExists(record.clone()));
            }
        }

        let handle = WriteHandle(self.next_handle);
        self.next_handle += 1;
        trace!(%handle, record = %op.record(), "staged write");
        self.pending.insert(handle.0, op);
        Ok(handle)
    }

    fn apply(&mut self, handle: WriteHandle) -> Result<(), StorageError> {
        let op = self
            .pending
            .remove(&handle.0)
            .ok_or(StorageError::UnknownHandle(handle))?;
        trace!(%handle, record = %op.record(), "applied write");
        let rows = self.tables.entry(op.record().table.clone()).or_default();
        Self::apply_to_rows(rows, &op);
        Ok(())
    }

    fn discard(&mut self, handle: WriteHandle) -> Result<(), StorageError> {
        self.pending
            .remove(&handle.0)
            .map(|_| trace!(%handle, "discarded write"))
            .ok_or(StorageError::UnknownHandle(handle))
    }

    fn read(&self, op: &ReadOp, visible: &[WriteHandle]) -> Result<Value, StorageError> {
        let table = match op {
            ReadOp::Table(table) => table,
            ReadOp::Record(record) => &record.table,
        };

        let mut rows = self.overlaid(table, visible)?;
        Ok(match op {
            ReadOp::Table(_) => Value::Array(rows.into_values().collect()),
            ReadOp::Record(record) => rows.remove(&record.key).unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn person(name: &str) -> Value {
        let mut map = HashMap::new();
        map.insert("name".to_string(), Value::String(name.to_string()));
        Value::Object(map)
    }

    #[test]
    fn test_staged_write_is_invisible_until_applied() {
        let mut store = MemoryStore::new();
        let id = RecordId::new("person", "1");
        let handle = store
            .write(
                WriteOp::Create {
                    record: id.clone(),
                    content: person("Tobie"),
                },
                &[],
            )
            .unwrap();

        let read = ReadOp::Record(id.clone());
        assert_eq!(store.read(&read, &[]).unwrap(), Value::Null);
        assert!(store.read(&read, &[handle]).unwrap().get("name").is_some());

        store.apply(handle).unwrap();
        assert!(store.get(&id).is_some());
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let mut store = MemoryStore::new();
        let id = RecordId::new("person", "1");
        store.insert(id.clone(), person("Tobie"));
        let err = store
            .write(
                WriteOp::Create {
                    record: id.clone(),
                    content: person("Jaime"),
                },
                &[],
            )
            .unwrap_err();
        assert_eq!(err, StorageError::RecordExists(id));
    }

    #[test]
    fn test_create_after_visible_delete() {
        let mut store = MemoryStore::new();
        let id = RecordId::new("person", "1");
        store.insert(id.clone(), person("Tobie"));

        let delete = store.write(WriteOp::Delete { record: id.clone() }, &[]).unwrap();
        let create = WriteOp::Create {
            record: id.clone(),
            content: person("Jaime"),
        };
        // Without the delete in view the record still exists
        assert_eq!(
            store.write(create.clone(), &[]),
            Err(StorageError::RecordExists(id.clone()))
        );

        let handle = store.write(create, &[delete]).unwrap();
        store.apply(delete).unwrap();
        store.apply(handle).unwrap();
        assert_eq!(store.get(&id).and_then(|r| r.get("name")), Some(&Value::String("Jaime".to_string())));
    }

    #[test]
    fn test_create_staged_by_another_writer_conflicts() {
        let mut store = MemoryStore::new();
        let id = RecordId::new("person", "1");
        let create = WriteOp::Create {
            record: id.clone(),
            content: person("Tobie"),
        };
        let first = store.write(create.clone(), &[]).unwrap();
        assert_eq!(
            store.write(create.clone(), &[]),
            Err(StorageError::RecordExists(id.clone()))
        );
        // The writer that staged it sees it through the overlay
        assert_eq!(
            store.write(create, &[first]),
            Err(StorageError::RecordExists(id))
        );
    }

    #[test]
    fn test_discard_unknown_handle() {
        let mut store = MemoryStore::new();
        assert_eq!(
            store.discard(WriteHandle(7)),
            Err(StorageError::UnknownHandle(WriteHandle(7)))
        );
    }
}
