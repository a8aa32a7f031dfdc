//! JSON <-> Quarry value conversion and seed loading

use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use super::CliError;
use crate::{MemoryStore, RecordId, Value};

/// Convert serde_json::Value to a Quarry value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert a Quarry value to serde_json::Value
///
/// Typed strands become JSON strings, and a failure becomes
/// `{"failure": <payload>}`.
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Decimal(d) => d
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
        Value::String(s) | Value::Datetime(s) => serde_json::Value::String(s),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Record(id) => serde_json::Value::String(id.to_string()),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Object(obj) => {
            serde_json::Value::Object(obj.into_iter().map(|(k, v)| (k, value_to_json(v))).collect())
        }
        Value::Failure(inner) => {
            let mut obj = serde_json::Map::new();
            obj.insert("failure".to_string(), value_to_json(*inner));
            serde_json::Value::Object(obj)
        }
    }
}

/// Load `{ "table": [ {record}, ... ] }` into `store` as committed data.
///
/// A record's key comes from its `id` field (`"table:key"` or a bare key);
/// records without one get a random key. Returns the number of records.
pub fn load_seed(json: &str, store: &mut MemoryStore) -> Result<usize, CliError> {
    let serde_json::Value::Object(tables) = serde_json::from_str(json)? else {
        return Err(CliError::Seed("expected an object of tables".to_string()));
    };

    let mut count = 0;
    for (table, rows) in tables {
        let serde_json::Value::Array(rows) = rows else {
            return Err(CliError::Seed(format!("table '{}' must be an array of records", table)));
        };
        for row in rows {
            let content = json_to_value(row);
            if !matches!(content, Value::Object(_)) {
                return Err(CliError::Seed(format!("records of '{}' must be objects", table)));
            }
            let key = match content.get("id") {
                Some(Value::String(id)) => match RecordId::parse(id) {
                    Ok(record) if record.table == table => record.key,
                    Ok(record) => {
                        return Err(CliError::Seed(format!("record {} listed under table '{}'", record, table)));
                    }
                    Err(_) => id.clone(),
                },
                Some(Value::Integer(n)) => n.to_string(),
                _ => Uuid::new_v4().to_string(),
            };
            store.insert(RecordId::new(table.clone(), key), content);
            count += 1;
        }
    }
    Ok(count)
}
