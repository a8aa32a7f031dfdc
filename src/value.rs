use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

/// Identifier of a single stored record: `table:key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub table: String,
    pub key: String,
}

impl RecordId {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        RecordId {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Parse `table:key`, as written inside an `r"..."` strand.
    pub fn parse(text: &str) -> Result<Self, String> {
        let (table, key) = crate::lexer::split_record_id(text)?;
        Ok(RecordId::new(table, key))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

/// A runtime value produced by evaluating a query.
///
/// # Type Preservation
///
/// Integers, floats and decimals are distinct:
/// - Arithmetic on two integers stays integer (overflow becomes a failure)
/// - Mixed integer/float arithmetic goes through `Decimal` and keeps an
///   integer when the result is whole
/// - Any operation with a decimal operand yields a decimal
///
/// Typed strands keep their kind: `d"..."` evaluates to `Datetime`, `u"..."`
/// to `Uuid` and `r"..."` to `Record`.
///
/// # Examples
///
/// ```
/// use quarry_lang::{RecordId, Value};
///
/// let id = Value::Record(RecordId::new("person", "tobie"));
/// let failure = Value::failure("negative age");
///
/// assert!(failure.is_failure());
/// assert_eq!(quarry_lang::value::type_name(&id), "record");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    Boolean(bool),

    Integer(i64),

    Float(f64),

    /// Exact decimal number (`10dec`)
    Decimal(Decimal),

    String(String),

    /// ISO-8601 date or datetime, validated when lexed
    Datetime(String),

    Uuid(Uuid),

    Record(RecordId),

    Array(Vec<Value>),

    Object(HashMap<String, Value>),

    /// Value-level failure. Carries user data (`THROW`, `fail()`) or a
    /// runtime message and flows through expressions like any other value.
    Failure(Box<Value>),
}

impl Value {
    pub fn failure(message: impl Into<String>) -> Self {
        Value::Failure(Box::new(Value::String(message.into())))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Value::Failure(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null | Failure(_) => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Float(n) => *n != 0.0,
            Decimal(d) => !d.is_zero(),
            String(s) => !s.is_empty(),
            Datetime(_) | Uuid(_) | Record(_) => true,
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Field lookup on objects; anything else has no fields.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(field),
            _ => None,
        }
    }

    /// The record id stored under `id`, if any.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self.get("id") {
            Some(Value::Record(id)) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::output::to_text(self))
    }
}

/// Returns a human-readable type name for a Value
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Decimal(_) => "decimal",
        Value::String(_) => "string",
        Value::Datetime(_) => "datetime",
        Value::Uuid(_) => "uuid",
        Value::Record(_) => "record",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Failure(_) => "failure",
    }
}
