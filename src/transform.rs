use crate::value::{Value, type_name};

/// A segment in a path used by `UPDATE ... SET`.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object field access by name
    ///
    /// # Examples
    /// - `name` → `Field("name")`
    /// - `address.city` → `[Field("address"), Field("city")]`
    Field(String),

    /// Array element access by index
    ///
    /// # Examples
    /// - `tags[0]` → `[Field("tags"), Index(0)]`
    /// - `tags[-1]` → `[Field("tags"), Index(-1)]` (counts from the end)
    Index(i64),
}

/// A navigation path through a record, e.g. `address.lines[0]`.
pub type Path = Vec<PathSegment>;

/// Why a path could not be written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("array index {index} out of bounds (length: {len})")]
    OutOfBounds { index: i64, len: usize },

    #[error("cannot use field '{field}' on {found}")]
    FieldOnNonObject { field: String, found: &'static str },

    #[error("cannot use index {index} on {found}")]
    IndexOnNonArray { index: i64, found: &'static str },

    #[error("empty path")]
    Empty,
}

fn resolve_index(idx: i64, len: usize) -> Result<usize, PathError> {
    let index = if idx >= 0 {
        idx as usize
    } else if idx.unsigned_abs() <= len as u64 {
        len - idx.unsigned_abs() as usize
    } else {
        return Err(PathError::OutOfBounds { index: idx, len });
    };
    if index < len {
        Ok(index)
    } else {
        Err(PathError::OutOfBounds { index: idx, len })
    }
}

/// Write `value` at `path` inside `current`.
///
/// Missing object fields along the way are created as empty objects, and a
/// null field is treated the same way. Array indexes must already exist.
pub fn set_at_path(current: &mut Value, path: &[PathSegment], value: Value) -> Result<(), PathError> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(PathError::Empty);
    };

    if matches!(current, Value::Null) && matches!(segment, PathSegment::Field(_)) {
        *current = Value::Object(Default::default());
    }

    match (current, segment) {
        (Value::Object(map), PathSegment::Field(key)) => {
            if rest.is_empty() {
                map.insert(key.clone(), value);
                return Ok(());
            }
            let child = map.entry(key.clone()).or_insert(Value::Null);
            set_at_path(child, rest, value)
        }
        (Value::Array(arr), PathSegment::Index(idx)) => {
            let index = resolve_index(*idx, arr.len())?;
            if rest.is_empty() {
                arr[index] = value;
                Ok(())
            } else {
                set_at_path(&mut arr[index], rest, value)
            }
        }
        (other, PathSegment::Field(field)) => Err(PathError::FieldOnNonObject {
            field: field.clone(),
            found: type_name(other),
        }),
        (other, PathSegment::Index(index)) => Err(PathError::IndexOnNonArray {
            index: *index,
            found: type_name(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn field(name: &str) -> PathSegment {
        PathSegment::Field(name.to_string())
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut record = Value::Object(HashMap::new());
        set_at_path(&mut record, &[field("a"), field("b")], Value::Integer(1)).unwrap();

        let Value::Object(outer) = &record else { panic!("expected object") };
        let Value::Object(inner) = &outer["a"] else { panic!("expected object") };
        assert_eq!(inner["b"], Value::Integer(1));
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let mut tags = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        set_at_path(&mut tags, &[PathSegment::Index(-1)], Value::Integer(9)).unwrap();
        assert_eq!(tags, Value::Array(vec![Value::Integer(1), Value::Integer(9)]));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut tags = Value::Array(vec![]);
        assert_eq!(
            set_at_path(&mut tags, &[PathSegment::Index(0)], Value::Null),
            Err(PathError::OutOfBounds { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_field_on_scalar() {
        let mut n = Value::Integer(3);
        assert!(matches!(
            set_at_path(&mut n, &[field("x")], Value::Null),
            Err(PathError::FieldOnNonObject { found: "integer", .. })
        ));
    }
}
