//! Built-in functions.
//!
//! Functions never fault. Bad input produces a failure value, and a failure
//! passed as an argument is returned unchanged, except by the functions that
//! exist to inspect failures (`is_failure`, `unwrap_or`, `type_of`, `fail`).

use regex::Regex;
use uuid::Uuid;

use crate::scope::ResolveError;
use crate::value::{Value, type_name};

/// Name and argument count of every built-in.
pub const FUNCTIONS: &[(&str, usize)] = &[
    ("len", 1),
    ("type_of", 1),
    ("fail", 1),
    ("is_failure", 1),
    ("unwrap_or", 2),
    ("uuid", 0),
    ("matches", 2),
    ("upper", 1),
    ("lower", 1),
    ("keys", 1),
];

/// Check that `name` exists and takes `argc` arguments.
pub fn check_call(name: &str, argc: usize) -> Result<(), ResolveError> {
    let (_, expected) = FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| ResolveError::UnknownFunction(name.to_string()))?;
    if *expected != argc {
        return Err(ResolveError::ArityMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            found: argc,
        });
    }
    Ok(())
}

/// Call a built-in with already evaluated arguments.
pub fn call(name: &str, mut args: Vec<Value>) -> Value {
    match name {
        "is_failure" => Value::Boolean(args.first().is_some_and(Value::is_failure)),
        "unwrap_or" => {
            let fallback = args.pop().unwrap_or(Value::Null);
            match args.pop() {
                Some(Value::Failure(_)) | Some(Value::Null) | None => fallback,
                Some(value) => value,
            }
        }
        "type_of" => Value::String(args.first().map(type_name).unwrap_or("null").to_string()),
        "fail" => match args.pop() {
            Some(failure @ Value::Failure(_)) => failure,
            Some(value) => Value::Failure(Box::new(value)),
            None => Value::failure("fail() called without a value"),
        },
        "uuid" => Value::Uuid(Uuid::new_v4()),
        _ => {
            if let Some(failure) = args.iter().find(|v| v.is_failure()) {
                return failure.clone();
            }
            call_plain(name, &args)
        }
    }
}

fn call_plain(name: &str, args: &[Value]) -> Value {
    match (name, args) {
        ("len", [Value::Array(arr)]) => Value::Integer(arr.len() as i64),
        ("len", [Value::String(s)]) => Value::Integer(s.chars().count() as i64),
        ("len", [Value::Object(obj)]) => Value::Integer(obj.len() as i64),
        ("len", [Value::Null]) => Value::Integer(0),
        ("matches", [Value::String(text), Value::String(pattern)]) => match Regex::new(pattern) {
            Ok(re) => Value::Boolean(re.is_match(text)),
            Err(e) => Value::failure(format!("invalid regex: {e}")),
        },
        ("upper", [Value::String(s)]) => Value::String(s.to_uppercase()),
        ("lower", [Value::String(s)]) => Value::String(s.to_lowercase()),
        ("keys", [Value::Object(obj)]) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            Value::Array(keys.into_iter().map(|k| Value::String(k.clone())).collect())
        }
        _ => {
            let types: Vec<&str> = args.iter().map(type_name).collect();
            Value::failure(format!("{}() does not accept ({})", name, types.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            check_call("nope", 0),
            Err(ResolveError::UnknownFunction("nope".to_string()))
        );
    }

    #[test]
    fn test_arity_checked() {
        assert!(matches!(
            check_call("len", 2),
            Err(ResolveError::ArityMismatch { found: 2, .. })
        ));
    }

    #[test]
    fn test_failure_argument_passes_through() {
        let failure = Value::failure("boom");
        assert_eq!(call("len", vec![failure.clone()]), failure);
        assert_eq!(
            call("unwrap_or", vec![failure, Value::Integer(3)]),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_matches_uses_regex() {
        let text = Value::String("tobie@surreal.io".to_string());
        let pattern = Value::String(r"^\w+@".to_string());
        assert_eq!(call("matches", vec![text, pattern]), Value::Boolean(true));
    }

    #[test]
    fn test_bad_argument_is_failure() {
        assert!(call("len", vec![Value::Integer(3)]).is_failure());
    }
}
