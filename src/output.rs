//! Text output for Quarry values.
//!
//! Values print in the same literal notation the language reads, so a printed
//! result can be pasted back into a query. Output is deterministic (object
//! keys are sorted).
//!
//! | value          | printed as                 |
//! |----------------|----------------------------|
//! | float `1.5`    | `1.5f`                     |
//! | decimal `10`   | `10dec`                    |
//! | datetime       | `d"2024-01-01"`            |
//! | uuid           | `u"..."`                   |
//! | record         | `r"person:tobie"`          |
//! | failure        | `fail("message")`          |
//!
//! # Examples
//!
//! ```
//! use quarry_lang::Value;
//! use quarry_lang::output::to_text;
//!
//! assert_eq!(to_text(&Value::Float(2.5)), "2.5f");
//! assert_eq!(to_text(&Value::Array(vec![Value::Integer(1), Value::Null])), "[1, null]");
//! ```

use std::collections::HashMap;

use crate::value::Value;

pub struct TextPrinter {
    pretty: bool,
}

impl TextPrinter {
    pub fn new(pretty: bool) -> Self {
        TextPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format!("{}f", n),
            Value::Decimal(d) => format!("{}dec", d),
            Value::String(s) => self.quote(s),
            Value::Datetime(s) => format!("d{}", self.quote(s)),
            Value::Uuid(u) => format!("u\"{}\"", u),
            Value::Record(id) => format!("r{}", self.quote(&id.to_string())),
            Value::Array(arr) => self.print_array(arr, indent),
            Value::Object(obj) => self.print_object(obj, indent),
            Value::Failure(inner) => format!("fail({})", self.print_value(inner, indent)),
        }
    }

    fn print_array(&self, arr: &[Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        let items: Vec<String> = arr
            .iter()
            .map(|v| self.print_value(v, indent + 1))
            .collect();
        self.wrap('[', ']', items, indent)
    }

    fn print_object(&self, obj: &HashMap<String, Value>, indent: usize) -> String {
        if obj.is_empty() {
            return "{}".to_string();
        }

        let mut entries: Vec<_> = obj.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let items: Vec<String> = entries
            .into_iter()
            .map(|(k, v)| format!("{}: {}", self.quote(k), self.print_value(v, indent + 1)))
            .collect();
        self.wrap('{', '}', items, indent)
    }

    fn wrap(&self, open: char, close: char, items: Vec<String>, indent: usize) -> String {
        if self.pretty {
            let inner = self.indent(indent + 1);
            let body: Vec<String> = items.iter().map(|i| format!("{}{}", inner, i)).collect();
            format!("{}\n{}\n{}{}", open, body.join(",\n"), self.indent(indent), close)
        } else if open == '{' {
            format!("{{ {} }}", items.join(", "))
        } else {
            format!("{}{}{}", open, items.join(", "), close)
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn quote(&self, s: &str) -> String {
        let escaped: String = s
            .chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c => vec![c],
            })
            .collect();
        format!("\"{}\"", escaped)
    }
}

/// Single-line literal notation.
pub fn to_text(value: &Value) -> String {
    TextPrinter::new(false).print(value)
}

/// Literal notation with one element per line and 2-space indentation.
pub fn to_text_pretty(value: &Value) -> String {
    TextPrinter::new(true).print(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RecordId;

    #[test]
    fn test_object_keys_sorted() {
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Value::String("Tobie".to_string()));
        obj.insert("age".to_string(), Value::Integer(32));
        assert_eq!(
            to_text(&Value::Object(obj)),
            r#"{ "age": 32, "name": "Tobie" }"#
        );
    }

    #[test]
    fn test_typed_values_keep_prefix() {
        assert_eq!(
            to_text(&Value::Record(RecordId::new("person", "tobie"))),
            r#"r"person:tobie""#
        );
        assert_eq!(to_text(&Value::failure("boom")), r#"fail("boom")"#);
    }

    #[test]
    fn test_pretty_nesting() {
        let value = Value::Array(vec![Value::Array(vec![Value::Integer(1)])]);
        assert_eq!(to_text_pretty(&value), "[\n  [\n    1\n  ]\n]");
    }
}
