//! Canonical source rendering of syntax trees.
//!
//! Printing a parsed tree and parsing the output again yields the same tree.
//! Nested operators are fully parenthesized, floats carry the `f` suffix and
//! object keys are always quoted.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{
    Block, Change, Expr, Identifier, Keyword, Literal, Number, Operator, Punct, Query, Statement,
    Strand, Target, TokenKind, TxnId, UnaryOp,
};
use crate::transform::PathSegment;

pub(crate) fn is_bare_shape(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_quoted(f: &mut Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    f.write_char(quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Field names print bare when they have identifier shape (keywords
/// included, since field positions accept them) and backticked otherwise.
fn write_name(f: &mut Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_shape(name) {
        f.write_str(name)
    } else {
        write_quoted(f, name, '`')
    }
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.is_atomic() {
        write!(f, "{}", expr)
    } else {
        write!(f, "({})", expr)
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.surrounded {
            write_quoted(f, &self.name, '`')
        } else {
            f.write_str(&self.name)
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.kind.prefix() {
            f.write_char(prefix)?;
        }
        write_quoted(f, &self.text, '"')
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{}f", n),
            Literal::Decimal(d) => write!(f, "{}dec", d),
            Literal::Strand(s) => write!(f, "{}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Target::Table(ident) => write!(f, "{}", ident),
            Target::Record(strand) => write!(f, "{}", strand),
            Target::Param(name) => write!(f, "${}", name),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Param(name) => write!(f, "${}", name),
            Expr::Ident(ident) => write!(f, "{}", ident),
            Expr::Array(items) => {
                f.write_char('[')?;
                write_list(f, items)?;
                f.write_char(']')
            }
            Expr::Object(pairs) => {
                if pairs.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, key, '"')?;
                    write!(f, ": {}", value)?;
                }
                f.write_str(" }")
            }
            Expr::Unary { op, operand } => {
                match op {
                    UnaryOp::Negate => f.write_char('-')?,
                    UnaryOp::Not => f.write_char('!')?,
                }
                write_operand(f, operand)
            }
            Expr::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Field { object, name } => {
                write_operand(f, object)?;
                f.write_char('.')?;
                write_name(f, name)
            }
            Expr::Index { object, index } => {
                write_operand(f, object)?;
                write!(f, "[{}]", index)
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                f.write_char(')')
            }
            Expr::Block(block) => write!(f, "{}", block),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (i, (condition, body)) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ELSE ")?;
                    }
                    write!(f, "IF {} {}", condition, body)?;
                }
                if let Some(body) = otherwise {
                    write!(f, " ELSE {}", body)?;
                }
                Ok(())
            }
            Expr::Create { target, content } => {
                write!(f, "CREATE {}", target)?;
                if let Some(content) = content {
                    write!(f, " CONTENT {}", content)?;
                }
                Ok(())
            }
            Expr::Update { target, change } => {
                write!(f, "UPDATE {}", target)?;
                match change {
                    Change::Content(content) => write!(f, " CONTENT {}", content),
                    Change::Set(assignments) => {
                        f.write_str(" SET ")?;
                        for (i, (path, value)) in assignments.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            for (j, segment) in path.iter().enumerate() {
                                match segment {
                                    PathSegment::Field(name) => {
                                        if j > 0 {
                                            f.write_char('.')?;
                                        }
                                        write_name(f, name)?;
                                    }
                                    PathSegment::Index(n) => write!(f, "[{}]", n)?,
                                }
                            }
                            write!(f, " = {}", value)?;
                        }
                        Ok(())
                    }
                }
            }
            Expr::Delete(target) => write!(f, "DELETE {}", target),
            Expr::Select { from, condition } => {
                write!(f, "SELECT * FROM {}", from)?;
                if let Some(condition) = condition {
                    write!(f, " WHERE {}", condition)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "LET ${} = {}", name, value),
            Statement::Expr(expr) => write!(f, "{}", expr),
            Statement::Return(expr) => write!(f, "RETURN {}", expr),
            Statement::Throw(expr) => write!(f, "THROW {}", expr),
            Statement::For {
                binding,
                iterable,
                body,
            } => write!(f, "FOR ${} IN {} {}", binding, iterable, body),
            Statement::Begin(_) => f.write_str("BEGIN"),
            Statement::Commit(_) => f.write_str("COMMIT"),
            Statement::Cancel(_) => f.write_str("CANCEL"),
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", entry)?;
        }
        if self.terminated {
            f.write_char(';')?;
        }
        f.write_str(" }")
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.body.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(";\n")?;
            }
            write!(f, "{}", entry)?;
        }
        if self.body.terminated {
            f.write_char(';')?;
        }
        Ok(())
    }
}

impl Display for TxnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(ident) => write!(f, "identifier {}", ident),
            TokenKind::Keyword(keyword) => write!(f, "keyword {}", keyword),
            TokenKind::Strand(strand) => write!(f, "strand {}", strand),
            TokenKind::Number(Number::Int(n)) => write!(f, "number {}", n),
            TokenKind::Number(Number::Float(n)) => write!(f, "number {}f", n),
            TokenKind::Number(Number::Decimal(d)) => write!(f, "number {}dec", d),
            TokenKind::Param(name) => write!(f, "${}", name),
            TokenKind::Operator(op) => write!(f, "'{}'", operator_symbol(*op)),
            TokenKind::Punct(p) => write!(f, "'{}'", punct_symbol(*p)),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

fn operator_symbol(op: Operator) -> String {
    match op {
        Operator::Plus => "+".into(),
        Operator::Minus => "-".into(),
        Operator::Star => "*".into(),
        Operator::Slash => "/".into(),
        Operator::Percent => "%".into(),
        Operator::EqEq => "==".into(),
        Operator::NotEq => "!=".into(),
        Operator::Lt => "<".into(),
        Operator::LtEq => "<=".into(),
        Operator::Gt => ">".into(),
        Operator::GtEq => ">=".into(),
        Operator::Assign => "=".into(),
        Operator::Bang => "!".into(),
        Operator::Coalesce => "??".into(),
        Operator::AndAnd => "&&".into(),
        Operator::OrOr => "||".into(),
        Operator::Knn(k) => format!("KNN<{}>", k),
    }
}

fn punct_symbol(p: Punct) -> &'static str {
    match p {
        Punct::LParen => "(",
        Punct::RParen => ")",
        Punct::LBracket => "[",
        Punct::RBracket => "]",
        Punct::LBrace => "{",
        Punct::RBrace => "}",
        Punct::Comma => ",",
        Punct::Semicolon => ";",
        Punct::Colon => ":",
        Punct::Dot => ".",
    }
}
