use rust_decimal::Decimal;

use crate::ast::{BinOp, Block, UnaryOp};
use crate::transform::Path;

/// An identifier as written in the source.
///
/// `surrounded` identifiers were delimited with backticks and may spell
/// anything, including reserved words. Bare identifiers never start with a
/// digit and never collide with a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub surrounded: bool,
}

impl Identifier {
    pub fn bare(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            surrounded: false,
        }
    }

    pub fn surrounded(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            surrounded: true,
        }
    }
}

/// Semantic subtype declared by a strand prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrandKind {
    /// `"..."`, `'...'` or `s"..."`
    Plain,
    /// `d"2024-05-01T10:00:00Z"`
    Datetime,
    /// `u"..."`
    Uuid,
    /// `r"table:key"`
    RecordId,
}

impl StrandKind {
    /// Prefix letter used in source, if any.
    pub fn prefix(&self) -> Option<char> {
        match self {
            StrandKind::Plain => None,
            StrandKind::Datetime => Some('d'),
            StrandKind::Uuid => Some('u'),
            StrandKind::RecordId => Some('r'),
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<StrandKind> {
        match prefix {
            "s" => Some(StrandKind::Plain),
            "d" => Some(StrandKind::Datetime),
            "u" => Some(StrandKind::Uuid),
            "r" => Some(StrandKind::RecordId),
            _ => None,
        }
    }
}

/// A string literal tagged at creation with its kind.
///
/// Untagged strands are always `Plain`; their content is never inspected to
/// promote them to another kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Strand {
    pub kind: StrandKind,
    pub text: String,
}

impl Strand {
    pub fn plain(text: impl Into<String>) -> Self {
        Strand {
            kind: StrandKind::Plain,
            text: text.into(),
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Strand(Strand),
    Boolean(bool),
    /// `NULL` and `NONE`
    Null,
}

/// Where a storage statement points.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Every record of a table (`person`)
    Table(Identifier),
    /// A single record (`r"person:tobie"`); the strand text is kept verbatim
    Record(Strand),
    /// Resolved at run time from a variable (`$who`)
    Param(String),
}

/// Modification applied by `UPDATE`.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// `CONTENT { ... }` replaces the whole record
    Content(Box<Expr>),
    /// `SET a.b = 1, tags[0] = "x"` edits individual paths
    Set(Vec<(Path, Expr)>),
}

/// Abstract Syntax Tree node representing a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    /// Variable reference (`$name`)
    ///
    /// Unbound variables read as null.
    Param(String),

    /// Bare or surrounded identifier in expression position
    ///
    /// Reads the field of the same name on `$this`.
    ///
    /// # Example
    /// ```text
    /// SELECT * FROM person WHERE age >= 18
    /// ```
    Ident(Identifier),

    /// Array literal
    Array(Vec<Expr>),

    /// Object literal. Keys are always quoted in source.
    ///
    /// # Example
    /// ```text
    /// {"name": $name, `total`: 10}
    /// ```
    Object(Vec<(String, Expr)>),

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Field access (`$person.name`)
    Field {
        object: Box<Expr>,
        name: String,
    },

    /// Index access (`$items[0]`, `$doc["key"]`)
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Built-in function call (`len($items)`)
    Call {
        name: String,
        args: Vec<Expr>,
    },

    /// Bracketed statement sequence used as a value
    Block(Block),

    /// `IF cond { } ELSE IF cond { } ELSE { }`
    If {
        branches: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },

    /// `CREATE person CONTENT {"name": "Tobie"}`
    Create {
        target: Target,
        content: Option<Box<Expr>>,
    },

    /// `UPDATE r"person:1" SET age = 30`
    Update {
        target: Target,
        change: Change,
    },

    /// `DELETE person`
    Delete(Target),

    /// `SELECT * FROM person WHERE age > 18`
    Select {
        from: Target,
        condition: Option<Box<Expr>>,
    },
}

impl Expr {
    /// True for expressions that print without surrounding parentheses in
    /// operand position.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Literal(_)
                | Expr::Param(_)
                | Expr::Ident(_)
                | Expr::Array(_)
                | Expr::Object(_)
                | Expr::Field { .. }
                | Expr::Index { .. }
                | Expr::Call { .. }
                | Expr::Block(_)
        )
    }
}
