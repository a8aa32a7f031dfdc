use rust_decimal::Decimal;

use crate::ast::{Identifier, Strand};

/// Location of a token in the source text.
///
/// `offset` counts characters from the start of the input; `line` and
/// `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A classified token together with its raw spelling and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: String,
    pub position: Position,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_operator(&self, operator: Operator) -> bool {
        self.kind == TokenKind::Operator(operator)
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }
}

/// Token classification. Decided once by the lexer and never revisited.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare (`name`) or surrounded (`` `any text` ``) identifier
    Identifier(Identifier),

    /// Reserved word, matched case-insensitively
    ///
    /// # Examples
    /// ```text
    /// LET  begin  Commit
    /// ```
    Keyword(Keyword),

    /// String literal, optionally tagged with a subtype prefix
    ///
    /// # Examples
    /// ```text
    /// "plain"
    /// d"2024-01-01T00:00:00Z"
    /// u"0190d1c4-7e8b-7c3a-9f00-5b1d2b4c6e11"
    /// r"person:tobie"
    /// ```
    Strand(Strand),

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42      // integer
    /// 1.5     // float
    /// 10f     // float
    /// 10dec   // decimal
    /// ```
    Number(Number),

    /// Variable reference (`$name`)
    Param(String),

    Operator(Operator),

    Punct(Punct),

    /// End of input
    Eof,
}

/// Numeric literal payload, already converted by the lexer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Let,
    If,
    Else,
    For,
    In,
    Begin,
    Transaction,
    Commit,
    Cancel,
    Return,
    Throw,
    Create,
    Update,
    Delete,
    Select,
    From,
    Where,
    Content,
    Set,
    And,
    Or,
    Not,
    True,
    False,
    Null,
    None,
    Knn,
}

impl Keyword {
    pub const ALL: [Keyword; 27] = [
        Keyword::Let,
        Keyword::If,
        Keyword::Else,
        Keyword::For,
        Keyword::In,
        Keyword::Begin,
        Keyword::Transaction,
        Keyword::Commit,
        Keyword::Cancel,
        Keyword::Return,
        Keyword::Throw,
        Keyword::Create,
        Keyword::Update,
        Keyword::Delete,
        Keyword::Select,
        Keyword::From,
        Keyword::Where,
        Keyword::Content,
        Keyword::Set,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::True,
        Keyword::False,
        Keyword::Null,
        Keyword::None,
        Keyword::Knn,
    ];

    /// Look up a bare word, ignoring ASCII case.
    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(word))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Let => "LET",
            Keyword::If => "IF",
            Keyword::Else => "ELSE",
            Keyword::For => "FOR",
            Keyword::In => "IN",
            Keyword::Begin => "BEGIN",
            Keyword::Transaction => "TRANSACTION",
            Keyword::Commit => "COMMIT",
            Keyword::Cancel => "CANCEL",
            Keyword::Return => "RETURN",
            Keyword::Throw => "THROW",
            Keyword::Create => "CREATE",
            Keyword::Update => "UPDATE",
            Keyword::Delete => "DELETE",
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Content => "CONTENT",
            Keyword::Set => "SET",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Null => "NULL",
            Keyword::None => "NONE",
            Keyword::Knn => "KNN",
        }
    }
}

/// Operator glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `=`, only valid in `LET` and `SET`
    Assign,
    /// `!`
    Bang,
    /// `??`
    Coalesce,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// Nearest-neighbour operator, lexed as one token (`KNN<3>`)
    Knn(u32),
}

/// Punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,
    Dot,
}
