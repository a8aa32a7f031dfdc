use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::instrument;

pub use crate::ast::Position;
use crate::ast::{Identifier, Keyword, Number, Operator, Punct, Strand, StrandKind, Token, TokenKind};

/// Errors raised while turning text into tokens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lex error at line {}, column {}: {kind}", position.line, position.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    InvalidCharacter(char),

    #[error("unterminated string")]
    UnterminatedStrand,

    #[error("unterminated identifier, missing closing '`'")]
    UnterminatedIdentifier,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    #[error("invalid {kind:?} strand: {reason}")]
    InvalidStrand { kind: StrandKind, reason: String },

    #[error("invalid number '{0}' (identifiers cannot start with a digit)")]
    InvalidNumber(String),

    #[error("malformed operator '{0}', nearest-neighbour search is written KNN<k>")]
    MalformedOperator(String),
}

static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2}):(\d{2})(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2})?)?$",
    )
    .expect("datetime pattern is valid")
});

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Consume the lexer and return every token, ending with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn here(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn error(&self, kind: LexErrorKind, position: Position) -> LexError {
        LexError { kind, position }
    }

    fn raw_since(&self, start: Position) -> String {
        self.input[start.offset..self.position].iter().collect()
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.current_char(), self.peek_char(1)) {
                (Some(ch), _) if ch.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current_char(), self.peek_char(1)) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                return Err(self.error(LexErrorKind::UnterminatedComment, start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Read a delimited body up to `close`, handling backslash escapes.
    fn read_delimited(
        &mut self,
        close: char,
        start: Position,
        unterminated: LexErrorKind,
    ) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // opening delimiter

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == close => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('\\') => result.push('\\'),
                        Some(c) if c == close || c == '"' || c == '\'' || c == '`' => result.push(c),
                        Some(c) => return Err(self.error(LexErrorKind::InvalidEscape(c), escape_at)),
                        None => return Err(self.error(unterminated, start)),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error(unterminated, start))
    }

    fn read_strand(&mut self, kind: StrandKind, start: Position) -> Result<TokenKind, LexError> {
        let quote = self.current_char().unwrap_or('"');
        let text = self.read_delimited(quote, start, LexErrorKind::UnterminatedStrand)?;
        validate_strand(kind, &text).map_err(|reason| {
            self.error(LexErrorKind::InvalidStrand { kind, reason }, start)
        })?;
        Ok(TokenKind::Strand(Strand { kind, text }))
    }

    fn read_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let suffix = if self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            self.read_word()
        } else {
            String::new()
        };

        let invalid = |lexer: &Lexer| lexer.error(LexErrorKind::InvalidNumber(lexer.raw_since(start)), start);

        let value = match suffix.as_str() {
            "" if is_float => Number::Float(number.parse::<f64>().map_err(|_| invalid(self))?),
            "" => Number::Int(number.parse::<i64>().map_err(|_| invalid(self))?),
            "f" => Number::Float(number.parse::<f64>().map_err(|_| invalid(self))?),
            "dec" => Number::Decimal(Decimal::from_str(&number).map_err(|_| invalid(self))?),
            _ => return Err(invalid(self)),
        };
        Ok(TokenKind::Number(value))
    }

    /// `KNN<k>`; the word has already been consumed and `<` is current.
    fn read_knn(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.advance(); // '<'
        let mut digits = String::new();
        while let Some(ch) = self.current_char().filter(|c| c.is_ascii_digit()) {
            digits.push(ch);
            self.advance();
        }
        let malformed = |lexer: &Lexer| {
            lexer.error(LexErrorKind::MalformedOperator(lexer.raw_since(start)), start)
        };
        if self.current_char() != Some('>') {
            return Err(malformed(self));
        }
        self.advance();
        match digits.parse::<u32>() {
            Ok(k) if k > 0 => Ok(TokenKind::Operator(Operator::Knn(k))),
            _ => Err(malformed(self)),
        }
    }

    fn single(&mut self, kind: TokenKind) -> Result<TokenKind, LexError> {
        self.advance();
        Ok(kind)
    }

    fn pair(&mut self, second: char, both: TokenKind, one: TokenKind) -> Result<TokenKind, LexError> {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            Ok(both)
        } else {
            Ok(one)
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.here();
        let kind = self.next_kind(start)?;
        Ok(Token {
            kind,
            raw: self.raw_since(start),
            position: start,
        })
    }

    fn next_kind(&mut self, start: Position) -> Result<TokenKind, LexError> {
        use Operator as Op;

        match self.current_char() {
            None => Ok(TokenKind::Eof),
            Some('$') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                {
                    self.advance();
                    Ok(TokenKind::Param(self.read_word()))
                } else {
                    Err(self.error(LexErrorKind::InvalidCharacter('$'), start))
                }
            }
            Some('`') => {
                let name =
                    self.read_delimited('`', start, LexErrorKind::UnterminatedIdentifier)?;
                Ok(TokenKind::Identifier(Identifier::surrounded(name)))
            }
            Some('"') | Some('\'') => self.read_strand(StrandKind::Plain, start),
            Some('(') => self.single(TokenKind::Punct(Punct::LParen)),
            Some(')') => self.single(TokenKind::Punct(Punct::RParen)),
            Some('[') => self.single(TokenKind::Punct(Punct::LBracket)),
            Some(']') => self.single(TokenKind::Punct(Punct::RBracket)),
            Some('{') => self.single(TokenKind::Punct(Punct::LBrace)),
            Some('}') => self.single(TokenKind::Punct(Punct::RBrace)),
            Some(',') => self.single(TokenKind::Punct(Punct::Comma)),
            Some(';') => self.single(TokenKind::Punct(Punct::Semicolon)),
            Some(':') => self.single(TokenKind::Punct(Punct::Colon)),
            Some('.') => self.single(TokenKind::Punct(Punct::Dot)),
            Some('+') => self.single(TokenKind::Operator(Op::Plus)),
            Some('-') => self.single(TokenKind::Operator(Op::Minus)),
            Some('*') => self.single(TokenKind::Operator(Op::Star)),
            Some('/') => self.single(TokenKind::Operator(Op::Slash)),
            Some('%') => self.single(TokenKind::Operator(Op::Percent)),
            Some('=') => self.pair('=', TokenKind::Operator(Op::EqEq), TokenKind::Operator(Op::Assign)),
            Some('!') => self.pair('=', TokenKind::Operator(Op::NotEq), TokenKind::Operator(Op::Bang)),
            Some('>') => self.pair('=', TokenKind::Operator(Op::GtEq), TokenKind::Operator(Op::Gt)),
            Some('<') => {
                if self.peek_char(1) == Some('|') {
                    self.advance();
                    self.advance();
                    return Err(self.error(
                        LexErrorKind::MalformedOperator(self.raw_since(start)),
                        start,
                    ));
                }
                self.pair('=', TokenKind::Operator(Op::LtEq), TokenKind::Operator(Op::Lt))
            }
            Some('?') if self.peek_char(1) == Some('?') => {
                self.advance();
                self.single(TokenKind::Operator(Op::Coalesce))
            }
            Some('&') if self.peek_char(1) == Some('&') => {
                self.advance();
                self.single(TokenKind::Operator(Op::AndAnd))
            }
            Some('|') if self.peek_char(1) == Some('|') => {
                self.advance();
                self.single(TokenKind::Operator(Op::OrOr))
            }
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let word = self.read_word();

                if let Some(kind) = StrandKind::from_prefix(&word)
                    && matches!(self.current_char(), Some('"') | Some('\''))
                {
                    return self.read_strand(kind, start);
                }

                if word.eq_ignore_ascii_case("knn") && self.current_char() == Some('<') {
                    return self.read_knn(start);
                }

                match Keyword::from_word(&word) {
                    Some(keyword) => Ok(TokenKind::Keyword(keyword)),
                    None => Ok(TokenKind::Identifier(Identifier::bare(word))),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(start),
            Some(ch) => Err(self.error(LexErrorKind::InvalidCharacter(ch), start)),
        }
    }
}

/// Tokenize `text`. The result depends on the text alone.
#[instrument(name = "lexer::tokenize", level = "trace", skip(text), fields(len = text.len()))]
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text).tokenize()
}

/// Check the content of a typed strand.
pub(crate) fn validate_strand(kind: StrandKind, text: &str) -> Result<(), String> {
    match kind {
        StrandKind::Plain => Ok(()),
        StrandKind::Datetime => validate_datetime(text),
        StrandKind::Uuid => uuid::Uuid::parse_str(text)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        StrandKind::RecordId => split_record_id(text).map(|_| ()),
    }
}

fn validate_datetime(text: &str) -> Result<(), String> {
    let captures = DATETIME
        .captures(text)
        .ok_or_else(|| format!("'{}' is not an ISO-8601 date or datetime", text))?;

    let field = |i: usize| -> u32 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let (month, day) = (field(2), field(3));
    if !(1..=12).contains(&month) {
        return Err(format!("month {} out of range", month));
    }
    if !(1..=31).contains(&day) {
        return Err(format!("day {} out of range", day));
    }
    if field(4) > 23 || field(5) > 59 || field(6) > 59 {
        return Err("time of day out of range".to_string());
    }
    Ok(())
}

/// Split `table:key`. The table must have bare identifier shape and the key
/// must be non-empty.
pub(crate) fn split_record_id(text: &str) -> Result<(&str, &str), String> {
    let (table, key) = text
        .split_once(':')
        .ok_or_else(|| format!("'{}' is missing the ':' between table and key", text))?;
    if !crate::ast::display::is_bare_shape(table) {
        return Err(format!("'{}' is not a valid table name", table));
    }
    if key.is_empty() {
        return Err("record key is empty".to_string());
    }
    Ok((table, key))
}
