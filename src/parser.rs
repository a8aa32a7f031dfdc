use std::fmt;

use tracing::instrument;

use crate::ast::{
    BinOp, Block, Change, Expr, Identifier, Keyword, Literal, Number, Operator, Position, Punct,
    Query, Statement, StrandKind, Target, Token, TokenKind, TxnRole, UnaryOp,
};
use crate::config::ParseConfig;
use crate::grammar::{self, BraceForm, Form, ProductionKind};
use crate::transform::{Path, PathSegment};

/// A construct the parser refused, with the disambiguation rule that fired.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("syntax error at line {}, column {} [{rule}]: {kind}", position.line, position.column)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: Position,
    pub rule: &'static str,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error(
        "'{{ name: ...' could be an object or a block; quote the key (\"name\") for an object, or write a statement for a block"
    )]
    AmbiguousConstruct,

    #[error("{0} is a reserved word here; surround it with backticks to use it as a name")]
    ReservedWordMisuse(Keyword),

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("nesting is deeper than the configured maximum")]
    NestingTooDeep,
}

/// Rule names reported with syntax errors.
pub mod rules {
    pub const BLOCK_OBJECT: &str = "block-object";
    pub const KEYWORD_RESERVATION: &str = "keyword-reservation";
    pub const OBJECT_KEY: &str = "object-key";
    pub const STATEMENT_SEPARATOR: &str = "statement-separator";
    pub const STATEMENT: &str = "statement";
    pub const EXPRESSION: &str = "expression";
    pub const NESTING_DEPTH: &str = "nesting-depth";
}

/// Where a statement sequence ends.
#[derive(Clone, Copy, PartialEq)]
enum Closing {
    Eof,
    Brace,
}

impl fmt::Display for Closing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Closing::Eof => f.write_str("';' or end of input"),
            Closing::Brace => f.write_str("';' or '}'"),
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    config: ParseConfig,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_config(tokens, ParseConfig::default())
    }

    pub fn with_config(mut tokens: Vec<Token>, config: ParseConfig) -> Self {
        debug_assert!(grammar::check_conflicts(grammar::PRODUCTIONS).is_ok());

        if !tokens.last().is_some_and(Token::is_eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_else(Position::start);
            tokens.push(Token {
                kind: TokenKind::Eof,
                raw: String::new(),
                position,
            });
        }
        Parser {
            tokens,
            position: 0,
            depth: 0,
            config,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.current().is_punct(punct)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    fn error(&self, kind: SyntaxErrorKind, rule: &'static str) -> SyntaxError {
        SyntaxError {
            kind,
            position: self.current().position,
            rule,
        }
    }

    fn unexpected(&self, expected: impl Into<String>, rule: &'static str) -> SyntaxError {
        self.error(
            SyntaxErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: self.current().kind.to_string(),
            },
            rule,
        )
    }

    /// A keyword where a name was required is a reservation error; anything
    /// else is an unexpected token.
    fn name_required(&self, expected: &str, rule: &'static str) -> SyntaxError {
        match self.current().kind {
            TokenKind::Keyword(keyword) => self.error(
                SyntaxErrorKind::ReservedWordMisuse(keyword),
                rules::KEYWORD_RESERVATION,
            ),
            _ => self.unexpected(expected, rule),
        }
    }

    fn expect_punct(&mut self, punct: Punct, rule: &'static str) -> Result<(), SyntaxError> {
        if self.check_punct(punct) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(TokenKind::Punct(punct).to_string(), rule))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, rule: &'static str) -> Result<(), SyntaxError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str(), rule))
        }
    }

    fn skip_keyword(&mut self, keyword: Keyword) {
        if self.check_keyword(keyword) {
            self.advance();
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.deepen()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Go one nesting level deeper without a matching return, for the
    /// links of an iteratively built chain.
    fn deepen(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= self.config.max_depth {
            return Err(self.error(SyntaxErrorKind::NestingTooDeep, rules::NESTING_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Query, SyntaxError> {
        let body = self.parse_entries(Closing::Eof)?;
        Ok(Query { body })
    }

    /// Parse a single expression that must span the whole input.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_expression()?;
        if !self.current().is_eof() {
            return Err(self.unexpected("end of input", rules::EXPRESSION));
        }
        Ok(expr)
    }

    fn at_closing(&self, closing: Closing) -> bool {
        match closing {
            Closing::Eof => self.current().is_eof(),
            Closing::Brace => self.check_punct(Punct::RBrace),
        }
    }

    fn parse_entries(&mut self, closing: Closing) -> Result<Block, SyntaxError> {
        let mut entries = Vec::new();
        let mut terminated = false;

        while !self.at_closing(closing) {
            entries.push(self.parse_statement()?);

            if self.check_punct(Punct::Semicolon) {
                self.advance();
                if self.at_closing(closing) {
                    terminated = true;
                }
            } else if !self.at_closing(closing) {
                return Err(self.unexpected(closing.to_string(), rules::STATEMENT_SEPARATOR));
            }
        }

        Ok(Block::new(entries, terminated))
    }

    /// `{ entries }` where a block is required.
    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        if !self.check_punct(Punct::LBrace) {
            return Err(self.unexpected("block", rules::BLOCK_OBJECT));
        }
        if !matches!(self.peek_kind(1), TokenKind::Punct(Punct::RBrace)) {
            match grammar::brace_form(self.peek_kind(1), self.peek_kind(2)) {
                BraceForm::Block => {}
                BraceForm::Ambiguous => {
                    return Err(self.error(SyntaxErrorKind::AmbiguousConstruct, rules::BLOCK_OBJECT));
                }
                BraceForm::Object => return Err(self.unexpected("block", rules::BLOCK_OBJECT)),
            }
        }
        self.advance();
        let block = self.nested(|p| p.parse_entries(Closing::Brace))?;
        self.expect_punct(Punct::RBrace, rules::BLOCK_OBJECT)?;
        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let production = grammar::production_for(&self.current().kind);

        match production {
            Some(p) if p.form == Form::Statement => match p.kind {
                ProductionKind::Let => self.parse_let(),
                ProductionKind::Return => {
                    self.advance();
                    Ok(Statement::Return(self.parse_expression()?))
                }
                ProductionKind::Throw => {
                    self.advance();
                    Ok(Statement::Throw(self.parse_expression()?))
                }
                ProductionKind::For => self.parse_for(),
                ProductionKind::Begin => {
                    self.advance();
                    self.skip_keyword(Keyword::Transaction);
                    Ok(Statement::Begin(TxnRole::Unresolved))
                }
                ProductionKind::Commit => {
                    self.advance();
                    self.skip_keyword(Keyword::Transaction);
                    Ok(Statement::Commit(TxnRole::Unresolved))
                }
                ProductionKind::Cancel => {
                    self.advance();
                    self.skip_keyword(Keyword::Transaction);
                    Ok(Statement::Cancel(TxnRole::Unresolved))
                }
                _ => Err(self.unexpected("statement", rules::STATEMENT)),
            },
            Some(_) => Ok(Statement::Expr(self.parse_expression()?)),
            None => match self.current().kind {
                TokenKind::Keyword(keyword) => Err(self.error(
                    SyntaxErrorKind::ReservedWordMisuse(keyword),
                    rules::KEYWORD_RESERVATION,
                )),
                _ => Err(self.unexpected("statement", rules::STATEMENT)),
            },
        }
    }

    fn parse_param_name(&mut self) -> Result<String, SyntaxError> {
        match &self.current().kind {
            TokenKind::Param(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.name_required("$parameter", rules::STATEMENT)),
        }
    }

    fn parse_let(&mut self) -> Result<Statement, SyntaxError> {
        self.advance(); // LET
        let name = self.parse_param_name()?;
        if !self.current().is_operator(Operator::Assign) {
            return Err(self.unexpected("'='", rules::STATEMENT));
        }
        self.advance();
        let value = self.parse_expression()?;
        Ok(Statement::Let { name, value })
    }

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        self.advance(); // FOR
        let binding = self.parse_param_name()?;
        self.expect_keyword(Keyword::In, rules::STATEMENT)?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::For {
            binding,
            iterable,
            body,
        })
    }

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(|p| p.parse_or())
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::parse_and, |p| {
            (p.check_keyword(Keyword::Or) || p.current().is_operator(Operator::OrOr)).then_some(BinOp::Or)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::parse_comparison, |p| {
            (p.check_keyword(Keyword::And) || p.current().is_operator(Operator::AndAnd)).then_some(BinOp::And)
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_knn()?;

        let op = match &self.current().kind {
            TokenKind::Operator(Operator::EqEq) => BinOp::Equal,
            TokenKind::Operator(Operator::NotEq) => BinOp::NotEqual,
            TokenKind::Operator(Operator::Lt) => BinOp::LessThan,
            TokenKind::Operator(Operator::Gt) => BinOp::GreaterThan,
            TokenKind::Operator(Operator::LtEq) => BinOp::LessEqual,
            TokenKind::Operator(Operator::GtEq) => BinOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_knn()?;
        Ok(Self::binary(op, left, right))
    }

    fn parse_knn(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_coalesce()?;

        if let TokenKind::Operator(Operator::Knn(k)) = self.current().kind {
            self.advance();
            let right = self.parse_coalesce()?;
            return Ok(Self::binary(BinOp::Knn(k), left, right));
        }
        Ok(left)
    }

    fn parse_coalesce(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::parse_additive, |p| {
            p.current().is_operator(Operator::Coalesce).then_some(BinOp::NullCoalesce)
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::parse_multiplicative, |p| match &p.current().kind {
            TokenKind::Operator(Operator::Plus) => Some(BinOp::Add),
            TokenKind::Operator(Operator::Minus) => Some(BinOp::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::parse_unary, |p| match &p.current().kind {
            TokenKind::Operator(Operator::Star) => Some(BinOp::Multiply),
            TokenKind::Operator(Operator::Slash) => Some(BinOp::Divide),
            TokenKind::Operator(Operator::Percent) => Some(BinOp::Modulo),
            _ => None,
        })
    }

    /// Fold a left-associative chain of `operand`s joined by whatever
    /// `operator` recognises. Every link is one more tree level and counts
    /// against the nesting limit until the chain is done.
    fn left_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, SyntaxError>,
        operator: fn(&Self) -> Option<BinOp>,
    ) -> Result<Expr, SyntaxError> {
        let mark = self.depth;
        let result = self.fold_chain(operand, operator);
        self.depth = mark;
        result
    }

    fn fold_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, SyntaxError>,
        operator: fn(&Self) -> Option<BinOp>,
    ) -> Result<Expr, SyntaxError> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self) {
            self.deepen()?;
            self.advance();
            let right = operand(self)?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match grammar::production_for(&self.current().kind).map(|p| p.kind) {
            Some(ProductionKind::Negate) => UnaryOp::Negate,
            Some(ProductionKind::Not) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mark = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = mark;
        result
    }

    fn parse_postfix_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check_punct(Punct::Dot) {
                self.deepen()?;
                self.advance();
                let name = self.parse_field_name()?;
                expr = Expr::Field {
                    object: Box::new(expr),
                    name,
                };
            } else if self.check_punct(Punct::LBracket) {
                self.deepen()?;
                self.advance();
                let index = self.parse_expression()?;
                self.expect_punct(Punct::RBracket, rules::EXPRESSION)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Field positions accept keywords as names, spelled as written.
    fn parse_field_name(&mut self) -> Result<String, SyntaxError> {
        let token = self.current();
        let name = match &token.kind {
            TokenKind::Identifier(ident) => ident.name.clone(),
            TokenKind::Keyword(_) => token.raw.clone(),
            _ => return Err(self.unexpected("field name", rules::EXPRESSION)),
        };
        self.advance();
        Ok(name)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let Some(production) = grammar::production_for(&self.current().kind) else {
            return Err(self.name_required("expression", rules::EXPRESSION));
        };

        if production.form == Form::Statement {
            return Err(self.name_required("expression", rules::KEYWORD_RESERVATION));
        }

        match production.kind {
            ProductionKind::BoolLiteral => {
                let value = self.check_keyword(Keyword::True);
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(value)))
            }
            ProductionKind::NullLiteral => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            ProductionKind::Number => {
                let literal = match self.advance().kind {
                    TokenKind::Number(Number::Int(n)) => Literal::Integer(n),
                    TokenKind::Number(Number::Float(n)) => Literal::Float(n),
                    TokenKind::Number(Number::Decimal(d)) => Literal::Decimal(d),
                    _ => return Err(self.unexpected("number", rules::EXPRESSION)),
                };
                Ok(Expr::Literal(literal))
            }
            ProductionKind::Strand => match self.advance().kind {
                TokenKind::Strand(strand) => Ok(Expr::Literal(Literal::Strand(strand))),
                _ => Err(self.unexpected("string", rules::EXPRESSION)),
            },
            ProductionKind::Param => match self.advance().kind {
                TokenKind::Param(name) => Ok(Expr::Param(name)),
                _ => Err(self.unexpected("$parameter", rules::EXPRESSION)),
            },
            ProductionKind::Identifier => self.parse_identifier_or_call(),
            ProductionKind::Group => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen, rules::EXPRESSION)?;
                Ok(expr)
            }
            ProductionKind::Array => self.parse_array_literal(),
            ProductionKind::Brace => self.parse_brace(),
            ProductionKind::If => self.parse_if(),
            ProductionKind::Create => self.parse_create(),
            ProductionKind::Update => self.parse_update(),
            ProductionKind::Delete => {
                self.advance();
                Ok(Expr::Delete(self.parse_target()?))
            }
            ProductionKind::Select => self.parse_select(),
            _ => Err(self.unexpected("expression", rules::EXPRESSION)),
        }
    }

    fn parse_identifier_or_call(&mut self) -> Result<Expr, SyntaxError> {
        let TokenKind::Identifier(ident) = self.advance().kind else {
            return Err(self.unexpected("identifier", rules::EXPRESSION));
        };

        if !ident.surrounded && self.check_punct(Punct::LParen) {
            self.advance();
            let args = self.parse_list(Punct::RParen)?;
            return Ok(Expr::Call {
                name: ident.name,
                args,
            });
        }
        Ok(Expr::Ident(ident))
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: Punct) -> Result<Vec<Expr>, SyntaxError> {
        let mut elements = vec![];

        while !self.check_punct(close) {
            elements.push(self.parse_expression()?);

            if !self.check_punct(close) {
                self.expect_punct(Punct::Comma, rules::EXPRESSION)?;
            }
        }

        self.expect_punct(close, rules::EXPRESSION)?;
        Ok(elements)
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // [
        let elements = self.nested(|p| p.parse_list(Punct::RBracket))?;
        Ok(Expr::Array(elements))
    }

    fn parse_brace(&mut self) -> Result<Expr, SyntaxError> {
        match grammar::brace_form(self.peek_kind(1), self.peek_kind(2)) {
            BraceForm::Object => {
                self.advance();
                self.nested(|p| p.parse_object_literal())
            }
            BraceForm::Block => Ok(Expr::Block(self.parse_block()?)),
            BraceForm::Ambiguous => {
                Err(self.error(SyntaxErrorKind::AmbiguousConstruct, rules::BLOCK_OBJECT))
            }
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut pairs = vec![];

        while !self.check_punct(Punct::RBrace) {
            let key = match &self.current().kind {
                TokenKind::Strand(s) if s.kind == StrandKind::Plain => s.text.clone(),
                TokenKind::Identifier(Identifier {
                    name,
                    surrounded: true,
                }) => name.clone(),
                _ => return Err(self.unexpected("quoted object key", rules::OBJECT_KEY)),
            };
            self.advance();

            self.expect_punct(Punct::Colon, rules::OBJECT_KEY)?;

            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma, rules::OBJECT_KEY)?;
            }
        }

        self.expect_punct(Punct::RBrace, rules::OBJECT_KEY)?;
        Ok(Expr::Object(pairs))
    }

    fn parse_if(&mut self) -> Result<Expr, SyntaxError> {
        let mut branches = Vec::new();
        let mut otherwise = None;

        self.advance(); // IF
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        branches.push((condition, body));

        while self.check_keyword(Keyword::Else) {
            self.advance();
            if self.check_keyword(Keyword::If) {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push((condition, body));
            } else {
                otherwise = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Expr::If {
            branches,
            otherwise,
        })
    }

    fn parse_target(&mut self) -> Result<Target, SyntaxError> {
        let target = match &self.current().kind {
            TokenKind::Identifier(ident) => Target::Table(ident.clone()),
            TokenKind::Strand(s) if s.kind == StrandKind::RecordId => Target::Record(s.clone()),
            TokenKind::Param(name) => Target::Param(name.clone()),
            _ => return Err(self.name_required("table, record id or $parameter", rules::EXPRESSION)),
        };
        self.advance();
        Ok(target)
    }

    fn parse_create(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // CREATE
        let target = self.parse_target()?;
        let content = if self.check_keyword(Keyword::Content) {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::Create { target, content })
    }

    fn parse_update(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // UPDATE
        let target = self.parse_target()?;

        let change = if self.check_keyword(Keyword::Content) {
            self.advance();
            Change::Content(Box::new(self.parse_expression()?))
        } else if self.check_keyword(Keyword::Set) {
            self.advance();
            let mut assignments = Vec::new();
            loop {
                let path = self.parse_path()?;
                if !self.current().is_operator(Operator::Assign) {
                    return Err(self.unexpected("'='", rules::EXPRESSION));
                }
                self.advance();
                assignments.push((path, self.parse_expression()?));

                if !self.check_punct(Punct::Comma) {
                    break;
                }
                self.advance();
            }
            Change::Set(assignments)
        } else {
            return Err(self.unexpected("CONTENT or SET", rules::EXPRESSION));
        };

        Ok(Expr::Update { target, change })
    }

    /// `name { '.' name | '[' ['-'] int ']' }`
    fn parse_path(&mut self) -> Result<Path, SyntaxError> {
        let mut path = vec![PathSegment::Field(self.parse_field_name()?)];

        loop {
            if self.check_punct(Punct::Dot) {
                self.advance();
                path.push(PathSegment::Field(self.parse_field_name()?));
            } else if self.check_punct(Punct::LBracket) {
                self.advance();
                let negative = self.current().is_operator(Operator::Minus);
                if negative {
                    self.advance();
                }
                let index = match self.current().kind {
                    TokenKind::Number(Number::Int(n)) => n,
                    _ => return Err(self.unexpected("integer index", rules::EXPRESSION)),
                };
                self.advance();
                self.expect_punct(Punct::RBracket, rules::EXPRESSION)?;
                path.push(PathSegment::Index(if negative { -index } else { index }));
            } else {
                return Ok(path);
            }
        }
    }

    fn parse_select(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // SELECT
        if !self.current().is_operator(Operator::Star) {
            return Err(self.unexpected("'*'", rules::EXPRESSION));
        }
        self.advance();
        self.expect_keyword(Keyword::From, rules::EXPRESSION)?;
        let from = self.parse_target()?;
        let condition = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::Select { from, condition })
    }
}

/// Parse a token stream into a query.
#[instrument(name = "parser::parse", level = "debug", skip(tokens), fields(tokens = tokens.len()))]
pub fn parse(tokens: Vec<Token>) -> Result<Query, SyntaxError> {
    Parser::new(tokens).parse_query()
}

/// Parse with explicit limits.
pub fn parse_with_config(tokens: Vec<Token>, config: ParseConfig) -> Result<Query, SyntaxError> {
    Parser::with_config(tokens, config).parse_query()
}
