//! Production table for statement and expression heads.
//!
//! Every production is a tagged variant keyed by the token that leads it.
//! The parser dispatches on this table instead of testing words, so the
//! question "which construct starts here" always has at most one answer.
//! [`check_conflicts`] verifies that at construction time.

use std::fmt;

use crate::ast::{Keyword, Operator, Punct, StrandKind, TokenKind};

/// Token classes that can lead a production without being a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Param,
    Strand,
    Number,
    LParen,
    LBracket,
    LBrace,
    Minus,
    Bang,
}

impl TokenClass {
    pub fn of(kind: &TokenKind) -> Option<TokenClass> {
        match kind {
            TokenKind::Identifier(_) => Some(TokenClass::Identifier),
            TokenKind::Param(_) => Some(TokenClass::Param),
            TokenKind::Strand(_) => Some(TokenClass::Strand),
            TokenKind::Number(_) => Some(TokenClass::Number),
            TokenKind::Punct(Punct::LParen) => Some(TokenClass::LParen),
            TokenKind::Punct(Punct::LBracket) => Some(TokenClass::LBracket),
            TokenKind::Punct(Punct::LBrace) => Some(TokenClass::LBrace),
            TokenKind::Operator(Operator::Minus) => Some(TokenClass::Minus),
            TokenKind::Operator(Operator::Bang) => Some(TokenClass::Bang),
            _ => None,
        }
    }
}

/// The token a production starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lead {
    Keyword(Keyword),
    Class(TokenClass),
}

impl Lead {
    fn matches(&self, kind: &TokenKind) -> bool {
        match (self, kind) {
            (Lead::Keyword(k), TokenKind::Keyword(found)) => k == found,
            (Lead::Class(class), kind) => TokenClass::of(kind) == Some(*class),
            _ => false,
        }
    }
}

/// Whether a production forms a whole statement or an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Statement,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionKind {
    Let,
    Return,
    Throw,
    For,
    Begin,
    Commit,
    Cancel,
    If,
    Create,
    Update,
    Delete,
    Select,
    BoolLiteral,
    NullLiteral,
    Not,
    Negate,
    Identifier,
    Param,
    Strand,
    Number,
    Group,
    Array,
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Production {
    pub kind: ProductionKind,
    pub lead: Lead,
    pub form: Form,
}

const fn statement(kind: ProductionKind, keyword: Keyword) -> Production {
    Production {
        kind,
        lead: Lead::Keyword(keyword),
        form: Form::Statement,
    }
}

const fn keyword_expr(kind: ProductionKind, keyword: Keyword) -> Production {
    Production {
        kind,
        lead: Lead::Keyword(keyword),
        form: Form::Expression,
    }
}

const fn class_expr(kind: ProductionKind, class: TokenClass) -> Production {
    Production {
        kind,
        lead: Lead::Class(class),
        form: Form::Expression,
    }
}

pub const PRODUCTIONS: &[Production] = &[
    statement(ProductionKind::Let, Keyword::Let),
    statement(ProductionKind::Return, Keyword::Return),
    statement(ProductionKind::Throw, Keyword::Throw),
    statement(ProductionKind::For, Keyword::For),
    statement(ProductionKind::Begin, Keyword::Begin),
    statement(ProductionKind::Commit, Keyword::Commit),
    statement(ProductionKind::Cancel, Keyword::Cancel),
    keyword_expr(ProductionKind::If, Keyword::If),
    keyword_expr(ProductionKind::Create, Keyword::Create),
    keyword_expr(ProductionKind::Update, Keyword::Update),
    keyword_expr(ProductionKind::Delete, Keyword::Delete),
    keyword_expr(ProductionKind::Select, Keyword::Select),
    keyword_expr(ProductionKind::BoolLiteral, Keyword::True),
    keyword_expr(ProductionKind::BoolLiteral, Keyword::False),
    keyword_expr(ProductionKind::NullLiteral, Keyword::Null),
    keyword_expr(ProductionKind::NullLiteral, Keyword::None),
    keyword_expr(ProductionKind::Not, Keyword::Not),
    class_expr(ProductionKind::Not, TokenClass::Bang),
    class_expr(ProductionKind::Negate, TokenClass::Minus),
    class_expr(ProductionKind::Identifier, TokenClass::Identifier),
    class_expr(ProductionKind::Param, TokenClass::Param),
    class_expr(ProductionKind::Strand, TokenClass::Strand),
    class_expr(ProductionKind::Number, TokenClass::Number),
    class_expr(ProductionKind::Group, TokenClass::LParen),
    class_expr(ProductionKind::Array, TokenClass::LBracket),
    class_expr(ProductionKind::Brace, TokenClass::LBrace),
];

/// Two productions that could both start at the same token.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarConflict {
    #[error("{first:?} and {second:?} share the lead {lead:?}")]
    SharedLead {
        first: ProductionKind,
        second: ProductionKind,
        lead: Lead,
    },

    #[error("statement production {0:?} is not led by a keyword")]
    UnkeyedStatement(ProductionKind),
}

/// Check that every lead selects exactly one production and that statements
/// are only introduced by keywords, which keeps them out of the FIRST set of
/// expressions.
pub fn check_conflicts(productions: &[Production]) -> Result<(), GrammarConflict> {
    for (i, first) in productions.iter().enumerate() {
        if first.form == Form::Statement && !matches!(first.lead, Lead::Keyword(_)) {
            return Err(GrammarConflict::UnkeyedStatement(first.kind));
        }
        if let Some(second) = productions[i + 1..].iter().find(|p| p.lead == first.lead) {
            return Err(GrammarConflict::SharedLead {
                first: first.kind,
                second: second.kind,
                lead: first.lead,
            });
        }
    }
    Ok(())
}

/// Production selected by a leading token, if any.
pub fn production_for(kind: &TokenKind) -> Option<&'static Production> {
    PRODUCTIONS.iter().find(|p| p.lead.matches(kind))
}

/// What a `{` opens, decided from the two tokens after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceForm {
    Object,
    Block,
    Ambiguous,
}

/// Brace decision table.
///
/// | after `{`                 | form      |
/// |---------------------------|-----------|
/// | `}`                       | Object    |
/// | plain strand, `:`         | Object    |
/// | `` `ident` ``, `:`        | Object    |
/// | bare ident, `:`           | Ambiguous |
/// | anything else             | Block     |
pub fn brace_form(second: &TokenKind, third: &TokenKind) -> BraceForm {
    let colon = matches!(third, TokenKind::Punct(Punct::Colon));
    match second {
        TokenKind::Punct(Punct::RBrace) => BraceForm::Object,
        TokenKind::Strand(s) if s.kind == StrandKind::Plain && colon => BraceForm::Object,
        TokenKind::Identifier(ident) if colon => {
            if ident.surrounded {
                BraceForm::Object
            } else {
                BraceForm::Ambiguous
            }
        }
        _ => BraceForm::Block,
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lead::Keyword(k) => write!(f, "{}", k),
            Lead::Class(c) => write!(f, "{:?}", c),
        }
    }
}
