use crate::ast::Statement;

/// Lexical scope number assigned by the scope resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// Scope of the query body.
    pub const GLOBAL: ScopeId = ScopeId(0);
    /// Placeholder left by the parser.
    pub const UNASSIGNED: ScopeId = ScopeId(usize::MAX);
}

/// An ordered statement sequence.
///
/// `terminated` records whether the last entry carried a trailing `;`, in
/// which case the sequence evaluates to null instead of that entry's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub entries: Vec<Statement>,
    pub terminated: bool,
    pub scope: ScopeId,
}

impl Block {
    pub fn new(entries: Vec<Statement>, terminated: bool) -> Self {
        Block {
            entries,
            terminated,
            scope: ScopeId::UNASSIGNED,
        }
    }
}

/// A complete query: the top-level statement sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: Block,
}
