use crate::ast::{Block, Expr};

/// Identifier of one `BEGIN` within a query, assigned by the scope resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(pub usize);

/// Role of a `BEGIN`, `COMMIT` or `CANCEL` statement.
///
/// The parser emits `Unresolved`; the scope resolver pairs the statements of
/// each sequence and fills in the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxnRole {
    #[default]
    Unresolved,
    /// `BEGIN` opening a context
    Open(TxnId),
    /// `COMMIT` or `CANCEL` finalizing a context opened in the same sequence
    Close(TxnId),
    /// `COMMIT` following a context already closed by `CANCEL` in the same sequence
    AfterCancel(TxnId),
    /// `CANCEL` inside a nested block: flags the innermost open context
    Nested,
}

/// A statement inside a block or at the top level of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Binding in the current block
    ///
    /// # Example
    /// ```text
    /// LET $total = $price * 2
    /// ```
    Let { name: String, value: Expr },

    /// Expression evaluated for its value
    Expr(Expr),

    /// Ends the innermost block (or the query) with a value
    Return(Expr),

    /// Ends the innermost block (or the query) with a failure value
    ///
    /// # Example
    /// ```text
    /// IF $age < 0 { THROW "negative age" }
    /// ```
    Throw(Expr),

    /// `FOR $item IN $items { ... }`
    For {
        binding: String,
        iterable: Expr,
        body: Block,
    },

    Begin(TxnRole),
    Commit(TxnRole),
    Cancel(TxnRole),
}

impl Statement {
    /// Whether the statement contributes an entry to a result sequence.
    pub fn produces_value(&self) -> bool {
        matches!(
            self,
            Statement::Expr(_) | Statement::Return(_) | Statement::Throw(_)
        )
    }
}
