//! # Quarry Query Language - Abstract Syntax Tree
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes, identifiers, strands and storage targets
//! - **[operators]** - Binary and unary operators
//! - **[statements]** - Statements, including the transaction statements
//! - **[query]** - Blocks and the complete query
//! - **[display]** - Canonical pretty printer
//!
//! ## Quick Start
//!
//! ```text
//! BEGIN;
//! LET $p = CREATE person CONTENT {"name": "Tobie", "age": 32};
//! IF $p.age > 100 { CANCEL };
//! COMMIT;
//! ```
//!
//! A transaction is finalized only by the `COMMIT`/`CANCEL` in the statement
//! sequence that opened it. The `CANCEL` inside the `IF` block only flags the
//! context, and the `COMMIT` then rolls it back.
//!
//! ## Core Concepts
//!
//! ### Blocks
//!
//! A block `{ a; b; c }` evaluates to the value of its last entry. A trailing
//! `;` (`{ a; b; c; }`) suppresses that value and the block yields null. The
//! same rule applies to the query itself.
//!
//! ### Braces
//!
//! `{` opens an object when followed by `}` or by a quoted key and `:`, and a
//! block otherwise. `{ name: ...` is rejected as ambiguous.
//!
//! ### Strands
//!
//! Strings carry their kind from the moment they are lexed: `d"..."`,
//! `u"..."` and `r"..."` are datetime, uuid and record-id strands. A plain
//! string is never reinterpreted because of what it contains.
pub mod display;
pub mod expressions;
pub mod operators;
pub mod query;
pub mod statements;
pub mod tokens;

pub use expressions::{Change, Expr, Identifier, Literal, Strand, StrandKind, Target};
pub use operators::{BinOp, UnaryOp};
pub use query::{Block, Query, ScopeId};
pub use statements::{Statement, TxnId, TxnRole};
pub use tokens::{Keyword, Number, Operator, Position, Punct, Token, TokenKind};
