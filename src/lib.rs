pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod evaluator;
pub mod functions;
pub mod grammar;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod scope;
pub mod storage;
pub mod transaction;
pub mod transform;
pub mod value;

pub use ast::{BinOp, Block, Expr, Query, Statement, Token};
pub use config::{EvalConfig, ParseConfig, UnboundPolicy};
pub use evaluator::{EvalError, Evaluator, ResultSequence};
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_text, to_text_pretty};
pub use parser::{Parser, SyntaxError};
pub use scope::{ResolveError, ScopedQuery};
pub use storage::{MemoryStore, ReadOp, Storage, StorageError, WriteHandle, WriteOp};
pub use value::{RecordId, Value};

/// Any error that stops a query from producing a result sequence.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Lex, parse and resolve a query without running it.
pub fn parse_query(text: &str) -> Result<ScopedQuery, QueryError> {
    parse_query_with_config(text, ParseConfig::default())
}

pub fn parse_query_with_config(text: &str, config: ParseConfig) -> Result<ScopedQuery, QueryError> {
    let tokens = lexer::tokenize(text)?;
    let query = parser::parse_with_config(tokens, config)?;
    Ok(scope::resolve(query)?)
}

/// Run a query against `storage` with default settings.
///
/// # Examples
///
/// ```
/// use quarry_lang::{MemoryStore, Value};
///
/// let mut store = MemoryStore::new();
/// let result = quarry_lang::run("BEGIN; CREATE r\"person:1\"; COMMIT; 1 + 1", &mut store).unwrap();
///
/// assert_eq!(result.values().len(), 2);
/// assert_eq!(result.tail(), &Value::Integer(2));
/// assert_eq!(store.records("person").len(), 1);
/// ```
pub fn run(text: &str, storage: &mut dyn Storage) -> Result<ResultSequence, QueryError> {
    run_with_config(text, storage, ParseConfig::default(), EvalConfig::default())
}

pub fn run_with_config(
    text: &str,
    storage: &mut dyn Storage,
    parse: ParseConfig,
    eval: EvalConfig,
) -> Result<ResultSequence, QueryError> {
    let scoped = parse_query_with_config(text, parse)?;
    Ok(Evaluator::new(storage, eval).evaluate(&scoped)?)
}
