//! Run, check and format queries

use super::{CliError, load_seed, value_to_json};
use crate::{EvalConfig, MemoryStore, ParseConfig, ResultSequence, Value, output};

/// Options for the run and check commands
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query text
    pub query: String,
    /// JSON seed data loaded into the memory store before running
    pub seed: Option<String>,
    /// Only lex, parse and resolve; don't execute
    pub syntax_only: bool,
    pub parse: ParseConfig,
    pub eval: EvalConfig,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Lexing, parsing and scope resolution passed
    SyntaxValid,
    /// Query executed against a fresh memory store
    Success(ResultSequence),
}

/// How results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// A JSON array of the result values
    #[default]
    Json,
    /// One value per line in literal notation
    Text,
}

/// Execute a quarry run or check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let scoped = crate::parse_query_with_config(&options.query, options.parse)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let mut store = MemoryStore::new();
    if let Some(seed) = &options.seed {
        load_seed(seed, &mut store)?;
    }

    let result = crate::Evaluator::new(&mut store, options.eval)
        .evaluate(&scoped)
        .map_err(crate::QueryError::from)?;
    Ok(CheckResult::Success(result))
}

/// Canonical text of a query. Parsing the output gives the same tree back.
pub fn format_query(query: &str, config: ParseConfig) -> Result<String, CliError> {
    let tokens = crate::lexer::tokenize(query).map_err(crate::QueryError::from)?;
    let query = crate::parser::parse_with_config(tokens, config).map_err(crate::QueryError::from)?;
    Ok(query.to_string())
}

pub fn render(result: ResultSequence, format: OutputFormat, pretty: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            let values = serde_json::Value::Array(result.into_values().into_iter().map(value_to_json).collect());
            Ok(if pretty {
                serde_json::to_string_pretty(&values)?
            } else {
                serde_json::to_string(&values)?
            })
        }
        OutputFormat::Text => {
            let print = |v: &Value| {
                if pretty {
                    output::to_text_pretty(v)
                } else {
                    output::to_text(v)
                }
            };
            Ok(result.values().iter().map(print).collect::<Vec<_>>().join("\n"))
        }
    }
}
