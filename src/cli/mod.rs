//! CLI support for quarry-lang
//!
//! Provides programmatic access to the `quarry` commands so other tools can
//! run, check and format queries without going through the binary.

mod check;
mod convert;
mod docs;

pub use check::{CheckOptions, CheckResult, OutputFormat, execute_check, format_query, render};
pub use convert::{json_to_value, load_seed, value_to_json};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};

use std::io;

use crate::QueryError;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Seed data that is valid JSON but not `{ "table": [records] }`
    #[error("invalid seed data: {0}")]
    Seed(String),

    #[error("unknown category: '{0}'\nRun 'quarry docs' to see available categories.")]
    UnknownCategory(String),
}
