//! Parser and evaluator settings.

use std::fmt;
use std::str::FromStr;

/// What reading an unbound variable yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnboundPolicy {
    /// `null`
    #[default]
    Null,
    /// A failure value naming the variable
    Failure,
}

impl FromStr for UnboundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(UnboundPolicy::Null),
            "failure" | "fail" => Ok(UnboundPolicy::Failure),
            other => Err(format!("unknown unbound policy '{}', expected null or failure", other)),
        }
    }
}

impl fmt::Display for UnboundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnboundPolicy::Null => f.write_str("null"),
            UnboundPolicy::Failure => f.write_str("failure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalConfig {
    pub unbound: UnboundPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Deepest allowed nesting of expressions and blocks
    pub max_depth: usize,
}

impl ParseConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 128;
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!("NULL".parse::<UnboundPolicy>(), Ok(UnboundPolicy::Null));
        assert_eq!("failure".parse::<UnboundPolicy>(), Ok(UnboundPolicy::Failure));
        assert!("maybe".parse::<UnboundPolicy>().is_err());
    }
}
